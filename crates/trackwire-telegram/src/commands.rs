//! Bot command parsing. Pure text → command; dispatch lives in the binary.

/// A parsed operator command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BotCommand {
    /// Enable the notification scheduler.
    Start,
    /// Disable the notification scheduler.
    Stop,
    /// Manually resume a circuit-breaker pause.
    Resume,
    /// Report scheduler/health/storage status.
    Status,
    /// List tracker projects.
    Projects,
    Help,
    /// Create a tracker issue: `/create <summary> @<project-id>`.
    Create {
        summary: String,
        project_id: String,
    },
    /// Slash-prefixed text that matched nothing above.
    Unknown(String),
}

/// Parse a message into a command. Non-command text returns None.
pub fn parse_command(text: &str) -> Option<BotCommand> {
    let trimmed = text.trim();
    if !trimmed.starts_with('/') {
        return None;
    }

    let lower = trimmed.to_lowercase();
    if lower.starts_with("/create") {
        let (summary, project_id) = split_create_args(trimmed);
        return Some(BotCommand::Create { summary, project_id });
    }

    Some(match lower.as_str() {
        "/start" => BotCommand::Start,
        "/stop" => BotCommand::Stop,
        "/resume" => BotCommand::Resume,
        "/status" => BotCommand::Status,
        "/projects" => BotCommand::Projects,
        "/help" => BotCommand::Help,
        _ => BotCommand::Unknown(trimmed.to_string()),
    })
}

/// Split `/create Fix login bug @DEMO` into ("Fix login bug", "DEMO").
/// A missing `@project` part yields an empty project id, which the caller
/// reports as a usage error.
fn split_create_args(text: &str) -> (String, String) {
    let content = text["/create".len()..].trim();
    match content.split_once('@') {
        Some((summary, project)) => (summary.trim().to_string(), project.trim().to_string()),
        None => (content.to_string(), String::new()),
    }
}
