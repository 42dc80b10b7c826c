//! Interactive bot commands over Telegram long polling.
//!
//! This is the manual control surface: `/start`, `/stop`, `/resume` drive
//! the scheduler state machine from a different task than the tick loop;
//! `/status`, `/projects`, `/create` are conveniences around the tracker.

use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;

use trackwire_core::traits::SentStore;
use trackwire_scheduler::SchedulerController;
use trackwire_storage::SqliteSentStore;
use trackwire_telegram::commands::{BotCommand, parse_command};
use trackwire_telegram::markdown::{escape_code, escape_v2};
use trackwire_telegram::TelegramClient;
use trackwire_tracker::TrackerClient;

/// Poll for operator commands until shutdown fires.
pub async fn run_command_loop(
    telegram: Arc<TelegramClient>,
    tracker: Arc<TrackerClient>,
    store: Arc<SqliteSentStore>,
    controller: Arc<SchedulerController>,
    mut shutdown: watch::Receiver<bool>,
) {
    tracing::info!("💬 Command loop started (long polling)");
    loop {
        let updates = tokio::select! {
            changed = shutdown.changed() => {
                if changed.is_err() || *shutdown.borrow() {
                    break;
                }
                continue;
            }
            res = telegram.get_updates() => res,
        };

        match updates {
            Ok(updates) => {
                for update in updates {
                    let Some((text, chat_id)) = update.command_text() else {
                        continue;
                    };
                    let Some(cmd) = parse_command(text) else {
                        continue;
                    };
                    tracing::info!("💬 Command from chat {chat_id}: {text}");
                    let reply =
                        handle_command(&tracker, &store, &controller, cmd).await;
                    if let Err(e) = telegram.send_markdown(&chat_id.to_string(), &reply).await {
                        tracing::warn!("⚠️ Failed to send command reply: {e}");
                    }
                }
            }
            Err(e) => {
                tracing::error!("Polling error: {e}");
                tokio::time::sleep(Duration::from_secs(5)).await;
            }
        }
    }
    tracing::info!("💬 Command loop stopped");
}

async fn handle_command(
    tracker: &TrackerClient,
    store: &SqliteSentStore,
    controller: &SchedulerController,
    cmd: BotCommand,
) -> String {
    match cmd {
        BotCommand::Start => {
            controller.start();
            welcome_text()
        }
        BotCommand::Stop => {
            controller.stop();
            "⏹️ Scheduler stopped\\. Notifications are no longer delivered\\.".to_string()
        }
        BotCommand::Resume => {
            controller.resume();
            "▶️ Scheduler resumed\\.".to_string()
        }
        BotCommand::Status => status_text(tracker, store, controller).await,
        BotCommand::Projects => projects_text(tracker).await,
        BotCommand::Help => help_text(),
        BotCommand::Create { summary, project_id } => {
            create_issue_text(tracker, &summary, &project_id).await
        }
        BotCommand::Unknown(text) => format!(
            "❓ Unknown command: `{}`\n\n{}",
            escape_code(&text),
            help_text()
        ),
    }
}

async fn status_text(
    tracker: &TrackerClient,
    store: &SqliteSentStore,
    controller: &SchedulerController,
) -> String {
    let tracker_status = match tracker.list_projects().await {
        Ok(p) if !p.is_empty() => "✅ Connected".to_string(),
        Ok(_) => "⚠️ Connected, no projects visible".to_string(),
        Err(e) => format!("❌ {}", escape_v2(&e.detail())),
    };

    let sched_status = if controller.is_running() {
        "▶️ Running".to_string()
    } else if controller.is_paused() {
        match controller.paused_until() {
            Some(until) => format!(
                "⏸️ Paused until {}",
                escape_v2(&until.format("%Y-%m-%d %H:%M:%S UTC").to_string())
            ),
            None => "⏸️ Paused".to_string(),
        }
    } else {
        "⏹️ Stopped".to_string()
    };

    let delivered = store.sent_count().await.unwrap_or(0);
    let mut out = format!(
        "🤖 *Bot:* ✅ Online\n\
         📡 *Tracker:* {tracker_status}\n\
         ⏰ *Scheduler:* {sched_status}\n\
         🩺 *Health:* {}\n\
         💾 *Delivered:* {delivered} notification\\(s\\)",
        escape_v2(&controller.health().status_line()),
    );

    let health = controller.health().snapshot();
    if let (Some(kind), Some(detail)) = (health.last_error_kind, health.last_error_detail) {
        out.push_str(&format!(
            "\n⚠️ *Last error:* {}: {}",
            escape_v2(&kind),
            escape_v2(&detail)
        ));
    }
    out
}

async fn projects_text(tracker: &TrackerClient) -> String {
    match tracker.list_projects().await {
        Ok(projects) if projects.is_empty() => "❌ No projects found".to_string(),
        Ok(projects) => {
            let mut out = String::from("🏗️ *Available projects:*\n\n");
            for p in &projects {
                out.push_str(&format!(
                    "• *{}* \\- `{}`\n",
                    escape_v2(&p.name),
                    escape_code(&p.id)
                ));
            }
            out.push_str(&format!(
                "\n*Example:* `/create Fix login bug @{}`",
                escape_code(&projects[0].id)
            ));
            out
        }
        Err(e) => format!("❌ Failed to fetch projects: {}", escape_v2(&e.detail())),
    }
}

async fn create_issue_text(tracker: &TrackerClient, summary: &str, project_id: &str) -> String {
    if summary.is_empty() || project_id.is_empty() {
        return "❌ Usage: `/create Your issue summary @PROJECT_ID`\n\n\
                Both a summary and a project id are required\\. \
                Use /projects to list available project ids\\."
            .to_string();
    }

    match tracker.create_issue(summary, project_id).await {
        Ok(id) => format!(
            "✅ Issue created\\!\n\n\
             *Issue:* `{}`\n\
             *Summary:* {}\n\
             *Project:* `{}`",
            escape_code(&id),
            escape_v2(summary),
            escape_code(project_id)
        ),
        Err(e) => format!("❌ Failed to create issue: {}", escape_v2(&e.detail())),
    }
}

fn welcome_text() -> String {
    format!(
        "🤖 *TrackWire bot is live\\!*\n\n\
         ▶️ Notification delivery is now enabled\\.\n\n{}",
        help_text()
    )
}

fn help_text() -> String {
    "📋 *Commands:*\n\
     `/start` \\- enable notification delivery\n\
     `/stop` \\- disable notification delivery\n\
     `/resume` \\- resume after a circuit\\-breaker pause\n\
     `/status` \\- scheduler and health status\n\
     `/projects` \\- list tracker projects\n\
     `/create <summary> @<project>` \\- create a tracker issue\n\
     `/help` \\- this message"
        .to_string()
}
