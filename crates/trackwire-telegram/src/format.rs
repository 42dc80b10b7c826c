//! Notification → MarkdownV2 message formatting. Pure function of the
//! notification's display fields.

use trackwire_core::types::Notification;

use crate::markdown::{escape_code, escape_url, escape_v2, sanitize_code_block};

/// Render one notification as a Telegram MarkdownV2 message.
pub fn notification_to_markdown(n: &Notification) -> String {
    let mut out = String::new();

    let display_id = if n.issue_id.trim().is_empty() { &n.id } else { &n.issue_id };
    out.push_str(&format!("📌 *{}*", escape_v2(display_id)));
    if !n.title.trim().is_empty() {
        out.push_str(&format!(" — _{}_", escape_v2(&n.title)));
    }
    out.push('\n');

    if !n.comment.trim().is_empty() {
        out.push_str(&format!("```\n{}\n```\n", sanitize_code_block(&n.comment)));
    }

    if !n.status.trim().is_empty() {
        out.push_str(&format!("Status: `{}`\n", escape_code(&n.status)));
    }
    if !n.priority.trim().is_empty() {
        out.push_str(&format!("Priority: `{}`\n", escape_code(&n.priority)));
    }
    if !n.assignee.trim().is_empty() {
        out.push_str(&format!("Assignee: `{}`\n", escape_code(&n.assignee)));
    }

    let tags: Vec<String> = n
        .tags
        .iter()
        .filter(|t| !t.trim().is_empty())
        .map(|t| escape_code(t))
        .collect();
    if !tags.is_empty() {
        out.push_str(&format!("Tags: `{}`\n", tags.join("`, `")));
    }

    if !n.link.trim().is_empty() {
        out.push_str(&format!("Link: [Open]({})", escape_url(&n.link)));
    }

    out.trim_end().to_string()
}
