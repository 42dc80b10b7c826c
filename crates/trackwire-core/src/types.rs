//! Domain types shared between the tracker client and the delivery pipeline.

use serde::{Deserialize, Serialize};

/// A tracker notification flattened for delivery.
///
/// Only `id` matters for deduplication; every other field is display payload
/// consumed by the Telegram formatter.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Notification {
    /// Globally unique notification id (the dedup key).
    pub id: String,
    /// Readable issue id, e.g. "DEMO-123".
    pub issue_id: String,
    pub title: String,
    pub content: String,
    pub status: String,
    /// Raw updated timestamp as reported by the tracker.
    pub updated: String,
    pub read: bool,
    pub assignee: String,
    pub priority: String,
    pub header: String,
    /// Latest comment text, if the notification carries one.
    pub comment: String,
    /// Permalink to the issue.
    pub link: String,
    pub tags: Vec<String>,
}

/// A tracker project, for issue creation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProjectInfo {
    pub id: String,
    pub name: String,
}
