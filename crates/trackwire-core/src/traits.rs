//! Collaborator traits — the seams between the scheduler core and the
//! outside world. The core never talks HTTP or SQL directly; it only sees
//! these three contracts, which keeps the whole state machine testable with
//! in-memory fakes.

use async_trait::async_trait;
use std::collections::HashSet;

use crate::error::Result;
use crate::types::Notification;

/// Source of pending notifications (the issue tracker).
#[async_trait]
pub trait NotificationSource: Send + Sync {
    /// Fetch up to `limit` candidate notifications. Ordering is whatever the
    /// upstream returns; `limit` bounds cost, not correctness.
    async fn fetch_notifications(&self, limit: u32) -> Result<Vec<Notification>>;
}

/// Outbound messenger (Telegram). Failures are surfaced to the caller and
/// never retried here.
#[async_trait]
pub trait Messenger: Send + Sync {
    /// Send to the operator's personal chat.
    async fn send_to_pm(&self, text: &str) -> Result<()>;
}

/// Persisted set of already-delivered notification ids.
///
/// Ids are never removed in normal operation; a crash between "message sent"
/// and `mark_sent` means a duplicate delivery on the next run, which is the
/// documented at-least-once trade-off.
#[async_trait]
pub trait SentStore: Send + Sync {
    /// Full snapshot of delivered ids. Must reflect all writes that
    /// completed before the call began.
    async fn all_sent_ids(&self) -> Result<HashSet<String>>;

    /// Record ids as delivered. Idempotent: re-marking an existing id is a
    /// no-op, never an error.
    async fn mark_sent(&self, ids: &HashSet<String>) -> Result<()>;

    /// Number of delivered ids, for status reporting.
    async fn sent_count(&self) -> Result<u64>;
}
