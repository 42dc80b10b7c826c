//! Health tracking — consecutive-failure counters shared between the tick
//! task and the status-reporting command handler.

use chrono::{DateTime, Utc};
use std::sync::Mutex;

use trackwire_core::error::TrackWireError;

/// Advisory failure taxonomy, used only for human-readable alerts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    Tracker,
    Storage,
    Telegram,
    Unknown,
}

impl FailureKind {
    /// Best-effort classification of a tick failure. Never used for control
    /// flow, only for operator-facing text.
    pub fn classify(err: &TrackWireError) -> Self {
        match err {
            TrackWireError::Tracker(_) => Self::Tracker,
            TrackWireError::Storage(_) => Self::Storage,
            TrackWireError::Telegram(_) => Self::Telegram,
            _ => Self::Unknown,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Tracker => "Tracker Connection Error",
            Self::Storage => "Storage Error",
            Self::Telegram => "Telegram API Error",
            Self::Unknown => "System Error",
        }
    }
}

impl std::fmt::Display for FailureKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Point-in-time view of scheduler health.
#[derive(Debug, Clone, Default)]
pub struct HealthSnapshot {
    pub consecutive_failures: u32,
    pub last_success_at: Option<DateTime<Utc>>,
    pub last_failure_at: Option<DateTime<Utc>>,
    pub last_error_kind: Option<String>,
    pub last_error_detail: Option<String>,
}

/// Records tick outcomes. Success resets the failure streak and clears the
/// last-error fields; failure bumps the streak and overwrites them.
#[derive(Default)]
pub struct HealthTracker {
    inner: Mutex<HealthSnapshot>,
}

impl HealthTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_success(&self) {
        let mut inner = self.inner.lock().unwrap();
        inner.consecutive_failures = 0;
        inner.last_success_at = Some(Utc::now());
        inner.last_error_kind = None;
        inner.last_error_detail = None;
    }

    pub fn record_failure(&self, kind: FailureKind, detail: &str) {
        let mut inner = self.inner.lock().unwrap();
        inner.consecutive_failures += 1;
        inner.last_failure_at = Some(Utc::now());
        inner.last_error_kind = Some(kind.as_str().to_string());
        inner.last_error_detail = Some(detail.to_string());
    }

    pub fn consecutive_failures(&self) -> u32 {
        self.inner.lock().unwrap().consecutive_failures
    }

    pub fn has_recent_failures(&self) -> bool {
        self.consecutive_failures() > 0
    }

    pub fn snapshot(&self) -> HealthSnapshot {
        self.inner.lock().unwrap().clone()
    }

    /// One-line status for the `/status` reply.
    pub fn status_line(&self) -> String {
        match self.consecutive_failures() {
            0 => "✅ Healthy".to_string(),
            n if n < 3 => format!("⚠️ Warning ({n} failure(s))"),
            n => format!("❌ Failing ({n} consecutive failures)"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_failure_streak_and_reset() {
        let health = HealthTracker::new();
        assert!(!health.has_recent_failures());

        health.record_failure(FailureKind::Tracker, "timeout");
        health.record_failure(FailureKind::Tracker, "timeout again");
        assert_eq!(health.consecutive_failures(), 2);
        assert!(health.has_recent_failures());

        let snap = health.snapshot();
        assert_eq!(snap.last_error_kind.as_deref(), Some("Tracker Connection Error"));
        assert_eq!(snap.last_error_detail.as_deref(), Some("timeout again"));
        assert!(snap.last_failure_at.is_some());

        health.record_success();
        assert_eq!(health.consecutive_failures(), 0);
        let snap = health.snapshot();
        assert!(snap.last_error_kind.is_none());
        assert!(snap.last_error_detail.is_none());
        assert!(snap.last_success_at.is_some());
        // Failure timestamp is history, not streak state.
        assert!(snap.last_failure_at.is_some());
    }

    #[test]
    fn test_classify_kinds() {
        assert_eq!(
            FailureKind::classify(&TrackWireError::Tracker("x".into())),
            FailureKind::Tracker
        );
        assert_eq!(
            FailureKind::classify(&TrackWireError::Storage("x".into())),
            FailureKind::Storage
        );
        assert_eq!(
            FailureKind::classify(&TrackWireError::Telegram("x".into())),
            FailureKind::Telegram
        );
        assert_eq!(
            FailureKind::classify(&TrackWireError::Other("x".into())),
            FailureKind::Unknown
        );
    }

    #[test]
    fn test_status_line() {
        let health = HealthTracker::new();
        assert_eq!(health.status_line(), "✅ Healthy");
        health.record_failure(FailureKind::Unknown, "e");
        assert!(health.status_line().contains("Warning"));
        health.record_failure(FailureKind::Unknown, "e");
        health.record_failure(FailureKind::Unknown, "e");
        assert!(health.status_line().contains("Failing"));
    }
}
