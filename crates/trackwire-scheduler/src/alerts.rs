//! Operator alert texts — pure functions so the circuit breaker can be
//! tested without a live messenger.

use trackwire_telegram::markdown::escape_v2;

use crate::health::FailureKind;

/// The single outage alert sent when the circuit breaker trips.
pub fn outage_alert(kind: FailureKind, detail: &str, failures: u32) -> String {
    format!(
        "🚨 *Notification Scheduler Alert*\n\n\
         ❌ *Status:* Failed after {failures} consecutive attempts\n\
         🔍 *Error Type:* {}\n\
         📝 *Details:* {}\n\n\
         ⏸️ The scheduler has been paused to prevent further errors\\.\n\
         🔄 It will auto\\-resume after the configured period\\.\n\
         💡 Use /resume to resume it manually\\.",
        escape_v2(kind.as_str()),
        escape_v2(detail),
    )
}

/// The recovery notice sent on the first successful tick after failures.
pub fn recovery_notice() -> String {
    "✅ *Notification Scheduler Recovered*\n\n\
     The scheduler has recovered and is operating normally\\."
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_outage_alert_carries_kind_and_count() {
        let msg = outage_alert(FailureKind::Tracker, "HTTP 503: upstream down", 3);
        assert!(msg.contains("3 consecutive attempts"));
        assert!(msg.contains("Tracker Connection Error"));
        assert!(msg.contains("HTTP 503"));
    }

    #[test]
    fn test_outage_alert_escapes_detail() {
        let msg = outage_alert(FailureKind::Unknown, "weird *markup* [here]", 5);
        assert!(msg.contains("\\*markup\\*"));
        assert!(msg.contains("\\[here\\]"));
    }

    #[test]
    fn test_recovery_notice_is_stable() {
        assert!(recovery_notice().contains("Recovered"));
    }
}
