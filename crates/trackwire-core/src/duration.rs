//! Compact textual duration parsing: "500ms", "10s", "5m", "2h".
//!
//! Every duration-valued config setting goes through here so the whole
//! system shares one encoding and one fallback rule.

use std::time::Duration;

/// Parse a compact duration string. Returns None for anything unparsable.
pub fn parse_compact(s: &str) -> Option<Duration> {
    let s = s.trim();
    if s.is_empty() {
        return None;
    }

    let (value, unit) = match s.find(|c: char| !c.is_ascii_digit()) {
        Some(idx) => s.split_at(idx),
        None => return None, // bare number, unit required
    };
    let value: u64 = value.parse().ok()?;

    match unit {
        "ms" => Some(Duration::from_millis(value)),
        "s" => Some(Duration::from_secs(value)),
        "m" => Some(Duration::from_secs(value * 60)),
        "h" => Some(Duration::from_secs(value * 3600)),
        _ => None,
    }
}

/// Parse with a fallback default for unknown/unparsable input.
pub fn parse_or(s: &str, default: Duration) -> Duration {
    parse_compact(s).unwrap_or(default)
}
