//! TrackWire configuration system.
//!
//! All duration-valued settings use the compact textual encoding parsed by
//! [`crate::duration`] ("500ms", "10s", "5m", "1h").

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::Result;

/// Root configuration.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct TrackWireConfig {
    #[serde(default)]
    pub tracker: TrackerConfig,
    #[serde(default)]
    pub telegram: TelegramConfig,
    #[serde(default)]
    pub scheduler: SchedulerConfig,
    #[serde(default)]
    pub storage: StorageConfig,
}

impl TrackWireConfig {
    /// Load config from the default path (~/.trackwire/config.toml).
    pub fn load() -> Result<Self> {
        let path = Self::default_path();
        if path.exists() {
            Self::load_from(&path)
        } else {
            Ok(Self::default())
        }
    }

    /// Load config from a specific path.
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            crate::error::TrackWireError::Config(format!("Failed to read config: {e}"))
        })?;
        let config: Self = toml::from_str(&content).map_err(|e| {
            crate::error::TrackWireError::Config(format!("Failed to parse config: {e}"))
        })?;
        Ok(config)
    }

    /// Get the default config path.
    pub fn default_path() -> PathBuf {
        Self::home_dir().join("config.toml")
    }

    /// Get the TrackWire home directory (~/.trackwire).
    pub fn home_dir() -> PathBuf {
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".trackwire")
    }
}

/// Issue-tracker API configuration.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct TrackerConfig {
    /// Base URL of the tracker instance, e.g. "https://example.myjetbrains.com/youtrack".
    #[serde(default)]
    pub base_url: String,
    /// Permanent API token.
    #[serde(default)]
    pub token: String,
}

/// Telegram Bot API configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TelegramConfig {
    #[serde(default)]
    pub bot_token: String,
    /// Chat that receives notifications, alerts, and command replies.
    #[serde(default)]
    pub pm_chat_id: String,
    /// Long-poll timeout for getUpdates, in seconds.
    #[serde(default = "default_poll_timeout")]
    pub poll_timeout_secs: u64,
}

fn default_poll_timeout() -> u64 { 30 }

impl Default for TelegramConfig {
    fn default() -> Self {
        Self {
            bot_token: String::new(),
            pm_chat_id: String::new(),
            poll_timeout_secs: default_poll_timeout(),
        }
    }
}

/// Scheduler configuration: tick cadence, fetch bound, pagination, circuit breaker.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchedulerConfig {
    #[serde(default = "bool_true")]
    pub enabled: bool,
    /// Interval between ticks (compact duration, 5s..10m is sensible).
    #[serde(default = "default_tick_interval")]
    pub tick_interval: String,
    /// Upper bound on notifications fetched per tick.
    #[serde(default = "default_fetch_limit")]
    pub fetch_limit: u32,
    #[serde(default)]
    pub pagination: PaginationConfig,
    #[serde(default)]
    pub circuit_breaker: CircuitBreakerConfig,
}

fn bool_true() -> bool { true }
fn default_tick_interval() -> String { "5s".into() }
fn default_fetch_limit() -> u32 { 20 }

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            tick_interval: default_tick_interval(),
            fetch_limit: default_fetch_limit(),
            pagination: PaginationConfig::default(),
            circuit_breaker: CircuitBreakerConfig::default(),
        }
    }
}

/// Paginated delivery: fixed-size chunks with an inter-message delay, so a
/// burst of notifications does not trip Telegram's rate limit.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaginationConfig {
    #[serde(default = "bool_true")]
    pub enabled: bool,
    #[serde(default = "default_page_size")]
    pub page_size: u32,
    /// Compact duration; unparsable values fall back to 1 second.
    #[serde(default = "default_message_delay")]
    pub delay_between_messages: String,
}

fn default_page_size() -> u32 { 5 }
fn default_message_delay() -> String { "1s".into() }

impl Default for PaginationConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            page_size: default_page_size(),
            delay_between_messages: default_message_delay(),
        }
    }
}

/// Circuit breaker: pause the scheduler after repeated failures instead of
/// hammering a broken upstream and flooding the operator with alerts.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CircuitBreakerConfig {
    #[serde(default = "default_max_failures")]
    pub max_consecutive_failures: u32,
    #[serde(default = "bool_true")]
    pub auto_pause: bool,
    /// How long to stay paused before auto-resuming (compact duration).
    #[serde(default = "default_pause_duration")]
    pub pause_duration: String,
    /// Send one alert per outage instead of one per failed tick.
    #[serde(default = "bool_true")]
    pub send_single_alert: bool,
}

fn default_max_failures() -> u32 { 3 }
fn default_pause_duration() -> String { "1h".into() }

impl Default for CircuitBreakerConfig {
    fn default() -> Self {
        Self {
            max_consecutive_failures: default_max_failures(),
            auto_pause: true,
            pause_duration: default_pause_duration(),
            send_single_alert: true,
        }
    }
}

/// Sent-notification storage configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    #[serde(default = "default_db_path")]
    pub db_path: String,
}

fn default_db_path() -> String { "~/.trackwire/sent.db".into() }

impl Default for StorageConfig {
    fn default() -> Self {
        Self { db_path: default_db_path() }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = TrackWireConfig::default();
        assert!(config.scheduler.enabled);
        assert_eq!(config.scheduler.tick_interval, "5s");
        assert_eq!(config.scheduler.fetch_limit, 20);
        assert_eq!(config.scheduler.circuit_breaker.max_consecutive_failures, 3);
        assert_eq!(config.scheduler.circuit_breaker.pause_duration, "1h");
        assert!(config.scheduler.pagination.enabled);
    }

    #[test]
    fn test_config_from_toml() {
        let toml_str = r#"
            [tracker]
            base_url = "https://issues.example.com"
            token = "perm-token"

            [telegram]
            bot_token = "123:abc"
            pm_chat_id = "42"

            [scheduler]
            tick_interval = "30s"
            fetch_limit = 50

            [scheduler.circuit_breaker]
            max_consecutive_failures = 5
            pause_duration = "10m"
        "#;

        let config: TrackWireConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(config.tracker.base_url, "https://issues.example.com");
        assert_eq!(config.telegram.pm_chat_id, "42");
        assert_eq!(config.scheduler.tick_interval, "30s");
        assert_eq!(config.scheduler.fetch_limit, 50);
        assert_eq!(config.scheduler.circuit_breaker.max_consecutive_failures, 5);
        assert_eq!(config.scheduler.circuit_breaker.pause_duration, "10m");
        // Sections not present keep their defaults
        assert!(config.scheduler.pagination.enabled);
        assert_eq!(config.telegram.poll_timeout_secs, 30);
    }

    #[test]
    fn test_config_missing_fields_use_defaults() {
        let config: TrackWireConfig = toml::from_str("").unwrap();
        assert_eq!(config.scheduler.pagination.page_size, 5);
        assert_eq!(config.scheduler.pagination.delay_between_messages, "1s");
        assert_eq!(config.storage.db_path, "~/.trackwire/sent.db");
    }

    #[test]
    fn test_home_dir() {
        let home = TrackWireConfig::home_dir();
        assert!(home.to_string_lossy().contains("trackwire"));
    }
}
