//! TrackWire error type — one enum per collaborator boundary.

use thiserror::Error;

/// Convenience result alias used across all TrackWire crates.
pub type Result<T> = std::result::Result<T, TrackWireError>;

/// Errors surfaced by TrackWire components.
#[derive(Debug, Error)]
pub enum TrackWireError {
    /// Issue-tracker API failure (transport, auth, bad response).
    #[error("Tracker error: {0}")]
    Tracker(String),

    /// Telegram Bot API failure.
    #[error("Telegram error: {0}")]
    Telegram(String),

    /// Sent-notification storage failure.
    #[error("Storage error: {0}")]
    Storage(String),

    /// Configuration load/parse failure.
    #[error("Config error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("{0}")]
    Other(String),
}

impl TrackWireError {
    /// The error message without the variant prefix, for operator-facing alerts.
    pub fn detail(&self) -> String {
        match self {
            Self::Tracker(m) | Self::Telegram(m) | Self::Storage(m) | Self::Config(m) => m.clone(),
            Self::Io(e) => e.to_string(),
            Self::Other(m) => m.clone(),
        }
    }
}
