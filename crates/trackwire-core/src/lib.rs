//! # TrackWire Core
//!
//! Shared foundation for the TrackWire notification bridge: configuration,
//! the error type, domain types, and the collaborator traits that decouple
//! the scheduler core from the tracker / Telegram / storage implementations.

pub mod config;
pub mod duration;
pub mod error;
pub mod traits;
pub mod types;

pub use config::TrackWireConfig;
pub use error::{Result, TrackWireError};
pub use traits::{Messenger, NotificationSource, SentStore};
pub use types::{Notification, ProjectInfo};
