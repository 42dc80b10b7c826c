//! # TrackWire Scheduler
//!
//! The polling orchestrator: pulls pending tracker notifications on a fixed
//! interval, deduplicates against the sent-store, fans them out to Telegram
//! with pagination, and protects itself from cascading failure with a
//! circuit breaker.
//!
//! ## Architecture
//! ```text
//! tick loop (tokio interval)
//!   └── SchedulerController.tick()          Stopped | Running | Paused
//!         ├── auto-resume check             (pausedUntil elapsed?)
//!         ├── DeliveryPipeline.run(limit)
//!         │     ├── fetch candidates        NotificationSource
//!         │     ├── snapshot sent ids       SentStore
//!         │     ├── filter + format         MarkdownV2
//!         │     └── paged sends + delay     Messenger
//!         ├── HealthTracker                 success / failure counters
//!         └── circuit breaker               auto-pause + single alert
//! ```
//!
//! Ticks never overlap; manual `/start`, `/stop`, `/resume` commands are
//! safe to call from another task while a tick is in flight.

pub mod alerts;
pub mod controller;
pub mod health;
pub mod pipeline;

pub use controller::{BreakerSettings, SchedState, SchedulerController, run_scheduler};
pub use health::{FailureKind, HealthSnapshot, HealthTracker};
pub use pipeline::{DeliveryPipeline, DeliveryReport, DeliverySettings};

#[cfg(test)]
pub(crate) mod testutil;
