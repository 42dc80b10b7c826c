//! Issue-tracker REST client.
//!
//! Implements the `NotificationSource` collaborator over the tracker's
//! notification feed, plus issue creation and project listing for the
//! interactive bot commands. All JSON mapping is kept in pure functions so
//! the wire format can be tested without HTTP.

mod client;
mod issues;

pub use client::TrackerClient;
