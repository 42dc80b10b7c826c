//! SQLite-backed sent-notification store.
//!
//! One table, one index, no ORM. The store is the dedup boundary: an id in
//! `sent_notifications` is never delivered again under crash-free operation.

mod sent;

pub use sent::SqliteSentStore;
