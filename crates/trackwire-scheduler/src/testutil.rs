//! In-memory collaborator fakes for scheduler tests.

use async_trait::async_trait;
use std::collections::HashSet;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use trackwire_core::error::{Result, TrackWireError};
use trackwire_core::traits::{Messenger, NotificationSource, SentStore};
use trackwire_core::types::Notification;

pub(crate) fn notification(id: &str, issue_id: &str) -> Notification {
    Notification {
        id: id.to_string(),
        issue_id: issue_id.to_string(),
        title: format!("Issue {issue_id}"),
        ..Default::default()
    }
}

/// Notification source returning a fixed list, optionally failing.
pub(crate) struct MockSource {
    notifications: Mutex<Vec<Notification>>,
    fail: AtomicBool,
    fetch_calls: AtomicUsize,
}

impl MockSource {
    pub fn with(notifications: Vec<Notification>) -> Self {
        Self {
            notifications: Mutex::new(notifications),
            fail: AtomicBool::new(false),
            fetch_calls: AtomicUsize::new(0),
        }
    }

    pub fn failing() -> Self {
        let source = Self::with(Vec::new());
        source.fail.store(true, Ordering::SeqCst);
        source
    }

    pub fn set_failing(&self, fail: bool) {
        self.fail.store(fail, Ordering::SeqCst);
    }

    pub fn fetch_calls(&self) -> usize {
        self.fetch_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl NotificationSource for MockSource {
    async fn fetch_notifications(&self, _limit: u32) -> Result<Vec<Notification>> {
        self.fetch_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail.load(Ordering::SeqCst) {
            return Err(TrackWireError::Tracker("connection refused".into()));
        }
        Ok(self.notifications.lock().unwrap().clone())
    }
}

/// Messenger that records every sent text; can fail the Nth send.
pub(crate) struct MockMessenger {
    sent: Mutex<Vec<String>>,
    fail_on: Mutex<Option<usize>>,
    send_attempts: AtomicUsize,
}

impl MockMessenger {
    pub fn new() -> Self {
        Self {
            sent: Mutex::new(Vec::new()),
            fail_on: Mutex::new(None),
            send_attempts: AtomicUsize::new(0),
        }
    }

    /// Make the send with this zero-based attempt index fail.
    pub fn fail_on_send(&self, idx: usize) {
        *self.fail_on.lock().unwrap() = Some(idx);
    }

    pub fn sent(&self) -> Vec<String> {
        self.sent.lock().unwrap().clone()
    }
}

#[async_trait]
impl Messenger for MockMessenger {
    async fn send_to_pm(&self, text: &str) -> Result<()> {
        let attempt = self.send_attempts.fetch_add(1, Ordering::SeqCst);
        if *self.fail_on.lock().unwrap() == Some(attempt) {
            return Err(TrackWireError::Telegram("rate limited".into()));
        }
        self.sent.lock().unwrap().push(text.to_string());
        Ok(())
    }
}

/// In-memory sent-store counting mark_sent calls.
pub(crate) struct MemorySentStore {
    ids: Mutex<HashSet<String>>,
    mark_calls: AtomicUsize,
}

impl MemorySentStore {
    pub fn new() -> Self {
        Self {
            ids: Mutex::new(HashSet::new()),
            mark_calls: AtomicUsize::new(0),
        }
    }

    pub fn with(ids: &[&str]) -> Self {
        let store = Self::new();
        *store.ids.lock().unwrap() = ids.iter().map(|s| s.to_string()).collect();
        store
    }

    pub fn mark_calls(&self) -> usize {
        self.mark_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SentStore for MemorySentStore {
    async fn all_sent_ids(&self) -> Result<HashSet<String>> {
        Ok(self.ids.lock().unwrap().clone())
    }

    async fn mark_sent(&self, ids: &HashSet<String>) -> Result<()> {
        self.mark_calls.fetch_add(1, Ordering::SeqCst);
        self.ids.lock().unwrap().extend(ids.iter().cloned());
        Ok(())
    }

    async fn sent_count(&self) -> Result<u64> {
        Ok(self.ids.lock().unwrap().len() as u64)
    }
}
