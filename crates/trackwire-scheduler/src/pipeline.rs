//! Deduplicated delivery pipeline: fetch → filter → format → paged send →
//! mark sent.
//!
//! At-least-once semantics: a crash between a Telegram send and the
//! `mark_sent` commit re-delivers that notification on the next run. When a
//! send fails mid-batch, the ids that did go out are still committed
//! (best-effort) so a transient Telegram error cannot turn into a resend
//! storm on the next healthy tick.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;

use trackwire_core::config::PaginationConfig;
use trackwire_core::duration::parse_or;
use trackwire_core::error::Result;
use trackwire_core::traits::{Messenger, NotificationSource, SentStore};
use trackwire_core::types::Notification;
use trackwire_telegram::format::notification_to_markdown;

/// Delivery settings resolved from config at startup.
#[derive(Debug, Clone)]
pub struct DeliverySettings {
    pub pagination_enabled: bool,
    pub page_size: u32,
    /// Delay between consecutive sends (within and across pages).
    pub message_delay: Duration,
}

impl DeliverySettings {
    pub fn from_config(cfg: &PaginationConfig) -> Self {
        Self {
            pagination_enabled: cfg.enabled,
            page_size: cfg.page_size.max(1),
            message_delay: parse_or(&cfg.delay_between_messages, Duration::from_secs(1)),
        }
    }
}

/// What one pipeline run did.
#[derive(Debug, Clone, Copy, Default)]
pub struct DeliveryReport {
    /// Candidates returned by the source.
    pub fetched: usize,
    /// Candidates not yet in the sent-store.
    pub new_count: usize,
    /// Messages actually sent this run.
    pub sent_count: usize,
}

/// The delivery pipeline. Owns no state between runs; everything durable
/// lives in the sent-store.
pub struct DeliveryPipeline {
    source: Arc<dyn NotificationSource>,
    messenger: Arc<dyn Messenger>,
    store: Arc<dyn SentStore>,
    settings: DeliverySettings,
    shutdown: watch::Receiver<bool>,
}

impl DeliveryPipeline {
    pub fn new(
        source: Arc<dyn NotificationSource>,
        messenger: Arc<dyn Messenger>,
        store: Arc<dyn SentStore>,
        settings: DeliverySettings,
        shutdown: watch::Receiver<bool>,
    ) -> Self {
        Self {
            source,
            messenger,
            store,
            settings,
            shutdown,
        }
    }

    /// One delivery run: fetch up to `limit` candidates, drop the already
    /// sent ones (preserving source order), send the rest, commit their ids.
    pub async fn run(&self, limit: u32) -> Result<DeliveryReport> {
        let candidates = self.source.fetch_notifications(limit).await?;
        let sent_ids = self.store.all_sent_ids().await?;

        let new: Vec<&Notification> = candidates
            .iter()
            .filter(|n| !sent_ids.contains(&n.id))
            .collect();

        let report = DeliveryReport {
            fetched: candidates.len(),
            new_count: new.len(),
            sent_count: 0,
        };

        if new.is_empty() {
            tracing::debug!("No new notifications ({} fetched, all sent)", report.fetched);
            return Ok(report);
        }
        tracing::info!(
            "📬 {} new notification(s) of {} fetched",
            report.new_count,
            report.fetched
        );

        let (delivered, send_err) = self.send_all(&new).await;
        let sent_count = delivered.len();

        if let Some(err) = send_err {
            // Commit what did go out so the next tick does not resend it;
            // the commit itself is best-effort here, the send error wins.
            if !delivered.is_empty() {
                if let Err(mark_err) = self.store.mark_sent(&delivered).await {
                    tracing::warn!("⚠️ Failed to mark {} sent id(s): {mark_err}", sent_count);
                }
            }
            return Err(err);
        }

        self.store.mark_sent(&delivered).await?;
        Ok(DeliveryReport { sent_count, ..report })
    }

    /// Send each new notification in order, with the configured inter-message
    /// delay (skipped after the last message). Returns the ids that were
    /// successfully sent and the first send error, if any. A shutdown signal
    /// aborts the remainder without error.
    async fn send_all(
        &self,
        new: &[&Notification],
    ) -> (HashSet<String>, Option<trackwire_core::error::TrackWireError>) {
        let mut delivered = HashSet::new();
        let total = new.len();
        let page_size = self.settings.page_size as usize;

        for (idx, n) in new.iter().enumerate() {
            if self.settings.pagination_enabled && idx % page_size == 0 {
                tracing::debug!(
                    "Sending page {} ({} notification(s) total)",
                    idx / page_size + 1,
                    total
                );
            }

            let msg = notification_to_markdown(n);
            if let Err(e) = self.messenger.send_to_pm(&msg).await {
                tracing::error!("Send failed for {} after {} sent: {e}", n.id, delivered.len());
                return (delivered, Some(e));
            }
            delivered.insert(n.id.clone());

            let delay = if self.settings.pagination_enabled {
                self.settings.message_delay
            } else {
                Duration::ZERO
            };
            // No delay after the very last message.
            if idx + 1 < total && !delay.is_zero() && self.pause_between(delay).await {
                tracing::info!(
                    "Delivery interrupted by shutdown: {} of {} sent",
                    delivered.len(),
                    total
                );
                break;
            }
        }

        (delivered, None)
    }

    /// Interruptible inter-message delay. Returns true if shutdown fired.
    async fn pause_between(&self, delay: Duration) -> bool {
        let mut shutdown = self.shutdown.clone();
        if *shutdown.borrow() {
            return true;
        }
        tokio::select! {
            _ = tokio::time::sleep(delay) => false,
            changed = shutdown.changed() => changed.is_err() || *shutdown.borrow(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::{MemorySentStore, MockMessenger, MockSource, notification};
    use trackwire_core::traits::SentStore as _;

    fn settings(paginated: bool, page_size: u32, delay: Duration) -> DeliverySettings {
        DeliverySettings {
            pagination_enabled: paginated,
            page_size,
            message_delay: delay,
        }
    }

    fn pipeline(
        source: Arc<MockSource>,
        messenger: Arc<MockMessenger>,
        store: Arc<MemorySentStore>,
        settings: DeliverySettings,
    ) -> (DeliveryPipeline, watch::Sender<bool>) {
        let (tx, rx) = watch::channel(false);
        (
            DeliveryPipeline::new(source, messenger, store, settings, rx),
            tx,
        )
    }

    #[tokio::test]
    async fn test_already_sent_ids_are_skipped() {
        let source = Arc::new(MockSource::with(vec![
            notification("516-1", "BUG-1"),
            notification("516-2", "BUG-2"),
        ]));
        let messenger = Arc::new(MockMessenger::new());
        let store = Arc::new(MemorySentStore::with(&["516-1"]));
        let (pipeline, _tx) = pipeline(
            source,
            messenger.clone(),
            store.clone(),
            settings(false, 1, Duration::ZERO),
        );

        let report = pipeline.run(10).await.unwrap();
        assert_eq!(report.fetched, 2);
        assert_eq!(report.new_count, 1);
        assert_eq!(report.sent_count, 1);

        let sent = messenger.sent();
        assert_eq!(sent.len(), 1);
        assert!(sent[0].contains("BUG\\-2"));

        let ids = store.all_sent_ids().await.unwrap();
        assert!(ids.contains("516-1") && ids.contains("516-2"));
        assert_eq!(store.mark_calls(), 1);
    }

    #[tokio::test]
    async fn test_all_new_are_delivered_once_and_marked() {
        let source = Arc::new(MockSource::with(vec![
            notification("1", "A-1"),
            notification("2", "A-2"),
        ]));
        let messenger = Arc::new(MockMessenger::new());
        let store = Arc::new(MemorySentStore::new());
        let (pipeline, _tx) = pipeline(
            source,
            messenger.clone(),
            store.clone(),
            settings(false, 1, Duration::ZERO),
        );

        let report = pipeline.run(10).await.unwrap();
        assert_eq!(report.sent_count, 2);
        assert_eq!(messenger.sent().len(), 2);
        assert_eq!(store.all_sent_ids().await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_empty_new_set_skips_mark_sent() {
        let source = Arc::new(MockSource::with(vec![notification("1", "A-1")]));
        let messenger = Arc::new(MockMessenger::new());
        let store = Arc::new(MemorySentStore::with(&["1"]));
        let (pipeline, _tx) = pipeline(
            source,
            messenger.clone(),
            store.clone(),
            settings(false, 1, Duration::ZERO),
        );

        let report = pipeline.run(10).await.unwrap();
        assert_eq!(report.sent_count, 0);
        assert!(messenger.sent().is_empty());
        assert_eq!(store.mark_calls(), 0);
    }

    #[tokio::test]
    async fn test_send_order_follows_candidate_order() {
        let source = Arc::new(MockSource::with(vec![
            notification("1", "A-1"),
            notification("2", "A-2"),
            notification("3", "A-3"),
        ]));
        let messenger = Arc::new(MockMessenger::new());
        let store = Arc::new(MemorySentStore::new());
        let (pipeline, _tx) = pipeline(
            source,
            messenger.clone(),
            store.clone(),
            settings(false, 1, Duration::ZERO),
        );

        pipeline.run(10).await.unwrap();
        let sent = messenger.sent();
        assert!(sent[0].contains("A\\-1"));
        assert!(sent[1].contains("A\\-2"));
        assert!(sent[2].contains("A\\-3"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_pagination_delays_between_sends_only() {
        let source = Arc::new(MockSource::with(vec![
            notification("1", "A-1"),
            notification("2", "A-2"),
            notification("3", "A-3"),
        ]));
        let messenger = Arc::new(MockMessenger::new());
        let store = Arc::new(MemorySentStore::new());
        let delay = Duration::from_millis(500);
        let (pipeline, _tx) = pipeline(
            source,
            messenger.clone(),
            store.clone(),
            settings(true, 2, delay),
        );

        let started = tokio::time::Instant::now();
        let report = pipeline.run(10).await.unwrap();
        let elapsed = started.elapsed();

        assert_eq!(report.sent_count, 3);
        // Two gaps (1st/2nd and 2nd/3rd), none after the last message.
        assert_eq!(elapsed, delay * 2);
    }

    #[tokio::test]
    async fn test_partial_failure_marks_what_succeeded() {
        let source = Arc::new(MockSource::with(vec![
            notification("1", "A-1"),
            notification("2", "A-2"),
            notification("3", "A-3"),
        ]));
        let messenger = Arc::new(MockMessenger::new());
        messenger.fail_on_send(1); // second send errors
        let store = Arc::new(MemorySentStore::new());
        let (pipeline, _tx) = pipeline(
            source,
            messenger.clone(),
            store.clone(),
            settings(false, 1, Duration::ZERO),
        );

        let err = pipeline.run(10).await.unwrap_err();
        assert!(err.to_string().contains("Telegram"));

        // The first notification went out and must stay deduplicated; the
        // failed one and the untried one are retried next tick.
        let ids = store.all_sent_ids().await.unwrap();
        assert!(ids.contains("1"));
        assert!(!ids.contains("2"));
        assert!(!ids.contains("3"));
    }

    #[tokio::test]
    async fn test_fetch_failure_propagates_without_marking() {
        let source = Arc::new(MockSource::failing());
        let messenger = Arc::new(MockMessenger::new());
        let store = Arc::new(MemorySentStore::new());
        let (pipeline, _tx) = pipeline(
            source,
            messenger.clone(),
            store.clone(),
            settings(false, 1, Duration::ZERO),
        );

        assert!(pipeline.run(10).await.is_err());
        assert!(messenger.sent().is_empty());
        assert_eq!(store.mark_calls(), 0);
    }

    #[tokio::test]
    async fn test_shutdown_aborts_remaining_sends() {
        let source = Arc::new(MockSource::with(vec![
            notification("1", "A-1"),
            notification("2", "A-2"),
        ]));
        let messenger = Arc::new(MockMessenger::new());
        let store = Arc::new(MemorySentStore::new());
        let (pipeline, tx) = pipeline(
            source,
            messenger.clone(),
            store.clone(),
            settings(true, 2, Duration::from_millis(50)),
        );
        tx.send(true).unwrap();

        let report = pipeline.run(10).await.unwrap();
        // First message is already in flight before the delay; the second is
        // abandoned, not rolled back.
        assert_eq!(report.sent_count, 1);
        assert_eq!(messenger.sent().len(), 1);
        let ids = store.all_sent_ids().await.unwrap();
        assert!(ids.contains("1"));
        assert!(!ids.contains("2"));
    }
}
