//! Scheduler state machine and circuit breaker.
//!
//! States: Stopped (initial, ticks are no-ops), Running (ticks deliver),
//! Paused (circuit breaker tripped; ticks only check the auto-resume
//! deadline). Manual `/start`, `/stop`, `/resume` may arrive from the bot
//! task while a tick is executing, so all control state sits behind one
//! mutex and ticks are serialized by a non-reentrant guard.

use chrono::{DateTime, Utc};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::watch;

use trackwire_core::config::CircuitBreakerConfig;
use trackwire_core::duration::parse_or;
use trackwire_core::traits::Messenger;

use crate::alerts::{outage_alert, recovery_notice};
use crate::health::{FailureKind, HealthTracker};
use crate::pipeline::DeliveryPipeline;

/// Scheduler lifecycle state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchedState {
    Stopped,
    Running,
    Paused,
}

/// Circuit-breaker settings resolved from config at startup.
#[derive(Debug, Clone)]
pub struct BreakerSettings {
    pub max_consecutive_failures: u32,
    pub auto_pause: bool,
    pub pause_duration: Duration,
    pub send_single_alert: bool,
}

impl BreakerSettings {
    pub fn from_config(cfg: &CircuitBreakerConfig) -> Self {
        Self {
            max_consecutive_failures: cfg.max_consecutive_failures.max(1),
            auto_pause: cfg.auto_pause,
            pause_duration: parse_or(&cfg.pause_duration, Duration::from_secs(3600)),
            send_single_alert: cfg.send_single_alert,
        }
    }
}

struct ControlState {
    state: SchedState,
    /// Auto-resume deadline; set only on entering Paused, cleared on leaving.
    paused_until: Option<DateTime<Utc>>,
    /// Guards duplicate alerts for the same outage.
    alert_sent: bool,
}

/// Owns the run/pause/stop state machine and drives the delivery pipeline.
pub struct SchedulerController {
    pipeline: DeliveryPipeline,
    messenger: Arc<dyn Messenger>,
    health: Arc<HealthTracker>,
    breaker: BreakerSettings,
    fetch_limit: u32,
    control: Mutex<ControlState>,
    /// Non-reentrant tick guard: a tick that finds this held is skipped,
    /// never queued.
    tick_guard: tokio::sync::Mutex<()>,
}

impl SchedulerController {
    pub fn new(
        pipeline: DeliveryPipeline,
        messenger: Arc<dyn Messenger>,
        health: Arc<HealthTracker>,
        breaker: BreakerSettings,
        fetch_limit: u32,
    ) -> Self {
        Self {
            pipeline,
            messenger,
            health,
            breaker,
            fetch_limit,
            control: Mutex::new(ControlState {
                state: SchedState::Stopped,
                paused_until: None,
                alert_sent: false,
            }),
            tick_guard: tokio::sync::Mutex::new(()),
        }
    }

    /// Enable the scheduler. Also clears a circuit-breaker pause. Idempotent.
    pub fn start(&self) {
        let mut ctl = self.control.lock().unwrap();
        if ctl.state != SchedState::Running {
            ctl.state = SchedState::Running;
            ctl.paused_until = None;
            ctl.alert_sent = false;
            tracing::info!("▶️ Scheduler started");
        }
    }

    /// Disable the scheduler. Idempotent.
    pub fn stop(&self) {
        let mut ctl = self.control.lock().unwrap();
        if ctl.state != SchedState::Stopped {
            ctl.state = SchedState::Stopped;
            ctl.paused_until = None;
            tracing::info!("⏹️ Scheduler stopped");
        }
    }

    /// Manually resume from a circuit-breaker pause ahead of the deadline.
    pub fn resume(&self) {
        let mut ctl = self.control.lock().unwrap();
        if ctl.state == SchedState::Paused {
            ctl.state = SchedState::Running;
            ctl.paused_until = None;
            ctl.alert_sent = false;
            tracing::info!("▶️ Scheduler resumed manually");
        }
    }

    pub fn state(&self) -> SchedState {
        self.control.lock().unwrap().state
    }

    pub fn is_running(&self) -> bool {
        self.state() == SchedState::Running
    }

    pub fn is_paused(&self) -> bool {
        self.state() == SchedState::Paused
    }

    pub fn paused_until(&self) -> Option<DateTime<Utc>> {
        self.control.lock().unwrap().paused_until
    }

    /// Health counters, for the `/status` reply.
    pub fn health(&self) -> &HealthTracker {
        &self.health
    }

    /// One scheduler tick. Called by the interval loop; safe to call while
    /// manual transitions happen concurrently.
    pub async fn tick(&self) {
        // Never overlap ticks. A tick arriving while one is in flight is
        // dropped; the next interval covers it.
        let Ok(_guard) = self.tick_guard.try_lock() else {
            tracing::debug!("Tick skipped: previous tick still in flight");
            return;
        };

        if !self.check_runnable() {
            return;
        }

        match self.pipeline.run(self.fetch_limit).await {
            Ok(report) => {
                let was_unhealthy = self.health.has_recent_failures();
                self.health.record_success();
                if report.sent_count > 0 {
                    tracing::info!(
                        "✅ Tick delivered {} notification(s) ({} fetched)",
                        report.sent_count,
                        report.fetched
                    );
                }
                if was_unhealthy {
                    tracing::info!("✅ Recovery detected after failures");
                    // Best-effort: a failed recovery notice must not poison
                    // the fresh healthy streak.
                    if let Err(e) = self.messenger.send_to_pm(&recovery_notice()).await {
                        tracing::warn!("⚠️ Failed to send recovery notice: {e}");
                    }
                }
            }
            Err(e) => {
                let kind = FailureKind::classify(&e);
                let detail = e.detail();
                self.health.record_failure(kind, &detail);
                let failures = self.health.consecutive_failures();
                tracing::error!("❌ Tick failed (attempt {failures}): {e}");

                if failures >= self.breaker.max_consecutive_failures && self.breaker.auto_pause {
                    self.trip_breaker(kind, &detail, failures).await;
                }
            }
        }
    }

    /// Evaluate state at the top of a tick: handle auto-resume, decide
    /// whether delivery should run.
    fn check_runnable(&self) -> bool {
        let mut ctl = self.control.lock().unwrap();
        match ctl.state {
            SchedState::Stopped => false,
            SchedState::Paused => {
                match ctl.paused_until {
                    Some(until) if Utc::now() >= until => {
                        tracing::info!("🔄 Auto-resuming after pause period");
                        ctl.state = SchedState::Running;
                        ctl.paused_until = None;
                        ctl.alert_sent = false;
                        // Continue into delivery within this same tick.
                        true
                    }
                    _ => false,
                }
            }
            SchedState::Running => true,
        }
    }

    /// Threshold breached with auto-pause enabled: pause and send at most one
    /// alert per outage. Alert send failures are logged and swallowed.
    async fn trip_breaker(&self, kind: FailureKind, detail: &str, failures: u32) {
        let should_alert = {
            let mut ctl = self.control.lock().unwrap();

            if ctl.state == SchedState::Running {
                let until = Utc::now()
                    + chrono::Duration::from_std(self.breaker.pause_duration)
                        .unwrap_or_else(|_| chrono::Duration::hours(1));
                ctl.state = SchedState::Paused;
                ctl.paused_until = Some(until);
                tracing::warn!("⏸️ Scheduler paused until {until} after {failures} failures");
            }

            if !ctl.alert_sent && self.breaker.send_single_alert {
                ctl.alert_sent = true;
                true
            } else {
                false
            }
        };

        if should_alert {
            let msg = outage_alert(kind, detail, failures);
            if let Err(e) = self.messenger.send_to_pm(&msg).await {
                tracing::warn!("⚠️ Failed to send outage alert: {e}");
            }
        }
    }
}

/// Drive the controller from a tokio interval until shutdown fires.
pub async fn run_scheduler(
    controller: Arc<SchedulerController>,
    tick_interval: Duration,
    mut shutdown: watch::Receiver<bool>,
) {
    tracing::info!("⏰ Scheduler loop started (tick every {tick_interval:?})");
    let mut interval = tokio::time::interval(tick_interval);
    // A slow tick must not produce a burst of catch-up ticks afterwards.
    interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

    loop {
        tokio::select! {
            _ = interval.tick() => controller.tick().await,
            changed = shutdown.changed() => {
                if changed.is_err() || *shutdown.borrow() {
                    break;
                }
            }
        }
    }
    tracing::info!("⏰ Scheduler loop stopped");
}
