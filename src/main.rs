//! # TrackWire — issue-tracker notifications in Telegram
//!
//! Pulls the tracker's notification feed on a fixed interval, deduplicates
//! against a local sent-store, and fans new notifications out to a Telegram
//! chat. A circuit breaker pauses polling after repeated failures and sends
//! a single alert per outage.
//!
//! Usage:
//!   trackwire                        # run with ~/.trackwire/config.toml
//!   trackwire --config ./tw.toml    # explicit config path
//!   trackwire --verbose             # debug logging

mod bot;

use anyhow::Result;
use clap::Parser;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tracing_subscriber::EnvFilter;

use trackwire_core::TrackWireConfig;
use trackwire_core::duration::parse_or;
use trackwire_scheduler::{
    BreakerSettings, DeliveryPipeline, DeliverySettings, HealthTracker, SchedulerController,
    run_scheduler,
};
use trackwire_storage::SqliteSentStore;
use trackwire_telegram::TelegramClient;
use trackwire_tracker::TrackerClient;

#[derive(Parser)]
#[command(
    name = "trackwire",
    version,
    about = "📡 TrackWire — issue-tracker notifications in Telegram"
)]
struct Cli {
    /// Path to config.toml (default: ~/.trackwire/config.toml)
    #[arg(short, long)]
    config: Option<String>,

    /// Override the sent-notification database path
    #[arg(long)]
    db_path: Option<String>,

    /// Verbose logging
    #[arg(short, long)]
    verbose: bool,
}

fn expand_path(p: &str) -> String {
    shellexpand::tilde(p).to_string()
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_target(false)
        .init();

    let config = match &cli.config {
        Some(p) => TrackWireConfig::load_from(Path::new(&expand_path(p)))?,
        None => TrackWireConfig::load()?,
    };

    let db_path = expand_path(cli.db_path.as_deref().unwrap_or(&config.storage.db_path));
    let store = Arc::new(SqliteSentStore::open(Path::new(&db_path))?);

    let tracker = Arc::new(TrackerClient::new(config.tracker.clone()));
    let telegram = Arc::new(TelegramClient::new(config.telegram.clone()));

    match telegram.get_me().await {
        Ok(me) => tracing::info!(
            "🤖 Telegram bot: @{}",
            me.username.as_deref().unwrap_or("unknown")
        ),
        Err(e) => tracing::warn!("⚠️ Telegram token check failed: {e}"),
    }

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let health = Arc::new(HealthTracker::new());
    let pipeline = DeliveryPipeline::new(
        tracker.clone(),
        telegram.clone(),
        store.clone(),
        DeliverySettings::from_config(&config.scheduler.pagination),
        shutdown_rx.clone(),
    );
    let controller = Arc::new(SchedulerController::new(
        pipeline,
        telegram.clone(),
        health,
        BreakerSettings::from_config(&config.scheduler.circuit_breaker),
        config.scheduler.fetch_limit,
    ));

    let mut tasks = Vec::new();
    if config.scheduler.enabled {
        let tick = parse_or(&config.scheduler.tick_interval, Duration::from_secs(5))
            .max(Duration::from_secs(1));
        tasks.push(tokio::spawn(run_scheduler(
            controller.clone(),
            tick,
            shutdown_rx.clone(),
        )));
    } else {
        tracing::info!("Scheduler disabled by config");
    }
    tasks.push(tokio::spawn(bot::run_command_loop(
        telegram.clone(),
        tracker.clone(),
        store.clone(),
        controller.clone(),
        shutdown_rx.clone(),
    )));

    tracing::info!(
        "📡 TrackWire v{} up — send /start to enable delivery",
        env!("CARGO_PKG_VERSION")
    );

    tokio::signal::ctrl_c().await?;
    tracing::info!("Shutting down");
    let _ = shutdown_tx.send(true);
    for task in tasks {
        let _ = task.await;
    }
    Ok(())
}
