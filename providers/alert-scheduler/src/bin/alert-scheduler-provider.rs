//! # Alert Scheduler Provider Binary
//!
//! Loads configuration from the environment, seeds the purchase store, serves alert
//! broadcasts over WebSocket and runs the poll and daily timers until Ctrl-C.

use anyhow::{Context, Result};
use std::sync::Arc;
use tokio::sync::watch;
use tracing::{error, info};

use alert_scheduler_provider::{
    AlertScheduler, AlertSchedulerConfig, InMemoryPurchaseStore, LogAlertReporter,
};
use websocket_notification_provider::{ProviderConfig, WebSocketNotificationProvider};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging with environment filter
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    info!("Starting Alert Scheduler Provider");

    let config = AlertSchedulerConfig::from_env()
        .context("Failed to load alert scheduler configuration")?;
    let settings = config
        .settings()
        .context("Invalid alert scheduler configuration")?;
    let ws_config =
        ProviderConfig::from_env().context("Failed to load WebSocket configuration")?;

    info!(
        "Reference timezone {}, poll every {:?}, daily report at {}",
        settings.timezone, settings.poll_interval, settings.daily_trigger_time
    );

    let store = match &config.seed_path {
        Some(path) => InMemoryPurchaseStore::from_seed_file(path)
            .await
            .with_context(|| format!("Failed to load seed file {}", path))?,
        None => {
            info!("No seed file configured, starting with an empty purchase store");
            InMemoryPurchaseStore::new()
        }
    };

    let notifications = WebSocketNotificationProvider::new(ws_config);
    let scheduler = Arc::new(
        AlertScheduler::new(
            settings,
            Arc::new(store),
            notifications.hub(),
            Arc::new(LogAlertReporter),
        )
        .context("Failed to create alert scheduler")?,
    );

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let server = tokio::spawn(async move {
        if let Err(e) = notifications.start(shutdown_rx).await {
            error!("WebSocket server error: {:#}", e);
        }
    });
    let timers = scheduler.start();

    info!("Alert Scheduler Provider ready");
    tokio::signal::ctrl_c()
        .await
        .context("Failed to listen for shutdown signal")?;

    info!("Shutdown requested");
    timers.shutdown().await;
    let _ = shutdown_tx.send(true);
    if let Err(e) = server.await {
        error!("WebSocket server task failed: {}", e);
    }

    info!("Alert Scheduler Provider shutdown complete");
    Ok(())
}
