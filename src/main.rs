//! better-trends — rolling-window trend sensors for home-automation hosts.
//!
//! Runs the trend engine against a simulated host store, reloading
//! `trends.toml` whenever it changes on disk.
//!
//! Run with:  `RUST_LOG=info better-trends`

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use tokio::sync::{mpsc, watch};
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;
use trend_config::ConfigWatcher;
use trend_core::{MemoryStore, TrendEvent};
use trend_engine::{Sampler, SimulatedHost};

#[tokio::main]
async fn main() -> Result<()> {
    // Structured logging — RUST_LOG controls verbosity (default: info).
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    tracing::info!("better-trends v{} starting", env!("CARGO_PKG_VERSION"));

    let path = trend_config::default_path();
    let config = trend_config::load(&path)?;
    if config.inputs.is_empty() {
        tracing::warn!("No inputs configured in '{}'; nothing to track yet", path.display());
    }

    let cancel = CancellationToken::new();
    let store = Arc::new(MemoryStore::new());

    // The simulated host advances once per effective sampling interval.
    let host = SimulatedHost::with_defaults(Arc::clone(&store), &config.inputs);
    let (period_tx, period_rx) = watch::channel(config.interval());
    let host_task = host.spawn(period_rx, cancel.clone());

    let (events_tx, mut events_rx) = mpsc::channel(64);
    let (config_tx, config_rx) = watch::channel(config.clone());
    let sampler = Sampler::new(Arc::clone(&store), config)?.with_events(events_tx);
    let sampler_task = sampler.spawn(config_rx, cancel.clone());

    let (_watcher, mut changes) = ConfigWatcher::spawn(&path);
    let reload_path = path.clone();
    let reload_task = tokio::spawn(async move {
        while changes.recv().await.is_some() {
            // Let the writer finish before reading.
            tokio::time::sleep(Duration::from_millis(200)).await;
            match trend_config::load(&reload_path) {
                Ok(next) => {
                    tracing::info!("Config file changed; applying");
                    if config_tx.send(next).is_err() {
                        break; // sampler gone
                    }
                }
                Err(e) => tracing::error!("Ignoring config change: {e}"),
            }
        }
    });

    let events_task = tokio::spawn(async move {
        while let Some(event) = events_rx.recv().await {
            match event {
                TrendEvent::TrendUpdated(r) => {
                    tracing::debug!(input = %r.input_id, output = %r.output_id, value = r.value, "trend")
                }
                TrendEvent::CycleCompleted { sampled, skipped, emitted } => {
                    tracing::debug!(sampled, skipped, emitted, "cycle completed")
                }
                TrendEvent::SettingsChanged { interval_secs, .. }
                | TrendEvent::ConfigApplied { interval_secs, .. } => {
                    let next = Duration::from_secs(interval_secs);
                    period_tx.send_if_modified(|period| {
                        let changed = *period != next;
                        *period = next;
                        changed
                    });
                }
                TrendEvent::Stopped => break,
                other => tracing::debug!(?other, "sampler event"),
            }
        }
    });

    tokio::signal::ctrl_c().await?;
    tracing::info!("Received shutdown signal");

    cancel.cancel();
    reload_task.abort();
    sampler_task.await?;
    host_task.await?;
    events_task.await?;

    tracing::info!("better-trends stopped");
    Ok(())
}
