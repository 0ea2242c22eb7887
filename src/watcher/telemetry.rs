use crate::watcher::bus::ResourceBus;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, OnceLock};
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio::{select, time};
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

static TRACING_INIT: OnceLock<()> = OnceLock::new();

/// Installs a basic tracing subscriber (if one is not already active).
///
/// The subscriber honours `RUST_LOG` if it is present, otherwise it falls
/// back to `info`. Calling this function multiple times is harmless.
pub fn init_tracing() {
    if TRACING_INIT.get().is_some() {
        return;
    }

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .try_init();

    let _ = TRACING_INIT.set(());
}

/// Lightweight rolling counters describing watcher activity.
#[derive(Debug, Default)]
pub struct WatcherTelemetry {
    resources_emitted: AtomicU64,
    records_fetched: AtomicU64,
    api_errors: AtomicU64,
    dropped_ticks: AtomicU64,
    busy_skips: AtomicU64,
}

impl WatcherTelemetry {
    pub(crate) fn record_resource_emitted(&self) {
        self.resources_emitted.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_records_fetched(&self, count: u64) {
        if count == 0 {
            return;
        }
        self.records_fetched.fetch_add(count, Ordering::Relaxed);
    }

    pub(crate) fn record_api_error(&self) {
        self.api_errors.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_dropped_tick(&self) {
        self.dropped_ticks.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_busy_skip(&self) {
        self.busy_skips.fetch_add(1, Ordering::Relaxed);
    }

    pub fn resources_emitted(&self) -> u64 {
        self.resources_emitted.load(Ordering::Relaxed)
    }

    pub fn records_fetched(&self) -> u64 {
        self.records_fetched.load(Ordering::Relaxed)
    }

    pub fn api_errors(&self) -> u64 {
        self.api_errors.load(Ordering::Relaxed)
    }

    pub fn dropped_ticks(&self) -> u64 {
        self.dropped_ticks.load(Ordering::Relaxed)
    }

    pub fn busy_skips(&self) -> u64 {
        self.busy_skips.load(Ordering::Relaxed)
    }

    pub fn snapshot(&self) -> TelemetrySnapshot {
        TelemetrySnapshot {
            resources_emitted: self.resources_emitted(),
            records_fetched: self.records_fetched(),
            api_errors: self.api_errors(),
            dropped_ticks: self.dropped_ticks(),
            busy_skips: self.busy_skips(),
        }
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct TelemetrySnapshot {
    pub resources_emitted: u64,
    pub records_fetched: u64,
    pub api_errors: u64,
    pub dropped_ticks: u64,
    pub busy_skips: u64,
}

/// Spawns a background task that periodically logs watcher throughput and
/// error counters.
pub(crate) fn spawn_metrics_reporter(
    telemetry: Arc<WatcherTelemetry>,
    bus: Arc<ResourceBus>,
    shutdown: CancellationToken,
    interval: Duration,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = time::interval(interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            select! {
                _ = shutdown.cancelled() => {
                    tracing::debug!(target: "o365watch::metrics", "metrics reporter shutting down");
                    break;
                }
                _ = ticker.tick() => {
                    let snapshot = telemetry.snapshot();
                    let queued_requests = bus.len().await;

                    tracing::info!(
                        target: "o365watch::metrics",
                        resources_emitted = snapshot.resources_emitted,
                        records_fetched = snapshot.records_fetched,
                        api_errors = snapshot.api_errors,
                        dropped_ticks = snapshot.dropped_ticks,
                        busy_skips = snapshot.busy_skips,
                        queued_requests,
                        "watcher metrics snapshot"
                    );
                }
            }
        }
    })
}
