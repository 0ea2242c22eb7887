//! Per-tenant polling engine for the Management Activity API.
//!
//! The watcher is three cooperating pieces wired together by
//! [`SubscriptionWatcher::run`]:
//! - `generator` ticks on a fixed period, lists active subscriptions, and
//!   offers one request per non-busy content type onto a bounded bus.
//! - `fetcher` is a pool of identical workers (one slot per content type)
//!   that turn requests into audit records and emit them downstream.
//! - `state` tracks the per-content-type busy flags and progress watermarks
//!   that keep fetches exclusive and windows non-overlapping.
//!
//! The consumer's [`CancellationToken`] is the single shutdown source: the
//! generator observes it and closes the bus, the fetchers drain and exit,
//! and the output channel closes once the last fetcher is gone.

pub mod config;
pub mod resource;
pub mod telemetry;

mod bus;
mod fetcher;
mod generator;
mod state;


use crate::api::client::ActivityApi;
use crate::schema::ContentType;
use anyhow::Result;
use bus::ResourceBus;
use config::WatcherConfig;
use fetcher::Fetcher;
use generator::Generator;
use resource::Resource;
use state::WatcherState;
use std::sync::Arc;
use telemetry::WatcherTelemetry;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

/// Polls current subscriptions at a fixed interval and streams de-duplicated
/// audit records to the returned channel.
///
/// Watermarks live for the life of the watcher instance and are not
/// persisted anywhere.
pub struct SubscriptionWatcher {
    client: Arc<dyn ActivityApi>,
    config: WatcherConfig,
    state: Arc<WatcherState>,
    telemetry: Arc<WatcherTelemetry>,
}

impl SubscriptionWatcher {
    /// Creates a watcher that queries the API through `client`.
    pub fn new(client: Arc<dyn ActivityApi>, config: WatcherConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            client,
            config,
            state: Arc::new(WatcherState::new()),
            telemetry: Arc::new(WatcherTelemetry::default()),
        })
    }

    pub fn config(&self) -> &WatcherConfig {
        &self.config
    }

    /// Returns a clone of the telemetry handle for observability.
    pub fn telemetry(&self) -> Arc<WatcherTelemetry> {
        self.telemetry.clone()
    }

    /// Starts the pipeline and returns the output channel.
    ///
    /// Must be called inside a tokio runtime. The channel yields resources
    /// until `shutdown` is cancelled and the pool has drained, after which
    /// it reports end-of-stream. A slow consumer stalls the fetcher that is
    /// trying to emit; nothing buffers beyond the channel slot.
    pub fn run(&self, shutdown: CancellationToken) -> mpsc::Receiver<Resource> {
        let (out_tx, out_rx) = mpsc::channel(1);
        let bus = Arc::new(ResourceBus::new(ContentType::COUNT));

        for id in 0..ContentType::COUNT {
            let fetcher = Fetcher {
                id,
                client: Arc::clone(&self.client),
                state: Arc::clone(&self.state),
                bus: Arc::clone(&bus),
                out: out_tx.clone(),
                telemetry: Arc::clone(&self.telemetry),
                look_behind: self.config.look_behind(),
                shutdown: shutdown.clone(),
            };
            tokio::spawn(fetcher.run());
        }
        // Fetchers hold the only senders: the consumer observes end-of-stream
        // exactly when the pool has drained.
        drop(out_tx);

        let generator = Generator {
            client: Arc::clone(&self.client),
            state: Arc::clone(&self.state),
            bus: Arc::clone(&bus),
            telemetry: Arc::clone(&self.telemetry),
            tick_interval: self.config.ticker_interval(),
            shutdown: shutdown.clone(),
        };
        tokio::spawn(generator.run());

        telemetry::spawn_metrics_reporter(
            Arc::clone(&self.telemetry),
            bus,
            shutdown,
            self.config.metrics_interval(),
        );

        out_rx
    }
}
