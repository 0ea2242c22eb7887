//! Tick-driven request generator.
//!
//! Every tick lists the tenant's active subscriptions in a freshly spawned
//! task, so a slow listing never delays subsequent ticks, and offers one
//! request per recognized, non-busy content type onto the bus.

use crate::api::client::ActivityApi;
use crate::schema::ContentType;
use crate::watcher::bus::{OfferOutcome, ResourceBus};
use crate::watcher::resource::Resource;
use crate::watcher::state::WatcherState;
use crate::watcher::telemetry::WatcherTelemetry;
use anyhow::Error;
use chrono::Local;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::{self, Instant};
use tokio_util::sync::CancellationToken;

pub(crate) struct Generator {
    pub(crate) client: Arc<dyn ActivityApi>,
    pub(crate) state: Arc<WatcherState>,
    pub(crate) bus: Arc<ResourceBus>,
    pub(crate) telemetry: Arc<WatcherTelemetry>,
    pub(crate) tick_interval: Duration,
    pub(crate) shutdown: CancellationToken,
}

impl Generator {
    pub(crate) async fn run(self) {
        let mut ticker = time::interval_at(
            Instant::now() + self.tick_interval,
            self.tick_interval,
        );

        tracing::debug!(interval = ?self.tick_interval, "generator started");

        loop {
            tokio::select! {
                _ = self.shutdown.cancelled() => {
                    tracing::debug!("generator received shutdown; closing bus");
                    self.bus.close().await;
                    return;
                }
                _ = ticker.tick() => {
                    let tick = TickTask {
                        client: Arc::clone(&self.client),
                        state: Arc::clone(&self.state),
                        bus: Arc::clone(&self.bus),
                        telemetry: Arc::clone(&self.telemetry),
                        shutdown: self.shutdown.clone(),
                    };
                    tokio::spawn(tick.run());
                }
            }
        }
    }
}

/// One tick's worth of work: list subscriptions, offer requests.
pub(crate) struct TickTask {
    pub(crate) client: Arc<dyn ActivityApi>,
    pub(crate) state: Arc<WatcherState>,
    pub(crate) bus: Arc<ResourceBus>,
    pub(crate) telemetry: Arc<WatcherTelemetry>,
    pub(crate) shutdown: CancellationToken,
}

impl TickTask {
    pub(crate) async fn run(self) {
        let request_time = Local::now();

        let subscriptions = tokio::select! {
            result = self.client.list_subscriptions() => result,
            _ = self.shutdown.cancelled() => return,
        };

        let subscriptions = match subscriptions {
            Ok(subscriptions) => subscriptions,
            Err(error) => {
                self.telemetry.record_api_error();
                tracing::warn!(error = %error, "subscription listing failed");
                self.offer(Resource::from_error(error)).await;
                return;
            }
        };

        for subscription in subscriptions {
            let content_type = match subscription.content_type.parse::<ContentType>() {
                Ok(content_type) => content_type,
                Err(invalid) => {
                    tracing::warn!(
                        content_type = %subscription.content_type,
                        "subscription advertises unknown content type"
                    );
                    self.offer(Resource::from_error(Error::new(invalid))).await;
                    continue;
                }
            };

            if self.state.is_busy(content_type) {
                self.telemetry.record_busy_skip();
                tracing::debug!(content_type = %content_type, "fetch in flight; skipping tick");
                continue;
            }

            self.offer(Resource::for_request(content_type, request_time))
                .await;
        }
    }

    async fn offer(&self, resource: Resource) {
        let content_type = resource.content_type();
        match self.bus.offer(resource).await {
            OfferOutcome::Queued => {}
            OfferOutcome::Dropped => {
                self.telemetry.record_dropped_tick();
                tracing::debug!(content_type = ?content_type, "bus full; dropping tick");
            }
            OfferOutcome::Closed => {
                tracing::debug!("bus closed; discarding resource");
            }
        }
    }
}
