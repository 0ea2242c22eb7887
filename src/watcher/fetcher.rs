//! Fetcher pool worker: turns a queued request into audit records.
//!
//! Each worker claims the request's content type, derives the query window
//! from the stored watermarks, lists the content blobs, and walks them in
//! returned order fetching audits. Failures on one blob never abort the
//! rest; everything the worker could not do travels on the resource's error
//! list.

use crate::api::client::ActivityApi;
use crate::api::time::parse_content_created;
use crate::schema::ContentType;
use crate::watcher::bus::ResourceBus;
use crate::watcher::resource::Resource;
use crate::watcher::state::WatcherState;
use crate::watcher::telemetry::WatcherTelemetry;
use chrono::{DateTime, Duration, Local};
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

pub(crate) struct Fetcher {
    pub(crate) id: usize,
    pub(crate) client: Arc<dyn ActivityApi>,
    pub(crate) state: Arc<WatcherState>,
    pub(crate) bus: Arc<ResourceBus>,
    pub(crate) out: mpsc::Sender<Resource>,
    pub(crate) telemetry: Arc<WatcherTelemetry>,
    pub(crate) look_behind: Duration,
    pub(crate) shutdown: CancellationToken,
}

impl Fetcher {
    #[tracing::instrument(name = "fetcher", skip_all, fields(worker = self.id))]
    pub(crate) async fn run(self) {
        tracing::debug!("fetcher started");
        while let Some(resource) = self.bus.recv().await {
            self.handle(resource).await;
        }
        tracing::debug!("fetcher exited");
    }

    pub(crate) async fn handle(&self, mut resource: Resource) {
        let Some(request) = resource.request else {
            // Failures with no content type attached travel pre-assembled;
            // forward them untouched.
            self.emit(resource).await;
            return;
        };

        let content_type = request.content_type;
        if !self.state.try_set_busy(content_type) {
            tracing::debug!(content_type = %content_type, "fetch already in flight; dropping request");
            return;
        }

        self.fill(content_type, request.request_time, &mut resource)
            .await;

        if !resource.is_empty() {
            self.emit(resource).await;
        }
        self.state.unset_busy(content_type);
    }

    /// Runs the content-then-audit pipeline for one request, accumulating
    /// records and errors in place.
    async fn fill(
        &self,
        content_type: ContentType,
        request_time: DateTime<Local>,
        resource: &mut Resource,
    ) {
        let last_request_time = self.state.last_request_time(content_type);
        let last_content_created = self.state.last_content_created(content_type);
        let (start, end) = query_window(last_request_time, request_time, self.look_behind);

        tracing::debug!(
            content_type = %content_type,
            start = %start,
            end = %end,
            last_content_created = ?last_content_created,
            "listing content"
        );

        let listing = tokio::select! {
            result = self.client.list_content(content_type, start, end) => result,
            _ = self.shutdown.cancelled() => return,
        };
        let content = match listing {
            Ok(content) => content,
            Err(error) => {
                self.telemetry.record_api_error();
                resource.add_error(error);
                return;
            }
        };

        // The request time only becomes the next lower bound once the
        // listing succeeded; a failed window is retried on the next tick.
        self.state.record_request_time(content_type, request_time);

        for descriptor in content {
            let created = match parse_content_created(&descriptor.content_created) {
                Ok(created) => created,
                Err(error) => {
                    resource.add_error(error);
                    continue;
                }
            };

            if let Some(watermark) = last_content_created {
                if created <= watermark {
                    tracing::trace!(
                        content_type = %content_type,
                        content_id = %descriptor.content_id,
                        "descriptor already processed; skipping"
                    );
                    continue;
                }
            }
            self.state.record_content_created(content_type, created);

            let audits = tokio::select! {
                result = self.client.list_audit_records(&descriptor.content_id) => result,
                _ = self.shutdown.cancelled() => return,
            };
            match audits {
                Ok(records) => {
                    self.telemetry.record_records_fetched(records.len() as u64);
                    resource.records.extend(records);
                }
                Err(error) => {
                    self.telemetry.record_api_error();
                    resource.add_error(error);
                }
            }
        }
    }

    async fn emit(&self, resource: Resource) {
        tokio::select! {
            // Prefer delivering over bailing out when both are ready, so a
            // consumer that is still draining after cancellation gets the
            // in-flight resource.
            biased;
            result = self.out.send(resource) => {
                if result.is_err() {
                    tracing::debug!("output receiver dropped; resource discarded");
                    return;
                }
                self.telemetry.record_resource_emitted();
            }
            _ = self.shutdown.cancelled() => {
                tracing::debug!("shutdown while emitting; resource discarded");
            }
        }
    }
}

/// Derives the content query window for a request at `request_time` given
/// the stored `last_request_time`.
///
/// The window falls back to the configured look-behind when there is no
/// usable lower bound (first fetch, or a bound within a minute of the
/// request), and is clamped to one day when the stored bound sits
/// anomalously in the future, which the API's 24-hour window cap would
/// reject anyway.
pub(crate) fn query_window(
    last_request_time: Option<DateTime<Local>>,
    request_time: DateTime<Local>,
    look_behind: Duration,
) -> (DateTime<Local>, DateTime<Local>) {
    let one_day = Duration::days(1);
    let start = match last_request_time {
        None => request_time - look_behind,
        Some(last) => {
            let delta = last - request_time;
            if delta.abs() < Duration::minutes(1) {
                request_time - look_behind
            } else if delta > one_day {
                request_time - one_day
            } else {
                last
            }
        }
    };
    (start, request_time)
}
