//! Polling watcher for the Microsoft Office 365 Management Activity API.
//!
//! The crate discovers newly available audit-content blobs across the five
//! content families of a tenant, retrieves the audit records inside each
//! blob, and emits a de-duplicated stream of [`Resource`] values to a
//! consumer channel. Shutdown is driven by a single
//! [`CancellationToken`](tokio_util::sync::CancellationToken) owned by the
//! consumer.
//!
//! ```no_run
//! use o365watch::{
//!     ActivityApiClient, Credentials, SubscriptionWatcher, WatcherConfig,
//! };
//! use std::sync::Arc;
//! use tokio_util::sync::CancellationToken;
//!
//! # async fn run() -> anyhow::Result<()> {
//! let client = ActivityApiClient::new(Credentials {
//!     tenant_id: "tenant".into(),
//!     client_id: "app".into(),
//!     client_secret: "secret".into(),
//! })?;
//! let watcher = SubscriptionWatcher::new(
//!     Arc::new(client),
//!     WatcherConfig::new(60, 300)?,
//! )?;
//!
//! let shutdown = CancellationToken::new();
//! let mut resources = watcher.run(shutdown.clone());
//! while let Some(resource) = resources.recv().await {
//!     for record in &resource.records {
//!         println!("{}", serde_json::to_string(record)?);
//!     }
//! }
//! # Ok(())
//! # }
//! ```

pub mod api;
pub mod schema;
pub mod watcher;

pub use api::client::{ActivityApi, ActivityApiClient, ApiError, Credentials};
pub use api::options::ApiClientOptions;
pub use schema::{
    AuditLogScope, AuditRecord, Content, ContentType, RecordType, Subscription, UserType, Webhook,
};
pub use watcher::config::WatcherConfig;
pub use watcher::resource::{Resource, ResourceRequest};
pub use watcher::telemetry::{init_tracing, TelemetrySnapshot, WatcherTelemetry};
pub use watcher::SubscriptionWatcher;
