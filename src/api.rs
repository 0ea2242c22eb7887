//! HTTP collaborator for the Management Activity API: OAuth2 token caching,
//! REST operations with paging, client options, and the API's time formats.

pub mod auth;
pub mod client;
pub mod options;
pub mod time;

pub use client::{ActivityApi, ActivityApiClient, ApiError, Credentials};
pub use options::ApiClientOptions;
pub use time::{format_window_bound, parse_content_created, parse_window_bound};
