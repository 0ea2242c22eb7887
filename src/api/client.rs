//! REST client for the Management Activity API. Houses the
//! `ActivityApiClient`, its error type, and the `ActivityApi` trait consumed
//! by the watcher.

use crate::api::auth::TokenSource;
use crate::api::options::ApiClientOptions;
use crate::api::time::format_window_bound;
use crate::schema::{AuditRecord, Content, ContentType, Subscription, Webhook};
use anyhow::{Context, Result};
use chrono::{DateTime, Local};
use futures::future::BoxFuture;
use reqwest::{Method, StatusCode};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::json;
use std::fmt;

/// Response header carrying the absolute URL of the next result page.
const NEXT_PAGE_HEADER: &str = "NextPageUri";
/// OAuth2 resource the tokens are scoped to.
const MANAGEMENT_RESOURCE: &str = "https://manage.office.com";

/// Failures the API reports explicitly, as opposed to transport or decode
/// errors which surface as plain [`anyhow::Error`] values.
#[derive(Debug)]
pub enum ApiError {
    /// The API answered with a non-success status.
    Status {
        status: StatusCode,
        code: Option<String>,
        message: String,
    },
    /// The token endpoint refused the client credentials.
    TokenRejected { status: StatusCode, message: String },
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ApiError::Status {
                status,
                code,
                message,
            } => match code {
                Some(code) => write!(
                    f,
                    "api request failed (status={status}, code={code}, message={message})"
                ),
                None => write!(f, "api request failed (status={status}, message={message})"),
            },
            ApiError::TokenRejected { status, message } => {
                write!(f, "token request rejected (status={status}): {message}")
            }
        }
    }
}

impl std::error::Error for ApiError {}

/// Azure AD application credentials for a tenant.
#[derive(Debug, Clone)]
pub struct Credentials {
    pub tenant_id: String,
    pub client_id: String,
    pub client_secret: String,
}

/// The three listing operations the watcher consumes.
///
/// Implementations must not retry: the watcher relies on the next tick for
/// recovery and carries failures out-of-band on the Resource.
pub trait ActivityApi: Send + Sync {
    fn list_subscriptions<'a>(&'a self) -> BoxFuture<'a, Result<Vec<Subscription>>>;

    fn list_content<'a>(
        &'a self,
        content_type: ContentType,
        start: DateTime<Local>,
        end: DateTime<Local>,
    ) -> BoxFuture<'a, Result<Vec<Content>>>;

    fn list_audit_records<'a>(&'a self, content_id: &'a str)
        -> BoxFuture<'a, Result<Vec<AuditRecord>>>;
}

/// Authenticated client for a single tenant's activity feed.
pub struct ActivityApiClient {
    http: reqwest::Client,
    api_base: String,
    pub_identifier: String,
    tokens: TokenSource,
}

impl ActivityApiClient {
    pub fn new(credentials: Credentials) -> Result<Self> {
        Self::with_options(credentials, ApiClientOptions::default())
    }

    pub fn with_options(credentials: Credentials, options: ApiClientOptions) -> Result<Self> {
        options.validate()?;

        let http = reqwest::Client::builder()
            .timeout(options.request_timeout)
            .user_agent(options.user_agent.clone())
            .build()
            .context("failed to build HTTP client")?;

        let mut api_base = options.api_base.unwrap_or_else(|| {
            format!(
                "https://manage.office.com/api/v1.0/{}/activity/feed/",
                credentials.tenant_id
            )
        });
        if !api_base.ends_with('/') {
            api_base.push('/');
        }
        let token_url = options.token_url.unwrap_or_else(|| {
            format!(
                "https://login.microsoftonline.com/{}/oauth2/token",
                credentials.tenant_id
            )
        });

        let tokens = TokenSource::new(
            http.clone(),
            token_url,
            MANAGEMENT_RESOURCE.to_owned(),
            credentials.client_id.clone(),
            credentials.client_secret,
        );

        Ok(Self {
            http,
            api_base,
            pub_identifier: credentials.client_id,
            tokens,
        })
    }

    /// Overrides the publisher identifier sent with every request
    /// (defaults to the client id).
    pub fn with_publisher_identifier(mut self, identifier: impl Into<String>) -> Self {
        self.pub_identifier = identifier.into();
        self
    }

    pub fn endpoint(&self) -> &str {
        &self.api_base
    }

    /// Lists the tenant's current subscriptions.
    pub async fn list_subscriptions(&self) -> Result<Vec<Subscription>> {
        self.get_paged("subscriptions/list", &[]).await
    }

    /// Lists content blobs of `content_type` created inside `[start, end]`,
    /// following result pages until exhausted.
    pub async fn list_content(
        &self,
        content_type: ContentType,
        start: DateTime<Local>,
        end: DateTime<Local>,
    ) -> Result<Vec<Content>> {
        self.get_paged(
            "subscriptions/content",
            &[
                ("contentType", content_type.as_str().to_owned()),
                ("startTime", format_window_bound(start)),
                ("endTime", format_window_bound(end)),
            ],
        )
        .await
    }

    /// Fetches the audit records held by a content blob.
    pub async fn list_audit_records(&self, content_id: &str) -> Result<Vec<AuditRecord>> {
        self.get_paged(&format!("audit/{content_id}"), &[]).await
    }

    /// Starts a subscription for `content_type`, optionally registering a
    /// webhook. Not used by the watcher itself.
    pub async fn start_subscription(
        &self,
        content_type: ContentType,
        webhook: Option<&Webhook>,
    ) -> Result<Subscription> {
        let url = format!("{}subscriptions/start", self.api_base);
        let mut request = self
            .authorized(Method::POST, &url)
            .await?
            .query(&[("contentType", content_type.as_str())]);
        if let Some(webhook) = webhook {
            request = request.json(&json!({ "webhook": webhook }));
        }

        let response = request
            .send()
            .await
            .with_context(|| format!("subscriptions/start failed for {content_type}"))?;
        let response = Self::check_status(response).await?;
        response
            .json()
            .await
            .context("failed to decode subscriptions/start response")
    }

    /// Stops the subscription for `content_type`. Not used by the watcher
    /// itself.
    pub async fn stop_subscription(&self, content_type: ContentType) -> Result<()> {
        let url = format!("{}subscriptions/stop", self.api_base);
        let response = self
            .authorized(Method::POST, &url)
            .await?
            .query(&[("contentType", content_type.as_str())])
            .send()
            .await
            .with_context(|| format!("subscriptions/stop failed for {content_type}"))?;
        Self::check_status(response).await?;
        Ok(())
    }

    /// GETs `path` under the feed base and follows `NextPageUri` headers,
    /// concatenating the pages.
    async fn get_paged<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, String)],
    ) -> Result<Vec<T>> {
        let mut out = Vec::new();
        let mut next_url = format!("{}{}", self.api_base, path);
        let mut first_page = true;

        loop {
            let mut request = self.authorized(Method::GET, &next_url).await?;
            if first_page {
                // Follow-up pages already carry the full query string.
                request = request.query(query);
            }

            let response = request
                .send()
                .await
                .with_context(|| format!("request to {path} failed"))?;
            let response = Self::check_status(response).await?;

            let next_page = response
                .headers()
                .get(NEXT_PAGE_HEADER)
                .and_then(|value| value.to_str().ok())
                .map(str::to_owned);

            let page: Vec<T> = response
                .json()
                .await
                .with_context(|| format!("failed to decode {path} response"))?;
            out.extend(page);

            match next_page {
                Some(url) if !url.is_empty() => {
                    tracing::debug!(path, next = %url, "following result page");
                    next_url = url;
                    first_page = false;
                }
                _ => return Ok(out),
            }
        }
    }

    async fn authorized(&self, method: Method, url: &str) -> Result<reqwest::RequestBuilder> {
        let token = self.tokens.bearer_token().await?;
        Ok(self
            .http
            .request(method, url)
            .bearer_auth(token)
            .query(&[("PublisherIdentifier", self.pub_identifier.as_str())]))
    }

    async fn check_status(response: reqwest::Response) -> Result<reqwest::Response> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        let detail: ErrorBody = serde_json::from_str(&body).unwrap_or_default();
        let (code, message) = match detail.error {
            Some(detail) => (detail.code, detail.message.unwrap_or(body)),
            None => (None, body),
        };
        Err(ApiError::Status {
            status,
            code,
            message,
        }
        .into())
    }
}

impl ActivityApi for ActivityApiClient {
    fn list_subscriptions<'a>(&'a self) -> BoxFuture<'a, Result<Vec<Subscription>>> {
        Box::pin(self.list_subscriptions())
    }

    fn list_content<'a>(
        &'a self,
        content_type: ContentType,
        start: DateTime<Local>,
        end: DateTime<Local>,
    ) -> BoxFuture<'a, Result<Vec<Content>>> {
        Box::pin(self.list_content(content_type, start, end))
    }

    fn list_audit_records<'a>(
        &'a self,
        content_id: &'a str,
    ) -> BoxFuture<'a, Result<Vec<AuditRecord>>> {
        Box::pin(self.list_audit_records(content_id))
    }
}

#[derive(Debug, Default, Deserialize)]
struct ErrorBody {
    error: Option<ErrorDetail>,
}

#[derive(Debug, Deserialize)]
struct ErrorDetail {
    code: Option<String>,
    message: Option<String>,
}
