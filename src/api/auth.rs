//! OAuth2 client-credentials token acquisition with in-process caching.

use crate::api::client::ApiError;
use anyhow::{Context, Result};
use serde::de::{self, Deserializer};
use serde::Deserialize;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;

/// Tokens within this margin of expiry are refreshed instead of reused.
const EXPIRY_MARGIN: Duration = Duration::from_secs(60);
/// Azure AD returns `expires_in` of 3599 seconds; assumed when the field is
/// absent.
const DEFAULT_TOKEN_LIFETIME_SECS: u64 = 3599;

/// Fetches and caches bearer tokens for the Management Activity resource.
///
/// Concurrent callers share a single cached token; only one refresh request
/// is in flight at a time.
pub(crate) struct TokenSource {
    http: reqwest::Client,
    token_url: String,
    resource: String,
    client_id: String,
    client_secret: String,
    cached: Mutex<Option<CachedToken>>,
}

struct CachedToken {
    access_token: String,
    expires_at: Instant,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default, deserialize_with = "expires_in_seconds")]
    expires_in: Option<u64>,
}

impl TokenSource {
    pub(crate) fn new(
        http: reqwest::Client,
        token_url: String,
        resource: String,
        client_id: String,
        client_secret: String,
    ) -> Self {
        Self {
            http,
            token_url,
            resource,
            client_id,
            client_secret,
            cached: Mutex::new(None),
        }
    }

    /// Returns a bearer token valid for at least [`EXPIRY_MARGIN`] from now.
    pub(crate) async fn bearer_token(&self) -> Result<String> {
        let mut cached = self.cached.lock().await;
        if let Some(token) = cached.as_ref() {
            if token.expires_at.saturating_duration_since(Instant::now()) > EXPIRY_MARGIN {
                return Ok(token.access_token.clone());
            }
        }

        let token = self.request_token().await?;
        let access_token = token.access_token.clone();
        *cached = Some(token);
        Ok(access_token)
    }

    async fn request_token(&self) -> Result<CachedToken> {
        tracing::debug!(token_url = %self.token_url, "requesting access token");

        let response = self
            .http
            .post(&self.token_url)
            .form(&[
                ("grant_type", "client_credentials"),
                ("resource", self.resource.as_str()),
                ("client_id", self.client_id.as_str()),
                ("client_secret", self.client_secret.as_str()),
            ])
            .send()
            .await
            .context("token request failed")?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(ApiError::TokenRejected { status, message }.into());
        }

        let token: TokenResponse = response
            .json()
            .await
            .context("failed to decode token response")?;
        let lifetime = token.expires_in.unwrap_or(DEFAULT_TOKEN_LIFETIME_SECS);

        Ok(CachedToken {
            access_token: token.access_token,
            expires_at: Instant::now() + Duration::from_secs(lifetime),
        })
    }
}

/// Azure AD serializes `expires_in` as a quoted decimal; some endpoints send
/// a bare number. Accept both.
fn expires_in_seconds<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<u64>, D::Error> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Number(u64),
        Text(String),
    }

    match Option::<Raw>::deserialize(deserializer)? {
        None => Ok(None),
        Some(Raw::Number(v)) => Ok(Some(v)),
        Some(Raw::Text(s)) => s
            .parse::<u64>()
            .map(Some)
            .map_err(|_| de::Error::custom(format!("invalid expires_in {s:?}"))),
    }
}
