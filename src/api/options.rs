//! Configurable knobs for the API client along with validation helpers.

use anyhow::{bail, Result};
use std::time::Duration;

const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;
const DEFAULT_USER_AGENT: &str = concat!("o365watch/", env!("CARGO_PKG_VERSION"));

#[derive(Debug, Clone)]
pub struct ApiClientOptions {
    pub request_timeout: Duration,
    pub user_agent: String,
    /// Overrides the activity feed base URL; the production endpoint for the
    /// configured tenant is used when unset.
    pub api_base: Option<String>,
    /// Overrides the OAuth2 token endpoint; the Azure AD endpoint for the
    /// configured tenant is used when unset.
    pub token_url: Option<String>,
}

impl Default for ApiClientOptions {
    fn default() -> Self {
        Self {
            request_timeout: Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECS),
            user_agent: DEFAULT_USER_AGENT.to_owned(),
            api_base: None,
            token_url: None,
        }
    }
}

impl ApiClientOptions {
    pub(crate) fn validate(&self) -> Result<()> {
        if self.request_timeout.is_zero() {
            bail!("request_timeout must be greater than 0");
        }
        if self.user_agent.trim().is_empty() {
            bail!("user_agent cannot be empty");
        }
        if let Some(base) = &self.api_base {
            validate_url(base, "api_base")?;
        }
        if let Some(url) = &self.token_url {
            validate_url(url, "token_url")?;
        }
        Ok(())
    }
}

fn validate_url(url: &str, field: &str) -> Result<()> {
    let url = url.trim();
    if !(url.starts_with("http://") || url.starts_with("https://")) {
        bail!("{field} must start with http:// or https://");
    }
    Ok(())
}
