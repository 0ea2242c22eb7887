//! Content families, subscription listings, and content descriptors.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// One of the five content families exposed by the Management Activity API.
///
/// The set is closed: it sizes the fetcher pool and the internal bus, so new
/// families require a code change rather than configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ContentType {
    #[serde(rename = "Audit.AzureActiveDirectory")]
    AuditAzureActiveDirectory,
    #[serde(rename = "Audit.Exchange")]
    AuditExchange,
    #[serde(rename = "Audit.SharePoint")]
    AuditSharePoint,
    #[serde(rename = "Audit.General")]
    AuditGeneral,
    #[serde(rename = "DLP.All")]
    DlpAll,
}

impl ContentType {
    /// Every content family, in a fixed order usable for pool indexing.
    pub const ALL: [ContentType; 5] = [
        ContentType::AuditAzureActiveDirectory,
        ContentType::AuditExchange,
        ContentType::AuditSharePoint,
        ContentType::AuditGeneral,
        ContentType::DlpAll,
    ];

    /// Number of content families; also the fetcher pool size and bus capacity.
    pub const COUNT: usize = Self::ALL.len();

    pub fn as_str(self) -> &'static str {
        match self {
            ContentType::AuditAzureActiveDirectory => "Audit.AzureActiveDirectory",
            ContentType::AuditExchange => "Audit.Exchange",
            ContentType::AuditSharePoint => "Audit.SharePoint",
            ContentType::AuditGeneral => "Audit.General",
            ContentType::DlpAll => "DLP.All",
        }
    }
}

impl fmt::Display for ContentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when a subscription advertises a content type outside the
/// closed set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvalidContentType(pub String);

impl fmt::Display for InvalidContentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid content type {:?}", self.0)
    }
}

impl std::error::Error for InvalidContentType {}

impl FromStr for ContentType {
    type Err = InvalidContentType;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .iter()
            .copied()
            .find(|ct| ct.as_str() == s)
            .ok_or_else(|| InvalidContentType(s.to_owned()))
    }
}

/// A current subscription as returned by `subscriptions/list`.
///
/// The content type stays a raw string here: the API can list families this
/// build does not know about, and the watcher reports those per subscription
/// instead of failing the whole listing.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Subscription {
    #[serde(default)]
    pub content_type: String,
    #[serde(default)]
    pub status: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub webhook: Option<Webhook>,
}

/// Optional webhook attached to a subscription on `subscriptions/start`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Webhook {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub auth_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expiration: Option<String>,
}

/// A content blob descriptor returned by `subscriptions/content`.
///
/// Only `content_id` and `content_created` drive the watcher; the rest is
/// carried for API completeness.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Content {
    #[serde(default)]
    pub content_type: String,
    #[serde(default)]
    pub content_id: String,
    #[serde(default)]
    pub content_uri: String,
    #[serde(default)]
    pub content_created: String,
    #[serde(default)]
    pub content_expiration: String,
}
