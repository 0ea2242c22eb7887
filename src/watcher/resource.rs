//! The message shuttled from generator through fetcher to the consumer.

use crate::schema::{AuditRecord, ContentType};
use chrono::{DateTime, Local};

/// Identifies the fetch a [`Resource`] answers: which content family, and the
/// tick instant that becomes the upper window bound and the next
/// `lastRequestTime` watermark.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResourceRequest {
    pub content_type: ContentType,
    pub request_time: DateTime<Local>,
}

/// One unit of watcher output.
///
/// A resource is mutated only by its current holder; once emitted on the
/// output channel it is not touched again. Resources without a request carry
/// failures that could not be pinned to a content type (a broken
/// subscription listing, an unknown content type literal).
#[derive(Debug, Default)]
pub struct Resource {
    pub request: Option<ResourceRequest>,
    pub records: Vec<AuditRecord>,
    pub errors: Vec<anyhow::Error>,
}

impl Resource {
    /// A resource destined for a fetch of `content_type`.
    pub(crate) fn for_request(content_type: ContentType, request_time: DateTime<Local>) -> Self {
        Self {
            request: Some(ResourceRequest {
                content_type,
                request_time,
            }),
            records: Vec::new(),
            errors: Vec::new(),
        }
    }

    /// A request-less resource carrying a single failure.
    pub(crate) fn from_error(error: anyhow::Error) -> Self {
        Self {
            request: None,
            records: Vec::new(),
            errors: vec![error],
        }
    }

    pub fn add_error(&mut self, error: anyhow::Error) {
        self.errors.push(error);
    }

    pub fn content_type(&self) -> Option<ContentType> {
        self.request.map(|r| r.content_type)
    }

    /// True when there is nothing for a consumer to look at.
    pub fn is_empty(&self) -> bool {
        self.records.is_empty() && self.errors.is_empty()
    }
}
