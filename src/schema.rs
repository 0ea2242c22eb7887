//! Wire-level data model for the Management Activity API: content types,
//! subscription listings, content descriptors, and the audit record envelope.

pub mod content;
pub mod record;

pub use content::{Content, ContentType, InvalidContentType, Subscription, Webhook};
pub use record::{AuditLogScope, AuditRecord, RecordType, UserType};
