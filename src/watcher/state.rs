//! Per-content-type watcher state: busy flags and progress watermarks.
//!
//! Each map sits behind its own lock so a fetcher updating one content type
//! never contends with the generator probing another. Watermark writes apply
//! the monotonic rule: a stored value is only replaced by a strictly greater
//! one, which keeps concurrent writers race-safe without ordering
//! constraints.

use crate::schema::ContentType;
use chrono::{DateTime, Local};
use std::collections::HashMap;
use std::sync::{Mutex, RwLock};

#[derive(Debug, Default)]
pub(crate) struct WatcherState {
    busy: Mutex<HashMap<ContentType, bool>>,
    last_request_time: RwLock<HashMap<ContentType, DateTime<Local>>>,
    last_content_created: RwLock<HashMap<ContentType, DateTime<Local>>>,
}

impl WatcherState {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn is_busy(&self, content_type: ContentType) -> bool {
        let busy = self.busy.lock().expect("busy lock poisoned");
        busy.get(&content_type).copied().unwrap_or(false)
    }

    /// Claims the content type for a fetch. Returns false when another fetch
    /// already holds it, in which case the caller must back off.
    pub(crate) fn try_set_busy(&self, content_type: ContentType) -> bool {
        let mut busy = self.busy.lock().expect("busy lock poisoned");
        let slot = busy.entry(content_type).or_insert(false);
        if *slot {
            return false;
        }
        *slot = true;
        true
    }

    pub(crate) fn unset_busy(&self, content_type: ContentType) {
        let mut busy = self.busy.lock().expect("busy lock poisoned");
        busy.insert(content_type, false);
    }

    pub(crate) fn last_request_time(&self, content_type: ContentType) -> Option<DateTime<Local>> {
        let map = self
            .last_request_time
            .read()
            .expect("request watermark lock poisoned");
        map.get(&content_type).copied()
    }

    pub(crate) fn record_request_time(&self, content_type: ContentType, t: DateTime<Local>) {
        let mut map = self
            .last_request_time
            .write()
            .expect("request watermark lock poisoned");
        monotonic_insert(&mut map, content_type, t);
    }

    pub(crate) fn last_content_created(
        &self,
        content_type: ContentType,
    ) -> Option<DateTime<Local>> {
        let map = self
            .last_content_created
            .read()
            .expect("creation watermark lock poisoned");
        map.get(&content_type).copied()
    }

    pub(crate) fn record_content_created(&self, content_type: ContentType, t: DateTime<Local>) {
        let mut map = self
            .last_content_created
            .write()
            .expect("creation watermark lock poisoned");
        monotonic_insert(&mut map, content_type, t);
    }
}

fn monotonic_insert(
    map: &mut HashMap<ContentType, DateTime<Local>>,
    content_type: ContentType,
    t: DateTime<Local>,
) {
    match map.get(&content_type) {
        Some(current) if *current >= t => {}
        _ => {
            map.insert(content_type, t);
        }
    }
}
