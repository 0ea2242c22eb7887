//! Bounded internal bus between the generator and the fetcher pool.
//!
//! Sends never block: when every slot is taken the resource is dropped and
//! the tick is simply retried by the next one. Receives block until a
//! resource arrives or the bus is closed and drained.

use crate::watcher::resource::Resource;
use std::collections::VecDeque;
use tokio::sync::{Mutex, Notify};

#[derive(Debug, PartialEq, Eq)]
pub(crate) enum OfferOutcome {
    Queued,
    /// The bus was full; the resource was discarded.
    Dropped,
    /// The bus no longer accepts resources.
    Closed,
}

pub(crate) struct ResourceBus {
    state: Mutex<BusState>,
    notify: Notify,
    capacity: usize,
}

struct BusState {
    queue: VecDeque<Resource>,
    closed: bool,
}

impl ResourceBus {
    pub(crate) fn new(capacity: usize) -> Self {
        assert!(capacity > 0, "capacity must be greater than zero");
        Self {
            state: Mutex::new(BusState {
                queue: VecDeque::with_capacity(capacity),
                closed: false,
            }),
            notify: Notify::new(),
            capacity,
        }
    }

    /// Non-blocking send with drop semantics.
    pub(crate) async fn offer(&self, resource: Resource) -> OfferOutcome {
        let mut state = self.state.lock().await;
        if state.closed {
            return OfferOutcome::Closed;
        }
        if state.queue.len() >= self.capacity {
            return OfferOutcome::Dropped;
        }
        state.queue.push_back(resource);
        drop(state);
        self.notify.notify_one();
        OfferOutcome::Queued
    }

    /// Awaits the next resource; `None` once the bus is closed and drained.
    pub(crate) async fn recv(&self) -> Option<Resource> {
        loop {
            let notified = self.notify.notified();
            tokio::pin!(notified);
            // Register before re-checking so a close() between the check and
            // the await cannot be missed.
            let _ = notified.as_mut().enable();

            {
                let mut state = self.state.lock().await;
                if let Some(resource) = state.queue.pop_front() {
                    return Some(resource);
                }
                if state.closed {
                    return None;
                }
            }

            notified.await;
        }
    }

    /// Stops accepting resources and wakes every receiver. Already queued
    /// resources remain receivable.
    pub(crate) async fn close(&self) {
        let mut state = self.state.lock().await;
        state.closed = true;
        drop(state);
        self.notify.notify_waiters();
    }

    pub(crate) async fn len(&self) -> usize {
        self.state.lock().await.queue.len()
    }
}
