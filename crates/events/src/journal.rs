//! Bounded in-memory activity feed.
//!
//! [`EventJournal`] subscribes to the [`EventBus`](crate::bus::EventBus) and
//! keeps the most recent events for the activity endpoint. It runs as a
//! long-lived background task and stops when the bus sender is dropped.

use std::collections::VecDeque;

use tokio::sync::{broadcast, RwLock};

use crate::bus::ContentEvent;

/// Default number of events retained.
pub const DEFAULT_JOURNAL_CAPACITY: usize = 500;

pub struct EventJournal {
    capacity: usize,
    entries: RwLock<VecDeque<ContentEvent>>,
}

impl EventJournal {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            entries: RwLock::new(VecDeque::with_capacity(capacity.max(1))),
        }
    }

    /// Consume events from `receiver` until the channel closes.
    pub async fn run(&self, mut receiver: broadcast::Receiver<ContentEvent>) {
        loop {
            match receiver.recv().await {
                Ok(event) => self.record(event).await,
                Err(broadcast::error::RecvError::Lagged(n)) => {
                    tracing::warn!(skipped = n, "Event journal lagged, some events were dropped");
                }
                Err(broadcast::error::RecvError::Closed) => {
                    tracing::info!("Event bus closed, journal shutting down");
                    break;
                }
            }
        }
    }

    pub async fn record(&self, event: ContentEvent) {
        let mut entries = self.entries.write().await;
        if entries.len() >= self.capacity {
            entries.pop_front();
        }
        entries.push_back(event);
    }

    /// Up to `limit` most recent events, newest first, optionally filtered
    /// to one content path.
    pub async fn recent(&self, limit: usize, path: Option<&str>) -> Vec<ContentEvent> {
        self.entries
            .read()
            .await
            .iter()
            .rev()
            .filter(|e| path.is_none_or(|p| e.content_path.as_deref() == Some(p)))
            .take(limit)
            .cloned()
            .collect()
    }

    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }
}

impl Default for EventJournal {
    fn default() -> Self {
        Self::new(DEFAULT_JOURNAL_CAPACITY)
    }
}
