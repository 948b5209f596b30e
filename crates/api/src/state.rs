use std::sync::Arc;

use folio_events::{ContentEvent, EventBus, EventJournal};
use folio_store::{ContentSource, SessionCoordinator, VersionStore};

use crate::config::ServerConfig;

/// Shared application state available to all Axum handlers via `State<AppState>`.
///
/// This is cheaply cloneable (inner data is behind `Arc`).
#[derive(Clone)]
pub struct AppState {
    /// Version ledger for every content path.
    pub store: Arc<VersionStore>,
    /// Live collaborative sessions.
    pub sessions: Arc<SessionCoordinator>,
    pub config: Arc<ServerConfig>,
    /// Centralized event bus for publishing engine events.
    pub event_bus: Arc<EventBus>,
    /// Recent events, fed from `event_bus` by a background task.
    pub journal: Arc<EventJournal>,
}

impl AppState {
    /// Wire the engine around `source`. The journal still needs its
    /// [`EventJournal::run`] task spawned against `event_bus`.
    pub fn new(config: ServerConfig, source: Arc<dyn ContentSource>) -> Self {
        let store = Arc::new(VersionStore::new(source, config.diff_cache_capacity));
        let sessions = Arc::new(SessionCoordinator::new(Arc::clone(&store)));
        Self {
            store,
            sessions,
            config: Arc::new(config),
            event_bus: Arc::new(EventBus::default()),
            journal: Arc::new(EventJournal::default()),
        }
    }

    pub fn publish(&self, event: ContentEvent) {
        self.event_bus.publish(event);
    }
}
