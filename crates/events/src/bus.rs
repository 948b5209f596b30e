//! In-process event bus backed by a `tokio::sync::broadcast` channel.
//!
//! [`EventBus`] is the central publish/subscribe hub for [`ContentEvent`]s.
//! It is designed to be shared via `Arc<EventBus>` across the application.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

use folio_core::types::EntityId;

/// Dot-separated event names published by the engine.
pub mod event_types {
    pub const VERSION_CREATED: &str = "version.created";
    pub const VERSION_PUBLISHED: &str = "version.published";
    pub const VERSION_REVIEWED: &str = "version.reviewed";
    pub const VERSION_ROLLED_BACK: &str = "version.rolled_back";
    pub const BRANCH_CREATED: &str = "branch.created";
    pub const BRANCH_COMMITTED: &str = "branch.committed";
    pub const BRANCH_MERGED: &str = "branch.merged";
    pub const BRANCH_MERGE_CONFLICTED: &str = "branch.merge_conflicted";
    pub const BRANCH_ABANDONED: &str = "branch.abandoned";
    pub const SESSION_STARTED: &str = "session.started";
    pub const SESSION_JOINED: &str = "session.joined";
    pub const SESSION_LEFT: &str = "session.left";
    pub const SESSION_CHANGED: &str = "session.changed";
    pub const SESSION_COMMENTED: &str = "session.commented";
    pub const SESSION_ENDED: &str = "session.ended";
    pub const SESSION_CHECKPOINTED: &str = "session.checkpointed";
    pub const SESSION_EXPIRED: &str = "session.expired";
}

// ---------------------------------------------------------------------------
// ContentEvent
// ---------------------------------------------------------------------------

/// Something that happened to a content path or session.
///
/// Constructed via [`ContentEvent::new`] and enriched with the builder
/// methods [`for_path`](ContentEvent::for_path),
/// [`with_source`](ContentEvent::with_source),
/// [`with_actor`](ContentEvent::with_actor), and
/// [`with_payload`](ContentEvent::with_payload).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContentEvent {
    /// Dot-separated event name, e.g. `"version.published"`.
    pub event_type: String,

    /// Content path the event concerns.
    pub content_path: Option<String>,

    /// Source entity kind (`"version"`, `"branch"`, `"session"`).
    pub source_entity_type: Option<String>,

    pub source_entity_id: Option<EntityId>,

    /// Author id of whoever triggered the event.
    pub actor_id: Option<String>,

    /// Free-form JSON payload carrying event-specific data.
    pub payload: serde_json::Value,

    pub timestamp: DateTime<Utc>,
}

impl ContentEvent {
    /// Create a new event with only the required `event_type`.
    pub fn new(event_type: impl Into<String>) -> Self {
        Self {
            event_type: event_type.into(),
            content_path: None,
            source_entity_type: None,
            source_entity_id: None,
            actor_id: None,
            payload: serde_json::Value::Object(Default::default()),
            timestamp: Utc::now(),
        }
    }

    pub fn for_path(mut self, path: impl Into<String>) -> Self {
        self.content_path = Some(path.into());
        self
    }

    /// Attach a source entity to the event.
    pub fn with_source(mut self, entity_type: impl Into<String>, entity_id: EntityId) -> Self {
        self.source_entity_type = Some(entity_type.into());
        self.source_entity_id = Some(entity_id);
        self
    }

    pub fn with_actor(mut self, actor_id: impl Into<String>) -> Self {
        self.actor_id = Some(actor_id.into());
        self
    }

    pub fn with_payload(mut self, payload: serde_json::Value) -> Self {
        self.payload = payload;
        self
    }
}

// ---------------------------------------------------------------------------
// EventBus
// ---------------------------------------------------------------------------

/// Default buffer capacity for the broadcast channel.
const DEFAULT_CAPACITY: usize = 1024;

/// In-process fan-out event bus.
///
/// Wraps a [`broadcast::Sender`] so that any number of subscribers can
/// independently receive every published [`ContentEvent`].
pub struct EventBus {
    sender: broadcast::Sender<ContentEvent>,
}

impl EventBus {
    /// Create a bus with a specific channel capacity.
    ///
    /// When the buffer is full the oldest unconsumed messages are dropped
    /// and slow receivers observe `RecvError::Lagged`.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Publish an event to all current subscribers. Dropped silently when
    /// nobody is listening.
    pub fn publish(&self, event: ContentEvent) {
        tracing::trace!(event_type = %event.event_type, "Publishing event");
        let _ = self.sender.send(event);
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ContentEvent> {
        self.sender.subscribe()
    }

    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
