//! Folio event bus and activity journal.
//!
//! - [`EventBus`]: in-process publish/subscribe hub backed by
//!   `tokio::sync::broadcast`. External delivery channels (websocket
//!   fan-out, webhooks) subscribe here.
//! - [`ContentEvent`]: the engine's event envelope.
//! - [`EventJournal`]: bounded in-memory feed of recent events.

pub mod bus;
pub mod journal;

pub use bus::{event_types, ContentEvent, EventBus};
pub use journal::EventJournal;
