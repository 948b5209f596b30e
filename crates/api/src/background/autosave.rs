//! Periodic checkpointing of active collaborative sessions.
//!
//! Each tick writes every session's working copy as a main-line draft when
//! it differs from the session base, then rebases the session onto it.

use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;

use folio_events::{event_types, ContentEvent, EventBus};
use folio_store::SessionCoordinator;

/// Checkpoint all sessions once, returning how many drafts were written.
pub async fn autosave_once(sessions: &SessionCoordinator, event_bus: &EventBus) -> usize {
    let saved = sessions.checkpoint_all().await;
    for version in &saved {
        event_bus.publish(
            ContentEvent::new(event_types::SESSION_CHECKPOINTED)
                .for_path(&version.content_path)
                .with_source("version", version.id)
                .with_actor(&version.author.id)
                .with_payload(serde_json::json!({ "version": version.version })),
        );
    }
    saved.len()
}

/// Run the autosave loop until `cancel` is triggered.
pub async fn run(
    sessions: Arc<SessionCoordinator>,
    event_bus: Arc<EventBus>,
    interval: Duration,
    cancel: CancellationToken,
) {
    tracing::info!(interval_secs = interval.as_secs(), "Session autosave started");

    let mut ticker = tokio::time::interval(interval);
    // The first tick completes immediately; nothing is worth saving yet.
    ticker.tick().await;

    loop {
        tokio::select! {
            _ = cancel.cancelled() => {
                tracing::info!("Session autosave stopping");
                break;
            }
            _ = ticker.tick() => {
                let saved = autosave_once(&sessions, &event_bus).await;
                if saved > 0 {
                    tracing::info!(saved, "Session autosave: checkpointed sessions");
                }
            }
        }
    }
}
