//! Periodic expiry of idle collaborative sessions.
//!
//! Sessions with no activity for longer than the configured timeout are
//! ended with discard semantics. Their unflushed changes are logged and
//! published as `session.expired` events so a client can reconcile them.

use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;

use folio_core::collaboration::LiveChange;
use folio_events::{event_types, ContentEvent, EventBus};
use folio_store::{SessionCoordinator, SessionOutcome};

/// Run one sweep, returning how many sessions were expired.
pub async fn sweep_once(
    sessions: &SessionCoordinator,
    event_bus: &EventBus,
    stale_after: chrono::Duration,
) -> usize {
    let expired = sessions.expire_stale(stale_after).await;
    for ended in &expired {
        let unflushed: &[LiveChange] = match &ended.outcome {
            SessionOutcome::Discarded { unflushed, .. } => unflushed.as_slice(),
            SessionOutcome::Committed { .. } => &[],
        };
        event_bus.publish(
            ContentEvent::new(event_types::SESSION_EXPIRED)
                .for_path(&ended.session.content_path)
                .with_source("session", ended.session.id)
                .with_actor(&ended.session.owner.id)
                .with_payload(serde_json::json!({
                    "last_activity_at": ended.session.last_activity_at,
                    "unflushed": unflushed,
                })),
        );
    }
    expired.len()
}

/// Run the stale-session sweep loop until `cancel` is triggered.
pub async fn run(
    sessions: Arc<SessionCoordinator>,
    event_bus: Arc<EventBus>,
    interval: Duration,
    stale_after: Duration,
    cancel: CancellationToken,
) {
    let stale_after = match chrono::Duration::from_std(stale_after) {
        Ok(d) => d,
        Err(e) => {
            tracing::error!(error = %e, "Session sweeper: invalid stale timeout, not starting");
            return;
        }
    };

    tracing::info!(
        interval_secs = interval.as_secs(),
        stale_after_secs = stale_after.num_seconds(),
        "Session sweeper started"
    );

    let mut ticker = tokio::time::interval(interval);

    loop {
        tokio::select! {
            _ = cancel.cancelled() => {
                tracing::info!("Session sweeper stopping");
                break;
            }
            _ = ticker.tick() => {
                let expired = sweep_once(&sessions, &event_bus, stale_after).await;
                if expired > 0 {
                    tracing::info!(expired, "Session sweeper: expired idle sessions");
                } else {
                    tracing::debug!("Session sweeper: no idle sessions");
                }
            }
        }
    }
}
