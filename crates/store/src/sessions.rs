//! In-process coordinator for collaborative editing sessions.
//!
//! Each session sits behind its own `tokio::sync::Mutex`, which serializes
//! changes within a session while leaving sessions independent of each
//! other. Commits and checkpoints replay the change log onto the main-line
//! tip while holding the path's write lock in [`VersionStore`], so versions
//! appended since the session started are built upon rather than replaced.
//! Ended sessions leave a tombstone so late callers get `SessionExpired`
//! instead of `NotFound`.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::Utc;
use indexmap::IndexSet;
use serde::Serialize;
use tokio::sync::{Mutex, RwLock};

use folio_core::collaboration::{
    CollaborativeSession, Comment, EndMode, LiveChange, ParticipantRole,
};
use folio_core::error::CoreError;
use folio_core::types::EntityId;
use folio_core::version::{ChangeRecord, ChangeType, ContentVersion, NewVersion, VersionAuthor};

use crate::version_store::VersionStore;

/// Number of ended session ids remembered for `SessionExpired` answers.
pub const MAX_TOMBSTONES: usize = 10_000;

type SessionSlot = Arc<Mutex<CollaborativeSession>>;

/// Result of writing a session's change log to the main line.
enum Flush {
    Appended(ContentVersion),
    /// The tip already holds everything the log would produce.
    UpToDate(ContentVersion),
}

/// What happened to a session's pending changes when it ended.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "result", rename_all = "snake_case")]
pub enum SessionOutcome {
    Committed { version: ContentVersion },
    /// Nothing was written. `unflushed` holds the changes that were pending;
    /// `failure` is set when a commit was attempted and failed.
    Discarded {
        unflushed: Vec<LiveChange>,
        failure: Option<String>,
    },
}

#[derive(Debug, Clone, Serialize)]
pub struct SessionEnd {
    /// Final state of the session.
    pub session: CollaborativeSession,
    pub outcome: SessionOutcome,
}

pub struct SessionCoordinator {
    store: Arc<VersionStore>,
    sessions: RwLock<HashMap<EntityId, SessionSlot>>,
    tombstones: RwLock<IndexSet<EntityId>>,
}

impl SessionCoordinator {
    pub fn new(store: Arc<VersionStore>) -> Self {
        Self {
            store,
            sessions: RwLock::new(HashMap::new()),
            tombstones: RwLock::new(IndexSet::new()),
        }
    }

    async fn slot(&self, id: EntityId) -> Result<SessionSlot, CoreError> {
        if let Some(slot) = self.sessions.read().await.get(&id) {
            return Ok(Arc::clone(slot));
        }
        if self.tombstones.read().await.contains(&id) {
            return Err(CoreError::SessionExpired(format!("Session {id} has ended")));
        }
        Err(CoreError::not_found("CollaborativeSession", id))
    }

    async fn release(&self, id: EntityId) {
        self.sessions.write().await.remove(&id);
        let mut tombstones = self.tombstones.write().await;
        if tombstones.len() >= MAX_TOMBSTONES {
            tombstones.shift_remove_index(0);
        }
        tombstones.insert(id);
    }

    // -----------------------------------------------------------------------
    // Lifecycle
    // -----------------------------------------------------------------------

    /// Open a session on the current main-line tip of `path`.
    pub async fn start(
        &self,
        path: &str,
        initiator: VersionAuthor,
    ) -> Result<CollaborativeSession, CoreError> {
        let history = self.store.get_or_init_history(path).await?;
        let base = history
            .current()
            .ok_or_else(|| CoreError::not_found("VersionHistory", path))?;

        let session = CollaborativeSession::new(base, initiator);
        self.sessions
            .write()
            .await
            .insert(session.id, Arc::new(Mutex::new(session.clone())));

        tracing::info!(
            session_id = %session.id,
            content_path = path,
            base_version = base.version,
            owner = %session.owner.id,
            "Collaborative session started"
        );
        Ok(session)
    }

    pub async fn join(
        &self,
        id: EntityId,
        user_id: &str,
        name: &str,
        role: ParticipantRole,
    ) -> Result<CollaborativeSession, CoreError> {
        let slot = self.slot(id).await?;
        let mut session = slot.lock().await;
        session.join(user_id, name, role)?;
        tracing::info!(session_id = %id, user_id, ?role, "Participant joined session");
        Ok(session.clone())
    }

    pub async fn leave(&self, id: EntityId, user_id: &str) -> Result<CollaborativeSession, CoreError> {
        let slot = self.slot(id).await?;
        let mut session = slot.lock().await;
        session.leave(user_id)?;
        tracing::info!(session_id = %id, user_id, "Participant left session");
        Ok(session.clone())
    }

    pub async fn apply_change(
        &self,
        id: EntityId,
        change: LiveChange,
    ) -> Result<CollaborativeSession, CoreError> {
        let slot = self.slot(id).await?;
        let mut session = slot.lock().await;
        let author_id = change.author_id.clone();
        session.apply(change)?;
        tracing::debug!(
            session_id = %id,
            author_id = %author_id,
            pending = session.changes.len(),
            "Live change applied"
        );
        Ok(session.clone())
    }

    pub async fn add_comment(
        &self,
        id: EntityId,
        author_id: &str,
        section: Option<String>,
        body: &str,
    ) -> Result<Comment, CoreError> {
        let slot = self.slot(id).await?;
        let mut session = slot.lock().await;
        let comment = session.add_comment(author_id, section, body)?;
        tracing::debug!(session_id = %id, comment_id = %comment.id, "Comment added");
        Ok(comment)
    }

    pub async fn get(&self, id: EntityId) -> Result<CollaborativeSession, CoreError> {
        let slot = self.slot(id).await?;
        let session = slot.lock().await;
        Ok(session.clone())
    }

    /// Active sessions, optionally limited to one path, oldest first.
    pub async fn list(&self, path: Option<&str>) -> Vec<CollaborativeSession> {
        let slots: Vec<SessionSlot> = self.sessions.read().await.values().cloned().collect();
        let mut sessions = Vec::with_capacity(slots.len());
        for slot in slots {
            let session = slot.lock().await;
            if session.is_active() && path.is_none_or(|p| session.content_path == p) {
                sessions.push(session.clone());
            }
        }
        sessions.sort_by_key(|s| s.started_at);
        sessions
    }

    /// End a session, committing its changes or discarding them.
    ///
    /// A commit with no effective changes against the current tip is a
    /// discard. A failed commit
    /// degrades to a discard that hands back the pending change log.
    pub async fn end(&self, id: EntityId, mode: EndMode) -> Result<SessionEnd, CoreError> {
        let slot = self.slot(id).await?;
        let mut session = slot.lock().await;
        if !session.is_active() {
            return Err(CoreError::SessionExpired(format!("Session {id} has ended")));
        }

        let outcome = match mode {
            EndMode::Commit if session.has_changes() => self.commit(&session).await,
            _ => SessionOutcome::Discarded {
                unflushed: session.changes.clone(),
                failure: None,
            },
        };

        session.end();
        let snapshot = session.clone();
        drop(session);
        self.release(id).await;

        match &outcome {
            SessionOutcome::Committed { version } => tracing::info!(
                session_id = %id,
                content_path = %snapshot.content_path,
                version = version.version,
                "Collaborative session committed"
            ),
            SessionOutcome::Discarded { unflushed, failure } => tracing::info!(
                session_id = %id,
                content_path = %snapshot.content_path,
                unflushed = unflushed.len(),
                failure = ?failure,
                "Collaborative session discarded"
            ),
        }
        Ok(SessionEnd {
            session: snapshot,
            outcome,
        })
    }

    async fn commit(&self, session: &CollaborativeSession) -> SessionOutcome {
        let editors = session
            .changes
            .iter()
            .map(|c| c.author_id.as_str())
            .collect::<std::collections::HashSet<_>>()
            .len();
        let record = ChangeRecord::document(
            ChangeType::Session,
            format!(
                "Committed collaborative session ({} change(s) from {editors} participant(s))",
                session.changes.len()
            ),
        );

        match self.flush(session, record).await {
            Ok(Flush::Appended(version)) => SessionOutcome::Committed { version },
            Ok(Flush::UpToDate(_)) => SessionOutcome::Discarded {
                unflushed: session.changes.clone(),
                failure: None,
            },
            Err(e) => {
                tracing::warn!(
                    session_id = %session.id,
                    error = %e,
                    "Session commit failed, discarding and surfacing pending changes"
                );
                SessionOutcome::Discarded {
                    unflushed: session.changes.clone(),
                    failure: Some(e.to_string()),
                }
            }
        }
    }

    /// Append the session's content on top of the current main-line tip.
    async fn flush(
        &self,
        session: &CollaborativeSession,
        record: ChangeRecord,
    ) -> Result<Flush, CoreError> {
        let path = session.content_path.as_str();
        let flushed = self
            .store
            .write(path, |history| {
                let tip = history
                    .current()
                    .ok_or_else(|| CoreError::not_found("VersionHistory", path))?;
                if tip.id != session.base_version_id {
                    tracing::debug!(
                        session_id = %session.id,
                        base_version_id = %session.base_version_id,
                        tip_version = tip.version,
                        "Main line moved, replaying session changes onto tip"
                    );
                }
                let content = session.content_on(tip);
                if content == tip.content {
                    return Ok(Flush::UpToDate(tip.clone()));
                }
                history
                    .append(NewVersion::draft(content, session.owner.clone()).with_change(record))
                    .map(Flush::Appended)
            })
            .await?;

        if let Flush::Appended(version) = &flushed {
            tracing::info!(
                content_path = path,
                version = version.version,
                version_id = %version.id,
                "Session changes appended"
            );
        }
        Ok(flushed)
    }

    // -----------------------------------------------------------------------
    // Background maintenance
    // -----------------------------------------------------------------------

    /// Save the session's changes as a main-line draft without ending it.
    ///
    /// Returns `None` when there is nothing new to save. Either way the
    /// session is rebased so later changes apply on top of the saved state.
    pub async fn checkpoint(&self, id: EntityId) -> Result<Option<ContentVersion>, CoreError> {
        let slot = self.slot(id).await?;
        let mut session = slot.lock().await;
        if !session.is_active() {
            return Err(CoreError::SessionExpired(format!("Session {id} has ended")));
        }
        if !session.has_changes() {
            return Ok(None);
        }

        let record = ChangeRecord::document(ChangeType::Session, "Autosaved collaborative session");
        let version = match self.flush(&session, record).await? {
            Flush::Appended(version) => version,
            Flush::UpToDate(tip) => {
                session.rebase(&tip);
                return Ok(None);
            }
        };
        session.rebase(&version);
        tracing::info!(session_id = %id, version = version.version, "Session checkpointed");
        Ok(Some(version))
    }

    /// Checkpoint every active session. Failures are logged and skipped.
    pub async fn checkpoint_all(&self) -> Vec<ContentVersion> {
        let ids: Vec<EntityId> = self.sessions.read().await.keys().copied().collect();
        let mut saved = Vec::new();
        for id in ids {
            match self.checkpoint(id).await {
                Ok(Some(version)) => saved.push(version),
                Ok(None) => {}
                Err(CoreError::SessionExpired(_)) | Err(CoreError::NotFound { .. }) => {}
                Err(e) => tracing::error!(session_id = %id, error = %e, "Autosave failed"),
            }
        }
        saved
    }

    /// End every session idle for longer than `timeout` with discard
    /// semantics, returning their unflushed changes for reconciliation.
    pub async fn expire_stale(&self, timeout: chrono::Duration) -> Vec<SessionEnd> {
        let now = Utc::now();
        let slots: Vec<(EntityId, SessionSlot)> = self
            .sessions
            .read()
            .await
            .iter()
            .map(|(id, slot)| (*id, Arc::clone(slot)))
            .collect();

        let mut stale = Vec::new();
        for (id, slot) in slots {
            let is_stale = {
                let session = slot.lock().await;
                session.is_active() && session.is_stale(now, timeout)
            };
            if !is_stale {
                continue;
            }
            match self.end(id, EndMode::Discard).await {
                Ok(ended) => {
                    tracing::warn!(
                        session_id = %id,
                        content_path = %ended.session.content_path,
                        "Stale session expired"
                    );
                    stale.push(ended);
                }
                Err(e) => tracing::debug!(session_id = %id, error = %e, "Session ended concurrently"),
            }
        }
        stale
    }

    /// Number of active sessions.
    pub async fn active_count(&self) -> usize {
        self.sessions.read().await.len()
    }
}
