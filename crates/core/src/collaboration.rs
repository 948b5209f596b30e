//! Collaborative editing session model and change folding.
//!
//! A session holds the base content it started from and an ordered log of
//! live changes. The working copy is always the base with the whole log
//! folded in order, so a late-arriving change with an earlier timestamp
//! lands in the right place. Conflicts resolve last-write-wins per section.

use chrono::{Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::content::validate_content;
use crate::error::CoreError;
use crate::sections::{is_valid_section_key, Document, Section, DEFAULT_HEADING_LEVEL};
use crate::types::{new_id, EntityId, Timestamp};
use crate::version::{ContentVersion, VersionAuthor};

/// Maximum length of a session comment body.
pub const MAX_COMMENT_LENGTH: usize = 5000;

/// Maximum number of participants in one session, active or not.
pub const MAX_PARTICIPANTS: usize = 50;

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
    Active,
    Ended,
}

impl SessionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Ended => "ended",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ParticipantRole {
    Owner,
    Editor,
    Viewer,
}

impl ParticipantRole {
    pub fn can_edit(&self) -> bool {
        !matches!(self, Self::Viewer)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Participant {
    pub user_id: String,
    pub name: String,
    pub role: ParticipantRole,
    pub is_active: bool,
    pub joined_at: Timestamp,
}

/// An edit applied to the working copy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum LiveOperation {
    /// Replace a section body, creating the section when it does not exist.
    ReplaceSection { section: String, content: String },
    RemoveSection { section: String },
    /// Replace the entire document.
    ReplaceAll { content: String },
}

impl LiveOperation {
    /// Section the operation targets, `None` for whole-document operations.
    pub fn section(&self) -> Option<&str> {
        match self {
            Self::ReplaceSection { section, .. } | Self::RemoveSection { section } => Some(section),
            Self::ReplaceAll { .. } => None,
        }
    }

    fn validate(&self) -> Result<(), CoreError> {
        if let Some(section) = self.section() {
            if !is_valid_section_key(section) {
                return Err(CoreError::Validation(format!(
                    "Invalid section name {section:?}"
                )));
            }
        }
        match self {
            Self::ReplaceSection { content, .. } => {
                validate_content(content)?;
                if Document::parse(content).heading_count() > 0 {
                    return Err(CoreError::Validation(
                        "Section content must not contain headings".into(),
                    ));
                }
                Ok(())
            }
            Self::ReplaceAll { content } => validate_content(content),
            Self::RemoveSection { .. } => Ok(()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LiveChange {
    pub author_id: String,
    pub timestamp: Timestamp,
    pub operation: LiveOperation,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Comment {
    pub id: EntityId,
    pub author_id: String,
    /// Section the comment is anchored to, if any.
    pub section: Option<String>,
    pub body: String,
    pub created_at: Timestamp,
}

/// How a session ends.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EndMode {
    Commit,
    Discard,
}

// ---------------------------------------------------------------------------
// Session
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CollaborativeSession {
    pub id: EntityId,
    pub content_path: String,
    /// Version the pending change log applies on top of.
    pub base_version_id: EntityId,
    pub owner: VersionAuthor,
    pub participants: Vec<Participant>,
    /// Pending changes ordered by `(timestamp, author_id)`.
    pub changes: Vec<LiveChange>,
    pub comments: Vec<Comment>,
    pub working_copy: String,
    pub started_at: Timestamp,
    pub last_activity_at: Timestamp,
    pub status: SessionStatus,
    #[serde(skip)]
    base_content: String,
}

impl CollaborativeSession {
    /// Open a session on `base` with `owner` as the first participant.
    pub fn new(base: &ContentVersion, owner: VersionAuthor) -> Self {
        let now = Utc::now();
        Self {
            id: new_id(),
            content_path: base.content_path.clone(),
            base_version_id: base.id,
            participants: vec![Participant {
                user_id: owner.id.clone(),
                name: owner.name.clone(),
                role: ParticipantRole::Owner,
                is_active: true,
                joined_at: now,
            }],
            owner,
            changes: Vec::new(),
            comments: Vec::new(),
            working_copy: base.content.clone(),
            started_at: now,
            last_activity_at: now,
            status: SessionStatus::Active,
            base_content: base.content.clone(),
        }
    }

    pub fn base_content(&self) -> &str {
        &self.base_content
    }

    pub fn is_active(&self) -> bool {
        self.status == SessionStatus::Active
    }

    /// Whether folding the change log altered the base content.
    pub fn has_changes(&self) -> bool {
        !self.changes.is_empty() && self.working_copy != self.base_content
    }

    pub fn participant(&self, user_id: &str) -> Option<&Participant> {
        self.participants.iter().find(|p| p.user_id == user_id)
    }

    pub fn active_participants(&self) -> impl Iterator<Item = &Participant> {
        self.participants.iter().filter(|p| p.is_active)
    }

    /// Idle for longer than `timeout` as of `now`.
    pub fn is_stale(&self, now: Timestamp, timeout: Duration) -> bool {
        now - self.last_activity_at > timeout
    }

    fn ensure_active(&self) -> Result<(), CoreError> {
        if !self.is_active() {
            return Err(CoreError::SessionExpired(format!(
                "Session {} has ended",
                self.id
            )));
        }
        Ok(())
    }

    fn ensure_active_participant(&self, user_id: &str) -> Result<&Participant, CoreError> {
        self.participant(user_id)
            .filter(|p| p.is_active)
            .ok_or_else(|| {
                CoreError::Validation(format!(
                    "'{user_id}' is not an active participant of session {}",
                    self.id
                ))
            })
    }

    fn touch(&mut self) {
        self.last_activity_at = Utc::now();
    }

    /// Add a participant, or re-activate one who left.
    pub fn join(
        &mut self,
        user_id: &str,
        name: &str,
        role: ParticipantRole,
    ) -> Result<&Participant, CoreError> {
        self.ensure_active()?;
        if user_id.trim().is_empty() {
            return Err(CoreError::Validation("Participant id must not be empty".into()));
        }
        if role == ParticipantRole::Owner && user_id != self.owner.id {
            return Err(CoreError::Validation(
                "Only the session owner may join with the owner role".into(),
            ));
        }

        let idx = match self.participants.iter().position(|p| p.user_id == user_id) {
            Some(idx) => {
                let participant = &mut self.participants[idx];
                participant.is_active = true;
                participant.name = name.to_string();
                if participant.role != ParticipantRole::Owner {
                    participant.role = role;
                }
                idx
            }
            None => {
                if self.participants.len() >= MAX_PARTICIPANTS {
                    return Err(CoreError::Validation(format!(
                        "Session {} already has the maximum of {MAX_PARTICIPANTS} participants",
                        self.id
                    )));
                }
                self.participants.push(Participant {
                    user_id: user_id.to_string(),
                    name: name.to_string(),
                    role,
                    is_active: true,
                    joined_at: Utc::now(),
                });
                self.participants.len() - 1
            }
        };
        self.touch();
        Ok(&self.participants[idx])
    }

    /// Mark a participant inactive. Their applied changes stay in the log.
    pub fn leave(&mut self, user_id: &str) -> Result<(), CoreError> {
        self.ensure_active()?;
        let participant = self
            .participants
            .iter_mut()
            .find(|p| p.user_id == user_id)
            .ok_or_else(|| {
                CoreError::Validation(format!("'{user_id}' is not a participant of this session"))
            })?;
        participant.is_active = false;
        self.touch();
        Ok(())
    }

    /// Insert a change into the ordered log and refold the working copy.
    pub fn apply(&mut self, change: LiveChange) -> Result<(), CoreError> {
        self.ensure_active()?;
        let participant = self.ensure_active_participant(&change.author_id)?;
        if !participant.role.can_edit() {
            return Err(CoreError::Validation(format!(
                "'{}' joined as a viewer and cannot edit",
                change.author_id
            )));
        }
        change.operation.validate()?;

        let at = insert_position(&self.changes, &change);
        self.changes.insert(at, change);
        self.working_copy = fold_changes(&self.base_content, &self.changes);
        self.touch();
        Ok(())
    }

    pub fn add_comment(
        &mut self,
        author_id: &str,
        section: Option<String>,
        body: &str,
    ) -> Result<Comment, CoreError> {
        self.ensure_active()?;
        self.ensure_active_participant(author_id)?;
        validate_comment_body(body)?;

        let comment = Comment {
            id: new_id(),
            author_id: author_id.to_string(),
            section,
            body: body.to_string(),
            created_at: Utc::now(),
        };
        self.comments.push(comment.clone());
        self.touch();
        Ok(comment)
    }

    /// Content the pending change log produces on top of `tip`.
    ///
    /// This is the working copy while `tip` is still the session base. Once
    /// the main line has moved, the log is replayed onto `tip`, so sections
    /// the session never touched keep their newer main-line content.
    pub fn content_on(&self, tip: &ContentVersion) -> String {
        if tip.id == self.base_version_id {
            self.working_copy.clone()
        } else {
            fold_changes(&tip.content, &self.changes)
        }
    }

    /// Start applying future changes on top of `version`, which must hold the
    /// current working copy.
    pub fn rebase(&mut self, version: &ContentVersion) {
        self.base_version_id = version.id;
        self.base_content = version.content.clone();
        self.working_copy = version.content.clone();
        self.changes.clear();
    }

    pub fn end(&mut self) {
        self.status = SessionStatus::Ended;
        self.touch();
    }
}

pub fn validate_comment_body(body: &str) -> Result<(), CoreError> {
    if body.trim().is_empty() {
        return Err(CoreError::Validation("Comment must not be empty".into()));
    }
    if body.len() > MAX_COMMENT_LENGTH {
        return Err(CoreError::Validation(format!(
            "Comment must be at most {MAX_COMMENT_LENGTH} characters"
        )));
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Folding
// ---------------------------------------------------------------------------

/// Index at which `change` belongs in a log ordered by `(timestamp, author_id)`.
/// Exact ties keep arrival order.
pub fn insert_position(log: &[LiveChange], change: &LiveChange) -> usize {
    log.partition_point(|c| {
        (c.timestamp, c.author_id.as_str()) <= (change.timestamp, change.author_id.as_str())
    })
}

/// Apply every change in `changes` to `base` in order.
pub fn fold_changes(base: &str, changes: &[LiveChange]) -> String {
    let mut doc = Document::parse(base);
    for change in changes {
        match &change.operation {
            LiveOperation::ReplaceSection { section, content } => {
                let replacement = match doc.get(section) {
                    Some(existing) => existing.with_body(content),
                    None => Section::new(section, DEFAULT_HEADING_LEVEL, content),
                };
                doc.upsert(replacement, None);
            }
            LiveOperation::RemoveSection { section } => {
                doc.remove(section);
            }
            LiveOperation::ReplaceAll { content } => {
                doc = Document::parse(content);
            }
        }
    }
    doc.render()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
