//! Version ledger models and the append primitive.
//!
//! A [`VersionHistory`] owns every [`ContentVersion`] and [`VersionBranch`]
//! of one content path. Versions are never removed and their content never
//! changes; only `status` (and `published_at`) move through the review and
//! publish workflow. [`VersionHistory::append`] is the single way new
//! versions enter the ledger.

use chrono::Utc;
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::content;
use crate::diff::{change_records_from_diff, diff_contents};
use crate::error::CoreError;
use crate::types::{new_id, EntityId, Timestamp};

// ---------------------------------------------------------------------------
// Author
// ---------------------------------------------------------------------------

/// Identity of whoever performed an operation. Supplied and vouched for by
/// the caller; the engine does not authenticate it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Validate)]
pub struct VersionAuthor {
    #[validate(length(min = 1, max = 128))]
    pub id: String,
    #[validate(length(min = 1, max = 200))]
    pub name: String,
    #[validate(email)]
    pub email: String,
    #[serde(default)]
    pub role: String,
    #[serde(default)]
    pub expertise: Vec<String>,
}

impl VersionAuthor {
    /// Author attributed to versions seeded from the content source.
    pub fn system() -> Self {
        Self {
            id: "system".to_string(),
            name: "Folio".to_string(),
            email: "system@folio.local".to_string(),
            role: "system".to_string(),
            expertise: Vec::new(),
        }
    }
}

/// Validate an author, flattening `validator` errors into [`CoreError::Validation`].
pub fn validate_author(author: &VersionAuthor) -> Result<(), CoreError> {
    author
        .validate()
        .map_err(|e| CoreError::Validation(format!("Invalid author: {e}")))
}

// ---------------------------------------------------------------------------
// Status
// ---------------------------------------------------------------------------

/// Lifecycle state of a version.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VersionStatus {
    Draft,
    PendingReview,
    Approved,
    Published,
    Archived,
}

impl VersionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Draft => "draft",
            Self::PendingReview => "pending_review",
            Self::Approved => "approved",
            Self::Published => "published",
            Self::Archived => "archived",
        }
    }

    /// Whether a version in this state may be published.
    pub fn is_publishable(&self) -> bool {
        matches!(self, Self::Draft | Self::PendingReview | Self::Approved)
    }
}

impl std::fmt::Display for VersionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Change records
// ---------------------------------------------------------------------------

/// Category of a [`ChangeRecord`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChangeType {
    Initial,
    Addition,
    Deletion,
    Modification,
    Rollback,
    Branch,
    Merge,
    Publish,
    Session,
}

/// Human-readable summary of one difference from the parent version.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangeRecord {
    pub description: String,
    /// Section key the change applies to; empty for whole-document records.
    pub section_path: String,
    #[serde(rename = "type")]
    pub change_type: ChangeType,
}

impl ChangeRecord {
    /// A record that applies to the whole document rather than one section.
    pub fn document(change_type: ChangeType, description: impl Into<String>) -> Self {
        Self {
            description: description.into(),
            section_path: String::new(),
            change_type,
        }
    }
}

// ---------------------------------------------------------------------------
// Versions
// ---------------------------------------------------------------------------

/// One immutable snapshot of a content item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContentVersion {
    pub id: EntityId,
    pub content_path: String,
    /// Strictly increasing per content path, shared by main line and branches.
    pub version: i64,
    pub title: String,
    pub content: String,
    pub status: VersionStatus,
    pub author: VersionAuthor,
    pub timestamp: Timestamp,
    pub changes: Vec<ChangeRecord>,
    pub parent_version_id: Option<EntityId>,
    /// Owning branch; `None` for main-line versions.
    pub branch_id: Option<EntityId>,
    /// When this version was published, if it ever was.
    pub published_at: Option<Timestamp>,
}

impl ContentVersion {
    pub fn is_main_line(&self) -> bool {
        self.branch_id.is_none()
    }
}

/// Input for [`VersionHistory::append`].
#[derive(Debug, Clone)]
pub struct NewVersion {
    pub content: String,
    pub author: VersionAuthor,
    pub status: VersionStatus,
    /// Defaults to the branch tip for branch appends, the main tip otherwise.
    pub parent_version_id: Option<EntityId>,
    /// Defaults to the first heading, then the parent's title, then the path.
    pub title: Option<String>,
    /// Leading records; section records against the parent are appended.
    pub changes: Vec<ChangeRecord>,
    pub branch_id: Option<EntityId>,
}

impl NewVersion {
    pub fn draft(content: impl Into<String>, author: VersionAuthor) -> Self {
        Self {
            content: content.into(),
            author,
            status: VersionStatus::Draft,
            parent_version_id: None,
            title: None,
            changes: Vec::new(),
            branch_id: None,
        }
    }

    pub fn with_status(mut self, status: VersionStatus) -> Self {
        self.status = status;
        self
    }

    pub fn with_parent(mut self, parent: EntityId) -> Self {
        self.parent_version_id = Some(parent);
        self
    }

    pub fn with_title(mut self, title: Option<String>) -> Self {
        self.title = title;
        self
    }

    pub fn with_change(mut self, record: ChangeRecord) -> Self {
        self.changes.push(record);
        self
    }

    pub fn on_branch(mut self, branch_id: EntityId) -> Self {
        self.branch_id = Some(branch_id);
        self
    }
}

// ---------------------------------------------------------------------------
// Branches
// ---------------------------------------------------------------------------

/// Lifecycle state of a branch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BranchStatus {
    Active,
    Merged,
    Abandoned,
}

impl BranchStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Merged => "merged",
            Self::Abandoned => "abandoned",
        }
    }
}

impl std::fmt::Display for BranchStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A named line of versions diverging from a base version.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VersionBranch {
    pub id: EntityId,
    pub name: String,
    pub description: Option<String>,
    pub base_version_id: EntityId,
    pub author: VersionAuthor,
    /// Branch versions in creation order; the last one is the tip.
    pub version_ids: Vec<EntityId>,
    pub status: BranchStatus,
    pub created_at: Timestamp,
    /// Main-line version produced by merging this branch.
    pub merged_version_id: Option<EntityId>,
}

impl VersionBranch {
    pub fn tip(&self) -> Option<EntityId> {
        self.version_ids.last().copied()
    }
}

// ---------------------------------------------------------------------------
// History
// ---------------------------------------------------------------------------

/// Every version and branch of one content path.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VersionHistory {
    pub content_path: String,
    /// Ordered by version number.
    pub versions: Vec<ContentVersion>,
    pub branches: Vec<VersionBranch>,
    /// Tip of the main line.
    pub current_version_id: Option<EntityId>,
    pub published_version_id: Option<EntityId>,
}

impl VersionHistory {
    pub fn new(content_path: impl Into<String>) -> Self {
        Self {
            content_path: content_path.into(),
            versions: Vec::new(),
            branches: Vec::new(),
            current_version_id: None,
            published_version_id: None,
        }
    }

    pub fn get(&self, id: EntityId) -> Option<&ContentVersion> {
        self.versions.iter().find(|v| v.id == id)
    }

    /// Look up a version, failing with [`CoreError::NotFound`].
    pub fn require(&self, id: EntityId) -> Result<&ContentVersion, CoreError> {
        self.get(id).ok_or_else(|| CoreError::not_found("ContentVersion", id))
    }

    pub(crate) fn get_mut(&mut self, id: EntityId) -> Option<&mut ContentVersion> {
        self.versions.iter_mut().find(|v| v.id == id)
    }

    /// Tip of the main line.
    pub fn current(&self) -> Option<&ContentVersion> {
        self.current_version_id.and_then(|id| self.get(id))
    }

    pub fn published(&self) -> Option<&ContentVersion> {
        self.published_version_id.and_then(|id| self.get(id))
    }

    /// Highest allocated version number, `0` for an empty history.
    pub fn latest_number(&self) -> i64 {
        self.versions.last().map(|v| v.version).unwrap_or(0)
    }

    pub fn branch(&self, id: EntityId) -> Option<&VersionBranch> {
        self.branches.iter().find(|b| b.id == id)
    }

    /// Look up a branch, failing with [`CoreError::NotFound`].
    pub fn require_branch(&self, id: EntityId) -> Result<&VersionBranch, CoreError> {
        self.branch(id)
            .ok_or_else(|| CoreError::not_found("VersionBranch", id))
    }

    pub(crate) fn branch_mut(&mut self, id: EntityId) -> Option<&mut VersionBranch> {
        self.branches.iter_mut().find(|b| b.id == id)
    }

    /// Main-line versions in version order.
    pub fn main_line(&self) -> impl Iterator<Item = &ContentVersion> {
        self.versions.iter().filter(|v| v.is_main_line())
    }

    /// Append a new version, allocating the next version number.
    ///
    /// Nothing is modified when validation fails. Main-line appends move
    /// `current_version_id`; a `Published` append archives the previously
    /// published version.
    pub fn append(&mut self, input: NewVersion) -> Result<ContentVersion, CoreError> {
        content::validate_content(&input.content)?;
        if let Some(title) = &input.title {
            content::validate_title(title)?;
        }

        let parent_id = match (input.parent_version_id, input.branch_id) {
            (Some(id), _) => Some(self.require(id)?.id),
            (None, Some(branch_id)) => self.require_branch(branch_id)?.tip(),
            (None, None) => self.current_version_id,
        };
        if let Some(branch_id) = input.branch_id {
            self.require_branch(branch_id)?;
            if input.status == VersionStatus::Published {
                return Err(CoreError::InvalidTransition {
                    entity: "ContentVersion",
                    from: "branch".to_string(),
                    to: VersionStatus::Published.to_string(),
                });
            }
        }

        let parent = parent_id.and_then(|id| self.get(id));
        let title = input
            .title
            .or_else(|| content::first_heading(&input.content))
            .or_else(|| parent.map(|p| p.title.clone()))
            .unwrap_or_else(|| self.content_path.clone());

        let mut changes = input.changes;
        match parent {
            Some(parent) => {
                changes.extend(change_records_from_diff(&diff_contents(
                    &parent.content,
                    &input.content,
                )));
            }
            None if changes.is_empty() => {
                changes.push(ChangeRecord::document(ChangeType::Initial, "Initial version"));
            }
            None => {}
        }

        let now = Utc::now();
        let published = input.status == VersionStatus::Published;
        let version = ContentVersion {
            id: new_id(),
            content_path: self.content_path.clone(),
            version: self.latest_number() + 1,
            title,
            content: input.content,
            status: input.status,
            author: input.author,
            timestamp: now,
            changes,
            parent_version_id: parent_id,
            branch_id: input.branch_id,
            published_at: published.then_some(now),
        };

        if published {
            self.archive_published();
            self.published_version_id = Some(version.id);
        }
        match input.branch_id {
            Some(branch_id) => {
                if let Some(branch) = self.branch_mut(branch_id) {
                    branch.version_ids.push(version.id);
                }
            }
            None => self.current_version_id = Some(version.id),
        }
        self.versions.push(version.clone());
        Ok(version)
    }

    /// Archive the currently published version, if any.
    pub(crate) fn archive_published(&mut self) {
        if let Some(previous) = self.published_version_id.take() {
            if let Some(v) = self.get_mut(previous) {
                v.status = VersionStatus::Archived;
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
