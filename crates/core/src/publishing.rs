//! Publish, review, rollback, and draft operations over a [`VersionHistory`].
//!
//! Each function validates everything before mutating, so a failed call
//! leaves the history exactly as it was.

use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::error::{CoreError, Warning};
use crate::types::EntityId;
use crate::version::{
    ChangeRecord, ChangeType, ContentVersion, NewVersion, VersionAuthor, VersionHistory,
    VersionStatus,
};

// ---------------------------------------------------------------------------
// Review workflow
// ---------------------------------------------------------------------------

/// A review step applied to a main-line version.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReviewAction {
    Submit,
    Approve,
    Reject,
}

impl ReviewAction {
    /// Status the version moves to.
    pub fn target(&self) -> VersionStatus {
        match self {
            Self::Submit => VersionStatus::PendingReview,
            Self::Approve => VersionStatus::Approved,
            Self::Reject => VersionStatus::Archived,
        }
    }

    /// Whether the action may be applied to a version in `from`.
    pub fn allowed_from(&self, from: VersionStatus) -> bool {
        match self {
            Self::Submit => from == VersionStatus::Draft,
            Self::Approve => from == VersionStatus::PendingReview,
            Self::Reject => matches!(from, VersionStatus::PendingReview | VersionStatus::Approved),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Submit => "submit",
            Self::Approve => "approve",
            Self::Reject => "reject",
        }
    }
}

fn main_line_version<'a>(
    history: &'a VersionHistory,
    version_id: EntityId,
    target: VersionStatus,
) -> Result<&'a ContentVersion, CoreError> {
    let version = history.require(version_id)?;
    if !version.is_main_line() {
        return Err(CoreError::InvalidTransition {
            entity: "ContentVersion",
            from: "branch".to_string(),
            to: target.to_string(),
        });
    }
    Ok(version)
}

/// Apply a review step (`submit`, `approve`, `reject`) to a main-line version.
pub fn apply_review(
    history: &mut VersionHistory,
    version_id: EntityId,
    action: ReviewAction,
) -> Result<ContentVersion, CoreError> {
    let target = action.target();
    let version = main_line_version(history, version_id, target)?;
    if !action.allowed_from(version.status) {
        return Err(CoreError::InvalidTransition {
            entity: "ContentVersion",
            from: version.status.to_string(),
            to: target.to_string(),
        });
    }

    let version = history
        .get_mut(version_id)
        .ok_or_else(|| CoreError::not_found("ContentVersion", version_id))?;
    version.status = target;
    Ok(version.clone())
}

// ---------------------------------------------------------------------------
// Publish
// ---------------------------------------------------------------------------

/// Publish a main-line version, archiving the previously published one.
///
/// Only `status` and `published_at` change; content is never touched.
pub fn publish_version(
    history: &mut VersionHistory,
    version_id: EntityId,
) -> Result<ContentVersion, CoreError> {
    let version = main_line_version(history, version_id, VersionStatus::Published)?;
    if !version.status.is_publishable() {
        return Err(CoreError::InvalidTransition {
            entity: "ContentVersion",
            from: version.status.to_string(),
            to: VersionStatus::Published.to_string(),
        });
    }

    history.archive_published();
    let version = history
        .get_mut(version_id)
        .ok_or_else(|| CoreError::not_found("ContentVersion", version_id))?;
    version.status = VersionStatus::Published;
    version.published_at = Some(Utc::now());
    let published = version.clone();
    history.published_version_id = Some(version_id);
    Ok(published)
}

// ---------------------------------------------------------------------------
// Rollback and drafts
// ---------------------------------------------------------------------------

/// Append a main-line draft that restores the content of `version_id`.
///
/// Rolling back to content identical to the current tip still appends and
/// returns a [`Warning::NoOp`].
pub fn rollback_to_version(
    history: &mut VersionHistory,
    version_id: EntityId,
    author: VersionAuthor,
) -> Result<(ContentVersion, Option<Warning>), CoreError> {
    let target = history.require(version_id)?;
    let warning = history
        .current()
        .filter(|head| head.content == target.content)
        .map(|head| Warning::NoOp {
            message: format!(
                "v{} already has the content of v{}; an identical draft was appended",
                head.version, target.version
            ),
        });

    let input = NewVersion::draft(target.content.clone(), author)
        .with_title(Some(target.title.clone()))
        .with_change(ChangeRecord::document(
            ChangeType::Rollback,
            format!("Rolled back to v{}", target.version),
        ));
    let version = history.append(input)?;
    Ok((version, warning))
}

/// Append a main-line draft with new content.
pub fn save_draft(
    history: &mut VersionHistory,
    content: String,
    author: VersionAuthor,
    title: Option<String>,
) -> Result<ContentVersion, CoreError> {
    history.append(NewVersion::draft(content, author).with_title(title))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::branching::{create_branch, CreateBranch};
    use crate::version::tests::author;

    fn seeded() -> (VersionHistory, ContentVersion) {
        let mut history = VersionHistory::new("architecture/overview");
        let v1 = save_draft(
            &mut history,
            "# Overview\nIntro paragraph.\n".into(),
            author("a"),
            None,
        )
        .unwrap();
        (history, v1)
    }

    fn published_count(history: &VersionHistory) -> usize {
        history
            .versions
            .iter()
            .filter(|v| v.status == VersionStatus::Published)
            .count()
    }

    #[test]
    fn publish_sets_status_and_pointer() {
        let (mut history, v1) = seeded();
        let published = publish_version(&mut history, v1.id).unwrap();
        assert_eq!(published.status, VersionStatus::Published);
        assert!(published.published_at.is_some());
        assert_eq!(published.content, v1.content);
        assert_eq!(history.published_version_id, Some(v1.id));
        assert_eq!(history.versions.len(), 1, "publishing must not append");
    }

    #[test]
    fn publish_archives_previous() {
        let (mut history, v1) = seeded();
        publish_version(&mut history, v1.id).unwrap();
        let v2 = save_draft(&mut history, "# Overview\nNew.\n".into(), author("a"), None).unwrap();
        publish_version(&mut history, v2.id).unwrap();
        assert_eq!(history.get(v1.id).unwrap().status, VersionStatus::Archived);
        assert_eq!(published_count(&history), 1);
    }

    #[test]
    fn publishing_archived_or_published_is_rejected() {
        let (mut history, v1) = seeded();
        publish_version(&mut history, v1.id).unwrap();
        let before = history.clone();
        assert!(matches!(
            publish_version(&mut history, v1.id),
            Err(CoreError::InvalidTransition { .. })
        ));
        let v2 = save_draft(&mut history, "x".into(), author("a"), None).unwrap();
        publish_version(&mut history, v2.id).unwrap();
        assert!(matches!(
            publish_version(&mut history, v1.id),
            Err(CoreError::InvalidTransition { .. })
        ));
        assert_eq!(before.published_version_id, Some(v1.id));
    }

    #[test]
    fn branch_versions_cannot_be_published() {
        let (mut history, v1) = seeded();
        let branch = create_branch(
            &mut history,
            CreateBranch {
                name: "feature".into(),
                description: None,
                base_version_id: v1.id,
            },
            author("b"),
        )
        .unwrap();
        let tip = branch.tip().unwrap();
        assert!(matches!(
            publish_version(&mut history, tip),
            Err(CoreError::InvalidTransition { .. })
        ));
        assert_eq!(history.published_version_id, None);
    }

    #[test]
    fn publish_unknown_version_is_not_found() {
        let (mut history, _) = seeded();
        assert!(matches!(
            publish_version(&mut history, crate::types::new_id()),
            Err(CoreError::NotFound { .. })
        ));
    }

    #[test]
    fn review_transitions() {
        let (mut history, v1) = seeded();
        let submitted = apply_review(&mut history, v1.id, ReviewAction::Submit).unwrap();
        assert_eq!(submitted.status, VersionStatus::PendingReview);
        assert!(apply_review(&mut history, v1.id, ReviewAction::Submit).is_err());
        let approved = apply_review(&mut history, v1.id, ReviewAction::Approve).unwrap();
        assert_eq!(approved.status, VersionStatus::Approved);
        let rejected = apply_review(&mut history, v1.id, ReviewAction::Reject).unwrap();
        assert_eq!(rejected.status, VersionStatus::Archived);
        assert!(rejected.published_at.is_none());
        assert!(apply_review(&mut history, v1.id, ReviewAction::Approve).is_err());
    }

    #[test]
    fn approve_requires_pending_review() {
        let (mut history, v1) = seeded();
        assert!(matches!(
            apply_review(&mut history, v1.id, ReviewAction::Approve),
            Err(CoreError::InvalidTransition { .. })
        ));
    }

    #[test]
    fn rollback_appends_copy_of_target() {
        let (mut history, v1) = seeded();
        save_draft(&mut history, "# Overview\nChanged.\n".into(), author("a"), None).unwrap();
        let (v3, warning) = rollback_to_version(&mut history, v1.id, author("b")).unwrap();
        assert!(warning.is_none());
        assert_eq!(v3.content, v1.content);
        assert_ne!(v3.id, v1.id);
        assert_eq!(v3.version, 3);
        assert_eq!(v3.status, VersionStatus::Draft);
        assert_eq!(v3.changes[0].change_type, ChangeType::Rollback);
        assert_eq!(v3.changes[0].description, "Rolled back to v1");
        assert_eq!(history.current_version_id, Some(v3.id));
    }

    #[test]
    fn rollback_to_head_warns_but_appends() {
        let (mut history, v1) = seeded();
        let (v2, warning) = rollback_to_version(&mut history, v1.id, author("a")).unwrap();
        assert!(matches!(warning, Some(Warning::NoOp { .. })));
        assert_eq!(v2.version, 2);
        assert_eq!(v2.changes.len(), 1, "identical content adds no section records");
    }
}
