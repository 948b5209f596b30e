//! Drafts, publishing, review and rollback.

use folio_core::error::{CoreError, Warning};
use folio_core::publishing::{self, ReviewAction};
use folio_core::types::EntityId;
use folio_core::version::{ContentVersion, VersionAuthor};

use crate::version_store::VersionStore;

/// Provides the status workflow and content-restoring writes for a path.
pub struct PublishRepo;

impl PublishRepo {
    /// Append a main-line draft.
    pub async fn save_draft(
        store: &VersionStore,
        path: &str,
        content: String,
        author: VersionAuthor,
        title: Option<String>,
    ) -> Result<ContentVersion, CoreError> {
        let version = store
            .write(path, |h| publishing::save_draft(h, content, author, title))
            .await?;
        tracing::info!(content_path = path, version = version.version, "Draft saved");
        Ok(version)
    }

    /// Publish a version; the previously published one is archived.
    ///
    /// `author` is who requested the publish; it is logged, not stored.
    pub async fn publish(
        store: &VersionStore,
        path: &str,
        version_id: EntityId,
        author: &VersionAuthor,
    ) -> Result<ContentVersion, CoreError> {
        let version = store
            .write(path, |h| publishing::publish_version(h, version_id))
            .await?;
        tracing::info!(
            content_path = path,
            version = version.version,
            published_by = %author.id,
            "Version published"
        );
        Ok(version)
    }

    pub async fn review(
        store: &VersionStore,
        path: &str,
        version_id: EntityId,
        action: ReviewAction,
    ) -> Result<ContentVersion, CoreError> {
        let version = store
            .write(path, |h| publishing::apply_review(h, version_id, action))
            .await?;
        tracing::info!(
            content_path = path,
            version = version.version,
            action = action.as_str(),
            status = %version.status,
            "Review action applied"
        );
        Ok(version)
    }

    /// Append a draft restoring `version_id`'s content.
    pub async fn rollback(
        store: &VersionStore,
        path: &str,
        version_id: EntityId,
        author: VersionAuthor,
    ) -> Result<(ContentVersion, Option<Warning>), CoreError> {
        let (version, warning) = store
            .write(path, |h| publishing::rollback_to_version(h, version_id, author))
            .await?;
        if warning.is_some() {
            tracing::warn!(content_path = path, %version_id, "Rollback target matches head");
        }
        tracing::info!(
            content_path = path,
            version = version.version,
            %version_id,
            "Rolled back"
        );
        Ok((version, warning))
    }
}
