//! Branch operations over a path's history.

use folio_core::branching::{self, CreateBranch};
use folio_core::error::CoreError;
use folio_core::types::EntityId;
use folio_core::version::{ContentVersion, VersionAuthor, VersionBranch};

use crate::version_store::VersionStore;

/// Provides create, commit, merge and abandon for content branches.
pub struct BranchRepo;

impl BranchRepo {
    /// Create a branch rooted at `input.base_version_id`.
    pub async fn create(
        store: &VersionStore,
        path: &str,
        input: CreateBranch,
        author: VersionAuthor,
    ) -> Result<VersionBranch, CoreError> {
        let branch = store
            .write(path, |h| branching::create_branch(h, input, author))
            .await?;
        tracing::info!(
            content_path = path,
            branch_id = %branch.id,
            name = %branch.name,
            base_version_id = %branch.base_version_id,
            "Branch created"
        );
        Ok(branch)
    }

    /// Append a version to an active branch.
    pub async fn commit(
        store: &VersionStore,
        path: &str,
        branch_id: EntityId,
        content: String,
        author: VersionAuthor,
        title: Option<String>,
    ) -> Result<ContentVersion, CoreError> {
        let version = store
            .write(path, |h| {
                branching::commit_to_branch(h, branch_id, content, author, title)
            })
            .await?;
        tracing::info!(
            content_path = path,
            %branch_id,
            version = version.version,
            "Branch commit appended"
        );
        Ok(version)
    }

    /// Merge a branch into the main line. On conflict nothing is written.
    pub async fn merge(
        store: &VersionStore,
        path: &str,
        branch_id: EntityId,
        merged_by: VersionAuthor,
    ) -> Result<(ContentVersion, VersionBranch), CoreError> {
        let result = store
            .write(path, |h| branching::merge_branch(h, branch_id, merged_by))
            .await;
        match &result {
            Ok((version, branch)) => tracing::info!(
                content_path = path,
                %branch_id,
                name = %branch.name,
                version = version.version,
                "Branch merged"
            ),
            Err(CoreError::Conflict { sections, .. }) => tracing::warn!(
                content_path = path,
                %branch_id,
                ?sections,
                "Branch merge conflicted"
            ),
            Err(_) => {}
        }
        result
    }

    pub async fn abandon(
        store: &VersionStore,
        path: &str,
        branch_id: EntityId,
    ) -> Result<VersionBranch, CoreError> {
        let branch = store
            .write(path, |h| branching::abandon_branch(h, branch_id))
            .await?;
        tracing::info!(content_path = path, %branch_id, "Branch abandoned");
        Ok(branch)
    }

    /// All branches of the path in creation order.
    pub async fn list(store: &VersionStore, path: &str) -> Result<Vec<VersionBranch>, CoreError> {
        store.read(path, |h| Ok(h.branches.clone())).await
    }

    pub async fn find_by_id(
        store: &VersionStore,
        path: &str,
        branch_id: EntityId,
    ) -> Result<Option<VersionBranch>, CoreError> {
        store.read(path, |h| Ok(h.branch(branch_id).cloned())).await
    }
}
