//! Branch creation, branch commits, and three-way section merge.
//!
//! A branch is rooted at any existing version of the path. Merging compares
//! `base -> branch tip` against `base -> main tip` section by section: edits
//! to disjoint sections combine, a section edited differently on both sides
//! is a conflict and nothing is written. There is no intra-section merge.

use chrono::Utc;
use serde::Serialize;

use crate::diff::{diff_documents, ContentDiff};
use crate::error::CoreError;
use crate::sections::Document;
use crate::types::{new_id, EntityId};
use crate::version::{
    BranchStatus, ChangeRecord, ChangeType, ContentVersion, NewVersion, VersionAuthor,
    VersionBranch, VersionHistory,
};

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

/// Maximum allowed length for a branch name.
pub const MAX_BRANCH_NAME_LENGTH: usize = 100;

/// Maximum allowed length for a branch description.
pub const MAX_BRANCH_DESCRIPTION_LENGTH: usize = 1000;

/// Maximum number of simultaneously active branches per content path.
pub const MAX_ACTIVE_BRANCHES_PER_PATH: usize = 20;

// ---------------------------------------------------------------------------
// Validation
// ---------------------------------------------------------------------------

/// Validate a branch name: must be non-empty, trimmed, and within
/// [`MAX_BRANCH_NAME_LENGTH`].
pub fn validate_branch_name(name: &str) -> Result<(), CoreError> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        return Err(CoreError::Validation(
            "Branch name must not be empty".to_string(),
        ));
    }
    if trimmed.len() != name.len() {
        return Err(CoreError::Validation(
            "Branch name must not have leading or trailing whitespace".to_string(),
        ));
    }
    if name.len() > MAX_BRANCH_NAME_LENGTH {
        return Err(CoreError::Validation(format!(
            "Branch name must not exceed {MAX_BRANCH_NAME_LENGTH} characters, got {}",
            name.len()
        )));
    }
    Ok(())
}

/// Validate a branch description length.
pub fn validate_branch_description(description: &str) -> Result<(), CoreError> {
    if description.len() > MAX_BRANCH_DESCRIPTION_LENGTH {
        return Err(CoreError::Validation(format!(
            "Branch description must not exceed {MAX_BRANCH_DESCRIPTION_LENGTH} characters"
        )));
    }
    Ok(())
}

/// Validate that another active branch fits under [`MAX_ACTIVE_BRANCHES_PER_PATH`].
pub fn validate_branch_count(active_count: usize) -> Result<(), CoreError> {
    if active_count >= MAX_ACTIVE_BRANCHES_PER_PATH {
        return Err(CoreError::Validation(format!(
            "Maximum active branches per path is {MAX_ACTIVE_BRANCHES_PER_PATH}, \
             path already has {active_count}"
        )));
    }
    Ok(())
}

fn ensure_active(branch: &VersionBranch, action: &str) -> Result<(), CoreError> {
    if branch.status != BranchStatus::Active {
        return Err(CoreError::InvalidTransition {
            entity: "VersionBranch",
            from: branch.status.to_string(),
            to: action.to_string(),
        });
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Branch operations
// ---------------------------------------------------------------------------

/// Input for [`create_branch`].
#[derive(Debug, Clone)]
pub struct CreateBranch {
    pub name: String,
    pub description: Option<String>,
    pub base_version_id: EntityId,
}

/// Create an active branch whose first version clones the base version.
pub fn create_branch(
    history: &mut VersionHistory,
    input: CreateBranch,
    author: VersionAuthor,
) -> Result<VersionBranch, CoreError> {
    validate_branch_name(&input.name)?;
    if let Some(description) = &input.description {
        validate_branch_description(description)?;
    }

    let base = history
        .get(input.base_version_id)
        .cloned()
        .ok_or_else(|| {
            CoreError::Validation(format!(
                "Base version {} does not exist in '{}'",
                input.base_version_id, history.content_path
            ))
        })?;

    let active: Vec<&VersionBranch> = history
        .branches
        .iter()
        .filter(|b| b.status == BranchStatus::Active)
        .collect();
    validate_branch_count(active.len())?;
    if active.iter().any(|b| b.name == input.name) {
        return Err(CoreError::Validation(format!(
            "An active branch named '{}' already exists",
            input.name
        )));
    }

    let branch_id = new_id();
    history.branches.push(VersionBranch {
        id: branch_id,
        name: input.name.clone(),
        description: input.description,
        base_version_id: base.id,
        author: author.clone(),
        version_ids: Vec::new(),
        status: BranchStatus::Active,
        created_at: Utc::now(),
        merged_version_id: None,
    });

    let first = NewVersion::draft(base.content.clone(), author)
        .with_parent(base.id)
        .with_title(Some(base.title.clone()))
        .on_branch(branch_id)
        .with_change(ChangeRecord::document(
            ChangeType::Branch,
            format!("Branched '{}' from v{}", input.name, base.version),
        ));
    if let Err(e) = history.append(first) {
        history.branches.retain(|b| b.id != branch_id);
        return Err(e);
    }

    history.require_branch(branch_id).cloned()
}

/// Append a version to an active branch.
pub fn commit_to_branch(
    history: &mut VersionHistory,
    branch_id: EntityId,
    content: String,
    author: VersionAuthor,
    title: Option<String>,
) -> Result<ContentVersion, CoreError> {
    ensure_active(history.require_branch(branch_id)?, "commit")?;
    history.append(
        NewVersion::draft(content, author)
            .with_title(title)
            .on_branch(branch_id),
    )
}

/// Mark an active branch as abandoned.
pub fn abandon_branch(
    history: &mut VersionHistory,
    branch_id: EntityId,
) -> Result<VersionBranch, CoreError> {
    ensure_active(history.require_branch(branch_id)?, BranchStatus::Abandoned.as_str())?;
    let branch = history
        .branch_mut(branch_id)
        .ok_or_else(|| CoreError::not_found("VersionBranch", branch_id))?;
    branch.status = BranchStatus::Abandoned;
    Ok(branch.clone())
}

// ---------------------------------------------------------------------------
// Merge
// ---------------------------------------------------------------------------

/// Result of a successful three-way section merge.
#[derive(Debug, Clone, Serialize)]
pub struct MergePlan {
    pub content: String,
    /// Base to branch tip.
    pub branch_diff: ContentDiff,
    /// Base to main tip.
    pub main_diff: ContentDiff,
}

/// Combine branch edits into the main tip, or report conflicting sections.
///
/// When the main line has not changed since the base the branch tip is taken
/// verbatim. Sections edited identically on both sides are not conflicts.
pub fn plan_merge(base: &str, branch_tip: &str, main_tip: &str) -> Result<MergePlan, Vec<String>> {
    let base_doc = Document::parse(base);
    let branch_doc = Document::parse(branch_tip);
    let main_doc = Document::parse(main_tip);

    let branch_diff = diff_documents(&base_doc, &branch_doc);
    let main_diff = diff_documents(&base_doc, &main_doc);

    if main_diff.is_empty() {
        return Ok(MergePlan {
            content: branch_tip.to_string(),
            branch_diff,
            main_diff,
        });
    }

    let trimmed = |s: &Option<String>| s.as_deref().map(str::trim_end).map(str::to_string);
    let conflicts: Vec<String> = branch_diff
        .sections
        .iter()
        .filter(|b| {
            main_diff
                .section(&b.section)
                .is_some_and(|m| trimmed(&m.new_content) != trimmed(&b.new_content))
        })
        .map(|b| b.section.clone())
        .collect();
    if !conflicts.is_empty() {
        return Err(conflicts);
    }

    let mut merged = main_doc;
    for change in &branch_diff.sections {
        if main_diff.section(&change.section).is_some() {
            continue;
        }
        match branch_doc.get(&change.section) {
            Some(section) => {
                merged.upsert(section.clone(), branch_doc.predecessor(&change.section));
            }
            None => {
                merged.remove(&change.section);
            }
        }
    }

    Ok(MergePlan {
        content: merged.render(),
        branch_diff,
        main_diff,
    })
}

/// Merge an active branch into the main line.
///
/// On conflict returns [`CoreError::Conflict`] and leaves the history untouched.
/// On success appends one main-line draft and marks the branch merged.
pub fn merge_branch(
    history: &mut VersionHistory,
    branch_id: EntityId,
    merged_by: VersionAuthor,
) -> Result<(ContentVersion, VersionBranch), CoreError> {
    let branch = history.require_branch(branch_id)?.clone();
    ensure_active(&branch, BranchStatus::Merged.as_str())?;

    let base = history.require(branch.base_version_id)?;
    let tip_id = branch
        .tip()
        .ok_or_else(|| CoreError::Internal(format!("Branch {branch_id} has no versions")))?;
    let tip = history.require(tip_id)?;
    let main = history.current().ok_or_else(|| {
        CoreError::Internal(format!("'{}' has no main-line version", history.content_path))
    })?;

    let plan = plan_merge(&base.content, &tip.content, &main.content).map_err(|sections| {
        CoreError::Conflict {
            message: format!(
                "Branch '{}' conflicts with the main line in {} section(s)",
                branch.name,
                sections.len()
            ),
            sections,
        }
    })?;

    let record = ChangeRecord::document(
        ChangeType::Merge,
        format!("Merged branch '{}' (v{})", branch.name, tip.version),
    );
    let main_id = main.id;
    let version = history.append(
        NewVersion::draft(plan.content, merged_by)
            .with_parent(main_id)
            .with_change(record),
    )?;

    let branch = history
        .branch_mut(branch_id)
        .ok_or_else(|| CoreError::not_found("VersionBranch", branch_id))?;
    branch.status = BranchStatus::Merged;
    branch.merged_version_id = Some(version.id);
    Ok((version, branch.clone()))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
