//! Handlers for content branches.

use axum::extract::{Path, Query, State};
use axum::response::IntoResponse;
use axum::Json;
use serde::{Deserialize, Serialize};

use folio_core::branching::CreateBranch;
use folio_core::error::CoreError;
use folio_core::types::EntityId;
use folio_core::version::{validate_author, ContentVersion, VersionAuthor, VersionBranch};
use folio_events::{event_types, ContentEvent};
use folio_store::BranchRepo;

use crate::error::AppResult;
use crate::handlers::versions::{AuthorRequest, SaveDraftRequest};
use crate::query::PathParams;
use crate::response::{created, DataResponse};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct CreateBranchRequest {
    pub name: String,
    pub description: Option<String>,
    pub base_version_id: EntityId,
    pub author: VersionAuthor,
}

#[derive(Debug, Serialize)]
pub struct MergeResponse {
    pub version: ContentVersion,
    pub branch: VersionBranch,
}

fn branch_event(event_type: &str, path: &str, branch_id: EntityId, actor: &str) -> ContentEvent {
    ContentEvent::new(event_type)
        .for_path(path)
        .with_source("branch", branch_id)
        .with_actor(actor)
}

/// GET /content/branches?path=
pub async fn list_branches(
    State(state): State<AppState>,
    Query(params): Query<PathParams>,
) -> AppResult<impl IntoResponse> {
    let branches = BranchRepo::list(&state.store, &params.path).await?;
    Ok(Json(DataResponse { data: branches }))
}

/// GET /content/branches/{id}?path=
pub async fn get_branch(
    State(state): State<AppState>,
    Path(branch_id): Path<EntityId>,
    Query(params): Query<PathParams>,
) -> AppResult<impl IntoResponse> {
    let branch = BranchRepo::find_by_id(&state.store, &params.path, branch_id)
        .await?
        .ok_or_else(|| CoreError::not_found("VersionBranch", branch_id))?;
    Ok(Json(DataResponse { data: branch }))
}

/// POST /content/branches?path=
pub async fn create_branch(
    State(state): State<AppState>,
    Query(params): Query<PathParams>,
    Json(body): Json<CreateBranchRequest>,
) -> AppResult<impl IntoResponse> {
    validate_author(&body.author)?;
    let input = CreateBranch {
        name: body.name,
        description: body.description,
        base_version_id: body.base_version_id,
    };
    let branch = BranchRepo::create(&state.store, &params.path, input, body.author.clone()).await?;

    state.publish(
        branch_event(event_types::BRANCH_CREATED, &params.path, branch.id, &body.author.id)
            .with_payload(serde_json::json!({
                "name": branch.name,
                "base_version_id": branch.base_version_id,
            })),
    );

    Ok(created(branch))
}

/// POST /content/branches/{id}/commits?path=
pub async fn commit_to_branch(
    State(state): State<AppState>,
    Path(branch_id): Path<EntityId>,
    Query(params): Query<PathParams>,
    Json(body): Json<SaveDraftRequest>,
) -> AppResult<impl IntoResponse> {
    validate_author(&body.author)?;
    let version = BranchRepo::commit(
        &state.store,
        &params.path,
        branch_id,
        body.content,
        body.author.clone(),
        body.title,
    )
    .await?;

    state.publish(
        branch_event(event_types::BRANCH_COMMITTED, &params.path, branch_id, &body.author.id)
            .with_payload(serde_json::json!({
                "version_id": version.id,
                "version": version.version,
            })),
    );

    Ok(created(version))
}

/// POST /content/branches/{id}/merge?path=
///
/// Conflicts surface as `409 MERGE_CONFLICT` with the conflicting sections
/// listed; the history is left untouched.
pub async fn merge_branch(
    State(state): State<AppState>,
    Path(branch_id): Path<EntityId>,
    Query(params): Query<PathParams>,
    Json(body): Json<AuthorRequest>,
) -> AppResult<impl IntoResponse> {
    validate_author(&body.author)?;
    let result = BranchRepo::merge(&state.store, &params.path, branch_id, body.author.clone()).await;

    let (version, branch) = match result {
        Ok(merged) => merged,
        Err(CoreError::Conflict { message, sections }) => {
            state.publish(
                branch_event(
                    event_types::BRANCH_MERGE_CONFLICTED,
                    &params.path,
                    branch_id,
                    &body.author.id,
                )
                .with_payload(serde_json::json!({ "sections": sections })),
            );
            return Err(CoreError::Conflict { message, sections }.into());
        }
        Err(e) => return Err(e.into()),
    };

    state.publish(
        branch_event(event_types::BRANCH_MERGED, &params.path, branch_id, &body.author.id)
            .with_payload(serde_json::json!({
                "name": branch.name,
                "merged_version_id": version.id,
                "version": version.version,
            })),
    );

    Ok(Json(DataResponse {
        data: MergeResponse { version, branch },
    }))
}

/// POST /content/branches/{id}/abandon?path=
pub async fn abandon_branch(
    State(state): State<AppState>,
    Path(branch_id): Path<EntityId>,
    Query(params): Query<PathParams>,
    Json(body): Json<AuthorRequest>,
) -> AppResult<impl IntoResponse> {
    validate_author(&body.author)?;
    let branch = BranchRepo::abandon(&state.store, &params.path, branch_id).await?;

    state.publish(branch_event(
        event_types::BRANCH_ABANDONED,
        &params.path,
        branch_id,
        &body.author.id,
    ));

    Ok(Json(DataResponse { data: branch }))
}
