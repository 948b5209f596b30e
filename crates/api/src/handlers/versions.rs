//! Handlers for the version ledger: history, drafts, publishing, review,
//! rollback, and diffs.

use axum::extract::{Path, Query, State};
use axum::response::IntoResponse;
use axum::Json;
use serde::{Deserialize, Serialize};

use folio_core::error::Warning;
use folio_core::publishing::ReviewAction;
use folio_core::types::EntityId;
use folio_core::version::{validate_author, ContentVersion, VersionAuthor};
use folio_events::{event_types, ContentEvent};
use folio_store::PublishRepo;

use crate::error::AppResult;
use crate::query::{DiffParams, PathParams};
use crate::response::{created, DataResponse};
use crate::state::AppState;

// ---------------------------------------------------------------------------
// Request / response bodies
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
pub struct SaveDraftRequest {
    pub content: String,
    pub author: VersionAuthor,
    pub title: Option<String>,
}

/// Body for operations that only need to know who acted.
#[derive(Debug, Deserialize)]
pub struct AuthorRequest {
    pub author: VersionAuthor,
}

#[derive(Debug, Deserialize)]
pub struct ReviewRequest {
    pub action: ReviewAction,
    pub author: VersionAuthor,
}

#[derive(Debug, Serialize)]
pub struct RollbackResponse {
    pub version: ContentVersion,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub warning: Option<Warning>,
}

fn version_event(event_type: &str, version: &ContentVersion, actor: &VersionAuthor) -> ContentEvent {
    ContentEvent::new(event_type)
        .for_path(&version.content_path)
        .with_source("version", version.id)
        .with_actor(&actor.id)
        .with_payload(serde_json::json!({
            "version": version.version,
            "status": version.status,
        }))
}

// ---------------------------------------------------------------------------
// GET /content/history?path=
// ---------------------------------------------------------------------------

/// Full version history of a path, seeding it from the content source on
/// first access.
pub async fn get_history(
    State(state): State<AppState>,
    Query(params): Query<PathParams>,
) -> AppResult<impl IntoResponse> {
    let history = state.store.get_or_init_history(&params.path).await?;
    tracing::debug!(
        content_path = %params.path,
        versions = history.versions.len(),
        "Fetched version history"
    );
    Ok(Json(DataResponse { data: history }))
}

// ---------------------------------------------------------------------------
// GET /content/versions/{id}?path=
// ---------------------------------------------------------------------------

pub async fn get_version(
    State(state): State<AppState>,
    Path(id): Path<EntityId>,
    Query(params): Query<PathParams>,
) -> AppResult<impl IntoResponse> {
    let version = state.store.get_version(&params.path, id).await?;
    Ok(Json(DataResponse { data: version }))
}

// ---------------------------------------------------------------------------
// POST /content/versions?path=
// ---------------------------------------------------------------------------

/// Save a main-line draft.
pub async fn save_draft(
    State(state): State<AppState>,
    Query(params): Query<PathParams>,
    Json(body): Json<SaveDraftRequest>,
) -> AppResult<impl IntoResponse> {
    validate_author(&body.author)?;
    let version = PublishRepo::save_draft(
        &state.store,
        &params.path,
        body.content,
        body.author.clone(),
        body.title,
    )
    .await?;

    state.publish(version_event(event_types::VERSION_CREATED, &version, &body.author));

    Ok(created(version))
}

// ---------------------------------------------------------------------------
// POST /content/versions/{id}/publish?path=
// ---------------------------------------------------------------------------

pub async fn publish_version(
    State(state): State<AppState>,
    Path(id): Path<EntityId>,
    Query(params): Query<PathParams>,
    Json(body): Json<AuthorRequest>,
) -> AppResult<impl IntoResponse> {
    validate_author(&body.author)?;
    let version = PublishRepo::publish(&state.store, &params.path, id, &body.author).await?;

    state.publish(version_event(event_types::VERSION_PUBLISHED, &version, &body.author));

    Ok(Json(DataResponse { data: version }))
}

// ---------------------------------------------------------------------------
// POST /content/versions/{id}/review?path=
// ---------------------------------------------------------------------------

/// Apply `submit`, `approve` or `reject`.
pub async fn review_version(
    State(state): State<AppState>,
    Path(id): Path<EntityId>,
    Query(params): Query<PathParams>,
    Json(body): Json<ReviewRequest>,
) -> AppResult<impl IntoResponse> {
    validate_author(&body.author)?;
    let version = PublishRepo::review(&state.store, &params.path, id, body.action).await?;

    state.publish(
        version_event(event_types::VERSION_REVIEWED, &version, &body.author).with_payload(
            serde_json::json!({
                "version": version.version,
                "action": body.action,
                "status": version.status,
            }),
        ),
    );

    Ok(Json(DataResponse { data: version }))
}

// ---------------------------------------------------------------------------
// POST /content/versions/{id}/rollback?path=
// ---------------------------------------------------------------------------

/// Append a draft restoring version `id`. A `warning` accompanies the
/// result when the content already matched the head.
pub async fn rollback_version(
    State(state): State<AppState>,
    Path(id): Path<EntityId>,
    Query(params): Query<PathParams>,
    Json(body): Json<AuthorRequest>,
) -> AppResult<impl IntoResponse> {
    validate_author(&body.author)?;
    let (version, warning) =
        PublishRepo::rollback(&state.store, &params.path, id, body.author.clone()).await?;

    state.publish(
        version_event(event_types::VERSION_ROLLED_BACK, &version, &body.author).with_payload(
            serde_json::json!({
                "version": version.version,
                "target_version_id": id,
                "no_op": warning.is_some(),
            }),
        ),
    );

    Ok(created(RollbackResponse { version, warning }))
}

// ---------------------------------------------------------------------------
// GET /content/diff?path=&from=&to=
// ---------------------------------------------------------------------------

pub async fn get_diff(
    State(state): State<AppState>,
    Query(params): Query<DiffParams>,
) -> AppResult<impl IntoResponse> {
    let diff = state
        .store
        .generate_diff(&params.path, params.from, params.to)
        .await?;
    tracing::debug!(
        content_path = %params.path,
        from = diff.from_number,
        to = diff.to_number,
        sections = diff.sections.len(),
        "Generated diff"
    );
    Ok(Json(DataResponse { data: diff }))
}
