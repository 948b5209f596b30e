//! Handlers for collaborative editing sessions.
//!
//! Sessions are addressed by id once started. Participant identity in
//! request bodies is taken at face value; the engine does not authenticate.

use axum::extract::{Path, Query, State};
use axum::response::IntoResponse;
use axum::Json;
use chrono::Utc;
use serde::Deserialize;

use folio_core::collaboration::{
    CollaborativeSession, EndMode, LiveChange, LiveOperation, ParticipantRole,
};
use folio_core::types::{EntityId, Timestamp};
use folio_core::version::validate_author;
use folio_events::{event_types, ContentEvent};
use folio_store::SessionOutcome;

use crate::error::AppResult;
use crate::handlers::versions::AuthorRequest;
use crate::query::{OptionalPathParams, PathParams};
use crate::response::{created, DataResponse};
use crate::state::AppState;

// ---------------------------------------------------------------------------
// Request bodies
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
pub struct JoinRequest {
    pub user_id: String,
    pub name: String,
    #[serde(default = "default_role")]
    pub role: ParticipantRole,
}

fn default_role() -> ParticipantRole {
    ParticipantRole::Editor
}

#[derive(Debug, Deserialize)]
pub struct LeaveRequest {
    pub user_id: String,
}

/// A live edit. `timestamp` defaults to the time the server received it.
#[derive(Debug, Deserialize)]
pub struct ChangeRequest {
    pub author_id: String,
    pub timestamp: Option<Timestamp>,
    pub operation: LiveOperation,
}

#[derive(Debug, Deserialize)]
pub struct CommentRequest {
    pub author_id: String,
    pub section: Option<String>,
    pub body: String,
}

#[derive(Debug, Deserialize)]
pub struct EndRequest {
    pub mode: EndMode,
}

fn session_event(event_type: &str, session: &CollaborativeSession) -> ContentEvent {
    ContentEvent::new(event_type)
        .for_path(&session.content_path)
        .with_source("session", session.id)
}

// ---------------------------------------------------------------------------
// Queries
// ---------------------------------------------------------------------------

/// GET /sessions?path=
pub async fn list_sessions(
    State(state): State<AppState>,
    Query(params): Query<OptionalPathParams>,
) -> AppResult<impl IntoResponse> {
    let sessions = state.sessions.list(params.path.as_deref()).await;
    Ok(Json(DataResponse { data: sessions }))
}

/// GET /sessions/{id}
pub async fn get_session(
    State(state): State<AppState>,
    Path(id): Path<EntityId>,
) -> AppResult<impl IntoResponse> {
    let session = state.sessions.get(id).await?;
    Ok(Json(DataResponse { data: session }))
}

// ---------------------------------------------------------------------------
// Lifecycle
// ---------------------------------------------------------------------------

/// POST /sessions?path=
///
/// Opens a session on the path's current main-line tip with the requesting
/// author as owner.
pub async fn start_session(
    State(state): State<AppState>,
    Query(params): Query<PathParams>,
    Json(body): Json<AuthorRequest>,
) -> AppResult<impl IntoResponse> {
    validate_author(&body.author)?;
    let session = state.sessions.start(&params.path, body.author).await?;

    state.publish(
        session_event(event_types::SESSION_STARTED, &session)
            .with_actor(&session.owner.id)
            .with_payload(serde_json::json!({
                "base_version_id": session.base_version_id,
            })),
    );

    Ok(created(session))
}

/// POST /sessions/{id}/join
pub async fn join_session(
    State(state): State<AppState>,
    Path(id): Path<EntityId>,
    Json(body): Json<JoinRequest>,
) -> AppResult<impl IntoResponse> {
    let session = state
        .sessions
        .join(id, &body.user_id, &body.name, body.role)
        .await?;

    state.publish(
        session_event(event_types::SESSION_JOINED, &session)
            .with_actor(&body.user_id)
            .with_payload(serde_json::json!({ "role": body.role })),
    );

    Ok(Json(DataResponse { data: session }))
}

/// POST /sessions/{id}/leave
pub async fn leave_session(
    State(state): State<AppState>,
    Path(id): Path<EntityId>,
    Json(body): Json<LeaveRequest>,
) -> AppResult<impl IntoResponse> {
    let session = state.sessions.leave(id, &body.user_id).await?;

    state.publish(session_event(event_types::SESSION_LEFT, &session).with_actor(&body.user_id));

    Ok(Json(DataResponse { data: session }))
}

/// POST /sessions/{id}/changes
pub async fn apply_change(
    State(state): State<AppState>,
    Path(id): Path<EntityId>,
    Json(body): Json<ChangeRequest>,
) -> AppResult<impl IntoResponse> {
    let change = LiveChange {
        author_id: body.author_id,
        timestamp: body.timestamp.unwrap_or_else(Utc::now),
        operation: body.operation,
    };
    let author_id = change.author_id.clone();
    let section = change.operation.section().map(str::to_string);
    let session = state.sessions.apply_change(id, change).await?;

    state.publish(
        session_event(event_types::SESSION_CHANGED, &session)
            .with_actor(author_id)
            .with_payload(serde_json::json!({
                "section": section,
                "pending_changes": session.changes.len(),
            })),
    );

    Ok(Json(DataResponse { data: session }))
}

/// POST /sessions/{id}/comments
pub async fn add_comment(
    State(state): State<AppState>,
    Path(id): Path<EntityId>,
    Json(body): Json<CommentRequest>,
) -> AppResult<impl IntoResponse> {
    let comment = state
        .sessions
        .add_comment(id, &body.author_id, body.section, &body.body)
        .await?;

    let mut event = ContentEvent::new(event_types::SESSION_COMMENTED).with_source("session", id);
    if let Ok(session) = state.sessions.get(id).await {
        event = event.for_path(session.content_path);
    }
    state.publish(
        event
            .with_actor(&comment.author_id)
            .with_payload(serde_json::json!({
                "comment_id": comment.id,
                "section": comment.section,
            })),
    );

    Ok(created(comment))
}

/// POST /sessions/{id}/end
///
/// `commit` writes the working copy as a main-line draft; `discard` (and a
/// commit that fails) returns the unflushed change log instead.
pub async fn end_session(
    State(state): State<AppState>,
    Path(id): Path<EntityId>,
    Json(body): Json<EndRequest>,
) -> AppResult<impl IntoResponse> {
    let ended = state.sessions.end(id, body.mode).await?;

    let payload = match &ended.outcome {
        SessionOutcome::Committed { version } => serde_json::json!({
            "result": "committed",
            "version_id": version.id,
            "version": version.version,
        }),
        SessionOutcome::Discarded { unflushed, failure } => serde_json::json!({
            "result": "discarded",
            "unflushed": unflushed.len(),
            "failure": failure,
        }),
    };
    state.publish(
        session_event(event_types::SESSION_ENDED, &ended.session)
            .with_actor(&ended.session.owner.id)
            .with_payload(payload),
    );

    Ok(Json(DataResponse { data: ended }))
}
