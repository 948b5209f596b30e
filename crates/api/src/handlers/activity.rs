//! Handler for the recent-activity feed backed by the event journal.

use axum::extract::{Query, State};
use axum::response::IntoResponse;
use axum::Json;

use crate::error::{AppError, AppResult};
use crate::query::ActivityParams;
use crate::response::DataResponse;
use crate::state::AppState;

const DEFAULT_ACTIVITY_LIMIT: usize = 50;
const MAX_ACTIVITY_LIMIT: usize = 500;

/// GET /activity?path=&limit=
///
/// Most recent engine events first.
pub async fn list_activity(
    State(state): State<AppState>,
    Query(params): Query<ActivityParams>,
) -> AppResult<impl IntoResponse> {
    let limit = params.limit.unwrap_or(DEFAULT_ACTIVITY_LIMIT);
    if limit == 0 || limit > MAX_ACTIVITY_LIMIT {
        return Err(AppError::BadRequest(format!(
            "limit must be between 1 and {MAX_ACTIVITY_LIMIT}"
        )));
    }
    let events = state.journal.recent(limit, params.path.as_deref()).await;
    Ok(Json(DataResponse { data: events }))
}
