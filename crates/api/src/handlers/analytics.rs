//! Handler for per-path content analytics.

use axum::extract::{Query, State};
use axum::response::IntoResponse;
use axum::Json;

use crate::error::AppResult;
use crate::query::PathParams;
use crate::response::DataResponse;
use crate::state::AppState;

/// GET /content/analytics?path=
pub async fn get_analytics(
    State(state): State<AppState>,
    Query(params): Query<PathParams>,
) -> AppResult<impl IntoResponse> {
    let analytics = state.store.analytics(&params.path).await?;
    Ok(Json(DataResponse { data: analytics }))
}
