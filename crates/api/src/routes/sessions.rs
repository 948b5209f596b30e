//! Route definitions for collaborative sessions (mounted at `/sessions`).

use axum::routing::{get, post};
use axum::Router;

use crate::handlers::sessions;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route(
            "/",
            get(sessions::list_sessions).post(sessions::start_session),
        )
        .route("/{id}", get(sessions::get_session))
        .route("/{id}/join", post(sessions::join_session))
        .route("/{id}/leave", post(sessions::leave_session))
        .route("/{id}/changes", post(sessions::apply_change))
        .route("/{id}/comments", post(sessions::add_comment))
        .route("/{id}/end", post(sessions::end_session))
}
