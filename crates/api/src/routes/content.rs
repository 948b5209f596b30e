//! Route definitions for path-addressed content (mounted at `/content`).

use axum::routing::{get, post};
use axum::Router;

use crate::handlers::{analytics, branches, versions};
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/history", get(versions::get_history))
        .route("/versions", post(versions::save_draft))
        .route("/versions/{id}", get(versions::get_version))
        .route("/versions/{id}/publish", post(versions::publish_version))
        .route("/versions/{id}/review", post(versions::review_version))
        .route("/versions/{id}/rollback", post(versions::rollback_version))
        .route("/diff", get(versions::get_diff))
        .route(
            "/branches",
            get(branches::list_branches).post(branches::create_branch),
        )
        .route("/branches/{id}", get(branches::get_branch))
        .route("/branches/{id}/commits", post(branches::commit_to_branch))
        .route("/branches/{id}/merge", post(branches::merge_branch))
        .route("/branches/{id}/abandon", post(branches::abandon_branch))
        .route("/analytics", get(analytics::get_analytics))
}
