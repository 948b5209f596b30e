pub mod content;
pub mod health;
pub mod sessions;

use axum::routing::get;
use axum::Router;

use crate::handlers;
use crate::state::AppState;

/// Build the `/api/v1` route tree.
///
/// Every content endpoint addresses its document with `?path=`.
///
/// ```text
/// /content/history                          version history (GET)
/// /content/versions                         save draft (POST)
/// /content/versions/{id}                    get version (GET)
/// /content/versions/{id}/publish            publish (POST)
/// /content/versions/{id}/review             submit, approve, reject (POST)
/// /content/versions/{id}/rollback           rollback (POST)
/// /content/diff                             diff two versions (GET, ?from=&to=)
/// /content/branches                         list, create
/// /content/branches/{id}                    get branch
/// /content/branches/{id}/commits            commit to branch (POST)
/// /content/branches/{id}/merge              merge into main line (POST)
/// /content/branches/{id}/abandon            abandon (POST)
/// /content/analytics                        per-path analytics (GET)
///
/// /sessions                                 list (?path=), start (POST)
/// /sessions/{id}                            get session
/// /sessions/{id}/join                       join (POST)
/// /sessions/{id}/leave                      leave (POST)
/// /sessions/{id}/changes                    apply live change (POST)
/// /sessions/{id}/comments                   add comment (POST)
/// /sessions/{id}/end                        commit or discard (POST)
///
/// /activity                                 recent engine events (GET)
/// ```
pub fn api_routes() -> Router<AppState> {
    Router::new()
        // Version ledger, branches, diffs and analytics.
        .nest("/content", content::router())
        // Collaborative editing sessions.
        .nest("/sessions", sessions::router())
        // Recent activity from the event journal.
        .route("/activity", get(handlers::activity::list_activity))
}
