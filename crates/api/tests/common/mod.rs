#![allow(dead_code)]

use std::path::PathBuf;
use std::sync::Arc;

use axum::body::Body;
use axum::http::{Method, Request, Response};
use axum::Router;
use http_body_util::BodyExt;
use tower::ServiceExt;

use folio_api::config::ServerConfig;
use folio_api::router::build_app_router;
use folio_api::state::AppState;
use folio_store::MemoryContentSource;

pub const PATH: &str = "architecture/overview";

pub const SEED: &str = "# Overview\nIntro paragraph.\n## Usage\nRun it.\n";

/// Build a test `ServerConfig` with safe defaults.
pub fn test_config() -> ServerConfig {
    ServerConfig {
        host: "127.0.0.1".to_string(),
        port: 0,
        cors_origins: vec!["http://localhost:5173".to_string()],
        request_timeout_secs: 30,
        shutdown_timeout_secs: 30,
        content_root: PathBuf::from("./content"),
        diff_cache_capacity: 64,
        session_stale_timeout_secs: 1800,
        session_sweep_interval_secs: 60,
        autosave_interval_secs: 0,
    }
}

/// Build application state over an in-memory source holding [`SEED`] at
/// [`PATH`], with the activity journal attached to the event bus.
pub fn build_test_state() -> AppState {
    let source = MemoryContentSource::new().with_content(PATH, SEED);
    let state = AppState::new(test_config(), Arc::new(source));

    let journal = Arc::clone(&state.journal);
    let receiver = state.event_bus.subscribe();
    tokio::spawn(async move { journal.run(receiver).await });

    state
}

/// Build the full application router with all middleware layers.
///
/// Goes through the same [`build_app_router`] as `main.rs`, so tests exercise
/// the production middleware stack.
pub fn build_test_app() -> Router {
    build_app_router(build_test_state(), &test_config())
}

pub fn build_app_with_state(state: AppState) -> Router {
    build_app_router(state, &test_config())
}

pub fn author_json(id: &str) -> serde_json::Value {
    serde_json::json!({
        "id": id,
        "name": format!("User {id}"),
        "email": format!("{id}@example.com"),
        "role": "writer",
        "expertise": [],
    })
}

pub fn content_uri(suffix: &str) -> String {
    format!("/api/v1/content{suffix}?path={PATH}")
}

// ---------------------------------------------------------------------------
// Request helpers
// ---------------------------------------------------------------------------

pub async fn get(app: Router, uri: &str) -> Response<Body> {
    let request = Request::builder()
        .method(Method::GET)
        .uri(uri)
        .body(Body::empty())
        .unwrap();
    app.oneshot(request).await.unwrap()
}

pub async fn post_json(app: Router, uri: &str, body: serde_json::Value) -> Response<Body> {
    let request = Request::builder()
        .method(Method::POST)
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(serde_json::to_vec(&body).unwrap()))
        .unwrap();
    app.oneshot(request).await.unwrap()
}

pub async fn body_json(response: Response<Body>) -> serde_json::Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}
