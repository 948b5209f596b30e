//! HTTP-level integration tests for the `/content` endpoints.
//!
//! Every test starts from a fresh in-memory source holding one document at
//! `architecture/overview`; its history is seeded on first access.

mod common;

use axum::http::StatusCode;
use axum::Router;
use common::{author_json, body_json, build_test_app, content_uri, get, post_json, PATH};
use serde_json::{json, Value};

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

async fn history(app: &Router) -> Value {
    let response = get(app.clone(), &content_uri("/history")).await;
    assert_eq!(response.status(), StatusCode::OK);
    body_json(response).await["data"].clone()
}

async fn save_draft(app: &Router, content: &str) -> Value {
    let response = post_json(
        app.clone(),
        &content_uri("/versions"),
        json!({ "content": content, "author": author_json("alice") }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::CREATED);
    body_json(response).await["data"].clone()
}

async fn version_action(app: &Router, id: &Value, action: &str, body: Value) -> (StatusCode, Value) {
    let uri = content_uri(&format!("/versions/{}/{action}", id.as_str().unwrap()));
    let response = post_json(app.clone(), &uri, body).await;
    let status = response.status();
    (status, body_json(response).await)
}

fn by_author(id: &str) -> Value {
    json!({ "author": author_json(id) })
}

// ---------------------------------------------------------------------------
// Test: first history read seeds v1 from the content source
// ---------------------------------------------------------------------------

#[tokio::test]
async fn history_is_seeded_from_source() {
    let app = build_test_app();
    let data = history(&app).await;

    assert_eq!(data["content_path"], PATH);
    let versions = data["versions"].as_array().unwrap();
    assert_eq!(versions.len(), 1);
    assert_eq!(versions[0]["version"], 1);
    assert_eq!(versions[0]["status"], "draft");
    assert_eq!(versions[0]["author"]["id"], "system");
    assert_eq!(data["current_version_id"], versions[0]["id"]);
    assert!(data["published_version_id"].is_null());
}

#[tokio::test]
async fn history_for_unknown_path_returns_404() {
    let app = build_test_app();
    let response = get(app, "/api/v1/content/history?path=docs/missing").await;

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert_eq!(body_json(response).await["code"], "NOT_FOUND");
}

#[tokio::test]
async fn malformed_path_returns_400() {
    let app = build_test_app();
    let response = get(app, "/api/v1/content/history?path=Docs/../secret").await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(response).await["code"], "VALIDATION_ERROR");
}

// ---------------------------------------------------------------------------
// Test: drafts get increasing numbers and are retrievable by id
// ---------------------------------------------------------------------------

#[tokio::test]
async fn save_draft_appends_next_version() {
    let app = build_test_app();
    let v1 = history(&app).await["versions"][0].clone();

    let v2 = save_draft(&app, "# Overview\nRewritten intro.\n## Usage\nRun it.\n").await;
    assert_eq!(v2["version"], 2);
    assert_eq!(v2["status"], "draft");
    assert_eq!(v2["parent_version_id"], v1["id"]);

    let uri = content_uri(&format!("/versions/{}", v2["id"].as_str().unwrap()));
    let response = get(app.clone(), &uri).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["data"]["id"], v2["id"]);
}

#[tokio::test]
async fn save_draft_rejects_invalid_author() {
    let app = build_test_app();
    history(&app).await;

    let response = post_json(
        app,
        &content_uri("/versions"),
        json!({
            "content": "# Overview\n",
            "author": { "id": "", "name": "Nobody", "email": "not-an-email" },
        }),
    )
    .await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(response).await["code"], "VALIDATION_ERROR");
}

#[tokio::test]
async fn unknown_version_returns_404() {
    let app = build_test_app();
    history(&app).await;

    let uri = content_uri(&format!("/versions/{}", folio_core::types::new_id()));
    let response = get(app, &uri).await;

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

// ---------------------------------------------------------------------------
// Test: publishing keeps at most one published version
// ---------------------------------------------------------------------------

#[tokio::test]
async fn publishing_archives_previous_published_version() {
    let app = build_test_app();
    let v1 = history(&app).await["versions"][0].clone();
    let v2 = save_draft(&app, "# Overview\nSecond take.\n").await;

    let (status, json) = version_action(&app, &v1["id"], "publish", by_author("alice")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["data"]["status"], "published");

    let (status, _) = version_action(&app, &v2["id"], "publish", by_author("alice")).await;
    assert_eq!(status, StatusCode::OK);

    let data = history(&app).await;
    assert_eq!(data["published_version_id"], v2["id"]);
    let statuses: Vec<&str> = data["versions"]
        .as_array()
        .unwrap()
        .iter()
        .map(|v| v["status"].as_str().unwrap())
        .collect();
    assert_eq!(statuses, vec!["archived", "published"]);
}

#[tokio::test]
async fn publishing_archived_version_returns_409() {
    let app = build_test_app();
    let v1 = history(&app).await["versions"][0].clone();
    let v2 = save_draft(&app, "# Overview\nSecond take.\n").await;
    version_action(&app, &v1["id"], "publish", by_author("alice")).await;
    version_action(&app, &v2["id"], "publish", by_author("alice")).await;

    let (status, json) = version_action(&app, &v1["id"], "publish", by_author("alice")).await;

    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(json["code"], "INVALID_TRANSITION");
    assert_eq!(history(&app).await["published_version_id"], v2["id"]);
}

#[tokio::test]
async fn review_flow_moves_through_statuses() {
    let app = build_test_app();
    let v1 = history(&app).await["versions"][0].clone();

    let review = |action: &str| json!({ "action": action, "author": author_json("reviewer") });

    let (status, json) = version_action(&app, &v1["id"], "review", review("submit")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["data"]["status"], "pending_review");

    let (status, json) = version_action(&app, &v1["id"], "review", review("approve")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["data"]["status"], "approved");

    let (status, json) = version_action(&app, &v1["id"], "review", review("submit")).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(json["code"], "INVALID_TRANSITION");
}

// ---------------------------------------------------------------------------
// Test: rollback appends a new draft and warns on no-op
// ---------------------------------------------------------------------------

#[tokio::test]
async fn rollback_restores_content_as_new_draft() {
    let app = build_test_app();
    let v1 = history(&app).await["versions"][0].clone();
    save_draft(&app, "# Overview\nSomething else entirely.\n").await;

    let (status, json) = version_action(&app, &v1["id"], "rollback", by_author("alice")).await;

    assert_eq!(status, StatusCode::CREATED);
    let v3 = &json["data"]["version"];
    assert_eq!(v3["version"], 3);
    assert_eq!(v3["content"], v1["content"]);
    assert_eq!(v3["changes"][0]["type"], "rollback");
    assert!(json["data"].get("warning").is_none());
}

#[tokio::test]
async fn rollback_to_head_content_returns_no_op_warning() {
    let app = build_test_app();
    let v1 = history(&app).await["versions"][0].clone();

    let (status, json) = version_action(&app, &v1["id"], "rollback", by_author("alice")).await;

    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(json["data"]["warning"]["kind"], "no_op");
    assert_eq!(json["data"]["version"]["version"], 2);
}

// ---------------------------------------------------------------------------
// Test: diff between versions
// ---------------------------------------------------------------------------

#[tokio::test]
async fn diff_reports_modified_and_added_sections() {
    let app = build_test_app();
    let v1 = history(&app).await["versions"][0].clone();
    let v2 = save_draft(
        &app,
        "# Overview\nIntro paragraph.\n## Usage\nRun it twice.\n## FAQ\nNone yet.\n",
    )
    .await;

    let uri = format!(
        "/api/v1/content/diff?path={PATH}&from={}&to={}",
        v1["id"].as_str().unwrap(),
        v2["id"].as_str().unwrap()
    );
    let response = get(app, &uri).await;
    assert_eq!(response.status(), StatusCode::OK);

    let diff = body_json(response).await["data"].clone();
    assert_eq!(diff["from_number"], 1);
    assert_eq!(diff["to_number"], 2);
    let sections: Vec<(&str, &str)> = diff["sections"]
        .as_array()
        .unwrap()
        .iter()
        .map(|s| (s["section"].as_str().unwrap(), s["type"].as_str().unwrap()))
        .collect();
    assert_eq!(sections, vec![("Usage", "modification"), ("FAQ", "addition")]);
    assert_eq!(diff["summary"]["modifications"], 1);
}

#[tokio::test]
async fn diff_without_version_ids_returns_400() {
    let app = build_test_app();
    let response = get(app, &content_uri("/diff")).await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

// ---------------------------------------------------------------------------
// Test: branches
// ---------------------------------------------------------------------------

async fn create_branch(app: &Router, name: &str, base: &Value) -> (StatusCode, Value) {
    let response = post_json(
        app.clone(),
        &content_uri("/branches"),
        json!({
            "name": name,
            "description": "Exploratory rewrite",
            "base_version_id": base,
            "author": author_json("bob"),
        }),
    )
    .await;
    let status = response.status();
    (status, body_json(response).await)
}

async fn commit(app: &Router, branch_id: &Value, content: &str) -> Value {
    let uri = content_uri(&format!("/branches/{}/commits", branch_id.as_str().unwrap()));
    let response = post_json(
        app.clone(),
        &uri,
        json!({ "content": content, "author": author_json("bob") }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::CREATED);
    body_json(response).await["data"].clone()
}

async fn merge(app: &Router, branch_id: &Value) -> (StatusCode, Value) {
    let uri = content_uri(&format!("/branches/{}/merge", branch_id.as_str().unwrap()));
    let response = post_json(app.clone(), &uri, by_author("alice")).await;
    let status = response.status();
    (status, body_json(response).await)
}

#[tokio::test]
async fn branch_merge_produces_main_line_version() {
    let app = build_test_app();
    let v1 = history(&app).await["versions"][0].clone();

    let (status, json) = create_branch(&app, "faq", &v1["id"]).await;
    assert_eq!(status, StatusCode::CREATED);
    let branch = json["data"].clone();
    assert_eq!(branch["status"], "active");

    let tip = commit(
        &app,
        &branch["id"],
        "# Overview\nIntro paragraph.\n## Usage\nRun it.\n## FAQ\nAsk away.\n",
    )
    .await;
    assert_eq!(tip["branch_id"], branch["id"]);

    let (status, json) = merge(&app, &branch["id"]).await;
    assert_eq!(status, StatusCode::OK);
    let merged = &json["data"]["version"];
    assert!(merged["branch_id"].is_null());
    assert_eq!(merged["content"], tip["content"]);
    assert_eq!(merged["parent_version_id"], v1["id"]);
    assert_eq!(json["data"]["branch"]["status"], "merged");
    assert_eq!(json["data"]["branch"]["merged_version_id"], merged["id"]);

    let data = history(&app).await;
    assert_eq!(data["current_version_id"], merged["id"]);

    let response = get(app.clone(), &content_uri("/branches")).await;
    let branches = body_json(response).await["data"].clone();
    assert_eq!(branches.as_array().unwrap().len(), 1);
    assert_eq!(branches[0]["status"], "merged");
}

#[tokio::test]
async fn conflicting_merge_returns_409_with_sections() {
    let app = build_test_app();
    let v1 = history(&app).await["versions"][0].clone();
    let (_, json) = create_branch(&app, "usage-rewrite", &v1["id"]).await;
    let branch_id = json["data"]["id"].clone();

    commit(&app, &branch_id, "# Overview\nIntro paragraph.\n## Usage\nRun it twice.\n").await;
    let main = save_draft(&app, "# Overview\nIntro paragraph.\n## Usage\nRun it once.\n").await;

    let (status, json) = merge(&app, &branch_id).await;

    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(json["code"], "MERGE_CONFLICT");
    assert_eq!(json["sections"], json!(["Usage"]));

    // Nothing was written and the branch stays open.
    let data = history(&app).await;
    assert_eq!(data["current_version_id"], main["id"]);
    assert_eq!(data["branches"][0]["status"], "active");
}

#[tokio::test]
async fn branch_from_unknown_base_returns_400() {
    let app = build_test_app();
    history(&app).await;

    let (status, json) = create_branch(&app, "ghost", &json!(folio_core::types::new_id())).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["code"], "VALIDATION_ERROR");
}

#[tokio::test]
async fn abandoned_branch_rejects_commits() {
    let app = build_test_app();
    let v1 = history(&app).await["versions"][0].clone();
    let (_, json) = create_branch(&app, "dead-end", &v1["id"]).await;
    let branch_id = json["data"]["id"].as_str().unwrap().to_string();

    let response = post_json(
        app.clone(),
        &content_uri(&format!("/branches/{branch_id}/abandon")),
        by_author("bob"),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["data"]["status"], "abandoned");

    let response = post_json(
        app.clone(),
        &content_uri(&format!("/branches/{branch_id}/commits")),
        json!({ "content": "# Overview\n", "author": author_json("bob") }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::CONFLICT);
    assert_eq!(body_json(response).await["code"], "INVALID_TRANSITION");
}

// ---------------------------------------------------------------------------
// Test: analytics
// ---------------------------------------------------------------------------

#[tokio::test]
async fn analytics_summarises_history() {
    let app = build_test_app();
    let v1 = history(&app).await["versions"][0].clone();
    save_draft(&app, "# Overview\nIntro paragraph.\n## Usage\nRun it.\n## FAQ\nNone.\n").await;
    version_action(&app, &v1["id"], "publish", by_author("alice")).await;

    let response = get(app, &content_uri("/analytics")).await;
    assert_eq!(response.status(), StatusCode::OK);

    let data = body_json(response).await["data"].clone();
    assert_eq!(data["content_path"], PATH);
    assert_eq!(data["version_count"], 2);
    assert_eq!(data["branch_count"], 0);
    assert_eq!(data["approval_rate"], 1.0);
    assert_eq!(data["content_growth"]["section_delta"], 1);
}
