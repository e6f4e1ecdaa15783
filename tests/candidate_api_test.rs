mod common;

use std::sync::Arc;

use axum::{
    body::{to_bytes, Body},
    http::{header, Request, StatusCode},
    Router,
};
use common::{at, recruiter};
use recruitment_pipeline::{
    database::MemoryStore,
    middleware::auth::AuthState,
    models::user::Actor,
    routes,
    services::{candidate_service::PipelineService, workflow_service::WorkflowEngine},
    utils::{time::FixedClock, token::issue_token},
    AppState,
};
use serde_json::{json, Value as JsonValue};
use tower::ServiceExt;

const SECRET: &str = "test_secret_key";

fn app() -> Router {
    let clock = Arc::new(FixedClock::new(at("2025-01-01T00:00:00Z")));
    let pipeline = PipelineService::with_clock(
        Arc::new(MemoryStore::new()),
        WorkflowEngine::default(),
        clock,
    );
    routes::router(AppState::with_pipeline(pipeline), AuthState::new(SECRET))
}

fn bearer(actor: &Actor) -> String {
    let token = issue_token(SECRET, actor, chrono::Duration::hours(1)).expect("sign token");
    format!("Bearer {}", token)
}

fn request(method: &str, uri: &str, auth: Option<&str>, body: Option<JsonValue>) -> Request<Body> {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(auth) = auth {
        builder = builder.header(header::AUTHORIZATION, auth);
    }
    match body {
        Some(json) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(json.to_string()))
            .expect("request"),
        None => builder.body(Body::empty()).expect("request"),
    }
}

async fn send(app: &Router, req: Request<Body>) -> (StatusCode, JsonValue) {
    let res = app.clone().oneshot(req).await.expect("response");
    let status = res.status();
    let bytes = to_bytes(res.into_body(), usize::MAX).await.expect("body");
    let json = if bytes.is_empty() {
        JsonValue::Null
    } else {
        serde_json::from_slice(&bytes).expect("json body")
    };
    (status, json)
}

fn intake_body(name: &str, phone: &str, national_id: &str) -> JsonValue {
    json!({
        "full_name": name,
        "phone": phone,
        "national_id": national_id,
        "position": "Cong nhan may",
        "source": "facebook",
        "dormitory_requested": true
    })
}

#[tokio::test]
async fn health_is_public() {
    let app = app();
    let (status, body) = send(&app, request("GET", "/health", None, None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
}

#[tokio::test]
async fn api_requires_a_valid_bearer_token() {
    let app = app();

    let (status, _) = send(&app, request("GET", "/api/candidates", None, None)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let forged = issue_token("other_secret", &recruiter(), chrono::Duration::hours(1)).expect("sign");
    let (status, body) = send(
        &app,
        request("GET", "/api/candidates", Some(&format!("Bearer {}", forged)), None),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["code"], "invalid_token");
}

#[tokio::test]
async fn candidate_api_end_to_end() {
    let app = app();
    let hr = bearer(&recruiter());

    let (status, created) = send(
        &app,
        request(
            "POST",
            "/api/candidates",
            Some(&hr),
            Some(intake_body("Nguyen Van A", "0900000001", "001")),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(created["status"], "new");
    assert_eq!(created["version"], 1);
    assert_eq!(created["deadline"]["days_remaining"], 2);
    let id = created["id"].as_str().expect("id").to_string();

    let (status, body) = send(
        &app,
        request(
            "POST",
            "/api/candidates",
            Some(&hr),
            Some(intake_body("Nguyen Van B", "0900000002", "001")),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["code"], "duplicate_candidate");
    assert_eq!(body["candidate_id"], id.as_str());
    assert_eq!(body["retryable"], false);

    let (status, updated) = send(
        &app,
        request(
            "PATCH",
            &format!("/api/candidates/{}", id),
            Some(&hr),
            Some(json!({ "status": "screened", "note": "Phoned", "expected_version": 1 })),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(updated["status"], "screened");
    assert_eq!(updated["version"], 2);

    let (status, body) = send(
        &app,
        request(
            "PATCH",
            &format!("/api/candidates/{}", id),
            Some(&hr),
            Some(json!({ "note": "stale", "expected_version": 1 })),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["code"], "conflict");
    assert_eq!(body["retryable"], true);

    let (status, body) = send(
        &app,
        request(
            "PATCH",
            &format!("/api/candidates/{}", id),
            Some(&hr),
            Some(json!({ "status": "hired" })),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["code"], "invalid_transition");

    let (status, _) = send(
        &app,
        request(
            "POST",
            &format!("/api/candidates/{}/comments", id),
            Some(&hr),
            Some(json!({ "message": "Will start Monday" })),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, history) = send(
        &app,
        request("GET", &format!("/api/candidates/{}/history", id), Some(&hr), None),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let fields: Vec<&str> = history["entries"]
        .as_array()
        .expect("entries")
        .iter()
        .map(|e| e["field"].as_str().unwrap_or_default())
        .collect();
    assert_eq!(fields, vec!["record", "status", "note", "comment"]);

    let (status, list) = send(
        &app,
        request("GET", "/api/candidates?q=nguyen&statuses=screened", Some(&hr), None),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(list["total"], 1);

    let (status, _) = send(
        &app,
        request("GET", "/api/candidates?statuses=hired", Some(&hr), None),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, report) = send(&app, request("GET", "/api/candidates/report", Some(&hr), None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(report["total"], 1);

    let (status, overdue) = send(&app, request("GET", "/api/candidates/overdue", Some(&hr), None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(overdue["total"], 0);
}

#[tokio::test]
async fn edits_need_an_editor_role() {
    let app = app();
    let hr = bearer(&recruiter());
    let viewer = bearer(&Actor::new("lead-1", "Line Lead").with_role("viewer"));

    let (_, created) = send(
        &app,
        request(
            "POST",
            "/api/candidates",
            Some(&hr),
            Some(intake_body("Tran Van C", "0900000003", "003")),
        ),
    )
    .await;
    let id = created["id"].as_str().expect("id").to_string();

    let (status, body) = send(
        &app,
        request(
            "PATCH",
            &format!("/api/candidates/{}", id),
            Some(&viewer),
            Some(json!({ "status": "screened" })),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["code"], "forbidden");

    let (status, fetched) = send(
        &app,
        request("GET", &format!("/api/candidates/{}", id), Some(&viewer), None),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(fetched["status"], "new");
}

#[tokio::test]
async fn unknown_candidate_is_404() {
    let app = app();
    let hr = bearer(&recruiter());
    let (status, body) = send(
        &app,
        request(
            "GET",
            "/api/candidates/9b0e1b4e-8a55-4f43-8a52-3d4f0a0e9e11",
            Some(&hr),
            None,
        ),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["code"], "not_found");
}
