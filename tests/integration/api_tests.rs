//! REST API tests driven through the router with `oneshot`.

use std::time::Duration;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use serde_json::{json, Value};
use tokio_util::sync::CancellationToken;
use tower::util::ServiceExt;

use iqc_tracker::api::{build_router, serve_until, AppState};
use iqc_tracker::AppError;

use super::test_helpers::{test_config, test_config_with, Failure, Fixture, ScriptedWarehouse};

fn app(fx: &Fixture) -> Router {
    build_router(fx.app_state(test_config()))
}

fn get(uri: &str) -> Request<Body> {
    Request::builder()
        .method("GET")
        .uri(uri)
        .body(Body::empty())
        .unwrap()
}

fn post_json(uri: &str, body: &Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn post_empty(uri: &str) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .body(Body::empty())
        .unwrap()
}

fn delete(uri: &str) -> Request<Body> {
    Request::builder()
        .method("DELETE")
        .uri(uri)
        .body(Body::empty())
        .unwrap()
}

async fn send(app: &Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("read body");
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).expect("json body")
    };
    (status, value)
}

#[tokio::test]
async fn health_reports_ok() {
    let fx = Fixture::new().await;
    let (status, body) = send(&app(&fx), get("/health")).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
    assert_eq!(body["service"], "iqc-tracker");
    assert!(body["version"].is_string());
}

#[tokio::test]
async fn settings_expose_effective_defaults() {
    let fx = Fixture::new().await;
    let app = build_router(fx.app_state(test_config_with(true)));
    let (status, body) = send(&app, get("/api/settings")).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["default_aql"], "1.0");
    assert_eq!(body["invert_result_status"], true);
    assert_eq!(body["sync_interval_seconds"], 0);
    assert!(body["pending_statuses"]
        .as_array()
        .unwrap()
        .contains(&json!("待检")));
}

#[tokio::test]
async fn sync_then_inspect_over_http() {
    let fx = Fixture::new().await;
    let upstream_id = fx.seed(Some("INV-1"), Some("P-1"), "V1", 1000, None).await;
    let app = app(&fx);

    let (status, report) = send(&app, post_empty("/api/sync")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(report["syncedCount"], 1);
    let task_id = report["tasks"][0]["id"].as_str().unwrap().to_owned();

    let (status, page) = send(&app, get("/api/tasks?active=true")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(page["total"], 1);
    assert_eq!(page["items"][0]["status"], "awaiting_inspection");

    let (status, plan) = send(&app, get(&format!("/api/tasks/{task_id}/sampling"))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(plan["sample_size"], 80);
    assert_eq!(plan["inspection_level"], "K");

    let (status, task) = send(
        &app,
        post_json(
            &format!("/api/tasks/{task_id}/start"),
            &json!({ "inspector": "kim" }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(task["status"], "in_inspection");

    let (status, outcome) = send(
        &app,
        post_json(
            &format!("/api/tasks/{task_id}/inspection"),
            &json!({ "verdict": "PASS", "inspector": "kim" }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(outcome["upstream_updated"], true);
    assert_eq!(outcome["task"]["status"], "released");
    assert_eq!(outcome["result"]["judgment"], "PASS");
    assert_eq!(outcome["result"]["status"], "Passed");
    assert_eq!(fx.status_of(upstream_id).await.as_deref(), Some("Passed"));

    let (status, history) = send(&app, get(&format!("/api/results?task_id={task_id}"))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(history["total"], 1);
    let result_id = history["items"][0]["id"].as_str().unwrap().to_owned();

    let (status, result) = send(&app, get(&format!("/api/results/{result_id}"))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(result["action"], "Release to WH");

    let (status, parts) = send(&app, get("/api/parts")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(parts[0]["part_no"], "P-1");

    let (status, page) = send(&app, get("/api/tasks?active=true")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(page["total"], 0);
}

#[tokio::test]
async fn second_verdict_is_a_conflict() {
    let fx = Fixture::new().await;
    fx.seed(Some("INV-1"), Some("P-1"), "V1", 10, None).await;
    let app = app(&fx);
    let (_, report) = send(&app, post_empty("/api/sync")).await;
    let task_id = report["tasks"][0]["id"].as_str().unwrap().to_owned();
    let uri = format!("/api/tasks/{task_id}/inspection");

    let (status, _) = send(
        &app,
        post_json(&uri, &json!({ "verdict": "FAIL", "inspector": "kim" })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, body) = send(
        &app,
        post_json(&uri, &json!({ "verdict": "PASS", "inspector": "kim" })),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"], "invalid_transition");
}

#[tokio::test]
async fn manual_task_lifecycle() {
    let fx = Fixture::new().await;
    let app = app(&fx);

    let (status, task) = send(
        &app,
        post_json(
            "/api/tasks",
            &json!({ "invoice": "INV-9", "part": "P-9", "vendor": "V1", "qty": 40 }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(task["status"], "pending");
    let id = task["id"].as_str().unwrap().to_owned();

    let (status, dup) = send(
        &app,
        post_json(
            "/api/tasks",
            &json!({ "invoice": "INV-9", "part": "P-9", "vendor": "V1" }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(dup["error"], "conflict");

    let (status, fetched) = send(&app, get(&format!("/api/tasks/{id}"))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(fetched["qty"], 40);

    let (status, _) = send(&app, delete(&format!("/api/tasks/{id}"))).await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, body) = send(&app, delete(&format!("/api/tasks/{id}"))).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "not_found");
}

#[tokio::test]
async fn invalid_bodies_are_bad_requests() {
    let fx = Fixture::new().await;
    let app = app(&fx);

    let (status, body) = send(&app, post_json("/api/tasks", &json!({ "invoice": "INV-1" }))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "validation");
    assert_eq!(body["details"], "part is required");

    let (status, body) = send(
        &app,
        post_json(
            "/api/tasks",
            &json!({ "invoice": "INV-1", "part": "P-1", "injected": true }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "validation");

    let request = Request::builder()
        .method("POST")
        .uri("/api/tasks")
        .header("content-type", "application/json")
        .body(Body::from("{not json"))
        .unwrap();
    let (status, _) = send(&app, request).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn unknown_status_filter_is_rejected() {
    let fx = Fixture::new().await;
    let (status, body) = send(&app(&fx), get("/api/tasks?status=archived")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "validation");
}

#[tokio::test]
async fn missing_task_is_not_found() {
    let fx = Fixture::new().await;
    let app = app(&fx);

    let (status, _) = send(&app, get("/api/tasks/nope")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    let (status, _) = send(&app, get("/api/tasks/nope/sampling")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    let (status, _) = send(&app, get("/api/results/nope")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn unreachable_warehouse_fails_the_sync() {
    let fx = Fixture::new().await;
    let state = std::sync::Arc::new(AppState::new(
        std::sync::Arc::new(test_config()),
        std::sync::Arc::clone(&fx.local),
        ScriptedWarehouse::new(Failure::Unreachable),
    ));
    let app = build_router(state);

    let (status, body) = send(&app, post_empty("/api/sync")).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["error"], "sync failed");
    assert!(body["details"].as_str().unwrap().contains("connection refused"));
}

#[tokio::test]
async fn bind_failure_ends_serving_with_an_error() {
    let fx = Fixture::new().await;
    let taken = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind");
    let mut config = test_config();
    config.bind_address = "127.0.0.1".into();
    config.http_port = taken.local_addr().expect("addr").port();
    let ct = CancellationToken::new();

    let served = tokio::time::timeout(
        Duration::from_secs(5),
        serve_until(fx.app_state(config), ct.clone(), std::future::pending()),
    )
    .await
    .expect("serving should stop on its own");

    assert!(matches!(served, Err(AppError::Config(_))), "got {served:?}");
    assert!(ct.is_cancelled());
}

#[tokio::test]
async fn shutdown_request_stops_serving_cleanly() {
    let fx = Fixture::new().await;
    let mut config = test_config();
    config.bind_address = "127.0.0.1".into();
    config.http_port = 0;
    let ct = CancellationToken::new();

    let served = tokio::time::timeout(
        Duration::from_secs(5),
        serve_until(fx.app_state(config), ct.clone(), async {}),
    )
    .await
    .expect("serving should stop after shutdown");

    assert!(served.is_ok(), "got {served:?}");
    assert!(ct.is_cancelled());
}
