use axum::body::Body;
use axum::http::Request;
use tower::ServiceExt as _;

use super::*;
use crate::test_support::test_state;

fn template_body(id: &str) -> String {
    serde_json::json!({
        "id": id,
        "name": "Minimal",
        "version": "1.0.0",
    })
    .to_string()
}

#[tokio::test]
async fn template_crud_round_trips() {
    let dir = tempfile::tempdir().unwrap();
    let state = test_state(dir.path()).await;
    let app = router().with_state(state.clone());

    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/orchestrator/templates")
                .header("content-type", "application/json")
                .body(Body::from(template_body("t1")))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), axum::http::StatusCode::OK);

    let response =
        app.clone().oneshot(Request::builder().uri("/orchestrator/templates").body(Body::empty()).unwrap()).await.unwrap();
    assert_eq!(response.status(), axum::http::StatusCode::OK);

    let response =
        app.clone().oneshot(Request::builder().uri("/orchestrator/templates/t1").body(Body::empty()).unwrap()).await.unwrap();
    assert_eq!(response.status(), axum::http::StatusCode::OK);

    let response = app
        .oneshot(Request::builder().method("DELETE").uri("/orchestrator/templates/t1").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), axum::http::StatusCode::OK);
    assert!(state.templates.list_ids().is_empty());
}

#[tokio::test]
async fn get_unknown_template_is_not_found() {
    let dir = tempfile::tempdir().unwrap();
    let state = test_state(dir.path()).await;
    let app = router().with_state(state);

    let response =
        app.oneshot(Request::builder().uri("/orchestrator/templates/nope").body(Body::empty()).unwrap()).await.unwrap();
    assert_eq!(response.status(), axum::http::StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn create_orchestrator_then_fetch_status() {
    let dir = tempfile::tempdir().unwrap();
    let state = test_state(dir.path()).await;
    state.templates.create("t1".into(), serde_json::json!({"id": "t1", "name": "Minimal", "version": "1.0.0"})).unwrap();
    let app = router().with_state(state);

    let body = serde_json::json!({"template_id": "t1", "cwd": "/tmp/proj", "user_request": "do the thing"}).to_string();
    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/orchestrator/create")
                .header("content-type", "application/json")
                .body(Body::from(body))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), axum::http::StatusCode::OK);

    let body = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let parsed: serde_json::Value = serde_json::from_slice(&body).unwrap();
    let orchestrator_id = parsed["orchestrator_id"].as_str().unwrap().to_string();

    let response = app
        .oneshot(Request::builder().uri(format!("/orchestrator/{orchestrator_id}/status")).body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), axum::http::StatusCode::OK);
}

#[tokio::test]
async fn status_of_unknown_orchestrator_is_not_found() {
    let dir = tempfile::tempdir().unwrap();
    let state = test_state(dir.path()).await;
    let app = router().with_state(state);

    let response =
        app.oneshot(Request::builder().uri("/orchestrator/nope/status").body(Body::empty()).unwrap()).await.unwrap();
    assert_eq!(response.status(), axum::http::StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn workers_list_is_empty_for_a_fresh_orchestrator() {
    let dir = tempfile::tempdir().unwrap();
    let state = test_state(dir.path()).await;
    state.templates.create("t1".into(), serde_json::json!({"id": "t1", "name": "Minimal", "version": "1.0.0"})).unwrap();
    let now_ms = 0;
    let conversation_id = state.coordinator.create("/tmp/proj", "hi", serde_json::json!({}), now_ms).await.unwrap();
    let instance = state.orchestrator.create("t1", "/tmp/proj", "hi", conversation_id, now_ms).unwrap();
    let app = router().with_state(state);

    let response = app
        .oneshot(Request::builder().uri(format!("/orchestrator/{}/workers", instance.id)).body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), axum::http::StatusCode::OK);
}
