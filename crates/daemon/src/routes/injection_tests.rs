use axum::body::Body;
use axum::http::Request;
use tower::ServiceExt as _;

use super::*;
use crate::test_support::test_state;

#[tokio::test]
async fn inject_succeeds_against_the_fake_adapter() {
    let dir = tempfile::tempdir().unwrap();
    let state = test_state(dir.path()).await;
    let app = router().with_state(state);

    let body = serde_json::json!({"text": "hello there"}).to_string();
    let response = app
        .oneshot(Request::builder().method("POST").uri("/inject").header("content-type", "application/json").body(Body::from(body)).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), axum::http::StatusCode::OK);
}

#[tokio::test]
async fn status_reports_the_default_preferred_method() {
    let dir = tempfile::tempdir().unwrap();
    let state = test_state(dir.path()).await;
    let app = router().with_state(state);

    let response = app.oneshot(Request::builder().uri("/inject/status").body(Body::empty()).unwrap()).await.unwrap();
    assert_eq!(response.status(), axum::http::StatusCode::OK);
}

#[tokio::test]
async fn configure_rejects_an_unknown_method() {
    let dir = tempfile::tempdir().unwrap();
    let state = test_state(dir.path()).await;
    let app = router().with_state(state);

    let body = serde_json::json!({"preferred_method": "carrier-pigeon"}).to_string();
    let response = app
        .oneshot(Request::builder().method("POST").uri("/inject/configure").header("content-type", "application/json").body(Body::from(body)).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), axum::http::StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn queue_then_process_drains_the_queued_message() {
    let dir = tempfile::tempdir().unwrap();
    let state = test_state(dir.path()).await;
    let app = router().with_state(state.clone());

    let body = serde_json::json!({"conversation_id": "conv-1", "text": "queued"}).to_string();
    let response = app
        .clone()
        .oneshot(Request::builder().method("POST").uri("/inject/queue").header("content-type", "application/json").body(Body::from(body)).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), axum::http::StatusCode::OK);
    assert_eq!(state.injection.queue_len(&dc_core::ConversationId::from("conv-1")), 1);

    let response = app
        .oneshot(
            Request::builder()
                .uri("/inject/queue/conv-1")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), axum::http::StatusCode::OK);
}
