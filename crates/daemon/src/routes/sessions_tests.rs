use axum::body::Body;
use axum::http::Request;
use tower::ServiceExt as _;

use super::*;
use crate::test_support::test_state;

#[tokio::test]
async fn list_is_empty_before_any_session_is_created() {
    let dir = tempfile::tempdir().unwrap();
    let state = test_state(dir.path()).await;
    let app = router().with_state(state);

    let response = app.oneshot(Request::builder().uri("/sessions").body(Body::empty()).unwrap()).await.unwrap();
    assert_eq!(response.status(), axum::http::StatusCode::OK);
}

#[tokio::test]
async fn new_session_then_detail_round_trips() {
    let dir = tempfile::tempdir().unwrap();
    let state = test_state(dir.path()).await;
    let app = router().with_state(state.clone());

    let body = serde_json::json!({"cwd": "/tmp/proj", "first_message": "hello"}).to_string();
    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/new-session")
                .header("content-type", "application/json")
                .body(Body::from(body))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), axum::http::StatusCode::OK);

    assert_eq!(state.coordinator.list(false).len(), 1);
    let id = state.coordinator.list(false)[0].id.clone();

    let response = app.oneshot(Request::builder().uri(format!("/session/{id}")).body(Body::empty()).unwrap()).await.unwrap();
    assert_eq!(response.status(), axum::http::StatusCode::OK);
}

#[tokio::test]
async fn detail_of_a_session_the_adapter_has_never_seen_starts_empty() {
    let dir = tempfile::tempdir().unwrap();
    let state = test_state(dir.path()).await;
    let app = router().with_state(state);

    let response = app.oneshot(Request::builder().uri("/session/never-observed").body(Body::empty()).unwrap()).await.unwrap();
    assert_eq!(response.status(), axum::http::StatusCode::OK);
}

#[tokio::test]
async fn archive_removes_the_session_from_the_list() {
    let dir = tempfile::tempdir().unwrap();
    let state = test_state(dir.path()).await;
    let app = router().with_state(state.clone());

    let now_ms = 0;
    let id = state.coordinator.create("/tmp/proj", "hi", serde_json::json!({}), now_ms).await.unwrap();

    let response = app
        .oneshot(Request::builder().method("POST").uri(format!("/archive-session/{id}")).body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), axum::http::StatusCode::OK);
    assert!(state.coordinator.list(true).is_empty());
}
