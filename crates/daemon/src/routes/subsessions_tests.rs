use axum::body::Body;
use axum::http::Request;
use tower::ServiceExt as _;

use super::*;
use crate::test_support::test_state;

#[tokio::test]
async fn link_then_list_then_unlink() {
    let dir = tempfile::tempdir().unwrap();
    let state = test_state(dir.path()).await;
    let app = router().with_state(state);

    let body = serde_json::json!({"child_id": "child-1", "parent_id": "parent-1"}).to_string();
    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/subsessions")
                .header("content-type", "application/json")
                .body(Body::from(body))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), axum::http::StatusCode::OK);

    let response = app.clone().oneshot(Request::builder().uri("/subsessions").body(Body::empty()).unwrap()).await.unwrap();
    assert_eq!(response.status(), axum::http::StatusCode::OK);

    let response =
        app.clone().oneshot(Request::builder().uri("/subsessions/child-1").body(Body::empty()).unwrap()).await.unwrap();
    assert_eq!(response.status(), axum::http::StatusCode::OK);

    let response = app
        .oneshot(Request::builder().method("DELETE").uri("/subsessions/child-1").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), axum::http::StatusCode::OK);
}

#[tokio::test]
async fn unlink_unknown_child_is_not_found() {
    let dir = tempfile::tempdir().unwrap();
    let state = test_state(dir.path()).await;
    let app = router().with_state(state);

    let response = app
        .oneshot(Request::builder().method("DELETE").uri("/subsessions/nope").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), axum::http::StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn auto_detect_toggle_round_trips() {
    let dir = tempfile::tempdir().unwrap();
    let state = test_state(dir.path()).await;
    let app = router().with_state(state.clone());

    let body = serde_json::json!({"enabled": true}).to_string();
    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/subsessions/auto-detect")
                .header("content-type", "application/json")
                .body(Body::from(body))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), axum::http::StatusCode::OK);
    assert!(state.subsessions.auto_link_enabled());
}

#[tokio::test]
async fn scan_tick_runs_without_error_when_idle() {
    let dir = tempfile::tempdir().unwrap();
    let state = test_state(dir.path()).await;
    let app = router().with_state(state);

    let response = app.oneshot(Request::builder().method("POST").uri("/subsessions/scan").body(Body::empty()).unwrap()).await.unwrap();
    assert_eq!(response.status(), axum::http::StatusCode::OK);
}
