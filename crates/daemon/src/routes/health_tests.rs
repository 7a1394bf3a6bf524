use axum::body::Body;
use axum::http::Request;
use tower::ServiceExt as _;

use super::*;
use crate::test_support::test_state;

#[tokio::test]
async fn health_reports_ok_and_adapter_availability() {
    let dir = tempfile::tempdir().unwrap();
    let state = test_state(dir.path()).await;
    let app = router().with_state(state);

    let response = app
        .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), axum::http::StatusCode::OK);
}

#[tokio::test]
async fn logs_round_trip_through_get_and_delete() {
    let dir = tempfile::tempdir().unwrap();
    let state = test_state(dir.path()).await;
    state.logs.push(crate::logs::LogEntry { level: "INFO".into(), target: "t".into(), message: "hi".into(), timestamp_ms: 0 });
    let app = router().with_state(state.clone());

    let response = app
        .clone()
        .oneshot(Request::builder().uri("/logs").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), axum::http::StatusCode::OK);

    let response = app
        .oneshot(Request::builder().method("DELETE").uri("/logs").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), axum::http::StatusCode::OK);
    assert!(state.logs.snapshot().is_empty());
}
