use axum::body::Body;
use axum::http::Request;
use dc_core::{ConversationId, PermissionRequest, PermissionRequestId, QuestionEntry, QuestionId, RiskLevel};
use tower::ServiceExt as _;

use super::*;
use crate::test_support::test_state;

fn request(id: &str) -> PermissionRequest {
    PermissionRequest {
        id: PermissionRequestId::from(id),
        conversation_id: ConversationId::from("c1"),
        tool_name: "shell_exec".into(),
        parameter_preview: "rm -rf /tmp/x".into(),
        risk_level: RiskLevel::High,
        created_at_ms: 0,
        expires_at_ms: 60_000,
    }
}

fn question(id: &str) -> QuestionEntry {
    QuestionEntry {
        id: QuestionId::from(id),
        conversation_id: ConversationId::from("c1"),
        prompt: "which approach?".into(),
        options: vec!["a".into(), "b".into()],
        created_at_ms: 0,
        expires_at_ms: 60_000,
    }
}

#[tokio::test]
async fn pending_permissions_lists_observed_requests() {
    let dir = tempfile::tempdir().unwrap();
    let state = test_state(dir.path()).await;
    state.broker.observe_permission(request("req-1"));
    let app = router().with_state(state);

    let response = app.oneshot(Request::builder().uri("/permission/pending").body(Body::empty()).unwrap()).await.unwrap();
    assert_eq!(response.status(), axum::http::StatusCode::OK);
}

#[tokio::test]
async fn respond_to_unknown_permission_is_not_found() {
    let dir = tempfile::tempdir().unwrap();
    let state = test_state(dir.path()).await;
    let app = router().with_state(state);

    let body = serde_json::json!({"request_id": "nope", "decision": "deny"}).to_string();
    let response = app
        .oneshot(Request::builder().method("POST").uri("/permission/respond").header("content-type", "application/json").body(Body::from(body)).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), axum::http::StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn respond_to_observed_question_succeeds() {
    let dir = tempfile::tempdir().unwrap();
    let state = test_state(dir.path()).await;
    state.broker.observe_question(question("q-1"));
    let app = router().with_state(state.clone());

    let body = serde_json::json!({"question_id": "q-1", "answers": ["a"]}).to_string();
    let response = app
        .oneshot(Request::builder().method("POST").uri("/question/respond").header("content-type", "application/json").body(Body::from(body)).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), axum::http::StatusCode::OK);
    assert!(state.broker.list_pending_questions().is_empty());
}
