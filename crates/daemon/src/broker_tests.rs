use std::sync::Arc;

use dc_adapters::FakeAdapter;
use dc_core::{ConversationId, RiskLevel};

use super::*;

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

#[test]
fn observe_registers_pending_permission() {
    let broker = Broker::new(Arc::new(FakeAdapter::new()));
    broker.observe_permission(request("req-1"));
    assert_eq!(broker.list_pending().len(), 1);
}

#[test]
fn reconcile_drops_items_adapter_no_longer_reports() {
    let broker = Broker::new(Arc::new(FakeAdapter::new()));
    broker.observe_permission(request("req-1"));
    broker.reconcile(&[], &[], 0);
    assert!(broker.list_pending().is_empty());
}

#[test]
fn reconcile_drops_expired_items() {
    let broker = Broker::new(Arc::new(FakeAdapter::new()));
    let id = PermissionRequestId::from("req-1");
    broker.observe_permission(request("req-1"));
    broker.reconcile(&[id], &[], 70_000);
    assert!(broker.list_pending().is_empty());
}

#[tokio::test]
async fn respond_dispatches_and_removes_request() {
    let broker = Broker::new(Arc::new(FakeAdapter::new()));
    let id = PermissionRequestId::from("req-1");
    broker.observe_permission(request("req-1"));

    broker.respond(&id, PermissionDecision::AllowOnce, None).await.unwrap();
    assert!(broker.list_pending().is_empty());
}

#[tokio::test]
async fn respond_unknown_request_fails() {
    let broker = Broker::new(Arc::new(FakeAdapter::new()));
    let err = broker.respond(&PermissionRequestId::from("nope"), PermissionDecision::Deny, None).await.unwrap_err();
    assert!(matches!(err, BrokerError::PermissionNotFound(_)));
}

#[tokio::test]
async fn respond_question_dispatches_and_removes() {
    let broker = Broker::new(Arc::new(FakeAdapter::new()));
    let id = QuestionId::from("q-1");
    broker.observe_question(question("q-1"));

    broker.respond_question(&id, vec!["a".into()]).await.unwrap();
    assert!(broker.list_pending_questions().is_empty());
}
