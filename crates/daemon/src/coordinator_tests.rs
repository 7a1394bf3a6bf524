use std::sync::Arc;

use dc_adapters::{FakeAdapter, NoopGuiAutomation, TranscriptMessage};

use super::*;

fn coordinator() -> Coordinator<FakeAdapter, NoopGuiAutomation> {
    let adapter = Arc::new(FakeAdapter::new());
    let injection = Arc::new(InjectionEngine::new(adapter.clone(), Arc::new(NoopGuiAutomation)));
    Coordinator::new(adapter, injection)
}

fn msg(role: &str, content: &str) -> TranscriptMessage {
    TranscriptMessage { role: role.into(), content: content.into(), timestamp_ms: 0 }
}

#[test]
fn list_excludes_hidden_unless_requested() {
    let coordinator = coordinator();
    coordinator.observe(ConversationId::from("visible"), "/tmp".into(), &[], 0);
    coordinator.observe(ConversationId::from("__worker_orch-1-task-1"), "/tmp".into(), &[], 0);

    assert_eq!(coordinator.list(false).len(), 1);
    assert_eq!(coordinator.list(true).len(), 2);
}

#[test]
fn status_derives_from_last_message_role() {
    let coordinator = coordinator();
    let id = ConversationId::from("c1");
    coordinator.observe(id.clone(), "/tmp".into(), &[msg("user", "hi"), msg("tool_action", "reading file")], 0);
    assert_eq!(coordinator.list(true)[0].status, ConversationStatus::Thinking);

    coordinator.observe(id.clone(), "/tmp".into(), &[msg("assistant", "done")], 1);
    assert_eq!(coordinator.list(true)[0].status, ConversationStatus::WaitingInput);
}

#[tokio::test]
async fn get_serves_from_cache_within_ttl() {
    let coordinator = coordinator();
    let id = ConversationId::from("c1");
    coordinator.observe(id.clone(), "/tmp".into(), &[msg("user", "hi")], 0);

    let first = coordinator.get(&id, 0, 10, 0).await.unwrap();
    assert!(!first.cache_hit);
    let second = coordinator.get(&id, 0, 10, 1_000).await.unwrap();
    assert!(second.cache_hit);
}

#[tokio::test]
async fn archive_invalidates_cache_and_removes_conversation() {
    let coordinator = coordinator();
    let id = ConversationId::from("c1");
    coordinator.observe(id.clone(), "/tmp".into(), &[], 0);
    coordinator.archive(&id).await.unwrap();
    assert!(!coordinator.exists(&id));
}

#[tokio::test]
async fn create_registers_new_conversation() {
    let coordinator = coordinator();
    let id = coordinator.create("/tmp", "hello", serde_json::Value::Null, 0).await.unwrap();
    assert!(coordinator.exists(&id));
}
