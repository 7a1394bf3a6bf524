use super::*;
use dc_adapters::{FakeAdapter, NoopGuiAutomation};
use std::sync::Arc;

fn tracker() -> SubSessionTracker<FakeAdapter, NoopGuiAutomation> {
    let injection = Arc::new(InjectionEngine::new(Arc::new(FakeAdapter::new()), Arc::new(NoopGuiAutomation)));
    SubSessionTracker::new(injection)
}

fn always_exists(_: &ConversationId) -> bool {
    true
}

fn never_exists(_: &ConversationId) -> bool {
    false
}

#[tokio::test]
async fn inactivity_moves_active_to_completing_then_completed_and_lifts_reply() {
    let tracker = tracker();
    let child = ConversationId::from("child-1");
    let parent = ConversationId::from("parent-1");
    tracker.link(child.clone(), parent.clone(), None, 0);
    tracker.note_activity(&child, Some("final answer".to_string()), 0);

    tracker.poll(COMPLETING_THRESHOLD_MS, always_exists).await.unwrap();
    assert_eq!(tracker.get(&child).unwrap().status, SubSessionStatus::Completing);

    tracker.poll(COMPLETING_THRESHOLD_MS + COMPLETED_THRESHOLD_MS, always_exists).await.unwrap();
    assert_eq!(tracker.get(&child).unwrap().status, SubSessionStatus::Returned);
}

#[tokio::test]
async fn activity_resets_completing_back_to_active() {
    let tracker = tracker();
    let child = ConversationId::from("child-2");
    let parent = ConversationId::from("parent-2");
    tracker.link(child.clone(), parent, None, 0);

    tracker.poll(COMPLETING_THRESHOLD_MS, always_exists).await.unwrap();
    assert_eq!(tracker.get(&child).unwrap().status, SubSessionStatus::Completing);

    tracker.note_activity(&child, None, COMPLETING_THRESHOLD_MS + 1);
    assert_eq!(tracker.get(&child).unwrap().status, SubSessionStatus::Active);
}

#[tokio::test]
async fn missing_parent_marks_orphaned() {
    let tracker = tracker();
    let child = ConversationId::from("child-3");
    let parent = ConversationId::from("parent-3");
    tracker.link(child.clone(), parent, None, 0);

    tracker.poll(1_000, never_exists).await.unwrap();
    assert_eq!(tracker.get(&child).unwrap().status, SubSessionStatus::Orphaned);
}

#[test]
fn auto_link_only_matches_within_window_when_enabled() {
    let tracker = tracker();
    let parent = ConversationId::from("parent-4");
    let child = ConversationId::from("child-4");

    tracker.record_tool_spawn(parent.clone(), 0);
    tracker.maybe_auto_link(child.clone(), AUTO_LINK_WINDOW_MS + 1);
    assert!(tracker.get(&child).is_none(), "auto-link disabled by default");

    tracker.set_auto_link_enabled(true);
    tracker.record_tool_spawn(parent.clone(), 1_000);
    tracker.maybe_auto_link(child.clone(), 1_000 + AUTO_LINK_WINDOW_MS - 1);
    assert_eq!(tracker.get(&child).unwrap().parent_id, parent);
}
