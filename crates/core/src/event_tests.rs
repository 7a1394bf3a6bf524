// SPDX-License-Identifier: MIT

use super::*;

#[test]
fn wire_tag_matches_canonical_type_value() {
    let ev = Event::MessageInjected { conversation_id: ConversationId::from("c1") };
    let v = serde_json::to_value(&ev).unwrap();
    assert_eq!(v["type"], "message-injected");
}

#[test]
fn namespaced_events_round_trip() {
    let ev = Event::OrchestratorStatusChanged {
        orchestrator_id: OrchestratorId::from("orc1"),
        status: OrchestratorStatus::Running,
    };
    let v = serde_json::to_value(&ev).unwrap();
    assert_eq!(v["type"], "orchestrator:status-changed");
    let back: Event = serde_json::from_value(v).unwrap();
    matches!(back, Event::OrchestratorStatusChanged { .. });
}

#[test]
fn worker_status_extraction_covers_terminal_events() {
    let ev = Event::WorkerTimeout { orchestrator_id: OrchestratorId::from("o"), worker_id: WorkerId::from("w") };
    assert_eq!(ev.worker_status(), Some(WorkerStatus::Timeout));

    let ev = Event::Ping;
    assert_eq!(ev.worker_status(), None);
}
