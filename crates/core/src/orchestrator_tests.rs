// SPDX-License-Identifier: MIT

use super::*;

#[test]
fn terminal_statuses() {
    for s in [OrchestratorStatus::Completed, OrchestratorStatus::Error, OrchestratorStatus::Cancelled] {
        assert!(s.is_terminal());
    }
    for s in [OrchestratorStatus::Created, OrchestratorStatus::Running, OrchestratorStatus::Paused] {
        assert!(!s.is_terminal());
    }
}

#[test]
fn new_instance_starts_in_created_analysis() {
    let o = OrchestratorInstance::new(
        OrchestratorId::generate("orc_"),
        "default",
        ConversationId::from("main-1"),
        "/tmp/project",
        "fix the bug",
        0,
    );
    assert_eq!(o.status, OrchestratorStatus::Created);
    assert_eq!(o.phase, Phase::Analysis);
    assert!(o.tasks.is_empty());
}
