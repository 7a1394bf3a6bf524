// SPDX-License-Identifier: MIT

use super::*;
use crate::orchestrator::OrchestratorId;

fn worker_at(now: i64) -> WorkerRecord {
    let mut w = WorkerRecord::new(
        WorkerId::generate("wk_"),
        OrchestratorId::generate("orc_"),
        "task-1",
        ConversationId::from("conv-1"),
        now,
    );
    w.status = WorkerStatus::Running;
    w
}

#[test]
fn boundary_zero_timeout_times_out_on_first_poll() {
    let w = worker_at(1_000);
    // workerTimeout = 0 -> every worker becomes timeout on its first poll after running (§8 boundary).
    assert!(w.is_timed_out(1_000, 0));
}

#[test]
fn not_timed_out_before_deadline() {
    let w = worker_at(1_000);
    assert!(!w.is_timed_out(1_500, 1_000));
    assert!(w.is_timed_out(2_000, 1_000));
}

#[test]
fn terminal_statuses() {
    for s in [WorkerStatus::Completed, WorkerStatus::Failed, WorkerStatus::Timeout, WorkerStatus::Cancelled] {
        assert!(s.is_terminal(), "{s} should be terminal");
    }
    for s in [WorkerStatus::Pending, WorkerStatus::Spawning, WorkerStatus::Running, WorkerStatus::Paused] {
        assert!(!s.is_terminal(), "{s} should not be terminal");
    }
}
