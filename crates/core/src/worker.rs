// SPDX-License-Identifier: MIT

//! Worker state: the Worker Pool's owned entity (§3, §4.G).

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::conversation::ConversationId;
use crate::define_id;
use crate::orchestrator::OrchestratorId;

define_id! {
    /// Worker identifier, unique within the owning orchestrator.
    pub struct WorkerId;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkerStatus {
    Pending,
    Spawning,
    Running,
    Paused,
    Completed,
    Failed,
    Timeout,
    Cancelled,
}

crate::simple_display! {
    WorkerStatus {
        Pending => "pending",
        Spawning => "spawning",
        Running => "running",
        Paused => "paused",
        Completed => "completed",
        Failed => "failed",
        Timeout => "timeout",
        Cancelled => "cancelled",
    }
}

impl WorkerStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            WorkerStatus::Completed | WorkerStatus::Failed | WorkerStatus::Timeout | WorkerStatus::Cancelled
        )
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ToolUseCounters {
    pub files_read: u32,
    pub files_written: u32,
    pub commands_run: u32,
    pub searches: u32,
}

/// A worker record, one per `(orchestrator, task)` pair while the
/// orchestrator is active (invariant, §3).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkerRecord {
    pub worker_id: WorkerId,
    pub orchestrator_id: OrchestratorId,
    pub task_id: String,
    pub conversation_id: ConversationId,
    pub status: WorkerStatus,
    pub progress_percent: u8,
    pub current_action: Option<String>,
    pub counters: ToolUseCounters,
    pub output: Option<String>,
    pub output_files: Vec<String>,
    pub error: Option<String>,
    pub retry_count: u32,
    pub started_at_ms: i64,
    pub completed_at_ms: Option<i64>,
    pub transcript_offset: usize,
}

impl WorkerRecord {
    pub fn new(
        worker_id: WorkerId,
        orchestrator_id: OrchestratorId,
        task_id: impl Into<String>,
        conversation_id: ConversationId,
        now_ms: i64,
    ) -> Self {
        Self {
            worker_id,
            orchestrator_id,
            task_id: task_id.into(),
            conversation_id,
            status: WorkerStatus::Pending,
            progress_percent: 0,
            current_action: None,
            counters: ToolUseCounters::default(),
            output: None,
            output_files: Vec::new(),
            error: None,
            retry_count: 0,
            started_at_ms: now_ms,
            completed_at_ms: None,
            transcript_offset: 0,
        }
    }

    pub fn is_timed_out(&self, now_ms: i64, worker_timeout_ms: u64) -> bool {
        self.status == WorkerStatus::Running && now_ms.saturating_sub(self.started_at_ms) as u64 >= worker_timeout_ms
    }
}

/// Outputs collected per task once every worker in a group is terminal
/// (§4.G "Output collection").
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkerOutput {
    pub task_id: String,
    pub status: WorkerStatus,
    pub summary: Option<String>,
    pub output_files: Vec<String>,
    pub error: Option<String>,
    pub counters: ToolUseCounters,
}

impl From<&WorkerRecord> for WorkerOutput {
    fn from(w: &WorkerRecord) -> Self {
        WorkerOutput {
            task_id: w.task_id.clone(),
            status: w.status,
            summary: w.output.clone(),
            output_files: w.output_files.clone(),
            error: w.error.clone(),
            counters: w.counters.clone(),
        }
    }
}

pub type WorkerIndex = HashMap<String, WorkerId>;

#[cfg(test)]
#[path = "worker_tests.rs"]
mod tests;
