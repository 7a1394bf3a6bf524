// SPDX-License-Identifier: MIT

//! Orchestrator instance: the Orchestrator Engine's owned entity (§3, §4.H).

use serde::{Deserialize, Serialize};

use crate::conversation::ConversationId;
use crate::define_id;
use crate::task::Task;
use crate::worker::WorkerIndex;

define_id! {
    /// Identifier for one running orchestrator instance.
    pub struct OrchestratorId;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrchestratorStatus {
    Created,
    Analyzing,
    Planning,
    AwaitingConfirmation,
    Spawning,
    Running,
    Aggregating,
    Verifying,
    Completed,
    Error,
    Cancelled,
    Paused,
}

crate::simple_display! {
    OrchestratorStatus {
        Created => "created",
        Analyzing => "analyzing",
        Planning => "planning",
        AwaitingConfirmation => "awaiting_confirmation",
        Spawning => "spawning",
        Running => "running",
        Aggregating => "aggregating",
        Verifying => "verifying",
        Completed => "completed",
        Error => "error",
        Cancelled => "cancelled",
        Paused => "paused",
    }
}

impl OrchestratorStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, OrchestratorStatus::Completed | OrchestratorStatus::Error | OrchestratorStatus::Cancelled)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Phase {
    Analysis,
    TaskPlanning,
    WorkerExecution,
    Aggregation,
    Verification,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AnalysisResult {
    pub summary: String,
    pub recommended_splits: u32,
    #[serde(default)]
    pub key_files: Vec<String>,
    #[serde(default)]
    pub components: Vec<String>,
    #[serde(default)]
    pub warnings: Vec<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AggregationResult {
    pub status: String,
    #[serde(default)]
    pub conflicts: Vec<String>,
    #[serde(default)]
    pub merged_output: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct VerificationResult {
    pub status: String,
    #[serde(default)]
    pub issues: Vec<String>,
}

/// One parallel group: a set of task ids whose dependencies are already
/// satisfied, eligible to run concurrently subject to `maxWorkers` (§4.H).
pub type ParallelGroup = Vec<String>;

/// A running (or terminated) instance of a template coordinating one main
/// conversation and many worker conversations.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrchestratorInstance {
    pub id: OrchestratorId,
    pub template_id: String,
    pub main_conversation_id: ConversationId,
    pub cwd: String,
    pub user_request: String,
    pub status: OrchestratorStatus,
    pub phase: Phase,
    pub previous_status: Option<OrchestratorStatus>,
    pub analysis: Option<AnalysisResult>,
    pub tasks: Vec<Task>,
    pub parallel_groups: Vec<ParallelGroup>,
    pub current_group: usize,
    pub worker_index: WorkerIndex,
    pub aggregation: Option<AggregationResult>,
    pub verification: Option<VerificationResult>,
    pub errors: Vec<String>,
    pub created_at_ms: i64,
    pub updated_at_ms: i64,
    /// Transcript offset on the main conversation already consumed, so a
    /// resumed engine does not re-dispatch prompts it already observed.
    pub main_transcript_offset: usize,
}

impl OrchestratorInstance {
    pub fn new(
        id: OrchestratorId,
        template_id: impl Into<String>,
        main_conversation_id: ConversationId,
        cwd: impl Into<String>,
        user_request: impl Into<String>,
        now_ms: i64,
    ) -> Self {
        Self {
            id,
            template_id: template_id.into(),
            main_conversation_id,
            cwd: cwd.into(),
            user_request: user_request.into(),
            status: OrchestratorStatus::Created,
            phase: Phase::Analysis,
            previous_status: None,
            analysis: None,
            tasks: Vec::new(),
            parallel_groups: Vec::new(),
            current_group: 0,
            worker_index: WorkerIndex::new(),
            aggregation: None,
            verification: None,
            errors: Vec::new(),
            created_at_ms: now_ms,
            updated_at_ms: now_ms,
            main_transcript_offset: 0,
        }
    }
}

#[cfg(test)]
#[path = "orchestrator_tests.rs"]
mod tests;
