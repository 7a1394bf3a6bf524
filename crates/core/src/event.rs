// SPDX-License-Identifier: MIT

//! Event Bus wire contract (§4.K, §6): the closed set of event kinds every
//! subsystem may broadcast. Each owning component builds `Event` values; the
//! daemon's Hub is the only thing that serialises and fans them out.
//!
//! This replaces the "event-emitter inheritance" idiom named in §9 with an
//! explicit, closed sum type — there is no `on(eventName)` string dispatch
//! at the boundary.

use serde::{Deserialize, Serialize};

use crate::conversation::ConversationId;
use crate::orchestrator::{OrchestratorId, OrchestratorStatus};
use crate::worker::{WorkerId, WorkerStatus};

/// Events broadcast to every connected WS client.
///
/// Serialises as `{"type": "...", ...fields, "timestamp": ...}` — `timestamp`
/// is stamped by the Hub at send time, not carried on the variant.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Event {
    #[serde(rename = "connected")]
    Connected { usage: serde_json::Value },

    #[serde(rename = "ping")]
    Ping,
    #[serde(rename = "pong")]
    Pong,
    #[serde(rename = "shutdown")]
    Shutdown,

    #[serde(rename = "usage-updated")]
    UsageUpdated { usage: serde_json::Value },

    // -- security / gate --
    #[serde(rename = "security-ip-blocked")]
    SecurityIpBlocked { source: String },
    #[serde(rename = "security-alert")]
    SecurityAlert { message: String },
    #[serde(rename = "global-lockdown")]
    GlobalLockdown { reason: String },
    #[serde(rename = "security-login-failed")]
    SecurityLoginFailed { source: String, attempts_remaining: u32 },

    // -- injection --
    #[serde(rename = "injection-started")]
    InjectionStarted { conversation_id: ConversationId, method: String },
    #[serde(rename = "injection-success")]
    InjectionSuccess { conversation_id: ConversationId, method: String, duration_ms: u64 },
    #[serde(rename = "injection-failed")]
    InjectionFailed { conversation_id: ConversationId, tried: Vec<String>, last_error: String },
    #[serde(rename = "injection-error")]
    InjectionError { conversation_id: ConversationId, error: String },
    #[serde(rename = "message-injected")]
    MessageInjected { conversation_id: ConversationId },

    // -- session coordinator --
    #[serde(rename = "cdp-session-switched")]
    CdpSessionSwitched { conversation_id: ConversationId },
    #[serde(rename = "cdp-connections-detected")]
    CdpConnectionsDetected { count: usize },
    #[serde(rename = "cdp-connection-count-changed")]
    CdpConnectionCountChanged { count: usize },

    // -- permission/question broker --
    #[serde(rename = "cdp-permission-requested")]
    CdpPermissionRequested { request_id: String, conversation_id: ConversationId, tool_name: String },
    #[serde(rename = "cdp-permission-responded")]
    CdpPermissionResponded { request_id: String, decision: String },
    #[serde(rename = "cdp-question-asked")]
    CdpQuestionAsked { question_id: String, conversation_id: ConversationId },
    #[serde(rename = "cdp-question-answered")]
    CdpQuestionAnswered { question_id: String },

    // -- orchestrator --
    #[serde(rename = "orchestrator:created")]
    OrchestratorCreated { orchestrator_id: OrchestratorId },
    #[serde(rename = "orchestrator:status-changed")]
    OrchestratorStatusChanged { orchestrator_id: OrchestratorId, status: OrchestratorStatus },
    #[serde(rename = "orchestrator:analysis-ready")]
    OrchestratorAnalysisReady { orchestrator_id: OrchestratorId },
    #[serde(rename = "orchestrator:tasks-ready")]
    OrchestratorTasksReady { orchestrator_id: OrchestratorId, task_count: usize },
    #[serde(rename = "orchestrator:confirmed")]
    OrchestratorConfirmed { orchestrator_id: OrchestratorId },
    #[serde(rename = "orchestrator:aggregating")]
    OrchestratorAggregating { orchestrator_id: OrchestratorId },
    #[serde(rename = "orchestrator:conflicts")]
    OrchestratorConflicts { orchestrator_id: OrchestratorId, conflicts: Vec<String> },
    #[serde(rename = "orchestrator:verifying")]
    OrchestratorVerifying { orchestrator_id: OrchestratorId },
    #[serde(rename = "orchestrator:completed")]
    OrchestratorCompleted { orchestrator_id: OrchestratorId },
    #[serde(rename = "orchestrator:error")]
    OrchestratorError { orchestrator_id: OrchestratorId, error: String },
    #[serde(rename = "orchestrator:cancelled")]
    OrchestratorCancelled { orchestrator_id: OrchestratorId },
    #[serde(rename = "orchestrator:paused")]
    OrchestratorPaused { orchestrator_id: OrchestratorId },
    #[serde(rename = "orchestrator:resumed")]
    OrchestratorResumed { orchestrator_id: OrchestratorId },

    // -- worker pool --
    #[serde(rename = "worker:spawned")]
    WorkerSpawned { orchestrator_id: OrchestratorId, worker_id: WorkerId, task_id: String },
    #[serde(rename = "worker:progress")]
    WorkerProgress { orchestrator_id: OrchestratorId, worker_id: WorkerId, progress_percent: u8 },
    #[serde(rename = "worker:completed")]
    WorkerCompleted { orchestrator_id: OrchestratorId, worker_id: WorkerId },
    #[serde(rename = "worker:failed")]
    WorkerFailed { orchestrator_id: OrchestratorId, worker_id: WorkerId, error: String },
    #[serde(rename = "worker:timeout")]
    WorkerTimeout { orchestrator_id: OrchestratorId, worker_id: WorkerId },
    #[serde(rename = "worker:cancelled")]
    WorkerCancelled { orchestrator_id: OrchestratorId, worker_id: WorkerId },
    #[serde(rename = "worker:retrying")]
    WorkerRetrying { orchestrator_id: OrchestratorId, worker_id: WorkerId, retry_count: u32 },

    // -- sub-session tracker --
    #[serde(rename = "subsession:linked")]
    SubsessionLinked { child_id: ConversationId, parent_id: ConversationId },
    #[serde(rename = "subsession:completing")]
    SubsessionCompleting { child_id: ConversationId },
    #[serde(rename = "subsession:completed")]
    SubsessionCompleted { child_id: ConversationId },
    #[serde(rename = "subsession:returned")]
    SubsessionReturned { child_id: ConversationId, parent_id: ConversationId },
    #[serde(rename = "subsession:orphaned")]
    SubsessionOrphaned { child_id: ConversationId },
}

impl Event {
    /// The `status ∈ terminal` check used by worker-pool invariants also
    /// applies here when tests assert monotonic terminal counts.
    pub fn worker_status(&self) -> Option<WorkerStatus> {
        match self {
            Event::WorkerCompleted { .. } => Some(WorkerStatus::Completed),
            Event::WorkerFailed { .. } => Some(WorkerStatus::Failed),
            Event::WorkerTimeout { .. } => Some(WorkerStatus::Timeout),
            Event::WorkerCancelled { .. } => Some(WorkerStatus::Cancelled),
            _ => None,
        }
    }
}

#[cfg(test)]
#[path = "event_tests.rs"]
mod tests;
