// SPDX-License-Identifier: MIT

//! Success response bodies. All include an ISO-8601 `timestamp` (§6); the
//! shape beyond that is endpoint-specific.

use chrono::Utc;
use serde::Serialize;

use dc_core::{
    Conversation, ConversationId, OrchestratorId, OrchestratorInstance, PermissionRequest, QuestionEntry,
    SubSessionLink, Task, Template, WorkerRecord,
};

fn now_iso8601() -> String {
    Utc::now().to_rfc3339()
}

#[derive(Debug, Serialize)]
pub struct Timestamped<T: Serialize> {
    pub success: bool,
    #[serde(flatten)]
    pub body: T,
    pub timestamp: String,
}

impl<T: Serialize> Timestamped<T> {
    pub fn ok(body: T) -> Self {
        Self { success: true, body, timestamp: now_iso8601() }
    }
}

#[derive(Debug, Serialize)]
pub struct AuthStatusResponse {
    pub gate_enabled: bool,
    pub authenticated: bool,
}

#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub token: String,
    pub expires_at_ms: i64,
}

#[derive(Debug, Serialize)]
pub struct SessionInfoResponse {
    pub source: String,
    pub created_at_ms: i64,
    pub expires_at_ms: i64,
}

#[derive(Debug, Serialize)]
pub struct AuthStatsResponse {
    pub blocked_sources: usize,
    pub active_tokens: usize,
    pub global_lockdown: bool,
}

#[derive(Debug, Serialize)]
pub struct ConversationSummary {
    pub id: ConversationId,
    pub cwd: String,
    pub title: String,
    pub last_activity_ms: i64,
    pub message_count: usize,
    pub status: String,
    pub context_tokens_estimate: u64,
}

impl From<&Conversation> for ConversationSummary {
    fn from(c: &Conversation) -> Self {
        Self {
            id: c.id.clone(),
            cwd: c.cwd.clone(),
            title: c.title.clone(),
            last_activity_ms: c.last_activity_ms,
            message_count: c.message_count,
            status: c.status.to_string(),
            context_tokens_estimate: c.context_tokens_estimate,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct SessionListResponse {
    pub sessions: Vec<ConversationSummary>,
}

#[derive(Debug, Serialize)]
pub struct SessionDetailResponse {
    #[serde(flatten)]
    pub summary: ConversationSummary,
    pub messages: Vec<dc_core::Message>,
    pub cache_hit: bool,
}

#[derive(Debug, Serialize)]
pub struct InjectionStatusResponse {
    pub preferred_method: String,
    pub retry_delay_ms: u64,
    pub counters: serde_json::Value,
}

#[derive(Debug, Serialize)]
pub struct PermissionListResponse {
    pub pending: Vec<PermissionRequest>,
}

#[derive(Debug, Serialize)]
pub struct QuestionListResponse {
    pub pending: Vec<QuestionEntry>,
}

#[derive(Debug, Serialize)]
pub struct TemplateSummary {
    pub id: String,
    pub name: String,
    pub version: String,
    pub extends: Option<String>,
    pub system: bool,
}

impl From<&Template> for TemplateSummary {
    fn from(t: &Template) -> Self {
        Self { id: t.id.clone(), name: t.name.clone(), version: t.version.clone(), extends: t.extends.clone(), system: t.system }
    }
}

#[derive(Debug, Serialize)]
pub struct TemplateListResponse {
    pub templates: Vec<TemplateSummary>,
}

#[derive(Debug, Serialize)]
pub struct TemplateDetailResponse {
    pub template: Template,
}

#[derive(Debug, Serialize)]
pub struct OrchestratorCreatedResponse {
    pub orchestrator_id: OrchestratorId,
}

#[derive(Debug, Serialize)]
pub struct OrchestratorStatusResponse {
    pub orchestrator: OrchestratorInstance,
}

#[derive(Debug, Serialize)]
pub struct OrchestratorTaskListResponse {
    pub tasks: Vec<Task>,
    pub parallel_groups: Vec<Vec<String>>,
}

#[derive(Debug, Serialize)]
pub struct WorkerListResponse {
    pub workers: Vec<WorkerRecord>,
}

#[derive(Debug, Serialize)]
pub struct SubsessionListResponse {
    pub links: Vec<SubSessionLink>,
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub adapter_available: bool,
    pub uptime_ms: i64,
}
