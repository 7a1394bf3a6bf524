// SPDX-License-Identifier: MIT

//! Request bodies, one struct per endpoint that accepts a JSON body (§6).

use serde::Deserialize;
use std::collections::BTreeMap;

use dc_core::{PermissionDecision, Priority};

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub pin: String,
}

#[derive(Debug, Deserialize)]
pub struct SwitchSessionRequest {
    pub conversation_id: String,
}

#[derive(Debug, Deserialize)]
pub struct SendMessageRequest {
    pub conversation_id: String,
    pub text: String,
}

#[derive(Debug, Deserialize)]
pub struct NewSessionRequest {
    pub cwd: String,
    pub first_message: String,
    #[serde(default)]
    pub options: serde_json::Value,
}

#[derive(Debug, Deserialize)]
pub struct InjectRequest {
    #[serde(default)]
    pub conversation_id: Option<String>,
    pub text: String,
}

#[derive(Debug, Deserialize)]
pub struct ConfigureInjectionRequest {
    #[serde(default)]
    pub preferred_method: Option<String>,
    #[serde(default)]
    pub retry_delay_ms: Option<u64>,
}

#[derive(Debug, Deserialize)]
pub struct QueueInjectRequest {
    pub conversation_id: String,
    pub text: String,
}

#[derive(Debug, Deserialize)]
pub struct PermissionRespondRequest {
    pub request_id: String,
    pub decision: PermissionDecision,
    #[serde(default)]
    pub parameter_override: Option<serde_json::Value>,
}

#[derive(Debug, Deserialize)]
pub struct QuestionRespondRequest {
    pub question_id: String,
    pub answers: Vec<String>,
}

#[derive(Debug, Deserialize)]
pub struct CreateOrchestratorRequest {
    pub template_id: String,
    pub cwd: String,
    pub user_request: String,
}

#[derive(Debug, Deserialize)]
pub struct OrchestratorMessageRequest {
    pub text: String,
}

#[derive(Debug, Deserialize)]
pub struct TaskInput {
    pub id: String,
    pub title: String,
    pub description: String,
    #[serde(default)]
    pub scope: Vec<String>,
    #[serde(default)]
    pub priority: Priority,
    #[serde(default)]
    pub dependencies: Vec<String>,
}

#[derive(Debug, Deserialize)]
pub struct CreateTemplateRequest {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub extends: Option<String>,
    #[serde(default)]
    pub body: serde_json::Value,
}

#[derive(Debug, Deserialize)]
pub struct UpdateTemplateRequest {
    pub body: serde_json::Value,
}

#[derive(Debug, Deserialize)]
pub struct DuplicateTemplateRequest {
    pub new_name: String,
}

#[derive(Debug, Deserialize)]
pub struct ImportTemplateRequest {
    pub id: String,
    pub document: serde_json::Value,
}

#[derive(Debug, Deserialize)]
pub struct CreateSubsessionRequest {
    pub child_id: String,
    pub parent_id: String,
    #[serde(default)]
    pub originating_tool_invocation_id: Option<String>,
}

pub type Variables = BTreeMap<String, String>;
