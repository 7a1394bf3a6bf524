// SPDX-License-Identifier: MIT

//! Permission/question prompts: the Broker's owned entity (§3, §4.D).

use serde::{Deserialize, Serialize};

use crate::conversation::ConversationId;
use crate::define_id;

define_id! {
    pub struct PermissionRequestId;
}

define_id! {
    pub struct QuestionId;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RiskLevel {
    Low,
    Medium,
    High,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PermissionDecision {
    AllowOnce,
    AllowAlways,
    Deny,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PermissionRequest {
    pub id: PermissionRequestId,
    pub conversation_id: ConversationId,
    pub tool_name: String,
    pub parameter_preview: String,
    pub risk_level: RiskLevel,
    pub created_at_ms: i64,
    pub expires_at_ms: i64,
}

impl PermissionRequest {
    pub fn is_expired(&self, now_ms: i64) -> bool {
        now_ms >= self.expires_at_ms
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuestionEntry {
    pub id: QuestionId,
    pub conversation_id: ConversationId,
    pub prompt: String,
    pub options: Vec<String>,
    pub created_at_ms: i64,
    pub expires_at_ms: i64,
}
