// SPDX-License-Identifier: MIT

//! Sub-session link: the Sub-session Tracker's owned entity (§3, §4.I).

use serde::{Deserialize, Serialize};

use crate::conversation::ConversationId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubSessionStatus {
    Active,
    Completing,
    Completed,
    Returned,
    Orphaned,
    Error,
}

crate::simple_display! {
    SubSessionStatus {
        Active => "active",
        Completing => "completing",
        Completed => "completed",
        Returned => "returned",
        Orphaned => "orphaned",
        Error => "error",
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubSessionLink {
    pub child_id: ConversationId,
    pub parent_id: ConversationId,
    #[serde(default)]
    pub originating_tool_invocation_id: Option<String>,
    pub status: SubSessionStatus,
    pub last_activity_ms: i64,
    #[serde(default)]
    pub last_assistant_message: Option<String>,
}

/// Marker prefix the Tracker prepends before lifting a completed child's
/// final reply into its parent (§4.I).
pub const LIFTED_REPLY_MARKER: &str = "[sub-session result]";
