// SPDX-License-Identifier: MIT

//! Conversation: the Session Coordinator's owned entity.

use serde::{Deserialize, Serialize};

use crate::define_id;

define_id! {
    /// Opaque conversation identifier, as reported by the External Adapter.
    pub struct ConversationId;
}

/// Fixed prefix used by the Worker Pool when it mints a child conversation id
/// (§4.G). The Session Coordinator filters ids carrying this prefix out of
/// `List` unless `includeHidden` is set.
pub const HIDDEN_CONVERSATION_PREFIX: &str = "__worker_";

impl ConversationId {
    pub fn is_hidden(&self) -> bool {
        self.as_str().starts_with(HIDDEN_CONVERSATION_PREFIX)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConversationStatus {
    Idle,
    WaitingInput,
    Thinking,
}

crate::simple_display! {
    ConversationStatus {
        Idle => "idle",
        WaitingInput => "waiting_input",
        Thinking => "thinking",
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageRole {
    User,
    Assistant,
    ToolAction,
    TaskUpdate,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub role: MessageRole,
    pub content: String,
    pub timestamp_ms: i64,
}

/// A single conversation thread tracked by the Session Coordinator.
///
/// Mutated only through Coordinator methods; every other component reads it
/// via a snapshot, never a shared reference (§3).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Conversation {
    pub id: ConversationId,
    pub cwd: String,
    pub title: String,
    pub last_activity_ms: i64,
    pub message_count: usize,
    pub status: ConversationStatus,
    pub hidden: bool,
    pub context_tokens_estimate: u64,
    pub messages: Vec<Message>,
}

impl Conversation {
    pub fn new(id: ConversationId, cwd: impl Into<String>, now_ms: i64) -> Self {
        let hidden = id.is_hidden();
        Self {
            id,
            cwd: cwd.into(),
            title: String::new(),
            last_activity_ms: now_ms,
            message_count: 0,
            status: ConversationStatus::Idle,
            hidden,
            context_tokens_estimate: 0,
            messages: Vec::new(),
        }
    }

    /// Return a windowed slice of messages: `(offset, limit)` counted from
    /// the end of the sequence, per §4.C `Get`.
    pub fn message_window(&self, offset: usize, limit: usize) -> &[Message] {
        let len = self.messages.len();
        if offset >= len {
            return &[];
        }
        let end = len - offset;
        let start = end.saturating_sub(limit);
        &self.messages[start..end]
    }
}

#[cfg(test)]
#[path = "conversation_tests.rs"]
mod tests;
