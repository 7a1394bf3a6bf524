// SPDX-License-Identifier: MIT

//! Session Coordinator (§4.C): owns the Conversation map, serves a
//! read-through cache over the Adapter's transcript, and derives
//! edge-triggered status. Grounded on the teacher's `ListenCtx` in owning a
//! single state map behind one lock and exposing plain methods rather than
//! a message-passing actor.

use std::collections::HashMap;
use std::sync::Arc;

use dc_adapters::{DebugAdapter, GuiAutomation, InjectionEngine};
use dc_core::{Conversation, ConversationId, ConversationStatus, ErrorKind, Message, MessageRole};
use parking_lot::Mutex;
use thiserror::Error;
use tokio::sync::broadcast;
use tracing::info;

/// Read-through cache TTL for `Get` (§4.C).
pub const DETAIL_CACHE_TTL_MS: i64 = 5_000;

#[derive(Debug, Error)]
pub enum CoordinatorError {
    #[error("conversation not found: {0}")]
    NotFound(String),
    #[error(transparent)]
    Adapter(#[from] dc_adapters::AdapterError),
    #[error(transparent)]
    Injection(#[from] dc_adapters::InjectionError),
}

impl CoordinatorError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            CoordinatorError::NotFound(m) => ErrorKind::NotFound(m.clone()),
            CoordinatorError::Adapter(e) => match e {
                dc_adapters::AdapterError::Unavailable(m) => ErrorKind::Unavailable(m.clone()),
                dc_adapters::AdapterError::NotFound(m) => ErrorKind::NotFound(m.clone()),
                dc_adapters::AdapterError::Timeout(_) => ErrorKind::Timeout(e.to_string()),
                _ => ErrorKind::Internal(e.to_string()),
            },
            CoordinatorError::Injection(e) => match e {
                dc_adapters::InjectionError::NoStrategyAvailable { tried, last_error } => {
                    ErrorKind::NoStrategyAvailable { tried: tried.clone(), last_error: last_error.clone() }
                }
                dc_adapters::InjectionError::AdapterUnavailable(m) => ErrorKind::Unavailable(m.clone()),
            },
        }
    }
}

struct CacheEntry {
    conversation: Conversation,
    cached_at_ms: i64,
}

/// Result of `Get`: the conversation snapshot plus whether it was served
/// from the read-through cache.
pub struct DetailResult {
    pub conversation: Conversation,
    pub cache_hit: bool,
}

pub struct Coordinator<A, G> {
    adapter: Arc<A>,
    injection: Arc<InjectionEngine<A, G>>,
    conversations: Mutex<HashMap<ConversationId, Conversation>>,
    cache: Mutex<HashMap<ConversationId, CacheEntry>>,
    events: broadcast::Sender<dc_core::Event>,
}

impl<A: DebugAdapter, G: GuiAutomation> Coordinator<A, G> {
    pub fn new(adapter: Arc<A>, injection: Arc<InjectionEngine<A, G>>) -> Self {
        let (events, _) = broadcast::channel(256);
        Self { adapter, injection, conversations: Mutex::new(HashMap::new()), cache: Mutex::new(HashMap::new()), events }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<dc_core::Event> {
        self.events.subscribe()
    }

    fn invalidate(&self, id: &ConversationId) {
        self.cache.lock().remove(id);
    }

    /// `List(includeHidden)`: hidden conversations (the worker-pool prefix)
    /// are excluded unless requested.
    pub fn list(&self, include_hidden: bool) -> Vec<Conversation> {
        self.conversations
            .lock()
            .values()
            .filter(|c| include_hidden || !c.hidden)
            .cloned()
            .collect()
    }

    pub fn exists(&self, id: &ConversationId) -> bool {
        self.conversations.lock().contains_key(id)
    }

    /// Registers or refreshes a conversation observed by the list poller,
    /// deriving its edge-triggered status from the freshly fetched
    /// transcript tail.
    pub fn observe(&self, id: ConversationId, cwd: String, transcript: &[dc_adapters::TranscriptMessage], now_ms: i64) {
        let mut conversations = self.conversations.lock();
        let entry = conversations.entry(id.clone()).or_insert_with(|| Conversation::new(id.clone(), cwd.clone(), now_ms));
        entry.cwd = cwd;
        entry.message_count = transcript.len();
        entry.last_activity_ms = now_ms;
        entry.messages = transcript
            .iter()
            .map(|m| Message { role: parse_role(&m.role), content: m.content.clone(), timestamp_ms: m.timestamp_ms })
            .collect();

        let new_status = derive_status(&entry.messages);
        if new_status != entry.status {
            entry.status = new_status;
            drop(conversations);
            let _ = self.events.send(dc_core::Event::CdpSessionSwitched { conversation_id: id });
        }
    }

    /// `Get(id, pagination)`: read-through cache keyed by conversation id
    /// with a 5 s TTL (§4.C).
    pub async fn get(&self, id: &ConversationId, offset: usize, limit: usize, now_ms: i64) -> Result<DetailResult, CoordinatorError> {
        if let Some(entry) = self.cache.lock().get(id) {
            if now_ms - entry.cached_at_ms < DETAIL_CACHE_TTL_MS {
                let mut conversation = entry.conversation.clone();
                conversation.messages = conversation.message_window(offset, limit).to_vec();
                return Ok(DetailResult { conversation, cache_hit: true });
            }
        }

        let transcript = self.adapter.get_transcript(id.as_str()).await?;
        let cwd = self.conversations.lock().get(id).map(|c| c.cwd.clone()).unwrap_or_default();
        self.observe(id.clone(), cwd, &transcript, now_ms);

        let full = self.conversations.lock().get(id).cloned().ok_or_else(|| CoordinatorError::NotFound(id.to_string()))?;
        self.cache.lock().insert(id.clone(), CacheEntry { conversation: full.clone(), cached_at_ms: now_ms });

        let mut conversation = full;
        conversation.messages = conversation.message_window(offset, limit).to_vec();
        Ok(DetailResult { conversation, cache_hit: false })
    }

    /// `Switch(id)`: serialized through the Adapter, broadcasts
    /// `session-switched`.
    pub async fn switch(&self, id: &ConversationId) -> Result<(), CoordinatorError> {
        self.adapter.switch_session(id.as_str()).await?;
        self.invalidate(id);
        let _ = self.events.send(dc_core::Event::CdpSessionSwitched { conversation_id: id.clone() });
        Ok(())
    }

    /// `SendMessage(id, text)`: delegates to the Injection Engine,
    /// broadcasts `message-injected` (via the Injection Engine itself).
    pub async fn send_message(&self, id: ConversationId, text: &str) -> Result<(), CoordinatorError> {
        self.injection.inject(Some(id.clone()), text).await?;
        self.invalidate(&id);
        Ok(())
    }

    /// `Archive(id)`: Adapter call plus cache invalidate.
    pub async fn archive(&self, id: &ConversationId) -> Result<(), CoordinatorError> {
        self.adapter.archive_session(id.as_str()).await?;
        self.invalidate(id);
        self.conversations.lock().remove(id);
        Ok(())
    }

    /// `Create(cwd, firstMessage, opts)`: delegates to the Adapter and
    /// records the new id.
    pub async fn create(&self, cwd: &str, first_message: &str, options: serde_json::Value, now_ms: i64) -> Result<ConversationId, CoordinatorError> {
        let raw_id = self.adapter.start_new_session(cwd, first_message, options).await?;
        let id = ConversationId::from(raw_id);
        self.conversations.lock().insert(id.clone(), Conversation::new(id.clone(), cwd, now_ms));
        info!(%id, "conversation created");
        Ok(id)
    }
}

fn parse_role(role: &str) -> MessageRole {
    match role {
        "assistant" => MessageRole::Assistant,
        "tool_action" | "tool-action" => MessageRole::ToolAction,
        "task_update" | "task-update" => MessageRole::TaskUpdate,
        _ => MessageRole::User,
    }
}

/// `thinking` if a tool-use/streaming marker is present in the tail,
/// `waiting_input` if the last message is assistant-final, else `idle`
/// (§4.C). Edge-triggered: callers only broadcast when this differs from
/// the conversation's previously recorded status.
fn derive_status(messages: &[Message]) -> ConversationStatus {
    match messages.last() {
        Some(last) if last.role == MessageRole::ToolAction => ConversationStatus::Thinking,
        Some(last) if last.role == MessageRole::Assistant => ConversationStatus::WaitingInput,
        _ => ConversationStatus::Idle,
    }
}

#[cfg(test)]
#[path = "coordinator_tests.rs"]
mod tests;
