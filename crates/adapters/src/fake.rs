// SPDX-License-Identifier: MIT

//! In-memory `DebugAdapter` for tests in other crates, gated behind
//! `test-support` (mirrors the teacher's `FakeAgentAdapter`).

use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::Value;

use crate::debug_adapter::{
    AdapterError, AvailabilityStatus, DebugAdapter, PageDescriptor, SessionHandle, TranscriptMessage,
};

#[derive(Debug, Clone, PartialEq)]
pub enum FakeCall {
    Evaluate { session: String, expression: String },
    DispatchKeys { session: String, text: String },
    InsertText { session: String, text: String },
    Focus { session: String },
    StartNewSession { cwd: String, first_message: String },
    ArchiveSession { conversation_id: String },
    SwitchSession { conversation_id: String },
}

#[derive(Default)]
struct State {
    calls: Vec<FakeCall>,
    transcripts: std::collections::HashMap<String, Vec<TranscriptMessage>>,
    available: bool,
    next_session_id: u64,
    /// Injection text and keyboard dispatch calls that should fail, so
    /// strategy-fallback tests can force a specific step to error out.
    failing_calls: std::collections::HashSet<&'static str>,
}

/// Scriptable `DebugAdapter` double. Defaults to "available" with an empty
/// transcript for every conversation; tests mutate it via the public
/// methods before exercising the code under test.
pub struct FakeAdapter {
    state: Arc<Mutex<State>>,
}

impl Default for FakeAdapter {
    fn default() -> Self {
        Self { state: Arc::new(Mutex::new(State { available: true, ..Default::default() })) }
    }
}

impl FakeAdapter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_available(&self, available: bool) {
        self.state.lock().available = available;
    }

    pub fn set_transcript(&self, conversation_id: &str, messages: Vec<TranscriptMessage>) {
        self.state.lock().transcripts.insert(conversation_id.to_string(), messages);
    }

    /// Make the named operation ("evaluate", "dispatch_keys", "insert_text",
    /// "focus") fail on every subsequent call, to test fallback ordering.
    pub fn fail_operation(&self, op: &'static str) {
        self.state.lock().failing_calls.insert(op);
    }

    pub fn calls(&self) -> Vec<FakeCall> {
        self.state.lock().calls.clone()
    }
}

#[async_trait]
impl DebugAdapter for FakeAdapter {
    async fn list_pages(&self) -> Result<Vec<PageDescriptor>, AdapterError> {
        if !self.state.lock().available {
            return Err(AdapterError::Unavailable("fake adapter offline".into()));
        }
        Ok(vec![PageDescriptor { id: "page-1".into(), title: "fake".into(), url: "about:blank".into() }])
    }

    async fn attach(&self, page_id: &str) -> Result<SessionHandle, AdapterError> {
        if !self.state.lock().available {
            return Err(AdapterError::Unavailable("fake adapter offline".into()));
        }
        Ok(SessionHandle { page_id: page_id.to_string() })
    }

    async fn evaluate(&self, session: &SessionHandle, expression: &str) -> Result<Value, AdapterError> {
        let mut state = self.state.lock();
        if state.failing_calls.contains("evaluate") {
            return Err(AdapterError::Runtime("forced failure".into()));
        }
        state.calls.push(FakeCall::Evaluate { session: session.page_id.clone(), expression: expression.to_string() });
        Ok(Value::Null)
    }

    async fn dispatch_keys(&self, session: &SessionHandle, text: &str) -> Result<(), AdapterError> {
        let mut state = self.state.lock();
        if state.failing_calls.contains("dispatch_keys") {
            return Err(AdapterError::Runtime("forced failure".into()));
        }
        state.calls.push(FakeCall::DispatchKeys { session: session.page_id.clone(), text: text.to_string() });
        Ok(())
    }

    async fn insert_text(&self, session: &SessionHandle, text: &str) -> Result<(), AdapterError> {
        let mut state = self.state.lock();
        if state.failing_calls.contains("insert_text") {
            return Err(AdapterError::Runtime("forced failure".into()));
        }
        state.calls.push(FakeCall::InsertText { session: session.page_id.clone(), text: text.to_string() });
        Ok(())
    }

    async fn focus(&self, session: &SessionHandle) -> Result<(), AdapterError> {
        let mut state = self.state.lock();
        if state.failing_calls.contains("focus") {
            return Err(AdapterError::Runtime("forced failure".into()));
        }
        state.calls.push(FakeCall::Focus { session: session.page_id.clone() });
        Ok(())
    }

    async fn get_transcript(&self, conversation_id: &str) -> Result<Vec<TranscriptMessage>, AdapterError> {
        Ok(self.state.lock().transcripts.get(conversation_id).cloned().unwrap_or_default())
    }

    async fn start_new_session(&self, cwd: &str, first_message: &str, _options: Value) -> Result<String, AdapterError> {
        let mut state = self.state.lock();
        state.next_session_id += 1;
        let id = format!("conv-{}", state.next_session_id);
        state.calls.push(FakeCall::StartNewSession { cwd: cwd.to_string(), first_message: first_message.to_string() });
        Ok(id)
    }

    async fn archive_session(&self, conversation_id: &str) -> Result<(), AdapterError> {
        self.state.lock().calls.push(FakeCall::ArchiveSession { conversation_id: conversation_id.to_string() });
        Ok(())
    }

    async fn switch_session(&self, conversation_id: &str) -> Result<(), AdapterError> {
        self.state.lock().calls.push(FakeCall::SwitchSession { conversation_id: conversation_id.to_string() });
        Ok(())
    }

    async fn availability_check(&self) -> AvailabilityStatus {
        let available = self.state.lock().available;
        AvailabilityStatus { available, reason: if available { None } else { Some("fake adapter offline".into()) } }
    }
}

#[cfg(test)]
#[path = "fake_tests.rs"]
mod tests;
