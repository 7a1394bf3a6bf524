// SPDX-License-Identifier: MIT

//! Permission/Question Broker (§4.D): a queue of pending prompts discovered
//! by the same poll that powers the Session Coordinator.

use std::collections::HashMap;
use std::sync::Arc;

use dc_adapters::{AdapterError, DebugAdapter};
use dc_core::{
    ErrorKind, PermissionDecision, PermissionRequest, PermissionRequestId, QuestionEntry, QuestionId,
};
use parking_lot::Mutex;
use thiserror::Error;
use tokio::sync::broadcast;
use tracing::info;

#[derive(Debug, Error)]
pub enum BrokerError {
    #[error("permission request not found: {0}")]
    PermissionNotFound(String),
    #[error("question not found: {0}")]
    QuestionNotFound(String),
    #[error(transparent)]
    Adapter(#[from] AdapterError),
}

impl BrokerError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            BrokerError::PermissionNotFound(m) | BrokerError::QuestionNotFound(m) => ErrorKind::NotFound(m.clone()),
            BrokerError::Adapter(e) => ErrorKind::Unavailable(e.to_string()),
        }
    }
}

/// Queues permission/question prompts surfaced by the Adapter and dispatches
/// the caller's decision back to it, grounded on the same single-map,
/// lock-then-mutate idiom as [`crate::coordinator::Coordinator`].
pub struct Broker<A> {
    adapter: Arc<A>,
    permissions: Mutex<HashMap<PermissionRequestId, PermissionRequest>>,
    questions: Mutex<HashMap<QuestionId, QuestionEntry>>,
    events: broadcast::Sender<dc_core::Event>,
}

impl<A: DebugAdapter> Broker<A> {
    pub fn new(adapter: Arc<A>) -> Self {
        let (events, _) = broadcast::channel(256);
        Self { adapter, permissions: Mutex::new(HashMap::new()), questions: Mutex::new(HashMap::new()), events }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<dc_core::Event> {
        self.events.subscribe()
    }

    /// Registers a permission prompt surfaced by the poll that backs the
    /// Session Coordinator's transcript reads.
    pub fn observe_permission(&self, request: PermissionRequest) {
        let is_new = !self.permissions.lock().contains_key(&request.id);
        if is_new {
            let _ = self.events.send(dc_core::Event::CdpPermissionRequested {
                request_id: request.id.to_string(),
                conversation_id: request.conversation_id.clone(),
                tool_name: request.tool_name.clone(),
            });
        }
        self.permissions.lock().insert(request.id.clone(), request);
    }

    pub fn observe_question(&self, question: QuestionEntry) {
        let is_new = !self.questions.lock().contains_key(&question.id);
        if is_new {
            let _ = self.events.send(dc_core::Event::CdpQuestionAsked {
                question_id: question.id.to_string(),
                conversation_id: question.conversation_id.clone(),
            });
        }
        self.questions.lock().insert(question.id.clone(), question);
    }

    /// Drops entries no longer reported by the Adapter's poll (§4.D:
    /// "unresolved items auto-drop when the Adapter no longer reports
    /// them"), and any whose absolute expiry has passed.
    pub fn reconcile(&self, live_permission_ids: &[PermissionRequestId], live_question_ids: &[QuestionId], now_ms: i64) {
        self.permissions.lock().retain(|id, req| live_permission_ids.contains(id) && !req.is_expired(now_ms));
        self.questions.lock().retain(|id, _| live_question_ids.contains(id));
    }

    pub fn list_pending(&self) -> Vec<PermissionRequest> {
        self.permissions.lock().values().cloned().collect()
    }

    pub fn list_pending_questions(&self) -> Vec<QuestionEntry> {
        self.questions.lock().values().cloned().collect()
    }

    /// `Respond(requestId, decision, parameterOverride?)`: dispatches to the
    /// Adapter then removes the item.
    pub async fn respond(
        &self,
        request_id: &PermissionRequestId,
        decision: PermissionDecision,
        parameter_override: Option<serde_json::Value>,
    ) -> Result<(), BrokerError> {
        let request = self
            .permissions
            .lock()
            .get(request_id)
            .cloned()
            .ok_or_else(|| BrokerError::PermissionNotFound(request_id.to_string()))?;

        let expr = format!(
            "__respondPermission({}, {}, {})",
            serde_json::to_string(request_id.as_str()).unwrap_or_default(),
            serde_json::to_string(&decision_tag(decision)).unwrap_or_default(),
            parameter_override.map(|v| v.to_string()).unwrap_or_else(|| "null".into()),
        );
        let session = self.adapter.attach(request.conversation_id.as_str()).await?;
        self.adapter.evaluate(&session, &expr).await?;

        self.permissions.lock().remove(request_id);
        let _ = self.events.send(dc_core::Event::CdpPermissionResponded {
            request_id: request_id.to_string(),
            decision: decision_tag(decision).to_string(),
        });
        info!(%request_id, "permission responded");
        Ok(())
    }

    /// `RespondQuestion(questionId, answers)`.
    pub async fn respond_question(&self, question_id: &QuestionId, answers: Vec<String>) -> Result<(), BrokerError> {
        let question = self
            .questions
            .lock()
            .get(question_id)
            .cloned()
            .ok_or_else(|| BrokerError::QuestionNotFound(question_id.to_string()))?;

        let expr = format!(
            "__respondQuestion({}, {})",
            serde_json::to_string(question_id.as_str()).unwrap_or_default(),
            serde_json::to_string(&answers).unwrap_or_default(),
        );
        let session = self.adapter.attach(question.conversation_id.as_str()).await?;
        self.adapter.evaluate(&session, &expr).await?;

        self.questions.lock().remove(question_id);
        let _ = self.events.send(dc_core::Event::CdpQuestionAnswered { question_id: question_id.to_string() });
        Ok(())
    }
}

fn decision_tag(decision: PermissionDecision) -> &'static str {
    match decision {
        PermissionDecision::AllowOnce => "allow_once",
        PermissionDecision::AllowAlways => "allow_always",
        PermissionDecision::Deny => "deny",
    }
}

#[cfg(test)]
#[path = "broker_tests.rs"]
mod tests;
