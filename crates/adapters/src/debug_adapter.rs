// SPDX-License-Identifier: MIT

//! `DebugAdapter`: the External Adapter's contract (§4.A).
//!
//! Grounded on the teacher's `AgentAdapter` trait — same shape of a single
//! `async_trait` interface with a companion error enum, so every concrete
//! transport (here: [`crate::cdp::CdpAdapter`], and the test-only
//! [`crate::fake::FakeAdapter`]) is interchangeable from the caller's side.

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Every call against a `DebugAdapter` is given this long to complete
/// before it is treated as a `Timeout`.
pub const DEFAULT_CALL_DEADLINE: Duration = Duration::from_secs(10);

#[derive(Debug, Error)]
pub enum AdapterError {
    /// No reachable target at all — maps to §7 `Unavailable`.
    #[error("debug endpoint unavailable: {0}")]
    Unavailable(String),
    /// Frame-layer / connection failure distinct from a clean "no target".
    #[error("transport error: {0}")]
    Transport(String),
    /// The remote side returned a runtime error for an `Evaluate` call.
    #[error("runtime error: {0}")]
    Runtime(String),
    /// Deadline elapsed before a reply arrived.
    #[error("adapter call timed out after {0:?}")]
    Timeout(Duration),
    #[error("session not found: {0}")]
    NotFound(String),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PageDescriptor {
    pub id: String,
    pub title: String,
    pub url: String,
}

/// Handle returned by `Attach`: a multiplexed command/response channel for
/// one page. Cloning is cheap; the underlying transport serializes writes.
#[derive(Debug, Clone)]
pub struct SessionHandle {
    pub page_id: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TranscriptMessage {
    pub role: String,
    pub content: String,
    pub timestamp_ms: i64,
}

#[derive(Debug, Clone)]
pub struct AvailabilityStatus {
    pub available: bool,
    pub reason: Option<String>,
}

/// Connects to the remote-debugging endpoint and exposes synchronous-looking
/// operations over it (§4.A). Implementors own re-attach/backoff internally;
/// callers never retry business operations themselves.
#[async_trait]
pub trait DebugAdapter: Send + Sync + 'static {
    async fn list_pages(&self) -> Result<Vec<PageDescriptor>, AdapterError>;

    async fn attach(&self, page_id: &str) -> Result<SessionHandle, AdapterError>;

    async fn evaluate(&self, session: &SessionHandle, expression: &str) -> Result<serde_json::Value, AdapterError>;

    async fn dispatch_keys(&self, session: &SessionHandle, text: &str) -> Result<(), AdapterError>;

    async fn insert_text(&self, session: &SessionHandle, text: &str) -> Result<(), AdapterError>;

    async fn focus(&self, session: &SessionHandle) -> Result<(), AdapterError>;

    /// Implemented by evaluating probes into the renderer; message content
    /// is opaque to the Adapter, it only relays what the page returns.
    async fn get_transcript(&self, conversation_id: &str) -> Result<Vec<TranscriptMessage>, AdapterError>;

    async fn start_new_session(
        &self,
        cwd: &str,
        first_message: &str,
        options: serde_json::Value,
    ) -> Result<String, AdapterError>;

    async fn archive_session(&self, conversation_id: &str) -> Result<(), AdapterError>;

    async fn switch_session(&self, conversation_id: &str) -> Result<(), AdapterError>;

    async fn availability_check(&self) -> AvailabilityStatus;
}
