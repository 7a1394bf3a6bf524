// SPDX-License-Identifier: MIT

//! Real `DebugAdapter` over HTTP discovery (`/json/list`-style endpoint)
//! plus a single writer-serialized WebSocket frame transport, reconnected
//! with exponential backoff on transient failure (§4.A).

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use futures_util::stream::SplitSink;
use futures_util::{SinkExt, StreamExt};
use parking_lot::Mutex;
use serde_json::{json, Value};
use tokio::net::TcpStream;
use tokio::sync::{oneshot, RwLock};
use tokio_tungstenite::tungstenite::Message as WsMessage;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};
use tracing::{info, warn};

use crate::debug_adapter::{
    AdapterError, AvailabilityStatus, DebugAdapter, PageDescriptor, SessionHandle, TranscriptMessage,
    DEFAULT_CALL_DEADLINE,
};

#[derive(Debug, Clone)]
pub struct CdpConfig {
    /// Base URL of the HTTP discovery endpoint, e.g. `http://127.0.0.1:9222`.
    pub http_base: String,
    pub call_deadline: Duration,
    pub reconnect_base_delay: Duration,
    pub reconnect_max_delay: Duration,
}

impl Default for CdpConfig {
    fn default() -> Self {
        Self {
            http_base: "http://127.0.0.1:9222".into(),
            call_deadline: DEFAULT_CALL_DEADLINE,
            reconnect_base_delay: Duration::from_secs(2),
            reconnect_max_delay: Duration::from_secs(30),
        }
    }
}

type WsWriter = SplitSink<WebSocketStream<MaybeTlsStream<TcpStream>>, WsMessage>;

struct Connection {
    writer: tokio::sync::Mutex<WsWriter>,
    pending: Mutex<HashMap<u64, oneshot::Sender<Value>>>,
}

/// Real `DebugAdapter`. A single shared WS connection multiplexes calls by
/// integer id; concurrent callers await their own reply on a oneshot
/// channel while a background reader task dispatches incoming frames.
pub struct CdpAdapter {
    config: CdpConfig,
    http: reqwest::Client,
    next_id: AtomicU64,
    connection: RwLock<Option<Arc<Connection>>>,
    connected: AtomicBool,
}

impl CdpAdapter {
    pub fn new(config: CdpConfig) -> Self {
        Self {
            config,
            http: reqwest::Client::new(),
            next_id: AtomicU64::new(1),
            connection: RwLock::new(None),
            connected: AtomicBool::new(false),
        }
    }

    async fn connection(&self) -> Result<Arc<Connection>, AdapterError> {
        if let Some(conn) = self.connection.read().await.clone() {
            return Ok(conn);
        }
        self.reconnect().await
    }

    /// Re-attach with exponential backoff, capped, surfacing `Unavailable`
    /// once the endpoint reports no reachable target at all (§4.A).
    async fn reconnect(&self) -> Result<Arc<Connection>, AdapterError> {
        let mut delay = self.config.reconnect_base_delay;
        let mut last_err = String::new();

        for _ in 0..5 {
            match self.dial().await {
                Ok(conn) => {
                    *self.connection.write().await = Some(conn.clone());
                    self.connected.store(true, Ordering::SeqCst);
                    return Ok(conn);
                }
                Err(err) => {
                    warn!(%err, "cdp reconnect attempt failed");
                    last_err = err.to_string();
                    tokio::time::sleep(delay).await;
                    delay = (delay * 2).min(self.config.reconnect_max_delay);
                }
            }
        }
        self.connected.store(false, Ordering::SeqCst);
        Err(AdapterError::Unavailable(last_err))
    }

    async fn dial(&self) -> Result<Arc<Connection>, AdapterError> {
        let pages = self.discover_pages().await?;
        let page = pages.first().ok_or_else(|| AdapterError::Unavailable("no debuggable pages".into()))?;
        let ws_url = format!("ws://{}/devtools/page/{}", self.host(), page.id);

        let (stream, _) = connect_async(&ws_url)
            .await
            .map_err(|e| AdapterError::Transport(e.to_string()))?;
        let (writer, mut reader) = stream.split();
        let connection = Arc::new(Connection { writer: tokio::sync::Mutex::new(writer), pending: Mutex::new(HashMap::new()) });

        let weak_pending = connection.clone();
        tokio::spawn(async move {
            while let Some(frame) = reader.next().await {
                let Ok(WsMessage::Text(text)) = frame else { continue };
                let Ok(value) = serde_json::from_str::<Value>(&text) else { continue };
                if let Some(id) = value.get("id").and_then(Value::as_u64) {
                    if let Some(tx) = weak_pending.pending.lock().remove(&id) {
                        let _ = tx.send(value);
                    }
                }
            }
        });

        Ok(connection)
    }

    fn host(&self) -> &str {
        self.config.http_base.trim_start_matches("http://").trim_start_matches("https://")
    }

    async fn discover_pages(&self) -> Result<Vec<PageDescriptor>, AdapterError> {
        let url = format!("{}/json/list", self.config.http_base);
        let resp = self
            .http
            .get(&url)
            .timeout(self.config.call_deadline)
            .send()
            .await
            .map_err(|e| AdapterError::Unavailable(e.to_string()))?;
        let body: Vec<Value> = resp.json().await.map_err(|e| AdapterError::Transport(e.to_string()))?;
        Ok(body
            .into_iter()
            .map(|v| PageDescriptor {
                id: v.get("id").and_then(Value::as_str).unwrap_or_default().to_string(),
                title: v.get("title").and_then(Value::as_str).unwrap_or_default().to_string(),
                url: v.get("url").and_then(Value::as_str).unwrap_or_default().to_string(),
            })
            .collect())
    }

    async fn send_command(&self, method: &str, params: Value) -> Result<Value, AdapterError> {
        let conn = self.connection().await?;
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        let (tx, rx) = oneshot::channel();
        conn.pending.lock().insert(id, tx);

        let frame = json!({ "id": id, "method": method, "params": params });
        {
            let mut writer = conn.writer.lock().await;
            writer
                .send(WsMessage::Text(frame.to_string()))
                .await
                .map_err(|e| AdapterError::Transport(e.to_string()))?;
        }

        match tokio::time::timeout(self.config.call_deadline, rx).await {
            Ok(Ok(reply)) => {
                if let Some(err) = reply.get("error") {
                    return Err(AdapterError::Runtime(err.to_string()));
                }
                Ok(reply.get("result").cloned().unwrap_or(Value::Null))
            }
            Ok(Err(_)) => Err(AdapterError::Transport("reply channel closed".into())),
            Err(_) => Err(AdapterError::Timeout(self.config.call_deadline)),
        }
    }
}

#[async_trait]
impl DebugAdapter for CdpAdapter {
    async fn list_pages(&self) -> Result<Vec<PageDescriptor>, AdapterError> {
        self.discover_pages().await
    }

    async fn attach(&self, page_id: &str) -> Result<SessionHandle, AdapterError> {
        self.connection().await?;
        Ok(SessionHandle { page_id: page_id.to_string() })
    }

    async fn evaluate(&self, session: &SessionHandle, expression: &str) -> Result<Value, AdapterError> {
        self.send_command(
            "Runtime.evaluate",
            json!({ "expression": expression, "pageId": session.page_id }),
        )
        .await
    }

    async fn dispatch_keys(&self, session: &SessionHandle, text: &str) -> Result<(), AdapterError> {
        self.send_command("Input.dispatchKeyEvent", json!({ "text": text, "pageId": session.page_id }))
            .await
            .map(|_| ())
    }

    async fn insert_text(&self, session: &SessionHandle, text: &str) -> Result<(), AdapterError> {
        self.send_command("Input.insertText", json!({ "text": text, "pageId": session.page_id }))
            .await
            .map(|_| ())
    }

    async fn focus(&self, session: &SessionHandle) -> Result<(), AdapterError> {
        self.send_command("DOM.focus", json!({ "pageId": session.page_id })).await.map(|_| ())
    }

    async fn get_transcript(&self, conversation_id: &str) -> Result<Vec<TranscriptMessage>, AdapterError> {
        let result = self
            .send_command("Runtime.evaluate", json!({ "expression": format!("__probeTranscript('{conversation_id}')") }))
            .await?;
        let messages: Vec<TranscriptMessage> = serde_json::from_value(result).unwrap_or_default();
        Ok(messages)
    }

    async fn start_new_session(&self, cwd: &str, first_message: &str, options: Value) -> Result<String, AdapterError> {
        let result = self
            .send_command("Runtime.evaluate", json!({ "expression": "__startNewSession", "cwd": cwd, "firstMessage": first_message, "options": options }))
            .await?;
        result
            .get("conversationId")
            .and_then(Value::as_str)
            .map(String::from)
            .ok_or_else(|| AdapterError::Runtime("missing conversationId in response".into()))
    }

    async fn archive_session(&self, conversation_id: &str) -> Result<(), AdapterError> {
        self.send_command("Runtime.evaluate", json!({ "expression": "__archiveSession", "conversationId": conversation_id }))
            .await
            .map(|_| ())
    }

    async fn switch_session(&self, conversation_id: &str) -> Result<(), AdapterError> {
        self.send_command("Runtime.evaluate", json!({ "expression": "__switchSession", "conversationId": conversation_id }))
            .await
            .map(|_| ())
    }

    async fn availability_check(&self) -> AvailabilityStatus {
        match self.discover_pages().await {
            Ok(pages) if !pages.is_empty() => {
                info!(count = pages.len(), "cdp pages discovered");
                AvailabilityStatus { available: true, reason: None }
            }
            Ok(_) => AvailabilityStatus { available: false, reason: Some("no debuggable pages".into()) },
            Err(err) => AvailabilityStatus { available: false, reason: Some(err.to_string()) },
        }
    }
}
