// SPDX-License-Identifier: MIT

//! Injection Engine routes (§6).

use std::sync::Arc;
use std::time::Duration;

use axum::extract::{Path, State};
use axum::routing::{get, post};
use axum::{Json, Router};
use dc_adapters::{DebugAdapter, GuiAutomation, InjectionMethod};
use dc_core::{ConversationId, ErrorKind};
use dc_wire::requests::{ConfigureInjectionRequest, InjectRequest, QueueInjectRequest};
use dc_wire::responses::{InjectionStatusResponse, Timestamped};
use serde::Serialize;

use crate::error::{ApiError, ApiResult};
use crate::state::AppState;

const DRAIN_INTER_ITEM_DELAY: Duration = Duration::from_millis(250);

fn parse_method(raw: &str) -> Result<InjectionMethod, ApiError> {
    match raw {
        "adapter-eval" => Ok(InjectionMethod::AdapterEval),
        "adapter-clipboard-paste" => Ok(InjectionMethod::AdapterClipboardPaste),
        "os-key-send" => Ok(InjectionMethod::OsKeySend),
        "tmux-send" => Ok(InjectionMethod::TmuxSend),
        "scripted-gui-automation" => Ok(InjectionMethod::ScriptedGuiAutomation),
        "clipboard-only" => Ok(InjectionMethod::ClipboardOnly),
        other => Err(ApiError::new(ErrorKind::Validation(format!("unknown injection method: {other}")))),
    }
}

#[derive(Debug, Serialize)]
struct InjectedBody {
    method: String,
    duration_ms: u64,
}

async fn inject<A: DebugAdapter, G: GuiAutomation>(
    State(state): State<Arc<AppState<A, G>>>,
    Json(body): Json<InjectRequest>,
) -> ApiResult<Json<Timestamped<InjectedBody>>> {
    let conversation_id = body.conversation_id.map(ConversationId::from);
    let outcome = state.injection.inject(conversation_id, &body.text).await?;
    Ok(Json(Timestamped::ok(InjectedBody { method: outcome.method.to_string(), duration_ms: outcome.duration_ms })))
}

async fn inject_into_session<A: DebugAdapter, G: GuiAutomation>(
    State(state): State<Arc<AppState<A, G>>>,
    Path(id): Path<String>,
    Json(body): Json<InjectRequest>,
) -> ApiResult<Json<Timestamped<InjectedBody>>> {
    let outcome = state.injection.inject(Some(ConversationId::from(id)), &body.text).await?;
    Ok(Json(Timestamped::ok(InjectedBody { method: outcome.method.to_string(), duration_ms: outcome.duration_ms })))
}

async fn status<A: DebugAdapter, G: GuiAutomation>(State(state): State<Arc<AppState<A, G>>>) -> ApiResult<Json<Timestamped<InjectionStatusResponse>>> {
    Ok(Json(Timestamped::ok(InjectionStatusResponse {
        preferred_method: state.injection.preferred_method().to_string(),
        retry_delay_ms: state.injection.retry_delay_ms(),
        counters: serde_json::to_value(state.injection.counters().into_iter().map(|(m, c)| (m.to_string(), c)).collect::<std::collections::HashMap<_, _>>())
            .unwrap_or_default(),
    })))
}

async fn configure<A: DebugAdapter, G: GuiAutomation>(
    State(state): State<Arc<AppState<A, G>>>,
    Json(body): Json<ConfigureInjectionRequest>,
) -> ApiResult<Json<Timestamped<serde_json::Value>>> {
    let method = match body.preferred_method {
        Some(raw) => parse_method(&raw)?,
        None => state.injection.preferred_method(),
    };
    let delay = body.retry_delay_ms.map(Duration::from_millis).unwrap_or_else(|| Duration::from_millis(state.injection.retry_delay_ms()));
    state.injection.configure(method, delay);
    Ok(Json(Timestamped::ok(serde_json::json!({}))))
}

async fn stats<A: DebugAdapter, G: GuiAutomation>(State(state): State<Arc<AppState<A, G>>>) -> Json<Timestamped<serde_json::Value>> {
    let counters: std::collections::HashMap<String, _> = state.injection.counters().into_iter().map(|(m, c)| (m.to_string(), c)).collect();
    Json(Timestamped::ok(serde_json::to_value(counters).unwrap_or_default()))
}

async fn queue<A: DebugAdapter, G: GuiAutomation>(
    State(state): State<Arc<AppState<A, G>>>,
    Json(body): Json<QueueInjectRequest>,
) -> Json<Timestamped<serde_json::Value>> {
    state.injection.queue_inject(ConversationId::from(body.conversation_id), body.text);
    Json(Timestamped::ok(serde_json::json!({})))
}

async fn process_queue<A: DebugAdapter, G: GuiAutomation>(
    State(state): State<Arc<AppState<A, G>>>,
    Json(body): Json<QueueInjectRequest>,
) -> ApiResult<Json<Timestamped<serde_json::Value>>> {
    let id = ConversationId::from(body.conversation_id);
    let drained = state.injection.drain_queue(id, DRAIN_INTER_ITEM_DELAY).await?;
    Ok(Json(Timestamped::ok(serde_json::json!({ "drained": drained }))))
}

async fn queue_len<A: DebugAdapter, G: GuiAutomation>(
    State(state): State<Arc<AppState<A, G>>>,
    Path(id): Path<String>,
) -> Json<Timestamped<serde_json::Value>> {
    let len = state.injection.queue_len(&ConversationId::from(id));
    Json(Timestamped::ok(serde_json::json!({ "queued": len })))
}

async fn clear_queue<A: DebugAdapter, G: GuiAutomation>(
    State(state): State<Arc<AppState<A, G>>>,
    Path(id): Path<String>,
) -> Json<Timestamped<serde_json::Value>> {
    let cleared = state.injection.clear_queue(&ConversationId::from(id));
    Json(Timestamped::ok(serde_json::json!({ "cleared": cleared })))
}

async fn best_method<A: DebugAdapter, G: GuiAutomation>(State(state): State<Arc<AppState<A, G>>>) -> Json<Timestamped<serde_json::Value>> {
    Json(Timestamped::ok(serde_json::json!({ "method": state.injection.best_method().to_string() })))
}

pub fn router<A: DebugAdapter, G: GuiAutomation>() -> Router<Arc<AppState<A, G>>> {
    Router::new()
        .route("/inject", post(inject))
        .route("/session/:id/inject", post(inject_into_session))
        .route("/inject/status", get(status))
        .route("/inject/configure", post(configure))
        .route("/inject/stats", get(stats))
        .route("/inject/queue", post(queue))
        .route("/inject/queue/process", post(process_queue))
        .route("/inject/queue/:id", get(queue_len).delete(clear_queue))
        .route("/inject/best-method", get(best_method))
}

#[cfg(test)]
#[path = "injection_tests.rs"]
mod tests;
