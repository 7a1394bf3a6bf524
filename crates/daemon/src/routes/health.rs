// SPDX-License-Identifier: MIT

//! Health/Logs routes (§6): `GET /api/health` is the one endpoint the auth
//! middleware bypasses entirely.

use std::sync::Arc;

use axum::extract::State;
use axum::response::sse::{Event as SseEvent, Sse};
use axum::routing::get;
use axum::{Json, Router};
use dc_adapters::{DebugAdapter, GuiAutomation};
use dc_wire::responses::{HealthResponse, Timestamped};
use futures_util::stream::Stream;
use tokio_stream::wrappers::BroadcastStream;
use tokio_stream::StreamExt as _;

use crate::error::ApiResult;
use crate::state::AppState;

async fn health<A: DebugAdapter, G: GuiAutomation>(State(state): State<Arc<AppState<A, G>>>) -> Json<Timestamped<HealthResponse>> {
    let adapter_available = state.adapter.availability_check().await.available;
    Json(Timestamped::ok(HealthResponse { status: "ok", adapter_available, uptime_ms: state.uptime_ms() }))
}

#[derive(serde::Serialize)]
struct LogsBody {
    entries: Vec<crate::logs::LogEntry>,
}

async fn get_logs<A: DebugAdapter, G: GuiAutomation>(State(state): State<Arc<AppState<A, G>>>) -> ApiResult<Json<Timestamped<LogsBody>>> {
    Ok(Json(Timestamped::ok(LogsBody { entries: state.logs.snapshot() })))
}

#[derive(serde::Serialize)]
struct ClearedBody {
    cleared: bool,
}

async fn clear_logs<A: DebugAdapter, G: GuiAutomation>(State(state): State<Arc<AppState<A, G>>>) -> ApiResult<Json<Timestamped<ClearedBody>>> {
    state.logs.clear();
    Ok(Json(Timestamped::ok(ClearedBody { cleared: true })))
}

/// `GET /api/logs/stream`: server-sent events mirroring the log ring
/// buffer's `push`es is out of scope (no per-push channel); instead this
/// streams the live Event Bus, the one broadcast already wired up, so a
/// terminal can `curl` live activity without a WS client.
async fn logs_stream<A: DebugAdapter, G: GuiAutomation>(
    State(state): State<Arc<AppState<A, G>>>,
) -> Sse<impl Stream<Item = Result<SseEvent, std::convert::Infallible>>> {
    let stream = BroadcastStream::new(state.hub.sender().subscribe()).filter_map(|item| {
        let event = item.ok()?;
        let json = serde_json::to_string(&event).ok()?;
        Some(Ok(SseEvent::default().data(json)))
    });
    Sse::new(stream)
}

pub fn router<A: DebugAdapter, G: GuiAutomation>() -> Router<Arc<AppState<A, G>>> {
    Router::new()
        .route("/health", get(health))
        .route("/logs", get(get_logs).delete(clear_logs))
        .route("/logs/stream", get(logs_stream))
}

#[cfg(test)]
#[path = "health_tests.rs"]
mod tests;
