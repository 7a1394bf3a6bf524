// SPDX-License-Identifier: MIT

//! Sub-session Tracker routes (§6): link/list/unlink, auto-detect toggle,
//! and a manual scan tick.

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::routing::{get, post};
use axum::{Json, Router};
use dc_adapters::{DebugAdapter, GuiAutomation};
use dc_core::{ConversationId, ErrorKind};
use dc_wire::requests::CreateSubsessionRequest;
use dc_wire::responses::{SubsessionListResponse, Timestamped};
use serde::{Deserialize, Serialize};

use crate::error::{ApiError, ApiResult};
use crate::state::AppState;

async fn list<A: DebugAdapter, G: GuiAutomation>(State(state): State<Arc<AppState<A, G>>>) -> Json<Timestamped<SubsessionListResponse>> {
    Json(Timestamped::ok(SubsessionListResponse { links: state.subsessions.list() }))
}

async fn detail<A: DebugAdapter, G: GuiAutomation>(
    State(state): State<Arc<AppState<A, G>>>,
    Path(id): Path<String>,
) -> ApiResult<Json<Timestamped<dc_core::SubSessionLink>>> {
    let link = state.subsessions.get(&ConversationId::from(id.as_str())).ok_or_else(|| ApiError::new(ErrorKind::NotFound(id)))?;
    Ok(Json(Timestamped::ok(link)))
}

async fn link<A: DebugAdapter, G: GuiAutomation>(
    State(state): State<Arc<AppState<A, G>>>,
    Json(body): Json<CreateSubsessionRequest>,
) -> Json<Timestamped<serde_json::Value>> {
    let now_ms = <dc_core::SystemClock as dc_core::Clock>::now_ms(&dc_core::SystemClock);
    state.subsessions.link(
        ConversationId::from(body.child_id.as_str()),
        ConversationId::from(body.parent_id.as_str()),
        body.originating_tool_invocation_id,
        now_ms,
    );
    Json(Timestamped::ok(serde_json::json!({})))
}

async fn unlink<A: DebugAdapter, G: GuiAutomation>(
    State(state): State<Arc<AppState<A, G>>>,
    Path(id): Path<String>,
) -> ApiResult<Json<Timestamped<serde_json::Value>>> {
    state.subsessions.unlink(&ConversationId::from(id.as_str())).map_err(|e| ApiError::with_message(e.kind(), e.to_string()))?;
    Ok(Json(Timestamped::ok(serde_json::json!({}))))
}

#[derive(Debug, Serialize)]
struct AutoDetectBody {
    enabled: bool,
}

async fn get_auto_detect<A: DebugAdapter, G: GuiAutomation>(
    State(state): State<Arc<AppState<A, G>>>,
) -> Json<Timestamped<AutoDetectBody>> {
    Json(Timestamped::ok(AutoDetectBody { enabled: state.subsessions.auto_link_enabled() }))
}

#[derive(Debug, Deserialize)]
struct SetAutoDetectRequest {
    enabled: bool,
}

async fn set_auto_detect<A: DebugAdapter, G: GuiAutomation>(
    State(state): State<Arc<AppState<A, G>>>,
    Json(body): Json<SetAutoDetectRequest>,
) -> Json<Timestamped<serde_json::Value>> {
    state.subsessions.set_auto_link_enabled(body.enabled);
    Json(Timestamped::ok(serde_json::json!({})))
}

/// Manually drives one monitoring tick (§4.I normally runs this on a 5 s
/// background poll; exposed here for operators and tests).
async fn scan<A: DebugAdapter, G: GuiAutomation>(State(state): State<Arc<AppState<A, G>>>) -> ApiResult<Json<Timestamped<serde_json::Value>>> {
    let now_ms = <dc_core::SystemClock as dc_core::Clock>::now_ms(&dc_core::SystemClock);
    let coordinator = state.coordinator.clone();
    state
        .subsessions
        .poll(now_ms, |id| coordinator.exists(id))
        .await
        .map_err(|e| ApiError::with_message(e.kind(), e.to_string()))?;
    Ok(Json(Timestamped::ok(serde_json::json!({}))))
}

pub fn router<A: DebugAdapter, G: GuiAutomation>() -> Router<Arc<AppState<A, G>>> {
    Router::new()
        .route("/subsessions", get(list).post(link))
        .route("/subsessions/auto-detect", get(get_auto_detect).post(set_auto_detect))
        .route("/subsessions/scan", post(scan))
        .route("/subsessions/:id", get(detail).delete(unlink))
}

#[cfg(test)]
#[path = "subsessions_tests.rs"]
mod tests;
