// SPDX-License-Identifier: MIT

//! Session Coordinator routes (§6).

use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::routing::{get, post};
use axum::{Json, Router};
use dc_adapters::{DebugAdapter, GuiAutomation};
use dc_core::{Clock, ConversationId, SystemClock};
use dc_wire::envelope::Pagination;
use dc_wire::requests::{NewSessionRequest, SendMessageRequest, SwitchSessionRequest};
use dc_wire::responses::{ConversationSummary, SessionDetailResponse, SessionListResponse, Timestamped};

use crate::error::ApiResult;
use crate::state::AppState;

async fn list<A: DebugAdapter, G: GuiAutomation>(State(state): State<Arc<AppState<A, G>>>) -> Json<Timestamped<SessionListResponse>> {
    let sessions = state.coordinator.list(false).iter().map(ConversationSummary::from).collect();
    Json(Timestamped::ok(SessionListResponse { sessions }))
}

async fn detail<A: DebugAdapter, G: GuiAutomation>(
    State(state): State<Arc<AppState<A, G>>>,
    Path(id): Path<String>,
) -> ApiResult<Json<Timestamped<SessionDetailResponse>>> {
    detail_with_window(state, id, Pagination::default()).await
}

async fn messages<A: DebugAdapter, G: GuiAutomation>(
    State(state): State<Arc<AppState<A, G>>>,
    Path(id): Path<String>,
    Query(pagination): Query<Pagination>,
) -> ApiResult<Json<Timestamped<SessionDetailResponse>>> {
    detail_with_window(state, id, pagination).await
}

async fn detail_with_window<A: DebugAdapter, G: GuiAutomation>(
    state: Arc<AppState<A, G>>,
    id: String,
    pagination: Pagination,
) -> ApiResult<Json<Timestamped<SessionDetailResponse>>> {
    let id = ConversationId::from(id);
    let now_ms = SystemClock.now_ms();
    let result = state.coordinator.get(&id, pagination.offset, pagination.limit, now_ms).await?;
    let summary = ConversationSummary::from(&result.conversation);
    Ok(Json(Timestamped::ok(SessionDetailResponse { summary, messages: result.conversation.messages, cache_hit: result.cache_hit })))
}

async fn switch<A: DebugAdapter, G: GuiAutomation>(
    State(state): State<Arc<AppState<A, G>>>,
    Json(body): Json<SwitchSessionRequest>,
) -> ApiResult<Json<Timestamped<serde_json::Value>>> {
    state.coordinator.switch(&ConversationId::from(body.conversation_id)).await?;
    Ok(Json(Timestamped::ok(serde_json::json!({}))))
}

async fn send<A: DebugAdapter, G: GuiAutomation>(
    State(state): State<Arc<AppState<A, G>>>,
    Json(body): Json<SendMessageRequest>,
) -> ApiResult<Json<Timestamped<serde_json::Value>>> {
    state.coordinator.send_message(ConversationId::from(body.conversation_id), &body.text).await?;
    Ok(Json(Timestamped::ok(serde_json::json!({}))))
}

async fn new_session<A: DebugAdapter, G: GuiAutomation>(
    State(state): State<Arc<AppState<A, G>>>,
    Json(body): Json<NewSessionRequest>,
) -> ApiResult<Json<Timestamped<serde_json::Value>>> {
    let now_ms = SystemClock.now_ms();
    let id = state.coordinator.create(&body.cwd, &body.first_message, body.options, now_ms).await?;
    Ok(Json(Timestamped::ok(serde_json::json!({ "conversation_id": id }))))
}

async fn archive<A: DebugAdapter, G: GuiAutomation>(
    State(state): State<Arc<AppState<A, G>>>,
    Path(id): Path<String>,
) -> ApiResult<Json<Timestamped<serde_json::Value>>> {
    state.coordinator.archive(&ConversationId::from(id)).await?;
    Ok(Json(Timestamped::ok(serde_json::json!({}))))
}

pub fn router<A: DebugAdapter, G: GuiAutomation>() -> Router<Arc<AppState<A, G>>> {
    Router::new()
        .route("/sessions", get(list))
        .route("/session/:id", get(detail))
        .route("/session/:id/messages", get(messages))
        .route("/switch-session", post(switch))
        .route("/send", post(send))
        .route("/new-session", post(new_session))
        .route("/archive-session/:id", post(archive))
}

#[cfg(test)]
#[path = "sessions_tests.rs"]
mod tests;
