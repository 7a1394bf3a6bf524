// SPDX-License-Identifier: MIT

//! Permission/Question Broker routes (§6).

use std::sync::Arc;

use axum::extract::State;
use axum::routing::{get, post};
use axum::{Json, Router};
use dc_adapters::{DebugAdapter, GuiAutomation};
use dc_core::{PermissionRequestId, QuestionId};
use dc_wire::requests::{PermissionRespondRequest, QuestionRespondRequest};
use dc_wire::responses::{PermissionListResponse, QuestionListResponse, Timestamped};

use crate::error::ApiResult;
use crate::state::AppState;

async fn pending_permissions<A: DebugAdapter, G: GuiAutomation>(
    State(state): State<Arc<AppState<A, G>>>,
) -> Json<Timestamped<PermissionListResponse>> {
    Json(Timestamped::ok(PermissionListResponse { pending: state.broker.list_pending() }))
}

async fn respond_permission<A: DebugAdapter, G: GuiAutomation>(
    State(state): State<Arc<AppState<A, G>>>,
    Json(body): Json<PermissionRespondRequest>,
) -> ApiResult<Json<Timestamped<serde_json::Value>>> {
    let request_id = PermissionRequestId::from(body.request_id);
    state.broker.respond(&request_id, body.decision, body.parameter_override).await?;
    Ok(Json(Timestamped::ok(serde_json::json!({}))))
}

async fn pending_questions<A: DebugAdapter, G: GuiAutomation>(
    State(state): State<Arc<AppState<A, G>>>,
) -> Json<Timestamped<QuestionListResponse>> {
    Json(Timestamped::ok(QuestionListResponse { pending: state.broker.list_pending_questions() }))
}

async fn respond_question<A: DebugAdapter, G: GuiAutomation>(
    State(state): State<Arc<AppState<A, G>>>,
    Json(body): Json<QuestionRespondRequest>,
) -> ApiResult<Json<Timestamped<serde_json::Value>>> {
    let question_id = QuestionId::from(body.question_id);
    state.broker.respond_question(&question_id, body.answers).await?;
    Ok(Json(Timestamped::ok(serde_json::json!({}))))
}

pub fn router<A: DebugAdapter, G: GuiAutomation>() -> Router<Arc<AppState<A, G>>> {
    Router::new()
        .route("/permission/pending", get(pending_permissions))
        .route("/permission/respond", post(respond_permission))
        .route("/question/pending", get(pending_questions))
        .route("/question/respond", post(respond_question))
}

#[cfg(test)]
#[path = "permissions_tests.rs"]
mod tests;
