// SPDX-License-Identifier: MIT

//! Orchestrator Engine, Worker Pool and Template Store routes (§6).

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::routing::{get, post};
use axum::{Json, Router};
use dc_adapters::{DebugAdapter, GuiAutomation};
use dc_core::{Clock, ErrorKind, OrchestratorId, SystemClock};
use dc_wire::requests::{
    CreateOrchestratorRequest, CreateTemplateRequest, DuplicateTemplateRequest, ImportTemplateRequest,
    OrchestratorMessageRequest, UpdateTemplateRequest,
};
use dc_wire::responses::{
    OrchestratorCreatedResponse, OrchestratorStatusResponse, OrchestratorTaskListResponse, TemplateDetailResponse,
    TemplateListResponse, TemplateSummary, Timestamped, WorkerListResponse,
};

use crate::error::{ApiError, ApiResult};
use crate::state::AppState;

fn merge_document(id: &str, name: &str, extends: Option<String>, mut body: serde_json::Value) -> serde_json::Value {
    if !body.is_object() {
        body = serde_json::json!({});
    }
    let map = body.as_object_mut().expect("just ensured object");
    map.insert("id".into(), serde_json::Value::String(id.to_string()));
    map.insert("name".into(), serde_json::Value::String(name.to_string()));
    if let Some(extends) = extends {
        map.insert("extends".into(), serde_json::Value::String(extends));
    }
    body
}

async fn list_templates<A: DebugAdapter, G: GuiAutomation>(
    State(state): State<Arc<AppState<A, G>>>,
) -> Json<Timestamped<TemplateListResponse>> {
    let templates = state
        .templates
        .list_ids()
        .into_iter()
        .filter_map(|(id, _)| state.templates.resolve(&id).ok())
        .map(|t| TemplateSummary::from(&t))
        .collect();
    Json(Timestamped::ok(TemplateListResponse { templates }))
}

async fn get_template<A: DebugAdapter, G: GuiAutomation>(
    State(state): State<Arc<AppState<A, G>>>,
    Path(id): Path<String>,
) -> ApiResult<Json<Timestamped<TemplateDetailResponse>>> {
    let template = state.templates.resolve(&id).map_err(into_engine_error)?;
    Ok(Json(Timestamped::ok(TemplateDetailResponse { template })))
}

async fn create_template<A: DebugAdapter, G: GuiAutomation>(
    State(state): State<Arc<AppState<A, G>>>,
    Json(body): Json<CreateTemplateRequest>,
) -> ApiResult<Json<Timestamped<TemplateDetailResponse>>> {
    let document = merge_document(&body.id, &body.name, body.extends, body.body);
    let template = state.templates.create(body.id, document).map_err(into_engine_error)?;
    Ok(Json(Timestamped::ok(TemplateDetailResponse { template })))
}

async fn update_template<A: DebugAdapter, G: GuiAutomation>(
    State(state): State<Arc<AppState<A, G>>>,
    Path(id): Path<String>,
    Json(body): Json<UpdateTemplateRequest>,
) -> ApiResult<Json<Timestamped<TemplateDetailResponse>>> {
    let template = state.templates.update(&id, body.body).map_err(into_engine_error)?;
    Ok(Json(Timestamped::ok(TemplateDetailResponse { template })))
}

async fn delete_template<A: DebugAdapter, G: GuiAutomation>(
    State(state): State<Arc<AppState<A, G>>>,
    Path(id): Path<String>,
) -> ApiResult<Json<Timestamped<serde_json::Value>>> {
    state.templates.delete(&id).map_err(into_engine_error)?;
    Ok(Json(Timestamped::ok(serde_json::json!({}))))
}

async fn duplicate_template<A: DebugAdapter, G: GuiAutomation>(
    State(state): State<Arc<AppState<A, G>>>,
    Path(id): Path<String>,
    Json(body): Json<DuplicateTemplateRequest>,
) -> ApiResult<Json<Timestamped<TemplateDetailResponse>>> {
    let template = state.templates.duplicate(&id, body.new_name).map_err(into_engine_error)?;
    Ok(Json(Timestamped::ok(TemplateDetailResponse { template })))
}

async fn export_template<A: DebugAdapter, G: GuiAutomation>(
    State(state): State<Arc<AppState<A, G>>>,
    Path(id): Path<String>,
) -> ApiResult<Json<Timestamped<serde_json::Value>>> {
    let document = state.templates.raw_document(&id).map_err(into_engine_error)?;
    Ok(Json(Timestamped::ok(document)))
}

async fn import_template<A: DebugAdapter, G: GuiAutomation>(
    State(state): State<Arc<AppState<A, G>>>,
    Json(body): Json<ImportTemplateRequest>,
) -> ApiResult<Json<Timestamped<TemplateDetailResponse>>> {
    let template = state.templates.create(body.id, body.document).map_err(into_engine_error)?;
    Ok(Json(Timestamped::ok(TemplateDetailResponse { template })))
}

fn into_engine_error(err: dc_engine::TemplateError) -> ApiError {
    ApiError::with_message(err.kind(), err.to_string())
}

async fn create_orchestrator<A: DebugAdapter, G: GuiAutomation>(
    State(state): State<Arc<AppState<A, G>>>,
    Json(body): Json<CreateOrchestratorRequest>,
) -> ApiResult<Json<Timestamped<OrchestratorCreatedResponse>>> {
    let now_ms = SystemClock.now_ms();
    let main_conversation_id = state.coordinator.create(&body.cwd, &body.user_request, serde_json::json!({}), now_ms).await?;
    let instance = state
        .orchestrator
        .create(&body.template_id, &body.cwd, &body.user_request, main_conversation_id, now_ms)
        .map_err(|e| ApiError::with_message(e.kind(), e.to_string()))?;
    Ok(Json(Timestamped::ok(OrchestratorCreatedResponse { orchestrator_id: instance.id })))
}

fn find_or_err<A: DebugAdapter, G: GuiAutomation>(state: &AppState<A, G>, id: &str) -> ApiResult<dc_core::OrchestratorInstance> {
    state.orchestrator.get(&OrchestratorId::from(id)).ok_or_else(|| ApiError::new(ErrorKind::NotFound(id.to_string())))
}

async fn detail<A: DebugAdapter, G: GuiAutomation>(
    State(state): State<Arc<AppState<A, G>>>,
    Path(id): Path<String>,
) -> ApiResult<Json<Timestamped<OrchestratorStatusResponse>>> {
    let orchestrator = find_or_err(&state, &id)?;
    Ok(Json(Timestamped::ok(OrchestratorStatusResponse { orchestrator })))
}

async fn tasks<A: DebugAdapter, G: GuiAutomation>(
    State(state): State<Arc<AppState<A, G>>>,
    Path(id): Path<String>,
) -> ApiResult<Json<Timestamped<OrchestratorTaskListResponse>>> {
    let orchestrator = find_or_err(&state, &id)?;
    Ok(Json(Timestamped::ok(OrchestratorTaskListResponse { tasks: orchestrator.tasks, parallel_groups: orchestrator.parallel_groups })))
}

async fn message<A: DebugAdapter, G: GuiAutomation>(
    State(state): State<Arc<AppState<A, G>>>,
    Path(id): Path<String>,
    Json(body): Json<OrchestratorMessageRequest>,
) -> ApiResult<Json<Timestamped<serde_json::Value>>> {
    let orchestrator = find_or_err(&state, &id)?;
    state.injection.inject(Some(orchestrator.main_conversation_id), &body.text).await?;
    Ok(Json(Timestamped::ok(serde_json::json!({}))))
}

async fn start<A: DebugAdapter, G: GuiAutomation>(
    State(state): State<Arc<AppState<A, G>>>,
    Path(id): Path<String>,
) -> ApiResult<Json<Timestamped<serde_json::Value>>> {
    let now_ms = SystemClock.now_ms();
    state.orchestrator.start(&OrchestratorId::from(id), now_ms).await.map_err(|e| ApiError::with_message(e.kind(), e.to_string()))?;
    Ok(Json(Timestamped::ok(serde_json::json!({}))))
}

async fn confirm_tasks<A: DebugAdapter, G: GuiAutomation>(
    State(state): State<Arc<AppState<A, G>>>,
    Path(id): Path<String>,
) -> ApiResult<Json<Timestamped<serde_json::Value>>> {
    let now_ms = SystemClock.now_ms();
    state.orchestrator.confirm(&OrchestratorId::from(id), now_ms).map_err(|e| ApiError::with_message(e.kind(), e.to_string()))?;
    Ok(Json(Timestamped::ok(serde_json::json!({}))))
}

async fn pause<A: DebugAdapter, G: GuiAutomation>(
    State(state): State<Arc<AppState<A, G>>>,
    Path(id): Path<String>,
) -> ApiResult<Json<Timestamped<serde_json::Value>>> {
    let now_ms = SystemClock.now_ms();
    state.orchestrator.pause(&OrchestratorId::from(id), now_ms).map_err(|e| ApiError::with_message(e.kind(), e.to_string()))?;
    Ok(Json(Timestamped::ok(serde_json::json!({}))))
}

async fn resume<A: DebugAdapter, G: GuiAutomation>(
    State(state): State<Arc<AppState<A, G>>>,
    Path(id): Path<String>,
) -> ApiResult<Json<Timestamped<serde_json::Value>>> {
    let now_ms = SystemClock.now_ms();
    state.orchestrator.resume(&OrchestratorId::from(id), now_ms).map_err(|e| ApiError::with_message(e.kind(), e.to_string()))?;
    Ok(Json(Timestamped::ok(serde_json::json!({}))))
}

async fn cancel<A: DebugAdapter, G: GuiAutomation>(
    State(state): State<Arc<AppState<A, G>>>,
    Path(id): Path<String>,
) -> ApiResult<Json<Timestamped<serde_json::Value>>> {
    let now_ms = SystemClock.now_ms();
    state.orchestrator.cancel(&OrchestratorId::from(id), now_ms).await.map_err(|e| ApiError::with_message(e.kind(), e.to_string()))?;
    Ok(Json(Timestamped::ok(serde_json::json!({}))))
}

async fn workers<A: DebugAdapter, G: GuiAutomation>(
    State(state): State<Arc<AppState<A, G>>>,
    Path(id): Path<String>,
) -> Json<Timestamped<WorkerListResponse>> {
    let workers = state.workers.list_for(&OrchestratorId::from(id));
    Json(Timestamped::ok(WorkerListResponse { workers }))
}

async fn worker_detail<A: DebugAdapter, G: GuiAutomation>(
    State(state): State<Arc<AppState<A, G>>>,
    Path((id, task_id)): Path<(String, String)>,
) -> ApiResult<Json<Timestamped<serde_json::Value>>> {
    let worker = state
        .orchestrator
        .worker_for_task(&OrchestratorId::from(id), &task_id)
        .ok_or_else(|| ApiError::new(ErrorKind::NotFound(task_id.clone())))?;
    Ok(Json(Timestamped::ok(serde_json::to_value(worker).unwrap_or_default())))
}

async fn retry_worker<A: DebugAdapter, G: GuiAutomation>(
    State(state): State<Arc<AppState<A, G>>>,
    Path((id, task_id)): Path<(String, String)>,
) -> ApiResult<Json<Timestamped<serde_json::Value>>> {
    state.orchestrator.retry_task(&OrchestratorId::from(id), &task_id).map_err(|e| ApiError::with_message(e.kind(), e.to_string()))?;
    Ok(Json(Timestamped::ok(serde_json::json!({}))))
}

async fn cancel_worker<A: DebugAdapter, G: GuiAutomation>(
    State(state): State<Arc<AppState<A, G>>>,
    Path((id, task_id)): Path<(String, String)>,
) -> ApiResult<Json<Timestamped<serde_json::Value>>> {
    let now_ms = SystemClock.now_ms();
    state
        .orchestrator
        .cancel_task(&OrchestratorId::from(id), &task_id, now_ms)
        .await
        .map_err(|e| ApiError::with_message(e.kind(), e.to_string()))?;
    Ok(Json(Timestamped::ok(serde_json::json!({}))))
}

pub fn router<A: DebugAdapter, G: GuiAutomation>() -> Router<Arc<AppState<A, G>>> {
    Router::new()
        .route("/orchestrator/templates", get(list_templates).post(create_template))
        .route("/orchestrator/templates/import", post(import_template))
        .route("/orchestrator/templates/:id", get(get_template).put(update_template).delete(delete_template))
        .route("/orchestrator/templates/:id/duplicate", post(duplicate_template))
        .route("/orchestrator/templates/:id/export", get(export_template))
        .route("/orchestrator/create", post(create_orchestrator))
        .route("/orchestrator/:id", get(detail))
        .route("/orchestrator/:id/status", get(detail))
        .route("/orchestrator/:id/tasks", get(tasks))
        .route("/orchestrator/:id/message", post(message))
        .route("/orchestrator/:id/start", post(start))
        .route("/orchestrator/:id/confirm-tasks", post(confirm_tasks))
        .route("/orchestrator/:id/pause", post(pause))
        .route("/orchestrator/:id/resume", post(resume))
        .route("/orchestrator/:id/cancel", post(cancel))
        .route("/orchestrator/:id/workers", get(workers))
        .route("/orchestrator/:id/workers/:task_id", get(worker_detail))
        .route("/orchestrator/:id/workers/:task_id/retry", post(retry_worker))
        .route("/orchestrator/:id/workers/:task_id/cancel", post(cancel_worker))
}

#[cfg(test)]
#[path = "orchestrator_tests.rs"]
mod tests;
