// SPDX-License-Identifier: MIT

//! Auth routes (§6): login/logout/refresh/session-info/stats, all fronted
//! by the shared [`crate::middleware::auth_layer`] except `login` itself,
//! which still needs the Gate for its own PIN check.

use std::sync::Arc;

use axum::extract::{Extension, State};
use axum::routing::{get, post};
use axum::{Json, Router};
use dc_adapters::{DebugAdapter, GuiAutomation};
use dc_core::{Clock, ErrorKind, SystemClock};
use dc_wire::requests::LoginRequest;
use dc_wire::responses::{AuthStatsResponse, AuthStatusResponse, LoginResponse, SessionInfoResponse, Timestamped};

use crate::error::{ApiError, ApiResult};
use crate::middleware::AuthedSource;
use crate::state::AppState;

async fn status<A: DebugAdapter, G: GuiAutomation>(
    State(state): State<Arc<AppState<A, G>>>,
    Extension(source): Extension<AuthedSource>,
) -> Json<Timestamped<AuthStatusResponse>> {
    let authenticated = !state.gate.enabled()
        || source.token.as_deref().map(|t| state.gate.validate(t, &source.source, SystemClock.now_ms()).is_ok()).unwrap_or(false);
    Json(Timestamped::ok(AuthStatusResponse { gate_enabled: state.gate.enabled(), authenticated }))
}

async fn login<A: DebugAdapter, G: GuiAutomation>(
    State(state): State<Arc<AppState<A, G>>>,
    Extension(source): Extension<AuthedSource>,
    Json(body): Json<LoginRequest>,
) -> ApiResult<Json<Timestamped<LoginResponse>>> {
    let now_ms = SystemClock.now_ms();
    let token = state.gate.attempt_login(&source.source, &body.pin, now_ms)?;
    Ok(Json(Timestamped::ok(LoginResponse { token: token.token, expires_at_ms: now_ms + state.config.token_ttl_ms })))
}

async fn logout<A: DebugAdapter, G: GuiAutomation>(
    State(state): State<Arc<AppState<A, G>>>,
    Extension(source): Extension<AuthedSource>,
) -> ApiResult<Json<Timestamped<serde_json::Value>>> {
    let token = source.token.ok_or_else(|| ApiError::new(ErrorKind::Unauthenticated("missing bearer token".into())))?;
    state.gate.logout(&token);
    Ok(Json(Timestamped::ok(serde_json::json!({}))))
}

async fn refresh<A: DebugAdapter, G: GuiAutomation>(
    State(state): State<Arc<AppState<A, G>>>,
    Extension(source): Extension<AuthedSource>,
) -> ApiResult<Json<Timestamped<LoginResponse>>> {
    let token = source.token.ok_or_else(|| ApiError::new(ErrorKind::Unauthenticated("missing bearer token".into())))?;
    let now_ms = SystemClock.now_ms();
    let refreshed = state.gate.refresh(&token, &source.source, now_ms)?;
    Ok(Json(Timestamped::ok(LoginResponse { token: refreshed.token, expires_at_ms: now_ms + state.config.token_ttl_ms })))
}

async fn session_info<A: DebugAdapter, G: GuiAutomation>(
    State(state): State<Arc<AppState<A, G>>>,
    Extension(source): Extension<AuthedSource>,
) -> ApiResult<Json<Timestamped<SessionInfoResponse>>> {
    let token = source.token.ok_or_else(|| ApiError::new(ErrorKind::Unauthenticated("missing bearer token".into())))?;
    let now_ms = SystemClock.now_ms();
    let record = state.gate.validate(&token, &source.source, now_ms)?;
    Ok(Json(Timestamped::ok(SessionInfoResponse {
        source: record.source,
        created_at_ms: record.created_at_ms,
        expires_at_ms: record.created_at_ms + state.config.token_ttl_ms,
    })))
}

async fn stats<A: DebugAdapter, G: GuiAutomation>(State(state): State<Arc<AppState<A, G>>>) -> Json<Timestamped<AuthStatsResponse>> {
    Json(Timestamped::ok(AuthStatsResponse {
        blocked_sources: state.gate.blocked_count(),
        active_tokens: state.gate.active_token_count(),
        global_lockdown: state.gate.global_lockdown(),
    }))
}

pub fn router<A: DebugAdapter, G: GuiAutomation>() -> Router<Arc<AppState<A, G>>> {
    Router::new()
        .route("/status", get(status))
        .route("/login", post(login))
        .route("/logout", post(logout))
        .route("/refresh", post(refresh))
        .route("/session-info", get(session_info))
        .route("/stats", get(stats))
}

#[cfg(test)]
#[path = "auth_tests.rs"]
mod tests;
