// SPDX-License-Identifier: MIT

//! Router composition (§6): one `axum::Router` per component, nested under
//! `/api`, fronted by the shared auth/rate-limit middleware layer, plus the
//! single root WebSocket upgrade endpoint.

pub mod auth;
pub mod health;
pub mod injection;
pub mod orchestrator;
pub mod permissions;
pub mod sessions;
pub mod subsessions;

use std::net::SocketAddr;
use std::sync::Arc;

use axum::extract::ws::WebSocketUpgrade;
use axum::extract::{ConnectInfo, Query, State};
use axum::response::Response;
use axum::routing::get;
use axum::Router;
use dc_adapters::{DebugAdapter, GuiAutomation};
use dc_core::{Clock, SystemClock};
use serde::Deserialize;
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::trace::TraceLayer;

use crate::state::AppState;

/// Ambient body-size cap for every JSON endpoint (§6).
const MAX_BODY_BYTES: usize = 16 * 1024;

#[derive(Debug, Deserialize)]
struct WsParams {
    token: Option<String>,
}

async fn ws_upgrade<A: DebugAdapter, G: GuiAutomation>(
    State(state): State<Arc<AppState<A, G>>>,
    ConnectInfo(remote): ConnectInfo<SocketAddr>,
    Query(params): Query<WsParams>,
    upgrade: WebSocketUpgrade,
) -> Response {
    let now_ms = SystemClock.now_ms();
    let authenticated = !state.gate.enabled()
        || params.token.as_deref().map(|t| state.gate.validate(t, &remote.ip().to_string(), now_ms).is_ok()).unwrap_or(false);
    let usage = serde_json::json!({
        "blocked_sources": state.gate.blocked_count(),
        "active_tokens": state.gate.active_token_count(),
        "global_lockdown": state.gate.global_lockdown(),
    });
    let hub = state.hub.clone();
    upgrade.on_upgrade(move |socket| hub.serve_connection(socket, authenticated, usage))
}

/// The whole daemon surface (§6): root WS upgrade plus `/api/*`, auth/rate
/// limiting applied only to the `/api` nest (`/` authenticates itself via
/// the WS `token` query param instead), with the ambient body-size cap and
/// request tracing over everything. Takes the concrete state up front since
/// `from_fn_with_state` needs a value to close over, not just a type.
pub fn root_router<A: DebugAdapter, G: GuiAutomation>(state: Arc<AppState<A, G>>) -> Router {
    let api = Router::new()
        .nest("/auth", auth::router())
        .merge(sessions::router())
        .merge(injection::router())
        .merge(permissions::router())
        .merge(orchestrator::router())
        .merge(subsessions::router())
        .merge(health::router())
        .layer(axum::middleware::from_fn_with_state(state.clone(), crate::middleware::auth_layer));

    Router::new()
        .route("/", get(ws_upgrade))
        .nest("/api", api)
        .layer(RequestBodyLimitLayer::new(MAX_BODY_BYTES))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
