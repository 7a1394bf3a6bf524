// SPDX-License-Identifier: MIT

//! Auth + rate-limit middleware layer, grounded on CloudLLM's HTTP adapter
//! pattern of resolving the caller's address and filtering before the
//! handler runs, generalized from an IP allowlist to the full Gate (§4.J).

use std::net::SocketAddr;
use std::sync::Arc;

use axum::extract::{ConnectInfo, Request, State};
use axum::http::HeaderMap;
use axum::middleware::Next;
use axum::response::Response;
use dc_adapters::{DebugAdapter, GuiAutomation};
use dc_core::{Clock, SystemClock};

use crate::auth::{resolve_source, Bucket};
use crate::error::ApiError;
use crate::state::AppState;

/// Resolved caller identity, inserted into request extensions by
/// [`auth_layer`] so handlers can recover it without re-parsing headers.
#[derive(Debug, Clone)]
pub struct AuthedSource {
    pub source: String,
    pub token: Option<String>,
}

fn bucket_for(path: &str) -> Bucket {
    if path == "/api/auth/login" {
        Bucket::Login
    } else if path == "/api/orchestrator/create" {
        Bucket::OrchestratorCreate
    } else if path.starts_with("/api/permission") || path.starts_with("/api/question") || path.starts_with("/api/inject") {
        Bucket::Strict
    } else {
        Bucket::General
    }
}

fn bearer_token(headers: &HeaderMap) -> Option<String> {
    headers
        .get(axum::http::header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::to_string)
}

/// Resolves the source address, applies the endpoint's rate-limit bucket,
/// and (for anything but `/api/health` and `/api/auth/login`) validates the
/// bearer token against the Gate. `/api/auth/login` still needs the source
/// resolved for lockout bookkeeping, it just skips token validation.
pub async fn auth_layer<A: DebugAdapter, G: GuiAutomation>(
    State(state): State<Arc<AppState<A, G>>>,
    ConnectInfo(remote): ConnectInfo<SocketAddr>,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let path = request.uri().path().to_string();
    let source = resolve_source(request.headers(), &remote.ip().to_string());
    let now_ms = SystemClock.now_ms();

    if path == "/api/health" {
        request.extensions_mut().insert(AuthedSource { source, token: None });
        return Ok(next.run(request).await);
    }

    state.gate.check_rate_limit(bucket_for(&path), &source, now_ms)?;

    let token = bearer_token(request.headers());
    if path != "/api/auth/login" && state.gate.enabled() {
        let token = token.clone().ok_or_else(|| ApiError::new(dc_core::ErrorKind::Unauthenticated("missing bearer token".into())))?;
        state.gate.validate(&token, &source, now_ms)?;
    }

    request.extensions_mut().insert(AuthedSource { source, token });
    Ok(next.run(request).await)
}

#[cfg(test)]
#[path = "middleware_tests.rs"]
mod tests;
