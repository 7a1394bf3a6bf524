// SPDX-License-Identifier: MIT

//! Daemon-level error: maps the abstract taxonomy of §7 onto an HTTP status
//! code and the `{success:false,...}` envelope every endpoint returns.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use dc_core::ErrorKind;
use dc_wire::ErrorResponse;

#[derive(Debug)]
pub struct ApiError {
    kind: ErrorKind,
    message: Option<String>,
}

impl ApiError {
    pub fn new(kind: ErrorKind) -> Self {
        Self { kind, message: None }
    }

    pub fn with_message(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self { kind, message: Some(message.into()) }
    }

    fn status(&self) -> StatusCode {
        match &self.kind {
            ErrorKind::Unauthenticated(_) => StatusCode::UNAUTHORIZED,
            ErrorKind::RateLimited { .. } => StatusCode::TOO_MANY_REQUESTS,
            ErrorKind::Forbidden(_) => StatusCode::FORBIDDEN,
            ErrorKind::Validation(_) => StatusCode::BAD_REQUEST,
            ErrorKind::NotFound(_) => StatusCode::NOT_FOUND,
            ErrorKind::Conflict(_) => StatusCode::CONFLICT,
            ErrorKind::Unavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            ErrorKind::Timeout(_) => StatusCode::GATEWAY_TIMEOUT,
            ErrorKind::ParseFailed(_) => StatusCode::BAD_GATEWAY,
            ErrorKind::DependencyCycle(_) => StatusCode::BAD_REQUEST,
            ErrorKind::NoStrategyAvailable { .. } => StatusCode::BAD_GATEWAY,
            ErrorKind::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<ErrorKind> for ApiError {
    fn from(kind: ErrorKind) -> Self {
        Self::new(kind)
    }
}

impl From<dc_engine::EngineError> for ApiError {
    fn from(err: dc_engine::EngineError) -> Self {
        Self::with_message(err.kind(), err.to_string())
    }
}

impl From<dc_adapters::AdapterError> for ApiError {
    fn from(err: dc_adapters::AdapterError) -> Self {
        let kind = match &err {
            dc_adapters::AdapterError::Unavailable(m) => ErrorKind::Unavailable(m.clone()),
            dc_adapters::AdapterError::Timeout(_) => ErrorKind::Timeout(err.to_string()),
            dc_adapters::AdapterError::NotFound(m) => ErrorKind::NotFound(m.clone()),
            _ => ErrorKind::Internal(err.to_string()),
        };
        Self::with_message(kind, err.to_string())
    }
}

impl From<dc_adapters::InjectionError> for ApiError {
    fn from(err: dc_adapters::InjectionError) -> Self {
        let kind = match &err {
            dc_adapters::InjectionError::NoStrategyAvailable { tried, last_error } => {
                ErrorKind::NoStrategyAvailable { tried: tried.clone(), last_error: last_error.clone() }
            }
            dc_adapters::InjectionError::AdapterUnavailable(m) => ErrorKind::Unavailable(m.clone()),
        };
        Self::with_message(kind, err.to_string())
    }
}

impl From<crate::coordinator::CoordinatorError> for ApiError {
    fn from(err: crate::coordinator::CoordinatorError) -> Self {
        Self::with_message(err.kind(), err.to_string())
    }
}

impl From<crate::broker::BrokerError> for ApiError {
    fn from(err: crate::broker::BrokerError) -> Self {
        Self::with_message(err.kind(), err.to_string())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let tag = self.kind.tag();
        let message = self.message.unwrap_or_else(|| self.kind.to_string());
        (status, Json(ErrorResponse::new(tag, Some(message)))).into_response()
    }
}

pub type ApiResult<T> = Result<T, ApiError>;
