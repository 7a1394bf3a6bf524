// SPDX-License-Identifier: MIT

//! Abstract error taxonomy shared by every component.
//!
//! Each component maps its internal failures onto one of these kinds at its
//! API boundary; the daemon's HTTP layer is the only place that turns a
//! `ErrorKind` into a status code (see `dc-daemon::error`).

use thiserror::Error;

#[derive(Debug, Clone, Error)]
pub enum ErrorKind {
    #[error("unauthenticated: {0}")]
    Unauthenticated(String),

    #[error("rate limited, retry after {retry_after_ms}ms")]
    RateLimited { retry_after_ms: u64 },

    #[error("forbidden: {0}")]
    Forbidden(String),

    #[error("validation failed: {0}")]
    Validation(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("conflict: {0}")]
    Conflict(String),

    #[error("unavailable: {0}")]
    Unavailable(String),

    #[error("timeout: {0}")]
    Timeout(String),

    #[error("parse failed: {0}")]
    ParseFailed(String),

    #[error("dependency cycle: {0}")]
    DependencyCycle(String),

    #[error("no injection strategy available: tried {tried:?}, last error: {last_error}")]
    NoStrategyAvailable { tried: Vec<String>, last_error: String },

    #[error("internal error: {0}")]
    Internal(String),
}

impl ErrorKind {
    /// Stable machine-readable tag, used in the `{success:false, error}` envelope.
    pub fn tag(&self) -> &'static str {
        match self {
            ErrorKind::Unauthenticated(_) => "Unauthenticated",
            ErrorKind::RateLimited { .. } => "RateLimited",
            ErrorKind::Forbidden(_) => "Forbidden",
            ErrorKind::Validation(_) => "Validation",
            ErrorKind::NotFound(_) => "NotFound",
            ErrorKind::Conflict(_) => "Conflict",
            ErrorKind::Unavailable(_) => "Unavailable",
            ErrorKind::Timeout(_) => "Timeout",
            ErrorKind::ParseFailed(_) => "ParseFailed",
            ErrorKind::DependencyCycle(_) => "DependencyCycle",
            ErrorKind::NoStrategyAvailable { .. } => "NoStrategyAvailable",
            ErrorKind::Internal(_) => "Internal",
        }
    }
}
