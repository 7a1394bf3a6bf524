// SPDX-License-Identifier: MIT

//! The uniform error envelope and a couple of small shared DTO fragments
//! every endpoint uses (§6).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

fn now_iso8601() -> String {
    Utc::now().to_rfc3339()
}

/// `{success: false, error, message?, timestamp}` — the one error shape
/// every endpoint in the HTTP surface returns.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub success: bool,
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    pub timestamp: String,
}

impl ErrorResponse {
    pub fn new(error: impl Into<String>, message: Option<String>) -> Self {
        Self { success: false, error: error.into(), message, timestamp: now_iso8601() }
    }
}

#[derive(Debug, Clone, Copy, Deserialize)]
pub struct Pagination {
    #[serde(default)]
    pub offset: usize,
    #[serde(default = "default_limit")]
    pub limit: usize,
}

fn default_limit() -> usize {
    50
}

impl Default for Pagination {
    fn default() -> Self {
        Self { offset: 0, limit: default_limit() }
    }
}
