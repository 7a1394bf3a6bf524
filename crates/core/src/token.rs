// SPDX-License-Identifier: MIT

//! Auth/Rate-limit Gate records (§3, §4.J): session tokens and per-source
//! attempt bookkeeping. The Gate's behaviour lives in the daemon; these are
//! just the owned data shapes.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionToken {
    /// 256-bit random value, hex-encoded.
    pub token: String,
    pub source: String,
    pub created_at_ms: i64,
}

impl SessionToken {
    pub fn is_expired(&self, now_ms: i64, ttl_ms: i64) -> bool {
        now_ms.saturating_sub(self.created_at_ms) >= ttl_ms
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SourceRecord {
    pub failed_attempts: u32,
    pub blocked: bool,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GlobalLockdown {
    pub active: bool,
    pub reason: Option<String>,
}
