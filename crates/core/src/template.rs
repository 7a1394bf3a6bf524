// SPDX-License-Identifier: MIT

//! Template: the Template Store's owned entity (§3, §4.E).

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub retry_on_error: bool,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self { max_retries: 0, retry_on_error: false }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TemplateConfig {
    pub max_workers: u32,
    pub worker_timeout_ms: u64,
    pub poll_interval_ms: u64,
    pub retry: RetryPolicy,
}

impl Default for TemplateConfig {
    fn default() -> Self {
        Self { max_workers: 5, worker_timeout_ms: 10 * 60 * 1000, poll_interval_ms: 2_000, retry: RetryPolicy::default() }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PhaseConfig {
    pub enabled: bool,
    pub timeout_ms: u64,
    pub validate: bool,
}

impl Default for PhaseConfig {
    fn default() -> Self {
        Self { enabled: true, timeout_ms: 5 * 60 * 1000, validate: true }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PhasePrompts {
    pub system: String,
    pub user: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Delimiters {
    pub start: String,
    pub end: String,
}

impl Default for Delimiters {
    fn default() -> Self {
        Self { start: "<<<ORCHESTRATOR_RESPONSE>>>".into(), end: "<<<END_ORCHESTRATOR_RESPONSE>>>".into() }
    }
}

/// JSON configuration defining prompts, phase flags, concurrency, timeouts,
/// and merge ancestor.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Template {
    pub id: String,
    pub name: String,
    pub version: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extends: Option<String>,
    #[serde(default)]
    pub config: TemplateConfig,
    #[serde(default)]
    pub analysis: PhaseConfig,
    #[serde(default)]
    pub task_planning: PhaseConfig,
    #[serde(default)]
    pub worker_execution: PhaseConfig,
    #[serde(default)]
    pub aggregation: PhaseConfig,
    #[serde(default)]
    pub verification: PhaseConfig,
    #[serde(default)]
    pub prompts: std::collections::BTreeMap<String, PhasePrompts>,
    #[serde(default)]
    pub delimiters: Delimiters,
    #[serde(default)]
    pub variables: std::collections::BTreeMap<String, String>,
    /// Shipped with the server; read-only (§4.E).
    #[serde(default)]
    pub system: bool,
}

impl Template {
    pub fn min_task_count(&self) -> u32 {
        1
    }

    pub fn max_task_count(&self) -> u32 {
        // A template may recommend an explicit cap via recommended_splits;
        // the hard ceiling guards against a runaway task list.
        50
    }
}
