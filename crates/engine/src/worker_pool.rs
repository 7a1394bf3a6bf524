// SPDX-License-Identifier: MIT

//! Worker Pool (§4.G): spawns and monitors child conversations, bounded by
//! `maxWorkers` per orchestrator, with a FIFO queue for the overflow.

use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::Arc;

use dc_core::{ErrorKind, OrchestratorId, Task, ToolUseCounters, WorkerId, WorkerOutput, WorkerRecord, WorkerStatus};
use dc_adapters::DebugAdapter;
use parking_lot::Mutex;
use regex::Regex;
use serde_json::Value;
use thiserror::Error;
use tokio::sync::broadcast;
use tracing::{info, warn};

use crate::parser::ResponseParser;

#[derive(Debug, Error)]
pub enum WorkerPoolError {
    #[error("worker not found: {0}")]
    NotFound(String),
    #[error("worker {0} is not in a retryable state")]
    NotRetryable(String),
    #[error("worker {0} has exhausted its retry budget")]
    RetryBudgetExhausted(String),
    #[error("adapter unavailable: {0}")]
    AdapterUnavailable(String),
}

impl WorkerPoolError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            WorkerPoolError::NotFound(m) => ErrorKind::NotFound(m.clone()),
            WorkerPoolError::NotRetryable(m) => ErrorKind::Conflict(m.clone()),
            WorkerPoolError::RetryBudgetExhausted(m) => ErrorKind::Conflict(m.clone()),
            WorkerPoolError::AdapterUnavailable(m) => ErrorKind::Unavailable(m.clone()),
        }
    }
}

#[derive(Debug, Clone)]
pub struct SpawnRequest {
    pub orchestrator_id: OrchestratorId,
    pub task: Task,
    pub cwd: String,
    pub prompt: String,
    pub max_workers: u32,
    pub max_retries: u32,
}

struct Queued {
    worker_id: WorkerId,
    request: SpawnRequest,
}

#[derive(Default)]
struct ScopeState {
    max_workers: u32,
    running: HashSet<WorkerId>,
    queue: VecDeque<Queued>,
}

/// Category counters are derived from the label attached to a transcript's
/// tool-use block via a small set of case-insensitive patterns.
fn tool_patterns() -> &'static [(Regex, fn(&mut ToolUseCounters))] {
    use std::sync::OnceLock;
    static PATTERNS: OnceLock<Vec<(Regex, fn(&mut ToolUseCounters))>> = OnceLock::new();
    PATTERNS.get_or_init(|| {
        vec![
            (Regex::new(r"(?i)\b(read|cat|view)\b").unwrap(), (|c: &mut ToolUseCounters| c.files_read += 1) as fn(&mut ToolUseCounters)),
            (Regex::new(r"(?i)\b(write|edit|create)\b").unwrap(), |c| c.files_written += 1),
            (Regex::new(r"(?i)\b(bash|run|exec|command)\b").unwrap(), |c| c.commands_run += 1),
            (Regex::new(r"(?i)\b(search|grep|glob|find)\b").unwrap(), |c| c.searches += 1),
        ]
    })
}

fn apply_tool_use_counters(counters: &mut ToolUseCounters, text: &str) {
    for (pattern, apply) in tool_patterns() {
        if pattern.is_match(text) {
            apply(counters);
        }
    }
}

pub struct WorkerPool<A> {
    adapter: Arc<A>,
    parser: Arc<ResponseParser>,
    workers: Mutex<HashMap<WorkerId, WorkerRecord>>,
    scopes: Mutex<HashMap<OrchestratorId, ScopeState>>,
    events: broadcast::Sender<dc_core::Event>,
}

impl<A: DebugAdapter> WorkerPool<A> {
    pub fn new(adapter: Arc<A>, parser: Arc<ResponseParser>) -> Self {
        let (events, _) = broadcast::channel(512);
        Self { adapter, parser, workers: Mutex::new(HashMap::new()), scopes: Mutex::new(HashMap::new()), events }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<dc_core::Event> {
        self.events.subscribe()
    }

    pub fn get(&self, worker_id: &WorkerId) -> Option<WorkerRecord> {
        self.workers.lock().get(worker_id).cloned()
    }

    pub fn list_for(&self, orchestrator_id: &OrchestratorId) -> Vec<WorkerRecord> {
        self.workers.lock().values().filter(|w| &w.orchestrator_id == orchestrator_id).cloned().collect()
    }

    /// `Spawn(orchestratorId, task, template, variables)`: computes the
    /// deterministic hidden conversation id, registers a `pending` worker,
    /// and enqueues it — `try_drain` decides whether it starts immediately.
    pub fn spawn(&self, request: SpawnRequest, now_ms: i64) -> WorkerId {
        let worker_id = WorkerId::generate("worker");
        let conversation_id = dc_core::ConversationId::from(format!(
            "{}{}_{}",
            dc_core::HIDDEN_CONVERSATION_PREFIX,
            request.orchestrator_id,
            request.task.id
        ));
        let record = WorkerRecord::new(
            worker_id.clone(),
            request.orchestrator_id.clone(),
            request.task.id.clone(),
            conversation_id,
            now_ms,
        );
        self.workers.lock().insert(worker_id.clone(), record);
        {
            let mut scopes = self.scopes.lock();
            let scope = scopes.entry(request.orchestrator_id.clone()).or_default();
            scope.max_workers = request.max_workers;
            scope.queue.push_back(Queued { worker_id: worker_id.clone(), request });
        }
        worker_id
    }

    /// Starts as many queued workers as `maxWorkers` allows for their
    /// orchestrator scope. Call after every spawn and every terminal
    /// transition (§4.G: "on any terminal transition ... call queue-drain").
    pub async fn try_drain(&self, orchestrator_id: &OrchestratorId, now_ms: i64) {
        loop {
            let next = {
                let mut scopes = self.scopes.lock();
                let Some(scope) = scopes.get_mut(orchestrator_id) else { return };
                if scope.running.len() >= scope.max_workers as usize {
                    None
                } else {
                    scope.queue.pop_front()
                }
            };
            let Some(queued) = next else { break };
            self.start(orchestrator_id, queued, now_ms).await;
        }
    }

    /// Runs one queued spawn to completion. Never calls back into
    /// `try_drain`: on failure it frees its own slot inline so the caller's
    /// drain loop can simply continue rather than recurse.
    async fn start(&self, orchestrator_id: &OrchestratorId, queued: Queued, now_ms: i64) {
        let Queued { worker_id, request } = queued;
        self.scopes.lock().entry(orchestrator_id.clone()).or_default().running.insert(worker_id.clone());
        self.set_status(&worker_id, WorkerStatus::Spawning);

        let conversation_id = self.workers.lock().get(&worker_id).map(|w| w.conversation_id.clone());
        let Some(conversation_id) = conversation_id else { return };

        match self.adapter.start_new_session(&request.cwd, &request.prompt, Value::Null).await {
            Ok(_) => {
                if let Some(w) = self.workers.lock().get_mut(&worker_id) {
                    w.status = WorkerStatus::Running;
                    w.started_at_ms = now_ms;
                }
                let _ = self.events.send(dc_core::Event::WorkerSpawned {
                    orchestrator_id: orchestrator_id.clone(),
                    worker_id: worker_id.clone(),
                    task_id: request.task.id.clone(),
                });
                info!(%worker_id, %conversation_id, "worker spawned");
            }
            Err(err) => {
                warn!(%worker_id, %err, "worker spawn failed");
                let error = err.to_string();
                if let Some(w) = self.workers.lock().get_mut(&worker_id) {
                    w.status = WorkerStatus::Failed;
                    w.error = Some(error.clone());
                    w.completed_at_ms = Some(now_ms);
                }
                if let Some(scope) = self.scopes.lock().get_mut(orchestrator_id) {
                    scope.running.remove(&worker_id);
                }
                let _ = self.events.send(dc_core::Event::WorkerFailed {
                    orchestrator_id: orchestrator_id.clone(),
                    worker_id: worker_id.clone(),
                    error,
                });
            }
        }
    }

    fn set_status(&self, worker_id: &WorkerId, status: WorkerStatus) {
        if let Some(w) = self.workers.lock().get_mut(worker_id) {
            w.status = status;
        }
    }

    /// One monitoring tick for a single running worker: fetch the
    /// transcript since `transcript_offset`, feed new fragments to the
    /// Response Parser, update progress/counters, and check the timeout.
    pub async fn poll(&self, worker_id: &WorkerId, delimiters: &dc_core::Delimiters, worker_timeout_ms: u64, now_ms: i64) -> Result<(), WorkerPoolError> {
        let (orchestrator_id, conversation_id, offset, status) = {
            let workers = self.workers.lock();
            let w = workers.get(worker_id).ok_or_else(|| WorkerPoolError::NotFound(worker_id.to_string()))?;
            (w.orchestrator_id.clone(), w.conversation_id.clone(), w.transcript_offset, w.status)
        };

        if status != WorkerStatus::Running {
            return Ok(());
        }

        let messages = self
            .adapter
            .get_transcript(conversation_id.as_str())
            .await
            .map_err(|e| WorkerPoolError::AdapterUnavailable(e.to_string()))?;

        let mut terminal = false;
        {
            let mut workers = self.workers.lock();
            let w = workers.get_mut(worker_id).ok_or_else(|| WorkerPoolError::NotFound(worker_id.to_string()))?;

            for message in messages.iter().skip(offset) {
                apply_tool_use_counters(&mut w.counters, &message.content);

                if let Ok(parsed) = self.parser.parse(&message.content, delimiters) {
                    if !parsed.found {
                        continue;
                    }
                    match parsed.phase.as_deref() {
                        Some("progress") => {
                            if let Some(data) = &parsed.data {
                                if let Some(p) = data.get("progress_percent").and_then(Value::as_u64) {
                                    w.progress_percent = p.min(100) as u8;
                                }
                                if let Some(action) = data.get("current_action").and_then(Value::as_str) {
                                    w.current_action = Some(action.to_string());
                                }
                            }
                        }
                        Some("completion") => {
                            if let Some(data) = &parsed.data {
                                let status_str = data.get("status").and_then(Value::as_str).unwrap_or("failed");
                                w.output = data.get("summary").and_then(Value::as_str).map(String::from);
                                w.error = data.get("error").and_then(Value::as_str).map(String::from);
                                w.output_files = data
                                    .get("output_files")
                                    .and_then(Value::as_array)
                                    .map(|a| a.iter().filter_map(Value::as_str).map(String::from).collect())
                                    .unwrap_or_default();
                                w.status = if status_str == "failed" { WorkerStatus::Failed } else { WorkerStatus::Completed };
                                w.completed_at_ms = Some(now_ms);
                                terminal = true;
                            }
                        }
                        _ => {}
                    }
                }
            }
            w.transcript_offset = messages.len();

            if !terminal && w.is_timed_out(now_ms, worker_timeout_ms) {
                w.status = WorkerStatus::Timeout;
                w.completed_at_ms = Some(now_ms);
                terminal = true;
            }
        }

        if terminal {
            self.on_terminal(&orchestrator_id, worker_id, now_ms).await;
        }
        Ok(())
    }

    async fn on_terminal(&self, orchestrator_id: &OrchestratorId, worker_id: &WorkerId, now_ms: i64) {
        let status = self.workers.lock().get(worker_id).map(|w| w.status);
        match status {
            Some(WorkerStatus::Completed) => {
                let _ = self.events.send(dc_core::Event::WorkerCompleted { orchestrator_id: orchestrator_id.clone(), worker_id: worker_id.clone() });
            }
            Some(WorkerStatus::Timeout) => {
                let _ = self.events.send(dc_core::Event::WorkerTimeout { orchestrator_id: orchestrator_id.clone(), worker_id: worker_id.clone() });
            }
            _ => {}
        }
        if let Some(scope) = self.scopes.lock().get_mut(orchestrator_id) {
            scope.running.remove(worker_id);
        }
        self.try_drain(orchestrator_id, now_ms).await;
    }

    /// `Retry(workerId)`: only legal for a terminal-failed worker under its
    /// template's retry budget. Resets the worker to `pending` and re-queues.
    pub fn retry(&self, worker_id: &WorkerId, request: SpawnRequest) -> Result<(), WorkerPoolError> {
        let mut workers = self.workers.lock();
        let w = workers.get_mut(worker_id).ok_or_else(|| WorkerPoolError::NotFound(worker_id.to_string()))?;
        if !matches!(w.status, WorkerStatus::Failed | WorkerStatus::Timeout) {
            return Err(WorkerPoolError::NotRetryable(worker_id.to_string()));
        }
        if w.retry_count >= request.max_retries {
            return Err(WorkerPoolError::RetryBudgetExhausted(worker_id.to_string()));
        }
        w.retry_count += 1;
        w.status = WorkerStatus::Pending;
        w.error = None;
        w.completed_at_ms = None;
        drop(workers);

        let mut scopes = self.scopes.lock();
        let scope = scopes.entry(request.orchestrator_id.clone()).or_default();
        scope.max_workers = request.max_workers;
        scope.queue.push_back(Queued { worker_id: worker_id.clone(), request });
        Ok(())
    }

    /// `Cancel(workerId)`: transitions to `cancelled` and frees a slot.
    pub async fn cancel(&self, worker_id: &WorkerId, now_ms: i64) -> Result<(), WorkerPoolError> {
        let orchestrator_id = {
            let mut workers = self.workers.lock();
            let w = workers.get_mut(worker_id).ok_or_else(|| WorkerPoolError::NotFound(worker_id.to_string()))?;
            if w.status.is_terminal() {
                return Ok(());
            }
            w.status = WorkerStatus::Cancelled;
            w.completed_at_ms = Some(now_ms);
            w.orchestrator_id.clone()
        };
        let _ = self.events.send(dc_core::Event::WorkerCancelled { orchestrator_id: orchestrator_id.clone(), worker_id: worker_id.clone() });
        self.on_terminal(&orchestrator_id, worker_id, now_ms).await;
        Ok(())
    }

    pub fn collect_output(&self, worker_id: &WorkerId) -> Option<WorkerOutput> {
        self.workers.lock().get(worker_id).map(WorkerOutput::from)
    }
}

#[cfg(test)]
#[path = "worker_pool_tests.rs"]
mod tests;
