// SPDX-License-Identifier: MIT

//! Orchestrator Engine (§4.H): the phase state machine that drives a
//! template's analysis → planning → worker-execution → aggregation →
//! verification pipeline over one main conversation.

use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;
use std::time::Duration;

use dc_adapters::{DebugAdapter, GuiAutomation, InjectionEngine};
use dc_core::{
    ConversationId, Delimiters, ErrorKind, OrchestratorId, OrchestratorInstance, OrchestratorStatus, Phase, Task,
    WorkerRecord, WorkerStatus,
};
use dc_storage::OrchestratorStore;
use regex::Regex;
use thiserror::Error;
use tokio::sync::broadcast;
use tracing::{info, warn};

use crate::parser::ResponseParser;
use crate::template::{TemplateError, TemplateStore};
use crate::worker_pool::{SpawnRequest, WorkerPool, WorkerPoolError};

/// Orchestrator dispatches the user prompt this long after the system
/// prompt, so the assistant has a chance to ingest its instructions first
/// (§4.H "wait 1.5 s").
const ANALYSIS_DISPATCH_GAP: Duration = Duration::from_millis(1_500);

#[derive(Debug, Error)]
pub enum OrchestratorError {
    #[error("orchestrator not found: {0}")]
    NotFound(String),
    #[error("invalid transition for orchestrator {0}: {1}")]
    InvalidTransition(String, String),
    #[error("dependency cycle among tasks: {0:?}")]
    DependencyCycle(Vec<String>),
    #[error("validation failed: {0}")]
    Validation(String),
    #[error(transparent)]
    Template(#[from] TemplateError),
    #[error(transparent)]
    WorkerPool(#[from] WorkerPoolError),
}

impl OrchestratorError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            OrchestratorError::NotFound(m) => ErrorKind::NotFound(m.clone()),
            OrchestratorError::InvalidTransition(id, reason) => ErrorKind::Conflict(format!("{id}: {reason}")),
            OrchestratorError::DependencyCycle(ids) => ErrorKind::DependencyCycle(format!("{ids:?}")),
            OrchestratorError::Validation(m) => ErrorKind::Validation(m.clone()),
            OrchestratorError::Template(e) => e.kind(),
            OrchestratorError::WorkerPool(e) => e.kind(),
        }
    }
}

/// Builds parallel-execution groups from a task DAG (§4.H): repeatedly
/// collects every task whose dependencies are already grouped, emits the
/// batch as one group. A pass that groups nothing indicates a cycle.
pub fn build_parallel_groups(tasks: &[Task]) -> Result<Vec<Vec<String>>, OrchestratorError> {
    let mut remaining: HashSet<String> = tasks.iter().map(|t| t.id.clone()).collect();
    let mut grouped: HashSet<String> = HashSet::new();
    let mut groups = Vec::new();

    while !remaining.is_empty() {
        let ready: Vec<String> = tasks
            .iter()
            .filter(|t| remaining.contains(&t.id))
            .filter(|t| t.dependencies.iter().all(|d| grouped.contains(d)))
            .map(|t| t.id.clone())
            .collect();

        if ready.is_empty() {
            return Err(OrchestratorError::DependencyCycle(remaining.into_iter().collect()));
        }

        for id in &ready {
            remaining.remove(id);
            grouped.insert(id.clone());
        }
        groups.push(ready);
    }
    Ok(groups)
}

/// `{NAME}` substitution (§4.H): undefined → empty string, bool → yes/no,
/// array → comma-joined.
pub fn substitute_variables(template: &str, variables: &BTreeMap<String, String>) -> String {
    static PATTERN: std::sync::OnceLock<Regex> = std::sync::OnceLock::new();
    let pattern = PATTERN.get_or_init(|| Regex::new(r"\{([A-Z_]+)\}").unwrap());
    pattern
        .replace_all(template, |caps: &regex::Captures| variables.get(&caps[1]).cloned().unwrap_or_default())
        .into_owned()
}

pub fn bool_variable(value: bool) -> String {
    if value { "yes".into() } else { "no".into() }
}

pub fn array_variable(values: &[String]) -> String {
    values.join(", ")
}

pub struct OrchestratorEngine<A, G> {
    store: Arc<OrchestratorStore>,
    templates: Arc<TemplateStore>,
    workers: Arc<WorkerPool<A>>,
    adapter: Arc<A>,
    injection: Arc<InjectionEngine<A, G>>,
    parser: Arc<ResponseParser>,
    events: broadcast::Sender<dc_core::Event>,
}

impl<A: DebugAdapter, G: GuiAutomation> OrchestratorEngine<A, G> {
    pub fn new(
        store: Arc<OrchestratorStore>,
        templates: Arc<TemplateStore>,
        workers: Arc<WorkerPool<A>>,
        adapter: Arc<A>,
        injection: Arc<InjectionEngine<A, G>>,
        parser: Arc<ResponseParser>,
    ) -> Self {
        let (events, _) = broadcast::channel(256);
        Self { store, templates, workers, adapter, injection, parser, events }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<dc_core::Event> {
        self.events.subscribe()
    }

    pub fn get(&self, id: &OrchestratorId) -> Option<OrchestratorInstance> {
        self.store.get(id)
    }

    pub fn list(&self) -> Vec<OrchestratorInstance> {
        self.store.list()
    }

    /// Looks up the worker record backing one task, for status reporting
    /// (§6 orchestrator detail endpoint).
    pub fn worker_for_task(&self, id: &OrchestratorId, task_id: &str) -> Option<WorkerRecord> {
        let instance = self.store.get(id)?;
        let worker_id = instance.worker_index.get(task_id)?;
        self.workers.get(worker_id)
    }

    fn get_or_err(&self, id: &OrchestratorId) -> Result<OrchestratorInstance, OrchestratorError> {
        self.store.get(id).ok_or_else(|| OrchestratorError::NotFound(id.to_string()))
    }

    fn delimiters_for(&self, template_id: &str) -> Delimiters {
        self.templates.resolve(template_id).map(|t| t.delimiters).unwrap_or_default()
    }

    fn builtin_variables(&self, instance: &OrchestratorInstance, template_name: &str) -> BTreeMap<String, String> {
        let mut vars = BTreeMap::new();
        vars.insert("USER_REQUEST".into(), instance.user_request.clone());
        vars.insert("ORIGINAL_REQUEST".into(), instance.user_request.clone());
        vars.insert("CWD".into(), instance.cwd.clone());
        vars.insert("TEMPLATE_NAME".into(), template_name.to_string());
        vars.insert("ORCHESTRATOR_ID".into(), instance.id.to_string());
        if let Some(analysis) = &instance.analysis {
            vars.insert("ANALYSIS_SUMMARY".into(), analysis.summary.clone());
        }
        vars
    }

    fn emit_status(&self, orchestrator_id: &OrchestratorId, status: OrchestratorStatus) {
        let _ = self.events.send(dc_core::Event::OrchestratorStatusChanged { orchestrator_id: orchestrator_id.clone(), status });
    }

    /// `Create(templateId, cwd, userRequest, mainConversationId)`.
    pub fn create(&self, template_id: &str, cwd: &str, user_request: &str, main_conversation_id: ConversationId, now_ms: i64) -> Result<OrchestratorInstance, OrchestratorError> {
        self.templates.resolve(template_id)?;
        let id = OrchestratorId::generate("orch");
        let instance = OrchestratorInstance::new(id.clone(), template_id, main_conversation_id, cwd, user_request, now_ms);
        self.store.upsert(instance.clone());
        let _ = self.events.send(dc_core::Event::OrchestratorCreated { orchestrator_id: id });
        Ok(instance)
    }

    /// `Start(id)`: dispatches the analysis system prompt, waits, then the
    /// user prompt, and transitions to `analyzing`.
    pub async fn start(&self, id: &OrchestratorId, now_ms: i64) -> Result<(), OrchestratorError> {
        let instance = self.get_or_err(id)?;
        if instance.status != OrchestratorStatus::Created {
            return Err(OrchestratorError::InvalidTransition(id.to_string(), "start() requires status=created".into()));
        }
        let template = self.templates.resolve(&instance.template_id)?;
        let vars = self.builtin_variables(&instance, &template.name);

        if let Some(prompts) = template.prompts.get("analysis") {
            let system = substitute_variables(&prompts.system, &vars);
            let user = substitute_variables(&prompts.user, &vars);
            self.dispatch(&instance.main_conversation_id, &system).await;
            tokio::time::sleep(ANALYSIS_DISPATCH_GAP).await;
            self.dispatch(&instance.main_conversation_id, &user).await;
        }

        self.store.update_with(id, |i| {
            i.status = OrchestratorStatus::Analyzing;
            i.phase = Phase::Analysis;
            i.updated_at_ms = now_ms;
        });
        self.emit_status(id, OrchestratorStatus::Analyzing);
        Ok(())
    }

    async fn dispatch(&self, conversation_id: &ConversationId, text: &str) {
        if text.is_empty() {
            return;
        }
        if let Err(err) = self.injection.inject(Some(conversation_id.clone()), text).await {
            warn!(%conversation_id, %err, "orchestrator prompt dispatch failed");
        }
    }

    /// One monitoring tick, dispatched per-phase (§4.H per-phase algorithm).
    /// Callers drive this at the template's `poll_interval_ms`.
    pub async fn poll(&self, id: &OrchestratorId, now_ms: i64) -> Result<(), OrchestratorError> {
        let instance = self.get_or_err(id)?;
        match instance.status {
            OrchestratorStatus::Analyzing => self.poll_analyzing(&instance, now_ms).await,
            OrchestratorStatus::Planning => self.poll_planning(&instance, now_ms).await,
            OrchestratorStatus::Spawning | OrchestratorStatus::Running => self.poll_running(&instance, now_ms).await,
            OrchestratorStatus::Aggregating => self.poll_aggregating(&instance, now_ms).await,
            OrchestratorStatus::Verifying => self.poll_verifying(&instance, now_ms).await,
            _ => Ok(()),
        }
    }

    async fn main_transcript_tail(&self, instance: &OrchestratorInstance) -> Vec<dc_adapters::TranscriptMessage> {
        self.adapter
            .get_transcript(instance.main_conversation_id.as_str())
            .await
            .unwrap_or_default()
            .into_iter()
            .skip(instance.main_transcript_offset)
            .collect()
    }

    async fn poll_analyzing(&self, instance: &OrchestratorInstance, now_ms: i64) -> Result<(), OrchestratorError> {
        let delimiters = self.delimiters_for(&instance.template_id);
        let tail = self.main_transcript_tail(instance).await;
        let mut consumed = 0;
        let mut found = None;

        for message in &tail {
            consumed += 1;
            if let Ok(parsed) = self.parser.parse(&message.content, &delimiters) {
                if parsed.found && parsed.phase.as_deref() == Some("analysis") {
                    found = parsed.data;
                    break;
                }
            }
        }

        let Some(data) = found else {
            self.bump_offset(&instance.id, instance.main_transcript_offset + consumed, now_ms);
            return Ok(());
        };

        let analysis: dc_core::AnalysisResult = serde_json::from_value(data).unwrap_or_default();
        let template = self.templates.resolve(&instance.template_id)?;
        let id = instance.id.clone();

        self.store.update_with(&id, |i| {
            i.analysis = Some(analysis.clone());
            i.status = OrchestratorStatus::Planning;
            i.phase = Phase::TaskPlanning;
            i.main_transcript_offset += consumed;
            i.updated_at_ms = now_ms;
        });
        let _ = self.events.send(dc_core::Event::OrchestratorAnalysisReady { orchestrator_id: id.clone() });
        self.emit_status(&id, OrchestratorStatus::Planning);

        let mut instance = instance.clone();
        instance.analysis = Some(analysis);
        let vars = self.builtin_variables(&instance, &template.name);
        if let Some(prompts) = template.prompts.get("task-planning") {
            let user = substitute_variables(&prompts.user, &vars);
            self.dispatch(&instance.main_conversation_id, &user).await;
        }
        Ok(())
    }

    fn bump_offset(&self, id: &OrchestratorId, offset: usize, now_ms: i64) {
        self.store.update_with(id, |i| {
            i.main_transcript_offset = offset;
            i.updated_at_ms = now_ms;
        });
    }

    async fn poll_planning(&self, instance: &OrchestratorInstance, now_ms: i64) -> Result<(), OrchestratorError> {
        let delimiters = self.delimiters_for(&instance.template_id);
        let tail = self.main_transcript_tail(instance).await;
        let mut consumed = 0;
        let mut found = None;

        for message in &tail {
            consumed += 1;
            if let Ok(parsed) = self.parser.parse(&message.content, &delimiters) {
                if parsed.found && parsed.phase.as_deref() == Some("task_list") {
                    found = parsed.data;
                    break;
                }
            }
        }

        let Some(data) = found else {
            self.bump_offset(&instance.id, instance.main_transcript_offset + consumed, now_ms);
            return Ok(());
        };

        let tasks: Vec<Task> = data
            .get("tasks")
            .cloned()
            .map(serde_json::from_value)
            .transpose()
            .map_err(|e: serde_json::Error| OrchestratorError::Validation(e.to_string()))?
            .unwrap_or_default();

        let template = self.templates.resolve(&instance.template_id)?;
        if (tasks.len() as u32) < template.min_task_count() {
            return Err(OrchestratorError::Validation(format!(
                "task_list has {} tasks, template requires at least {}",
                tasks.len(),
                template.min_task_count()
            )));
        }

        let groups = build_parallel_groups(&tasks)?;
        let id = instance.id.clone();
        self.store.update_with(&id, |i| {
            i.tasks = tasks.clone();
            i.parallel_groups = groups.clone();
            i.current_group = 0;
            i.status = OrchestratorStatus::AwaitingConfirmation;
            i.main_transcript_offset += consumed;
            i.updated_at_ms = now_ms;
        });
        let _ = self.events.send(dc_core::Event::OrchestratorTasksReady { orchestrator_id: id.clone(), task_count: tasks.len() });
        self.emit_status(&id, OrchestratorStatus::AwaitingConfirmation);
        Ok(())
    }

    /// `Confirm(id)`: explicit user action required to leave
    /// `awaiting_confirmation` (§4.H). Enqueues the first parallel group.
    pub fn confirm(&self, id: &OrchestratorId, now_ms: i64) -> Result<(), OrchestratorError> {
        let instance = self.get_or_err(id)?;
        if instance.status != OrchestratorStatus::AwaitingConfirmation {
            return Err(OrchestratorError::InvalidTransition(id.to_string(), "confirm() requires status=awaiting_confirmation".into()));
        }
        let template = self.templates.resolve(&instance.template_id)?;
        self.enqueue_group(&instance, &template, 0, now_ms)?;
        self.store.update_with(id, |i| {
            i.status = OrchestratorStatus::Spawning;
            i.phase = Phase::WorkerExecution;
            i.updated_at_ms = now_ms;
        });
        let _ = self.events.send(dc_core::Event::OrchestratorConfirmed { orchestrator_id: id.clone() });
        self.emit_status(id, OrchestratorStatus::Spawning);
        Ok(())
    }

    fn spawn_request_for(&self, instance: &OrchestratorInstance, template: &dc_core::Template, task: &Task) -> SpawnRequest {
        let mut vars = self.builtin_variables(instance, &template.name);
        vars.insert("TASK_ID".into(), task.id.clone());
        vars.insert("TASK_TITLE".into(), task.title.clone());
        vars.insert("TASK_DESCRIPTION".into(), task.description.clone());
        vars.insert("TASK_SCOPE".into(), array_variable(&task.scope));

        let prompt = template
            .prompts
            .get("worker-execution")
            .map(|p| substitute_variables(&p.user, &vars))
            .unwrap_or_else(|| task.description.clone());

        SpawnRequest {
            orchestrator_id: instance.id.clone(),
            task: task.clone(),
            cwd: instance.cwd.clone(),
            prompt,
            max_workers: template.config.max_workers,
            max_retries: template.config.retry.max_retries,
        }
    }

    fn enqueue_group(&self, instance: &OrchestratorInstance, template: &dc_core::Template, group_index: usize, now_ms: i64) -> Result<(), OrchestratorError> {
        let Some(group) = instance.parallel_groups.get(group_index) else { return Ok(()) };
        for task_id in group {
            let Some(task) = instance.tasks.iter().find(|t| &t.id == task_id) else { continue };
            let request = self.spawn_request_for(instance, template, task);
            let worker_id = self.workers.spawn(request, now_ms);
            self.store.update_with(&instance.id, |i| {
                i.worker_index.insert(task.id.clone(), worker_id.clone());
            });
        }
        Ok(())
    }

    /// Template config's `retry.retry_on_error` (§5 "Automatic retry is
    /// opt-in via template config") re-queues a group's failed/timed-out
    /// workers in place, under their retry budget, before the group is
    /// considered done.
    fn retry_failed_in_group(&self, instance: &OrchestratorInstance, template: &dc_core::Template, group: &[String]) {
        if !template.config.retry.retry_on_error {
            return;
        }
        for task_id in group {
            let Some(worker_id) = instance.worker_index.get(task_id) else { continue };
            let Some(record) = self.workers.get(worker_id) else { continue };
            if !matches!(record.status, WorkerStatus::Failed | WorkerStatus::Timeout) {
                continue;
            }
            if record.retry_count >= template.config.retry.max_retries {
                continue;
            }
            let Some(task) = instance.tasks.iter().find(|t| &t.id == task_id) else { continue };
            let request = self.spawn_request_for(instance, template, task);
            if self.workers.retry(worker_id, request).is_ok() {
                let _ = self.events.send(dc_core::Event::WorkerRetrying {
                    orchestrator_id: instance.id.clone(),
                    worker_id: worker_id.clone(),
                    retry_count: record.retry_count + 1,
                });
            }
        }
    }

    async fn poll_running(&self, instance: &OrchestratorInstance, now_ms: i64) -> Result<(), OrchestratorError> {
        let template = self.templates.resolve(&instance.template_id)?;

        if let Some(group) = instance.parallel_groups.get(instance.current_group) {
            self.retry_failed_in_group(instance, &template, group);
        }
        self.workers.try_drain(&instance.id, now_ms).await;

        for worker in self.workers.list_for(&instance.id) {
            if worker.status == WorkerStatus::Running {
                self.workers.poll(&worker.id, &template.delimiters, template.config.worker_timeout_ms, now_ms).await?;
            }
        }

        let workers = self.workers.list_for(&instance.id);
        if instance.status == OrchestratorStatus::Spawning && workers.iter().any(|w| w.status == WorkerStatus::Running) {
            self.store.update_with(&instance.id, |i| {
                i.status = OrchestratorStatus::Running;
                i.updated_at_ms = now_ms;
            });
            self.emit_status(&instance.id, OrchestratorStatus::Running);
        }

        let Some(group) = instance.parallel_groups.get(instance.current_group) else {
            return self.finish_worker_execution(instance, now_ms).await;
        };
        let group_workers: Vec<_> = group
            .iter()
            .filter_map(|task_id| instance.worker_index.get(task_id))
            .filter_map(|worker_id| self.workers.get(worker_id))
            .collect();
        if group_workers.len() < group.len() || !group_workers.iter().all(|w| w.status.is_terminal()) {
            return Ok(());
        }

        let next_group = instance.current_group + 1;
        if next_group >= instance.parallel_groups.len() {
            return self.finish_worker_execution(instance, now_ms).await;
        }
        self.enqueue_group(instance, &template, next_group, now_ms)?;
        self.store.update_with(&instance.id, |i| {
            i.current_group = next_group;
            i.updated_at_ms = now_ms;
        });
        Ok(())
    }

    async fn finish_worker_execution(&self, instance: &OrchestratorInstance, now_ms: i64) -> Result<(), OrchestratorError> {
        let template = self.templates.resolve(&instance.template_id)?;
        let id = instance.id.clone();

        if !template.aggregation.enabled {
            self.store.update_with(&id, |i| {
                i.status = OrchestratorStatus::Completed;
                i.updated_at_ms = now_ms;
            });
            let _ = self.events.send(dc_core::Event::OrchestratorCompleted { orchestrator_id: id.clone() });
            self.emit_status(&id, OrchestratorStatus::Completed);
            return Ok(());
        }

        let outputs: Vec<String> = instance
            .worker_index
            .values()
            .filter_map(|worker_id| self.workers.collect_output(worker_id))
            .map(|o| format!("[{}] {}: {}", o.task_id, o.status, o.summary.unwrap_or_default()))
            .collect();

        self.store.update_with(&id, |i| {
            i.status = OrchestratorStatus::Aggregating;
            i.phase = Phase::Aggregation;
            i.updated_at_ms = now_ms;
        });
        let _ = self.events.send(dc_core::Event::OrchestratorAggregating { orchestrator_id: id.clone() });
        self.emit_status(&id, OrchestratorStatus::Aggregating);

        let mut vars = self.builtin_variables(instance, &template.name);
        vars.insert("WORKER_OUTPUTS".into(), array_variable(&outputs));
        if let Some(prompts) = template.prompts.get("aggregation") {
            let user = substitute_variables(&prompts.user, &vars);
            self.dispatch(&instance.main_conversation_id, &user).await;
        }
        Ok(())
    }

    async fn poll_aggregating(&self, instance: &OrchestratorInstance, now_ms: i64) -> Result<(), OrchestratorError> {
        let delimiters = self.delimiters_for(&instance.template_id);
        let tail = self.main_transcript_tail(instance).await;
        let mut consumed = 0;
        let mut found = None;
        for message in &tail {
            consumed += 1;
            if let Ok(parsed) = self.parser.parse(&message.content, &delimiters) {
                if parsed.found && parsed.phase.as_deref() == Some("aggregation") {
                    found = parsed.data;
                    break;
                }
            }
        }
        let Some(data) = found else {
            self.bump_offset(&instance.id, instance.main_transcript_offset + consumed, now_ms);
            return Ok(());
        };
        let aggregation: dc_core::AggregationResult = serde_json::from_value(data).unwrap_or_default();
        let template = self.templates.resolve(&instance.template_id)?;
        let id = instance.id.clone();

        self.store.update_with(&id, |i| {
            i.aggregation = Some(aggregation.clone());
            i.main_transcript_offset += consumed;
            i.updated_at_ms = now_ms;
        });

        if aggregation.status == "needs_input" {
            let _ = self.events.send(dc_core::Event::OrchestratorConflicts {
                orchestrator_id: id.clone(),
                conflicts: aggregation.conflicts,
            });
            return Ok(());
        }

        if !template.verification.enabled {
            self.store.update_with(&id, |i| {
                i.status = OrchestratorStatus::Completed;
                i.updated_at_ms = now_ms;
            });
            let _ = self.events.send(dc_core::Event::OrchestratorCompleted { orchestrator_id: id.clone() });
            self.emit_status(&id, OrchestratorStatus::Completed);
            return Ok(());
        }

        self.store.update_with(&id, |i| {
            i.status = OrchestratorStatus::Verifying;
            i.phase = Phase::Verification;
            i.updated_at_ms = now_ms;
        });
        let _ = self.events.send(dc_core::Event::OrchestratorVerifying { orchestrator_id: id.clone() });
        self.emit_status(&id, OrchestratorStatus::Verifying);

        let vars = self.builtin_variables(instance, &template.name);
        if let Some(prompts) = template.prompts.get("verification") {
            let user = substitute_variables(&prompts.user, &vars);
            self.dispatch(&instance.main_conversation_id, &user).await;
        }
        Ok(())
    }

    async fn poll_verifying(&self, instance: &OrchestratorInstance, now_ms: i64) -> Result<(), OrchestratorError> {
        let delimiters = self.delimiters_for(&instance.template_id);
        let tail = self.main_transcript_tail(instance).await;
        let mut consumed = 0;
        let mut found = None;
        for message in &tail {
            consumed += 1;
            if let Ok(parsed) = self.parser.parse(&message.content, &delimiters) {
                if parsed.found && parsed.phase.as_deref() == Some("verification") {
                    found = parsed.data;
                    break;
                }
            }
        }
        let Some(data) = found else {
            self.bump_offset(&instance.id, instance.main_transcript_offset + consumed, now_ms);
            return Ok(());
        };
        let verification: dc_core::VerificationResult = serde_json::from_value(data).unwrap_or_default();
        let id = instance.id.clone();
        self.store.update_with(&id, |i| {
            i.verification = Some(verification);
            i.status = OrchestratorStatus::Completed;
            i.main_transcript_offset += consumed;
            i.updated_at_ms = now_ms;
        });
        let _ = self.events.send(dc_core::Event::OrchestratorCompleted { orchestrator_id: id.clone() });
        self.emit_status(&id, OrchestratorStatus::Completed);
        Ok(())
    }

    /// `Pause(id)`: cross-cutting, valid from any active (non-terminal,
    /// non-paused) state.
    pub fn pause(&self, id: &OrchestratorId, now_ms: i64) -> Result<(), OrchestratorError> {
        let instance = self.get_or_err(id)?;
        if instance.status.is_terminal() || instance.status == OrchestratorStatus::Paused {
            return Err(OrchestratorError::InvalidTransition(id.to_string(), "cannot pause a terminal or already-paused orchestrator".into()));
        }
        self.store.update_with(id, |i| {
            i.previous_status = Some(i.status);
            i.status = OrchestratorStatus::Paused;
            i.updated_at_ms = now_ms;
        });
        let _ = self.events.send(dc_core::Event::OrchestratorPaused { orchestrator_id: id.clone() });
        Ok(())
    }

    /// `Resume(id)`: restores the status recorded by `pause()`.
    pub fn resume(&self, id: &OrchestratorId, now_ms: i64) -> Result<(), OrchestratorError> {
        let instance = self.get_or_err(id)?;
        if instance.status != OrchestratorStatus::Paused {
            return Err(OrchestratorError::InvalidTransition(id.to_string(), "resume() requires status=paused".into()));
        }
        let restored = instance.previous_status.unwrap_or(OrchestratorStatus::Running);
        self.store.update_with(id, |i| {
            i.status = restored;
            i.previous_status = None;
            i.updated_at_ms = now_ms;
        });
        let _ = self.events.send(dc_core::Event::OrchestratorResumed { orchestrator_id: id.clone() });
        Ok(())
    }

    /// `Cancel(id)`: propagates to every live worker (§5).
    pub async fn cancel(&self, id: &OrchestratorId, now_ms: i64) -> Result<(), OrchestratorError> {
        let instance = self.get_or_err(id)?;
        for worker_id in instance.worker_index.values() {
            let _ = self.workers.cancel(worker_id, now_ms).await;
        }
        self.store.update_with(id, |i| {
            i.status = OrchestratorStatus::Cancelled;
            i.updated_at_ms = now_ms;
        });
        let _ = self.events.send(dc_core::Event::OrchestratorCancelled { orchestrator_id: id.clone() });
        info!(%id, "orchestrator cancelled");
        Ok(())
    }

    /// `Retry(workerId)` addressed by task id (§6 `/workers/:taskId/retry`):
    /// rebuilds the spawn request from the current template and re-queues.
    pub fn retry_task(&self, id: &OrchestratorId, task_id: &str) -> Result<(), OrchestratorError> {
        let instance = self.get_or_err(id)?;
        let worker_id = instance.worker_index.get(task_id).ok_or_else(|| OrchestratorError::NotFound(task_id.to_string()))?;
        let task = instance.tasks.iter().find(|t| t.id == task_id).ok_or_else(|| OrchestratorError::NotFound(task_id.to_string()))?;
        let template = self.templates.resolve(&instance.template_id)?;
        let request = self.spawn_request_for(&instance, &template, task);
        self.workers.retry(worker_id, request)?;
        Ok(())
    }

    /// `Cancel(workerId)` addressed by task id (§6 `/workers/:taskId/cancel`).
    pub async fn cancel_task(&self, id: &OrchestratorId, task_id: &str, now_ms: i64) -> Result<(), OrchestratorError> {
        let instance = self.get_or_err(id)?;
        let worker_id = instance.worker_index.get(task_id).ok_or_else(|| OrchestratorError::NotFound(task_id.to_string()))?;
        self.workers.cancel(worker_id, now_ms).await?;
        Ok(())
    }

    /// Any unhandled per-phase error flows here: stops workers and marks
    /// the orchestrator `error` (§4.H cross-cutting transition).
    pub async fn fail(&self, id: &OrchestratorId, error: String, now_ms: i64) {
        if let Some(instance) = self.store.get(id) {
            for worker_id in instance.worker_index.values() {
                let _ = self.workers.cancel(worker_id, now_ms).await;
            }
        }
        self.store.update_with(id, |i| {
            i.status = OrchestratorStatus::Error;
            i.errors.push(error.clone());
            i.updated_at_ms = now_ms;
        });
        let _ = self.events.send(dc_core::Event::OrchestratorError { orchestrator_id: id.clone(), error });
    }
}

#[cfg(test)]
#[path = "orchestrator_tests.rs"]
mod tests;
