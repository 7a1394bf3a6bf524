// SPDX-License-Identifier: MIT

//! Shared `AppState` builder for route-level tests across this crate.

use std::sync::Arc;
use std::time::Instant;

use dc_adapters::{FakeAdapter, InjectionEngine, NoopGuiAutomation};
use dc_engine::{OrchestratorEngine, ResponseParser, SubSessionTracker, TemplateStore, WorkerPool};
use dc_storage::OrchestratorStore;

use crate::auth::Gate;
use crate::broker::Broker;
use crate::config::Config;
use crate::coordinator::Coordinator;
use crate::hub::Hub;
use crate::logs::LogBuffer;
use crate::state::AppState;

pub type TestState = AppState<FakeAdapter, NoopGuiAutomation>;

pub async fn test_state(state_dir: &std::path::Path) -> Arc<TestState> {
    let adapter = Arc::new(FakeAdapter::new());
    let gui = Arc::new(NoopGuiAutomation);
    let injection = Arc::new(InjectionEngine::new(adapter.clone(), gui));
    let parser = Arc::new(ResponseParser::new());
    let workers = Arc::new(WorkerPool::new(adapter.clone(), parser.clone()));
    let templates = Arc::new(TemplateStore::empty());
    let store = Arc::new(OrchestratorStore::load(state_dir.join("orchestrators.json"), 1_000).await.unwrap());
    let orchestrator = Arc::new(OrchestratorEngine::new(store, templates.clone(), workers.clone(), adapter.clone(), injection.clone(), parser));
    let subsessions = Arc::new(SubSessionTracker::new(injection.clone()));

    Arc::new(AppState {
        config: Config::load(crate::config::Cli { pin: None, port: None, config: Some(state_dir.to_path_buf()) }),
        gate: Arc::new(Gate::new(Some("123456".to_string()), 3_600_000, 10)),
        coordinator: Arc::new(Coordinator::new(adapter.clone(), injection.clone())),
        broker: Arc::new(Broker::new(adapter.clone())),
        hub: Arc::new(Hub::new()),
        orchestrator,
        workers,
        templates,
        injection,
        subsessions,
        logs: Arc::new(LogBuffer::new(100)),
        adapter,
        start_time: Instant::now(),
    })
}
