// SPDX-License-Identifier: MIT

//! Daemon-wide shared state, modelled on the teacher's `ListenCtx`: one
//! struct bundling every long-lived component behind `Arc`, handed to axum
//! as `State<Arc<AppState<A, G>>>` so every handler gets cheap clones
//! rather than its own lock.

use std::sync::Arc;
use std::time::Instant;

use dc_adapters::{DebugAdapter, GuiAutomation, InjectionEngine};
use dc_engine::{OrchestratorEngine, SubSessionTracker, TemplateStore, WorkerPool};

use crate::auth::Gate;
use crate::broker::Broker;
use crate::config::Config;
use crate::coordinator::Coordinator;
use crate::hub::Hub;
use crate::logs::LogBuffer;

pub struct AppState<A, G> {
    pub config: Config,
    pub gate: Arc<Gate>,
    pub coordinator: Arc<Coordinator<A, G>>,
    pub broker: Arc<Broker<A>>,
    pub hub: Arc<Hub>,
    pub orchestrator: Arc<OrchestratorEngine<A, G>>,
    pub workers: Arc<WorkerPool<A>>,
    pub templates: Arc<TemplateStore>,
    pub injection: Arc<InjectionEngine<A, G>>,
    pub subsessions: Arc<SubSessionTracker<A, G>>,
    pub logs: Arc<LogBuffer>,
    pub adapter: Arc<A>,
    pub start_time: Instant,
}

impl<A: DebugAdapter, G: GuiAutomation> AppState<A, G> {
    pub fn uptime_ms(&self) -> i64 {
        self.start_time.elapsed().as_millis() as i64
    }
}
