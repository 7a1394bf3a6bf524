// SPDX-License-Identifier: MIT

//! `deskctld`: binds the HTTP/WS surface, wires every component together,
//! and drives the background poll loops (page discovery, orchestrator
//! phase ticks, sub-session inactivity). Startup sequencing mirrors the
//! teacher's numbered `lifecycle::startup` steps.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use dc_adapters::{CdpAdapter, CdpConfig, InjectionEngine, NoopGuiAutomation};
use dc_core::{Clock, OrchestratorStatus, SystemClock};
use dc_daemon::auth::Gate;
use dc_daemon::broker::Broker;
use dc_daemon::config::{Cli, Config};
use dc_daemon::coordinator::Coordinator;
use dc_daemon::hub::Hub;
use dc_daemon::logs::{LogBuffer, RingBufferLayer};
use dc_daemon::routes;
use dc_daemon::state::AppState;
use dc_engine::{OrchestratorEngine, ResponseParser, SubSessionTracker, TemplateStore, WorkerPool};
use dc_storage::OrchestratorStore;
use tokio::net::TcpListener;
use tracing::{error, info, warn};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer};

/// Page/orchestrator/sub-session background poll cadence.
const DISCOVERY_POLL_INTERVAL: Duration = Duration::from_secs(2);
const ORCHESTRATOR_POLL_INTERVAL: Duration = Duration::from_millis(2_000);
const SUBSESSION_POLL_INTERVAL: Duration = Duration::from_secs(5);

#[cfg(unix)]
type Gui = dc_adapters::injection::XdotoolAutomation;
#[cfg(not(unix))]
type Gui = NoopGuiAutomation;

fn gui_automation() -> Gui {
    #[cfg(unix)]
    {
        dc_adapters::injection::XdotoolAutomation
    }
    #[cfg(not(unix))]
    {
        NoopGuiAutomation
    }
}

fn init_tracing(config: &Config, logs: Arc<LogBuffer>) -> tracing_appender::non_blocking::WorkerGuard {
    std::fs::create_dir_all(config.log_path.parent().unwrap_or(&config.state_dir)).ok();
    let file_appender = tracing_appender::rolling::daily(
        config.log_path.parent().unwrap_or(&config.state_dir),
        config.log_path.file_name().unwrap_or_else(|| std::ffi::OsStr::new("daemon.log")),
    );
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let file_layer = tracing_subscriber::fmt::layer().with_writer(non_blocking).with_ansi(false);
    let stdout_layer = tracing_subscriber::fmt::layer();

    tracing_subscriber::registry()
        .with(filter)
        .with(stdout_layer)
        .with(file_layer)
        .with(RingBufferLayer::new(logs))
        .init();

    guard
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    let config = Config::load(cli);

    let logs = Arc::new(LogBuffer::new(config.log_buffer_capacity));
    let _tracing_guard = init_tracing(&config, logs.clone());

    if let Err(err) = run(config, logs).await {
        error!(%err, "daemon exited with error");
        std::process::exit(1);
    }
    info!("daemon exited cleanly");
}

async fn run(config: Config, logs: Arc<LogBuffer>) -> Result<(), Box<dyn std::error::Error>> {
    std::fs::create_dir_all(&config.state_dir)?;
    std::fs::create_dir_all(&config.templates_system_dir)?;
    std::fs::create_dir_all(&config.templates_user_dir)?;

    let adapter = Arc::new(CdpAdapter::new(CdpConfig { http_base: config.cdp_http_base.clone(), ..Default::default() }));
    let gui = Arc::new(gui_automation());
    let injection = Arc::new(InjectionEngine::new(adapter.clone(), gui));
    let parser = Arc::new(ResponseParser::new());
    let workers = Arc::new(WorkerPool::new(adapter.clone(), parser.clone()));
    let templates = Arc::new(TemplateStore::load(&config.templates_system_dir, &config.templates_user_dir)?);
    let store = Arc::new(OrchestratorStore::load(config.snapshot_path.clone(), config.snapshot_debounce_ms).await?);
    let orchestrator = Arc::new(OrchestratorEngine::new(store, templates.clone(), workers.clone(), adapter.clone(), injection.clone(), parser));
    let subsessions = Arc::new(SubSessionTracker::new(injection.clone()));
    let coordinator = Arc::new(Coordinator::new(adapter.clone(), injection.clone()));
    let broker = Arc::new(Broker::new(adapter.clone()));
    let gate = Arc::new(Gate::new(config.pin.clone(), config.token_ttl_ms, config.lockdown_threshold));
    let hub = Arc::new(Hub::new());

    hub.relay(gate.subscribe());
    hub.relay(coordinator.subscribe());
    hub.relay(broker.subscribe());
    hub.relay(injection.subscribe());
    hub.relay(orchestrator.subscribe());
    hub.relay(workers.subscribe());
    hub.relay(subsessions.subscribe());

    let state = Arc::new(AppState {
        config: config.clone(),
        gate,
        coordinator: coordinator.clone(),
        broker,
        hub,
        orchestrator: orchestrator.clone(),
        workers,
        templates,
        injection,
        subsessions: subsessions.clone(),
        logs,
        adapter: adapter.clone(),
        start_time: std::time::Instant::now(),
    });

    spawn_discovery_poller(adapter, coordinator.clone(), subsessions.clone());
    spawn_orchestrator_poller(orchestrator);
    spawn_subsession_poller(subsessions, coordinator);

    let app = routes::root_router(state);
    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    let listener = TcpListener::bind(addr).await?;
    info!(%addr, "deskctld listening");

    axum::serve(listener, app.into_make_service_with_connect_info::<SocketAddr>())
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

/// Polls the adapter's page list every [`DISCOVERY_POLL_INTERVAL`], feeding
/// every page's transcript into the Session Coordinator and offering
/// previously-unseen conversations to the Sub-session Tracker's auto-link.
fn spawn_discovery_poller<A: dc_adapters::DebugAdapter, G: dc_adapters::GuiAutomation>(
    adapter: Arc<A>,
    coordinator: Arc<Coordinator<A, G>>,
    subsessions: Arc<SubSessionTracker<A, G>>,
) {
    tokio::spawn(async move {
        let mut ticks = tokio::time::interval(DISCOVERY_POLL_INTERVAL);
        loop {
            ticks.tick().await;
            let now_ms = SystemClock.now_ms();
            let pages = match adapter.list_pages().await {
                Ok(pages) => pages,
                Err(err) => {
                    warn!(%err, "page discovery failed, adapter unavailable");
                    continue;
                }
            };
            for page in pages {
                let conversation_id = dc_core::ConversationId::from(page.id.as_str());
                let first_seen = !coordinator.exists(&conversation_id);
                let transcript = adapter.get_transcript(&page.id).await.unwrap_or_default();
                coordinator.observe(conversation_id.clone(), String::new(), &transcript, now_ms);
                if first_seen {
                    subsessions.maybe_auto_link(conversation_id.clone(), now_ms);
                }
                if let Some(last) = transcript.last() {
                    subsessions.note_activity(&conversation_id, Some(last.content.clone()), now_ms);
                }
            }
        }
    });
}

/// Drives every non-terminal orchestrator instance's phase tick.
fn spawn_orchestrator_poller<A: dc_adapters::DebugAdapter, G: dc_adapters::GuiAutomation>(orchestrator: Arc<OrchestratorEngine<A, G>>) {
    tokio::spawn(async move {
        let mut ticks = tokio::time::interval(ORCHESTRATOR_POLL_INTERVAL);
        loop {
            ticks.tick().await;
            let now_ms = SystemClock.now_ms();
            for instance in orchestrator.list() {
                if instance.status.is_terminal() || instance.status == OrchestratorStatus::Paused {
                    continue;
                }
                if let Err(err) = orchestrator.poll(&instance.id, now_ms).await {
                    warn!(id = %instance.id, %err, "orchestrator poll tick failed");
                }
            }
        }
    });
}

fn spawn_subsession_poller<A: dc_adapters::DebugAdapter, G: dc_adapters::GuiAutomation>(
    subsessions: Arc<SubSessionTracker<A, G>>,
    coordinator: Arc<Coordinator<A, G>>,
) {
    tokio::spawn(async move {
        let mut ticks = tokio::time::interval(SUBSESSION_POLL_INTERVAL);
        loop {
            ticks.tick().await;
            let now_ms = SystemClock.now_ms();
            if let Err(err) = subsessions.poll(now_ms, |id| coordinator.exists(id)).await {
                warn!(%err, "sub-session poll tick failed");
            }
        }
    });
}

/// Waits for `SIGINT` or `SIGTERM` (unix only for the latter), matching the
/// documented exit codes (§6): graceful shutdown always exits 0.
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c().await.expect("failed to install ctrl-c handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };
    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    info!("shutdown signal received, draining in-flight requests");
}
