use super::*;
use dc_adapters::{FakeAdapter, TranscriptMessage};
use dc_core::{Delimiters, Priority, Task};

fn task(id: &str, deps: &[&str]) -> Task {
    Task {
        id: id.to_string(),
        title: id.to_string(),
        description: "do the thing".into(),
        scope: vec![],
        priority: Priority::Medium,
        dependencies: deps.iter().map(|d| d.to_string()).collect(),
        token_estimate: None,
    }
}

fn request(orchestrator_id: &str, task: Task, max_workers: u32) -> SpawnRequest {
    SpawnRequest {
        orchestrator_id: OrchestratorId::from(orchestrator_id.to_string()),
        task,
        cwd: "/tmp".into(),
        prompt: "go".into(),
        max_workers,
        max_retries: 1,
    }
}

fn hidden_conversation_id(orchestrator_id: &str, task_id: &str) -> String {
    format!("{}{}_{}", dc_core::HIDDEN_CONVERSATION_PREFIX, orchestrator_id, task_id)
}

fn delims() -> Delimiters {
    Delimiters { start: "<<<ORCHESTRATOR_RESPONSE>>>".into(), end: "<<<END_ORCHESTRATOR_RESPONSE>>>".into() }
}

#[tokio::test]
async fn max_workers_one_serializes_spawns() {
    let adapter = Arc::new(FakeAdapter::new());
    let pool = WorkerPool::new(adapter.clone(), Arc::new(ResponseParser::new()));
    let orchestrator_id = OrchestratorId::from("orch-1".to_string());

    let w1 = pool.spawn(request("orch-1", task("a", &[]), 1), 0);
    let w2 = pool.spawn(request("orch-1", task("b", &[]), 1), 0);

    pool.try_drain(&orchestrator_id, 0).await;

    assert_eq!(pool.get(&w1).unwrap().status, WorkerStatus::Running);
    assert_eq!(pool.get(&w2).unwrap().status, WorkerStatus::Pending);

    pool.cancel(&w1, 1).await.unwrap();

    assert_eq!(pool.get(&w2).unwrap().status, WorkerStatus::Running);
}

#[tokio::test]
async fn completion_phase_marks_worker_terminal_and_frees_slot() {
    let adapter = Arc::new(FakeAdapter::new());
    let pool = WorkerPool::new(adapter.clone(), Arc::new(ResponseParser::new()));
    let orchestrator_id = OrchestratorId::from("orch-2".to_string());

    let w1 = pool.spawn(request("orch-2", task("a", &[]), 1), 0);
    let w2 = pool.spawn(request("orch-2", task("b", &[]), 1), 0);
    pool.try_drain(&orchestrator_id, 0).await;

    let conv = hidden_conversation_id("orch-2", "a");
    adapter.set_transcript(
        &conv,
        vec![TranscriptMessage {
            role: "assistant".into(),
            content: "<<<ORCHESTRATOR_RESPONSE>>>{\"phase\":\"completion\",\"data\":{\"task_id\":\"a\",\"status\":\"success\",\"summary\":\"done\"}}<<<END_ORCHESTRATOR_RESPONSE>>>".into(),
            timestamp_ms: 1,
        }],
    );

    pool.poll(&w1, &delims(), 60_000, 10).await.unwrap();

    let record = pool.get(&w1).unwrap();
    assert_eq!(record.status, WorkerStatus::Completed);
    assert_eq!(record.output.as_deref(), Some("done"));
    assert_eq!(pool.get(&w2).unwrap().status, WorkerStatus::Running);
}

#[tokio::test]
async fn worker_timeout_transitions_and_frees_slot() {
    let adapter = Arc::new(FakeAdapter::new());
    let pool = WorkerPool::new(adapter.clone(), Arc::new(ResponseParser::new()));
    let orchestrator_id = OrchestratorId::from("orch-3".to_string());

    let w1 = pool.spawn(request("orch-3", task("a", &[]), 1), 0);
    pool.try_drain(&orchestrator_id, 0).await;

    pool.poll(&w1, &delims(), 1_000, 5_000).await.unwrap();

    assert_eq!(pool.get(&w1).unwrap().status, WorkerStatus::Timeout);
}

#[tokio::test]
async fn retry_requires_terminal_state_and_respects_retry_budget() {
    let adapter = Arc::new(FakeAdapter::new());
    let pool = WorkerPool::new(adapter.clone(), Arc::new(ResponseParser::new()));
    let orchestrator_id = OrchestratorId::from("orch-4".to_string());

    let w1 = pool.spawn(request("orch-4", task("a", &[]), 1), 0);
    let req = request("orch-4", task("a", &[]), 1);

    assert!(matches!(pool.retry(&w1, req.clone()), Err(WorkerPoolError::NotRetryable(_))));

    pool.try_drain(&orchestrator_id, 0).await;
    pool.cancel(&w1, 1).await.unwrap();

    // cancelled isn't in the retryable set (only failed/timeout).
    assert!(matches!(pool.retry(&w1, req), Err(WorkerPoolError::NotRetryable(_))));
}

#[tokio::test]
async fn monotonic_terminal_worker_count_across_polls() {
    let adapter = Arc::new(FakeAdapter::new());
    let pool = WorkerPool::new(adapter.clone(), Arc::new(ResponseParser::new()));
    let orchestrator_id = OrchestratorId::from("orch-5".to_string());

    let w1 = pool.spawn(request("orch-5", task("a", &[]), 2), 0);
    let w2 = pool.spawn(request("orch-5", task("b", &[]), 2), 0);
    pool.try_drain(&orchestrator_id, 0).await;

    let mut terminal_count = |pool: &WorkerPool<FakeAdapter>| {
        [&w1, &w2].iter().filter(|id| pool.get(id).map(|w| w.status.is_terminal()).unwrap_or(false)).count()
    };

    assert_eq!(terminal_count(&pool), 0);
    pool.cancel(&w1, 5).await.unwrap();
    assert_eq!(terminal_count(&pool), 1);
    pool.cancel(&w2, 6).await.unwrap();
    assert_eq!(terminal_count(&pool), 2);
    // Cancelling an already-terminal worker is a no-op, count never drops.
    pool.cancel(&w1, 7).await.unwrap();
    assert_eq!(terminal_count(&pool), 2);
}
