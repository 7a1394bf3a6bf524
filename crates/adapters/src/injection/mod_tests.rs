use super::*;
use crate::fake::FakeAdapter;

fn engine() -> InjectionEngine<FakeAdapter, NoopGuiAutomation> {
    InjectionEngine::new(Arc::new(FakeAdapter::new()), Arc::new(NoopGuiAutomation))
}

#[tokio::test]
async fn preferred_method_succeeds_on_first_attempt() {
    let engine = engine();
    let conv = ConversationId::from("conv-1");

    let outcome = engine.inject(Some(conv.clone()), "hello").await.unwrap();

    assert_eq!(outcome.method, InjectionMethod::AdapterEval);
    assert_eq!(engine.counters().get(&InjectionMethod::AdapterEval).unwrap().success, 1);
}

#[tokio::test]
async fn unavailable_adapter_fails_fast_without_trying_strategies() {
    let adapter = Arc::new(FakeAdapter::new());
    adapter.set_available(false);
    let engine = InjectionEngine::new(adapter, Arc::new(NoopGuiAutomation));

    let err = engine.inject(Some(ConversationId::from("conv-1")), "hi").await.unwrap_err();
    assert!(matches!(err, InjectionError::AdapterUnavailable(_)));
}

#[tokio::test]
async fn events_are_broadcast_on_success() {
    let engine = engine();
    let mut rx = engine.subscribe();

    engine.inject(Some(ConversationId::from("conv-1")), "hi").await.unwrap();

    let started = rx.recv().await.unwrap();
    assert!(matches!(started, Event::InjectionStarted { .. }));
    let success = rx.recv().await.unwrap();
    assert!(matches!(success, Event::InjectionSuccess { .. }));
    let injected = rx.recv().await.unwrap();
    assert!(matches!(injected, Event::MessageInjected { .. }));
}

#[tokio::test]
async fn queued_items_drain_in_fifo_order() {
    let adapter = Arc::new(FakeAdapter::new());
    let engine = InjectionEngine::new(adapter.clone(), Arc::new(NoopGuiAutomation));
    let conv = ConversationId::from("conv-1");

    engine.queue_inject(conv.clone(), "first".into());
    engine.queue_inject(conv.clone(), "second".into());

    let drained = engine.drain_queue(conv, Duration::from_millis(1)).await.unwrap();
    assert_eq!(drained, 2);

    let calls = adapter.calls();
    let expressions: Vec<_> = calls
        .iter()
        .filter_map(|c| match c {
            crate::fake::FakeCall::Evaluate { expression, .. } => Some(expression.clone()),
            _ => None,
        })
        .collect();
    assert!(expressions[0].contains("first"));
    assert!(expressions[1].contains("second"));
}
