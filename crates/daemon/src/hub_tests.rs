use super::*;

#[test]
fn security_events_pass_the_unauthenticated_whitelist() {
    assert!(allowed_unauthenticated(&Event::GlobalLockdown { reason: "test".into() }));
    assert!(allowed_unauthenticated(&Event::SecurityIpBlocked { source: "1.1.1.1".into() }));
    assert!(!allowed_unauthenticated(&Event::Ping));
    assert!(!allowed_unauthenticated(&Event::MessageInjected { conversation_id: dc_core::ConversationId::from("c1") }));
}

#[test]
fn stamp_adds_a_timestamp_field() {
    let stamped = stamp(&Event::Ping);
    let value: serde_json::Value = serde_json::from_str(&stamped).unwrap();
    assert_eq!(value["type"], "ping");
    assert!(value.get("timestamp").is_some());
}

#[tokio::test]
async fn publish_reaches_subscribers() {
    let hub = Arc::new(Hub::new());
    let mut rx = hub.sender().subscribe();
    hub.publish(Event::Ping);
    let event = rx.recv().await.unwrap();
    assert!(matches!(event, Event::Ping));
}

#[tokio::test]
async fn relay_forwards_events_from_an_external_sender() {
    let hub = Arc::new(Hub::new());
    let (external_tx, external_rx) = broadcast::channel(16);
    hub.relay(external_rx);

    let mut hub_rx = hub.sender().subscribe();
    external_tx.send(Event::Pong).unwrap();

    let event = hub_rx.recv().await.unwrap();
    assert!(matches!(event, Event::Pong));
}
