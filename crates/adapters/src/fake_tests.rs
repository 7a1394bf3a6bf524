use super::*;

#[tokio::test]
async fn unavailable_adapter_fails_list_pages() {
    let fake = FakeAdapter::new();
    fake.set_available(false);
    assert!(matches!(fake.list_pages().await, Err(AdapterError::Unavailable(_))));
}

#[tokio::test]
async fn records_calls_in_order() {
    let fake = FakeAdapter::new();
    let session = fake.attach("page-1").await.unwrap();
    fake.focus(&session).await.unwrap();
    fake.insert_text(&session, "hello").await.unwrap();

    let calls = fake.calls();
    assert_eq!(calls.len(), 2);
    assert_eq!(calls[0], FakeCall::Focus { session: "page-1".into() });
}

#[tokio::test]
async fn forced_failure_surfaces_as_runtime_error() {
    let fake = FakeAdapter::new();
    fake.fail_operation("insert_text");
    let session = fake.attach("page-1").await.unwrap();
    assert!(matches!(fake.insert_text(&session, "x").await, Err(AdapterError::Runtime(_))));
}
