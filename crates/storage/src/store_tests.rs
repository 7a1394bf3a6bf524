use super::*;
use dc_core::ConversationId;
use tempfile::tempdir;

fn instance(id: &str) -> OrchestratorInstance {
    OrchestratorInstance::new(
        OrchestratorId::from(id),
        "default",
        ConversationId::generate("conv"),
        "/tmp/project",
        "do the thing",
        0,
    )
}

#[tokio::test]
async fn upsert_persists_after_debounce() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("orchestrators.json");
    let store = OrchestratorStore::load(path.clone(), 10).await.unwrap();

    store.upsert(instance("orch-1"));
    tokio::time::sleep(std::time::Duration::from_millis(100)).await;

    let snapshot = crate::snapshot::read_snapshot(&path).unwrap().expect("written");
    assert!(snapshot.orchestrators.contains_key(&OrchestratorId::from("orch-1")));
}

#[tokio::test]
async fn load_recovers_prior_snapshot() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("orchestrators.json");

    let mut map = HashMap::new();
    map.insert(OrchestratorId::from("orch-1"), instance("orch-1"));
    write_snapshot(&path, &Snapshot::new(map)).unwrap();

    let store = OrchestratorStore::load(path, 10).await.unwrap();
    assert_eq!(store.list().len(), 1);
}

#[tokio::test]
async fn update_with_missing_id_returns_false() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("orchestrators.json");
    let store = OrchestratorStore::load(path, 10).await.unwrap();

    let found = store.update_with(&OrchestratorId::from("missing"), |i| i.errors.push("x".into()));
    assert!(!found);
}
