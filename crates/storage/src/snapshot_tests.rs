use super::*;
use dc_core::OrchestratorId;
use tempfile::tempdir;

fn sample() -> OrchestratorInstance {
    OrchestratorInstance::new(
        OrchestratorId::generate("orch"),
        "default".into(),
        dc_core::ConversationId::generate("conv"),
        "/tmp/project".into(),
        "do the thing".into(),
        0,
    )
}

#[test]
fn round_trips_through_disk() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("orchestrators.json");

    let mut orchestrators = HashMap::new();
    let inst = sample();
    orchestrators.insert(inst.id.clone(), inst.clone());

    write_snapshot(&path, &Snapshot::new(orchestrators)).unwrap();
    let loaded = read_snapshot(&path).unwrap().expect("snapshot present");

    assert_eq!(loaded.version, CURRENT_SNAPSHOT_VERSION);
    assert_eq!(loaded.orchestrators.get(&inst.id).unwrap().user_request, "do the thing");
}

#[test]
fn missing_file_is_none() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("missing.json");
    assert!(read_snapshot(&path).unwrap().is_none());
}

#[test]
fn previous_snapshot_is_rotated_to_bak() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("orchestrators.json");

    write_snapshot(&path, &Snapshot::new(HashMap::new())).unwrap();
    write_snapshot(&path, &Snapshot::new(HashMap::new())).unwrap();

    assert!(path.with_extension("bak").exists());
}
