use super::*;

fn cli(pin: Option<&str>, port: Option<u16>, dir: Option<&std::path::Path>) -> Cli {
    Cli { pin: pin.map(String::from), port, config: dir.map(|d| d.to_path_buf()) }
}

#[test]
fn cli_pin_overrides_and_empty_pin_disables_gate() {
    let dir = tempfile::tempdir().unwrap();
    let config = Config::load(cli(Some("123456"), None, Some(dir.path())));
    assert_eq!(config.pin.as_deref(), Some("123456"));

    let config = Config::load(cli(Some(""), None, Some(dir.path())));
    assert_eq!(config.pin, None, "empty pin disables the gate");
}

#[test]
fn port_defaults_when_unset() {
    let dir = tempfile::tempdir().unwrap();
    let config = Config::load(cli(None, None, Some(dir.path())));
    assert_eq!(config.port, 4207);
}

#[test]
fn paths_are_resolved_under_state_dir() {
    let dir = tempfile::tempdir().unwrap();
    let config = Config::load(cli(None, None, Some(dir.path())));
    assert_eq!(config.snapshot_path, dir.path().join("orchestrators.json"));
    assert_eq!(config.log_path, dir.path().join("daemon.log"));
}
