//! End-to-end tests against the built `deskctld` binary (§8 scenarios 1/2
//! and the "CLI / environment" contract): spawn the real process, log in,
//! exercise a couple of routes, and confirm graceful shutdown on SIGTERM.

use std::process::Stdio;
use std::time::Duration;

use assert_cmd::cargo::cargo_bin;
use serial_test::serial;
use tokio::process::Command;
use tokio::time::sleep;

struct Daemon {
    child: tokio::process::Child,
    port: u16,
    base: String,
}

impl Daemon {
    async fn spawn(dir: &std::path::Path, pin: &str) -> Self {
        let port = pick_port();
        let child = Command::new(cargo_bin("deskctld"))
            .arg("--pin")
            .arg(pin)
            .arg("--port")
            .arg(port.to_string())
            .arg("--config")
            .arg(dir)
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .kill_on_drop(true)
            .spawn()
            .expect("spawn deskctld");

        let base = format!("http://127.0.0.1:{port}");
        wait_for_health(&base).await;
        Self { child, port, base }
    }

    async fn shutdown(mut self) {
        send_sigterm(self.child.id());
        let _ = tokio::time::timeout(Duration::from_secs(5), self.child.wait()).await;
    }
}

#[cfg(unix)]
fn send_sigterm(pid: Option<u32>) {
    if let Some(pid) = pid {
        let _ = std::process::Command::new("kill").arg("-TERM").arg(pid.to_string()).status();
    }
}
#[cfg(not(unix))]
fn send_sigterm(_pid: Option<u32>) {}

fn pick_port() -> u16 {
    std::net::TcpListener::bind("127.0.0.1:0").unwrap().local_addr().unwrap().port()
}

async fn wait_for_health(base: &str) {
    let client = reqwest::Client::new();
    for _ in 0..50 {
        if let Ok(resp) = client.get(format!("{base}/api/health")).send().await {
            if resp.status().is_success() {
                return;
            }
        }
        sleep(Duration::from_millis(100)).await;
    }
    panic!("daemon never became healthy");
}

#[tokio::test]
#[serial]
async fn health_is_reachable_without_auth() {
    let dir = tempfile::tempdir().unwrap();
    let daemon = Daemon::spawn(dir.path(), "482913").await;

    let resp = reqwest::get(format!("{}/api/health", daemon.base)).await.unwrap();
    assert!(resp.status().is_success());

    daemon.shutdown().await;
}

#[tokio::test]
#[serial]
async fn wrong_pin_then_correct_pin_yields_a_usable_token() {
    let dir = tempfile::tempdir().unwrap();
    let daemon = Daemon::spawn(dir.path(), "482913").await;
    let client = reqwest::Client::new();

    let bad = client.post(format!("{}/api/auth/login", daemon.base)).json(&serde_json::json!({"pin": "000000"})).send().await.unwrap();
    assert_eq!(bad.status(), reqwest::StatusCode::UNAUTHORIZED);

    let good = client.post(format!("{}/api/auth/login", daemon.base)).json(&serde_json::json!({"pin": "482913"})).send().await.unwrap();
    assert!(good.status().is_success());
    let body: serde_json::Value = good.json().await.unwrap();
    let token = body["token"].as_str().expect("token field").to_string();
    assert!(!token.is_empty());

    let sessions = client
        .get(format!("{}/api/sessions", daemon.base))
        .header("authorization", format!("Bearer {token}"))
        .send()
        .await
        .unwrap();
    assert!(sessions.status().is_success());

    let unauthenticated = client.get(format!("{}/api/sessions", daemon.base)).send().await.unwrap();
    assert_eq!(unauthenticated.status(), reqwest::StatusCode::UNAUTHORIZED);

    daemon.shutdown().await;
}

#[tokio::test]
#[serial]
async fn template_crud_round_trips_over_http() {
    let dir = tempfile::tempdir().unwrap();
    let daemon = Daemon::spawn(dir.path(), "482913").await;
    let client = reqwest::Client::new();

    let login = client.post(format!("{}/api/auth/login", daemon.base)).json(&serde_json::json!({"pin": "482913"})).send().await.unwrap();
    let body: serde_json::Value = login.json().await.unwrap();
    let token = body["token"].as_str().unwrap().to_string();

    let create = client
        .post(format!("{}/api/orchestrator/templates", daemon.base))
        .header("authorization", format!("Bearer {token}"))
        .json(&serde_json::json!({"id": "smoke-test", "name": "Smoke Test", "extends": null, "body": {"version": "1.0.0", "phases": {}}}))
        .send()
        .await
        .unwrap();
    assert!(create.status().is_success(), "create failed: {:?}", create.text().await);

    let list = client
        .get(format!("{}/api/orchestrator/templates", daemon.base))
        .header("authorization", format!("Bearer {token}"))
        .send()
        .await
        .unwrap();
    assert!(list.status().is_success());
    let list_body: serde_json::Value = list.json().await.unwrap();
    let templates = list_body["templates"].as_array().expect("templates array");
    assert!(templates.iter().any(|t| t["id"] == "smoke-test"));

    daemon.shutdown().await;
}

#[tokio::test]
#[serial]
async fn sigterm_shuts_down_gracefully() {
    let dir = tempfile::tempdir().unwrap();
    let mut daemon = Daemon::spawn(dir.path(), "482913").await;

    send_sigterm(daemon.child.id());
    let status = tokio::time::timeout(Duration::from_secs(5), daemon.child.wait()).await.expect("did not exit in time").unwrap();
    assert!(status.success());
}
