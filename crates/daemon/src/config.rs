// SPDX-License-Identifier: MIT

//! Centralized environment variable and CLI flag access for the daemon crate.
//! Mirrors the teacher's `env.rs`: one place that reads `std::env::var`, typed
//! accessors and defaults everywhere else.

use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;

/// `--pin=<6-digit>` overrides env `PIN`; absence of PIN disables the Gate
/// entirely. `PORT` selects the HTTP port (§6 "CLI / environment").
#[derive(Debug, Parser)]
#[command(name = "deskctld", version)]
pub struct Cli {
    /// Operator PIN. Overrides `PIN`. Omit to disable the Auth Gate.
    #[arg(long)]
    pub pin: Option<String>,

    /// HTTP port to bind. Overrides `PORT`.
    #[arg(long)]
    pub port: Option<u16>,

    /// Path to the state directory. Overrides `DC_STATE_DIR`.
    #[arg(long)]
    pub config: Option<PathBuf>,
}

/// Resolve the state directory: `DC_STATE_DIR` > `XDG_STATE_HOME/deskctl` >
/// `~/.local/state/deskctl`.
fn state_dir(cli_override: Option<PathBuf>) -> PathBuf {
    if let Some(dir) = cli_override {
        return dir;
    }
    if let Ok(dir) = std::env::var("DC_STATE_DIR") {
        return PathBuf::from(dir);
    }
    if let Ok(xdg) = std::env::var("XDG_STATE_HOME") {
        return PathBuf::from(xdg).join("deskctl");
    }
    let home = std::env::var("HOME").unwrap_or_else(|_| ".".to_string());
    PathBuf::from(home).join(".local/state/deskctl")
}

fn env_u16(name: &str) -> Option<u16> {
    std::env::var(name).ok().and_then(|s| s.parse().ok())
}

fn env_u64(name: &str) -> Option<u64> {
    std::env::var(name).ok().and_then(|s| s.parse().ok())
}

/// Fully resolved daemon configuration: CLI flags take priority over
/// environment variables, which take priority over defaults.
#[derive(Debug, Clone)]
pub struct Config {
    /// Operator PIN. `None` disables the Auth/Rate-limit Gate entirely.
    pub pin: Option<String>,
    pub port: u16,
    pub state_dir: PathBuf,
    pub snapshot_path: PathBuf,
    pub log_path: PathBuf,
    pub templates_system_dir: PathBuf,
    pub templates_user_dir: PathBuf,
    /// Remote-debugging discovery base, e.g. `http://127.0.0.1:9222`.
    pub cdp_http_base: String,
    /// Session token TTL, default 4 h (§3 "Session token").
    pub token_ttl_ms: i64,
    /// Distinct-failure threshold that trips the global lockdown (§4.J).
    pub lockdown_threshold: u32,
    /// Persistence debounce for the orchestrator snapshot (§4.H).
    pub snapshot_debounce_ms: u64,
    /// Force-exit backstop after graceful shutdown begins (§6).
    pub drain_timeout: Duration,
    /// Ring-buffer capacity for `GET /api/logs` (§3.1).
    pub log_buffer_capacity: usize,
}

impl Config {
    pub fn load(cli: Cli) -> Self {
        let state_dir = state_dir(cli.config);
        let pin = cli.pin.or_else(|| std::env::var("PIN").ok()).filter(|s| !s.is_empty());
        let port = cli.port.or_else(|| env_u16("PORT")).unwrap_or(4207);

        Self {
            pin,
            port,
            snapshot_path: state_dir.join("orchestrators.json"),
            log_path: state_dir.join("daemon.log"),
            templates_system_dir: state_dir.join("templates/system"),
            templates_user_dir: state_dir.join("templates/user"),
            cdp_http_base: std::env::var("DC_CDP_HTTP_BASE").unwrap_or_else(|_| "http://127.0.0.1:9222".into()),
            token_ttl_ms: env_u64("DC_TOKEN_TTL_MS").map(|v| v as i64).unwrap_or(4 * 60 * 60 * 1000),
            lockdown_threshold: env_u64("DC_LOCKDOWN_THRESHOLD").map(|v| v as u32).unwrap_or(10),
            snapshot_debounce_ms: env_u64("DC_SNAPSHOT_DEBOUNCE_MS").unwrap_or(1_000),
            drain_timeout: Duration::from_millis(env_u64("DC_DRAIN_TIMEOUT_MS").unwrap_or(5_000)),
            log_buffer_capacity: env_u64("DC_LOG_BUFFER_CAPACITY").map(|v| v as usize).unwrap_or(2_000),
            state_dir,
        }
    }
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
