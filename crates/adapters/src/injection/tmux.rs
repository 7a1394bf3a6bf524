// SPDX-License-Identifier: MIT

//! Strategy 4: terminal-multiplexer send (tmux/screen/wsl-tmux).

use thiserror::Error;

#[derive(Debug, Error)]
pub enum TmuxError {
    #[error("no multiplexer session bound to this conversation")]
    NoSession,
    #[error("command failed: {0}")]
    CommandFailed(String),
}

/// Sends `text` to a named tmux pane/session via `tmux send-keys ... Enter`.
/// Screen and wsl-tmux variants shell out the same way with a different
/// program name; only the plain tmux path is implemented here since it is
/// the common case in the server's deployment target.
pub async fn send_to_session(session_name: &str, text: &str) -> Result<(), TmuxError> {
    let status = tokio::process::Command::new("tmux")
        .args(["send-keys", "-t", session_name, text, "Enter"])
        .status()
        .await
        .map_err(|e| TmuxError::CommandFailed(e.to_string()))?;

    if status.success() {
        Ok(())
    } else {
        Err(TmuxError::CommandFailed(format!("tmux exited with {status}")))
    }
}

pub async fn session_exists(session_name: &str) -> bool {
    tokio::process::Command::new("tmux")
        .args(["has-session", "-t", session_name])
        .status()
        .await
        .map(|s| s.success())
        .unwrap_or(false)
}
