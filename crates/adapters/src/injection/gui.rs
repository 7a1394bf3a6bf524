// SPDX-License-Identifier: MIT

//! Strategies 3 and 5: OS-level key-send to the top-level window, and
//! scripted GUI automation (AppleScript/xdotool equivalent). Both are
//! platform-specific; the trait lets the rest of the engine stay
//! platform-agnostic and fall back to a no-op on unsupported hosts.

use async_trait::async_trait;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum GuiError {
    #[error("not supported on this platform")]
    Unsupported,
    #[error("automation command failed: {0}")]
    CommandFailed(String),
}

#[async_trait]
pub trait GuiAutomation: Send + Sync + 'static {
    /// Strategy 3: send raw key events to the OS-focused top-level window.
    async fn key_send(&self, text: &str) -> Result<(), GuiError>;

    /// Strategy 5: run a scripted automation (AppleScript, xdotool, ...)
    /// that types and submits `text` in the foreground window.
    async fn scripted_submit(&self, text: &str) -> Result<(), GuiError>;
}

/// Default automation for platforms (or test environments) with no
/// scripting backend wired up. Both strategies always fail, so the engine
/// falls through to the next strategy in priority order.
#[derive(Debug, Default)]
pub struct NoopGuiAutomation;

#[async_trait]
impl GuiAutomation for NoopGuiAutomation {
    async fn key_send(&self, _text: &str) -> Result<(), GuiError> {
        Err(GuiError::Unsupported)
    }

    async fn scripted_submit(&self, _text: &str) -> Result<(), GuiError> {
        Err(GuiError::Unsupported)
    }
}

#[cfg(unix)]
pub struct XdotoolAutomation;

#[cfg(unix)]
#[async_trait]
impl GuiAutomation for XdotoolAutomation {
    async fn key_send(&self, text: &str) -> Result<(), GuiError> {
        run("xdotool", &["type", "--clearmodifiers", text]).await
    }

    async fn scripted_submit(&self, text: &str) -> Result<(), GuiError> {
        run("xdotool", &["type", "--clearmodifiers", text]).await?;
        run("xdotool", &["key", "Return"]).await
    }
}

#[cfg(unix)]
async fn run(program: &str, args: &[&str]) -> Result<(), GuiError> {
    let output = tokio::process::Command::new(program)
        .args(args)
        .output()
        .await
        .map_err(|e| GuiError::CommandFailed(e.to_string()))?;
    if output.status.success() {
        Ok(())
    } else {
        Err(GuiError::CommandFailed(String::from_utf8_lossy(&output.stderr).to_string()))
    }
}
