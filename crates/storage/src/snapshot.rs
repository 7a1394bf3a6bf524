// SPDX-License-Identifier: MIT

//! Snapshot file format and atomic write helpers.
//!
//! Grounded on the teacher's `daemon::storage::snapshot` module: a
//! versioned envelope plus rotated `.bak` files, written via a temp file
//! and rename rather than in place.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use dc_core::{OrchestratorId, OrchestratorInstance};
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub const CURRENT_SNAPSHOT_VERSION: u32 = 1;

#[derive(Debug, Error)]
pub enum SnapshotError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("serialization error: {0}")]
    Json(#[from] serde_json::Error),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Snapshot {
    #[serde(rename = "v")]
    pub version: u32,
    pub orchestrators: HashMap<OrchestratorId, OrchestratorInstance>,
    pub saved_at: DateTime<Utc>,
}

impl Snapshot {
    pub fn new(orchestrators: HashMap<OrchestratorId, OrchestratorInstance>) -> Self {
        Self { version: CURRENT_SNAPSHOT_VERSION, orchestrators, saved_at: Utc::now() }
    }
}

const MAX_BAK_FILES: u32 = 3;

/// Pick the next `.bak` / `.bak.N` path, rotating older backups out.
pub(crate) fn rotate_bak_path(path: &Path) -> PathBuf {
    let bak = |n: u32| {
        if n == 1 {
            path.with_extension("bak")
        } else {
            path.with_extension(format!("bak.{n}"))
        }
    };

    let oldest = bak(MAX_BAK_FILES);
    if oldest.exists() {
        let _ = fs::remove_file(&oldest);
    }
    for n in (1..MAX_BAK_FILES).rev() {
        let src = bak(n);
        if src.exists() {
            let _ = fs::rename(&src, bak(n + 1));
        }
    }
    bak(1)
}

/// Writes `snapshot` to `path` via a sibling temp file plus rename, so a
/// crash mid-write never leaves a truncated snapshot on disk. The previous
/// file, if any, is rotated into `.bak` first.
pub fn write_snapshot(path: &Path, snapshot: &Snapshot) -> Result<(), SnapshotError> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    if path.exists() {
        let _ = fs::copy(path, rotate_bak_path(path));
    }

    let tmp_path = path.with_extension("json.tmp");
    let body = serde_json::to_vec_pretty(snapshot)?;
    fs::write(&tmp_path, body)?;
    fs::rename(&tmp_path, path)?;
    Ok(())
}

pub fn read_snapshot(path: &Path) -> Result<Option<Snapshot>, SnapshotError> {
    if !path.exists() {
        return Ok(None);
    }
    let body = fs::read(path)?;
    Ok(Some(serde_json::from_slice(&body)?))
}

#[cfg(test)]
#[path = "snapshot_tests.rs"]
mod tests;
