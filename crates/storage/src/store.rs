// SPDX-License-Identifier: MIT

//! In-memory orchestrator table backed by a debounced JSON snapshot.
//!
//! Every mutation marks the store dirty; a background task coalesces bursts
//! of mutations into a single write `debounce_ms` after the first one,
//! mirroring the "single writer, debounced" rule in §4.H rather than
//! fsyncing on every state transition.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;

use dc_core::{OrchestratorId, OrchestratorInstance};
use parking_lot::RwLock;
use tokio::sync::mpsc;
use tracing::{error, info};

use crate::snapshot::{read_snapshot, write_snapshot, Snapshot, SnapshotError};

#[derive(Clone)]
pub struct OrchestratorStore {
    inner: Arc<RwLock<HashMap<OrchestratorId, OrchestratorInstance>>>,
    dirty_tx: mpsc::UnboundedSender<()>,
}

impl OrchestratorStore {
    /// Loads any existing snapshot at `path` (missing file is an empty
    /// store) and starts the debounce-writer task.
    pub async fn load(path: PathBuf, debounce_ms: u64) -> Result<Self, SnapshotError> {
        let path_for_blocking = path.clone();
        let snapshot = tokio::task::spawn_blocking(move || read_snapshot(&path_for_blocking))
            .await
            .expect("snapshot load task panicked")?;

        let orchestrators = snapshot.map(|s| s.orchestrators).unwrap_or_default();
        let inner = Arc::new(RwLock::new(orchestrators));
        let (dirty_tx, dirty_rx) = mpsc::unbounded_channel();

        let store = Self { inner, dirty_tx };
        store.spawn_writer(path, debounce_ms, dirty_rx);
        Ok(store)
    }

    fn spawn_writer(&self, path: PathBuf, debounce_ms: u64, mut dirty_rx: mpsc::UnboundedReceiver<()>) {
        let inner = self.inner.clone();
        tokio::spawn(async move {
            while dirty_rx.recv().await.is_some() {
                // Drain any additional signals that arrived while we were
                // about to sleep, so a burst of writes collapses to one.
                tokio::time::sleep(std::time::Duration::from_millis(debounce_ms)).await;
                while dirty_rx.try_recv().is_ok() {}

                let snapshot = Snapshot::new(inner.read().clone());
                let path = path.clone();
                let result = tokio::task::spawn_blocking(move || write_snapshot(&path, &snapshot)).await;
                match result {
                    Ok(Ok(())) => info!("orchestrator snapshot written"),
                    Ok(Err(err)) => error!(%err, "failed to write orchestrator snapshot"),
                    Err(err) => error!(%err, "snapshot write task panicked"),
                }
            }
        });
    }

    fn mark_dirty(&self) {
        let _ = self.dirty_tx.send(());
    }

    pub fn get(&self, id: &OrchestratorId) -> Option<OrchestratorInstance> {
        self.inner.read().get(id).cloned()
    }

    pub fn list(&self) -> Vec<OrchestratorInstance> {
        self.inner.read().values().cloned().collect()
    }

    pub fn upsert(&self, instance: OrchestratorInstance) {
        self.inner.write().insert(instance.id.clone(), instance);
        self.mark_dirty();
    }

    /// Applies `f` to the stored instance in place and persists the result.
    /// Returns `false` if no instance with `id` exists.
    pub fn update_with<F: FnOnce(&mut OrchestratorInstance)>(&self, id: &OrchestratorId, f: F) -> bool {
        let found = {
            let mut guard = self.inner.write();
            match guard.get_mut(id) {
                Some(instance) => {
                    f(instance);
                    true
                }
                None => false,
            }
        };
        if found {
            self.mark_dirty();
        }
        found
    }

    pub fn remove(&self, id: &OrchestratorId) -> Option<OrchestratorInstance> {
        let removed = self.inner.write().remove(id);
        if removed.is_some() {
            self.mark_dirty();
        }
        removed
    }
}

#[cfg(test)]
#[path = "store_tests.rs"]
mod tests;
