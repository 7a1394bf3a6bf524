// SPDX-License-Identifier: MIT

//! dc-storage: debounced JSON snapshot persistence for orchestrator state
//! (§4.H "Persistence"). Conversations, workers, templates, and auth state
//! are process-lifetime only — only orchestrator instances survive a
//! restart, so this crate has a single job: keep `data/orchestrators.json`
//! close to the in-memory truth without a write on every mutation.

pub mod snapshot;
pub mod store;

pub use snapshot::{Snapshot, SnapshotError};
pub use store::OrchestratorStore;
