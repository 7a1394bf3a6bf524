// SPDX-License-Identifier: MIT

//! Aggregates every sub-component error into the abstract taxonomy from
//! §7. Each component error type exposes `.kind()`; `EngineError` just
//! forwards so the daemon has one type to map to an HTTP status.

use dc_core::ErrorKind;
use thiserror::Error;

use crate::orchestrator::OrchestratorError;
use crate::parser::ParserError;
use crate::subsession::SubSessionError;
use crate::template::TemplateError;
use crate::worker_pool::WorkerPoolError;

#[derive(Debug, Error)]
pub enum EngineError {
    #[error(transparent)]
    Template(#[from] TemplateError),
    #[error(transparent)]
    Parser(#[from] ParserError),
    #[error(transparent)]
    Worker(#[from] WorkerPoolError),
    #[error(transparent)]
    Orchestrator(#[from] OrchestratorError),
    #[error(transparent)]
    SubSession(#[from] SubSessionError),
}

impl EngineError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            EngineError::Template(e) => e.kind(),
            EngineError::Parser(e) => e.kind(),
            EngineError::Worker(e) => e.kind(),
            EngineError::Orchestrator(e) => e.kind(),
            EngineError::SubSession(e) => e.kind(),
        }
    }
}
