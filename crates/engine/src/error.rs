// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Engine error types.

use cq_storage::StoreError;

/// Errors surfaced by the queue engine.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error("unknown queue '{0}'")]
    UnknownQueue(String),

    #[error("no handler registered for '{0}'")]
    UnknownHandler(String),

    #[error("failed to spawn worker thread: {0}")]
    WorkerSpawn(#[source] std::io::Error),

    #[error(transparent)]
    Config(#[from] crate::config::ConfigError),

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl EngineError {
    /// True when the error is the distinct "job not found" signal.
    pub fn is_not_found(&self) -> bool {
        matches!(self, EngineError::Store(StoreError::JobNotFound(_)))
    }
}
