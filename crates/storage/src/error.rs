// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Storage error types.

use cq_core::JobId;

/// Errors surfaced by the persistence layer.
///
/// `JobNotFound` is a distinct signal, never conflated with a failed job;
/// I/O and SQLite errors are propagated so callers can decide whether to
/// retry.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("job {0} not found")]
    JobNotFound(JobId),

    #[error("job {0} already exists")]
    DuplicateJob(JobId),

    #[error("corrupt row for job {job}: {reason}")]
    CorruptRow { job: JobId, reason: String },

    #[error(transparent)]
    Sqlite(#[from] rusqlite::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}
