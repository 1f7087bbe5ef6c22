// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! cq-storage: SQLite persistence for the caption queue job engine.
//!
//! One database file holds two tables with different lifecycles: `jobs`,
//! the live queue rows owned by the queues that created them, and
//! `job_records`, the queue-independent history that outlives job-row
//! deletion. All access is serialized through one mutex per database.

pub mod db;
pub mod error;
pub mod fingerprint;
pub mod job_store;
pub mod records;

pub use db::Database;
pub use error::StoreError;
pub use fingerprint::{Fingerprint, FingerprintStatus};
pub use job_store::{JobStore, Transition};
pub use records::{HistoryEntry, JobRecord, JobRecordPatch, RecordStore};
