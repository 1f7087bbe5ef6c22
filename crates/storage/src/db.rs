// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Database handle: connection setup, pragmas, and schema migration.

use crate::error::StoreError;
use crate::job_store::JobStore;
use crate::records::RecordStore;
use parking_lot::Mutex;
use rusqlite::Connection;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

/// Shared SQLite handle behind the single per-database lock.
///
/// Every store view cloned from this handle serializes through the same
/// mutex, so each operation's read-modify-write section is atomic with
/// respect to concurrent callers on other threads.
#[derive(Clone)]
pub struct Database {
    conn: Arc<Mutex<Connection>>,
}

impl Database {
    /// Open (creating if needed) the job database at `path`.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let conn = Connection::open(path)?;
        conn.busy_timeout(Duration::from_secs(5))?;
        migrate(&conn)?;

        tracing::debug!(path = %path.display(), "opened job database");
        Ok(Self { conn: Arc::new(Mutex::new(conn)) })
    }

    /// View over the live `jobs` table.
    pub fn job_store(&self) -> JobStore {
        JobStore::new(self.conn.clone())
    }

    /// View over the `job_records` history table.
    pub fn record_store(&self) -> RecordStore {
        RecordStore::new(self.conn.clone())
    }
}

fn migrate(conn: &Connection) -> Result<(), rusqlite::Error> {
    conn.execute_batch(
        r#"
        PRAGMA journal_mode=WAL;
        PRAGMA synchronous=NORMAL;

        CREATE TABLE IF NOT EXISTS jobs (
          job_id TEXT PRIMARY KEY,
          queue_name TEXT NOT NULL,
          handler TEXT NOT NULL,
          args TEXT NOT NULL,
          status TEXT NOT NULL,
          created_at_ms INTEGER NOT NULL,
          started_at_ms INTEGER,
          ended_at_ms INTEGER,
          meta TEXT NOT NULL,
          result TEXT,
          error TEXT
        );

        CREATE INDEX IF NOT EXISTS idx_jobs_status ON jobs(status);
        CREATE INDEX IF NOT EXISTS idx_jobs_queue ON jobs(queue_name, status);

        CREATE TABLE IF NOT EXISTS job_records (
          job_id TEXT PRIMARY KEY,
          filename TEXT NOT NULL,
          display_name TEXT,
          media_path TEXT,
          fp_size INTEGER,
          fp_mtime_ms INTEGER,
          fp_hash TEXT,
          status TEXT NOT NULL,
          language TEXT,
          device TEXT,
          summary TEXT,
          transcript TEXT,
          created_at_ms INTEGER NOT NULL,
          updated_at_ms INTEGER NOT NULL
        );

        CREATE INDEX IF NOT EXISTS idx_records_updated ON job_records(updated_at_ms);
        "#,
    )
}
