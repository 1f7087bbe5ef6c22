// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Durable CRUD over job rows behind one lock per database.

use crate::error::StoreError;
use cq_core::{Job, JobId, JobMeta, JobStatus, MetaPatch};
use parking_lot::Mutex;
use rusqlite::{params, Connection, OptionalExtension, Row};
use serde_json::Value;
use std::sync::Arc;

/// Outcome of a status write.
///
/// Terminal states are sticky: a write whose stored status does not accept
/// the requested edge is rejected, carrying the status that won. A job
/// canceled while running keeps `canceled` even when the handler later
/// returns normally.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    Applied,
    Rejected(JobStatus),
}

impl Transition {
    pub fn is_applied(self) -> bool {
        matches!(self, Transition::Applied)
    }
}

/// View over the `jobs` table. Every operation takes the database lock for
/// its whole read-modify-write section; no operation partially applies.
#[derive(Clone)]
pub struct JobStore {
    conn: Arc<Mutex<Connection>>,
}

const JOB_COLUMNS: &str = "job_id, queue_name, handler, args, status, \
     created_at_ms, started_at_ms, ended_at_ms, meta, result, error";

impl JobStore {
    pub(crate) fn new(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    /// Insert a freshly enqueued job. Fails if the id already exists;
    /// a row, once created, is never re-created under the same id.
    pub fn insert(&self, job: &Job) -> Result<(), StoreError> {
        let conn = self.conn.lock();
        let exists = conn
            .query_row("SELECT 1 FROM jobs WHERE job_id = ?1", params![job.id.as_str()], |_| {
                Ok(())
            })
            .optional()?;
        if exists.is_some() {
            return Err(StoreError::DuplicateJob(job.id.clone()));
        }

        conn.execute(
            "INSERT INTO jobs (job_id, queue_name, handler, args, status, \
             created_at_ms, started_at_ms, ended_at_ms, meta, result, error) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, NULL, NULL, ?7, NULL, NULL)",
            params![
                job.id.as_str(),
                job.queue.as_str(),
                job.handler.as_str(),
                serde_json::to_string(&job.args)?,
                job.status.to_string(),
                job.created_at_ms as i64,
                serde_json::to_string(&job.meta)?,
            ],
        )?;
        Ok(())
    }

    /// Read the full row for a job.
    pub fn read(&self, id: &JobId) -> Result<Job, StoreError> {
        let conn = self.conn.lock();
        let row = conn
            .query_row(
                &format!("SELECT {JOB_COLUMNS} FROM jobs WHERE job_id = ?1"),
                params![id.as_str()],
                map_job_row,
            )
            .optional()?;
        row.ok_or_else(|| StoreError::JobNotFound(id.clone()))?
    }

    /// Apply a status transition, stamping `started_at_ms` on `started` and
    /// `ended_at_ms` on `finished`/`failed`/`canceled`. `result` is written
    /// only with `finished`, `error` only with `failed`. Edges outside the
    /// state machine are rejected, not applied.
    pub fn update_status(
        &self,
        id: &JobId,
        status: JobStatus,
        result: Option<&Value>,
        error: Option<&str>,
        now_ms: u64,
    ) -> Result<Transition, StoreError> {
        let conn = self.conn.lock();
        let current = read_status(&conn, id)?;
        if !current.accepts(status) {
            return Ok(Transition::Rejected(current));
        }

        let result_json = match (status, result) {
            (JobStatus::Finished, Some(value)) => Some(serde_json::to_string(value)?),
            _ => None,
        };
        let error_text = match (status, error) {
            (JobStatus::Failed, Some(text)) => Some(text),
            _ => None,
        };

        conn.execute(
            "UPDATE jobs SET status = ?2, \
             started_at_ms = CASE WHEN ?3 THEN ?5 ELSE started_at_ms END, \
             ended_at_ms = CASE WHEN ?4 THEN ?5 ELSE ended_at_ms END, \
             result = COALESCE(?6, result), \
             error = COALESCE(?7, error) \
             WHERE job_id = ?1",
            params![
                id.as_str(),
                status.to_string(),
                status == JobStatus::Started,
                matches!(status, JobStatus::Finished | JobStatus::Failed | JobStatus::Canceled),
                now_ms as i64,
                result_json,
                error_text,
            ],
        )?;
        Ok(Transition::Applied)
    }

    /// Merge a partial meta update into the stored meta (key-wise
    /// last-write-wins, defined by [`JobMeta::merge`]) and return the
    /// merged value. Atomic under the database lock.
    pub fn merge_meta(&self, id: &JobId, patch: MetaPatch) -> Result<JobMeta, StoreError> {
        let conn = self.conn.lock();
        let meta_json: Option<String> = conn
            .query_row("SELECT meta FROM jobs WHERE job_id = ?1", params![id.as_str()], |row| {
                row.get(0)
            })
            .optional()?;
        let meta_json = meta_json.ok_or_else(|| StoreError::JobNotFound(id.clone()))?;

        let mut meta: JobMeta = serde_json::from_str(&meta_json)?;
        meta.merge(patch);

        conn.execute(
            "UPDATE jobs SET meta = ?2 WHERE job_id = ?1",
            params![id.as_str(), serde_json::to_string(&meta)?],
        )?;
        Ok(meta)
    }

    /// Recovery helper: put an outstanding row back to `queued`, clearing
    /// the timestamps and error left by the interrupted run.
    pub fn reset_for_retry(&self, id: &JobId) -> Result<(), StoreError> {
        let conn = self.conn.lock();
        let updated = conn.execute(
            "UPDATE jobs SET status = ?2, started_at_ms = NULL, ended_at_ms = NULL, \
             error = NULL WHERE job_id = ?1",
            params![id.as_str(), JobStatus::Queued.to_string()],
        )?;
        if updated == 0 {
            return Err(StoreError::JobNotFound(id.clone()));
        }
        Ok(())
    }

    /// Remove a row entirely. Explicit cleanup, not a terminal transition.
    pub fn delete(&self, id: &JobId) -> Result<(), StoreError> {
        let conn = self.conn.lock();
        conn.execute("DELETE FROM jobs WHERE job_id = ?1", params![id.as_str()])?;
        Ok(())
    }

    /// Number of rows still `queued` on the named queue.
    pub fn queued_count(&self, queue: &str) -> Result<u64, StoreError> {
        let conn = self.conn.lock();
        let count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM jobs WHERE queue_name = ?1 AND status = 'queued'",
            params![queue],
            |row| row.get(0),
        )?;
        Ok(count as u64)
    }

    /// Ids of rows still `queued` on the named queue, in enqueue order.
    pub fn queued_ids(&self, queue: &str) -> Result<Vec<JobId>, StoreError> {
        let conn = self.conn.lock();
        let mut stmt = conn.prepare(
            "SELECT job_id FROM jobs WHERE queue_name = ?1 AND status = 'queued' \
             ORDER BY created_at_ms",
        )?;
        let ids = stmt
            .query_map(params![queue], |row| row.get::<_, String>(0))?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(ids.into_iter().map(JobId::from_string).collect())
    }

    /// Rows left `queued` or `started` on the named queue: the work a
    /// prior process never finished. Input to recovery.
    pub fn outstanding(&self, queue: &str) -> Result<Vec<Job>, StoreError> {
        let conn = self.conn.lock();
        let mut stmt = conn.prepare(&format!(
            "SELECT {JOB_COLUMNS} FROM jobs \
             WHERE queue_name = ?1 AND status IN ('queued', 'started') \
             ORDER BY created_at_ms"
        ))?;
        let rows = stmt
            .query_map(params![queue], map_job_row)?
            .collect::<Result<Vec<_>, rusqlite::Error>>()?;
        rows.into_iter().collect()
    }
}

fn read_status(conn: &Connection, id: &JobId) -> Result<JobStatus, StoreError> {
    let status: Option<String> = conn
        .query_row("SELECT status FROM jobs WHERE job_id = ?1", params![id.as_str()], |row| {
            row.get(0)
        })
        .optional()?;
    let status = status.ok_or_else(|| StoreError::JobNotFound(id.clone()))?;
    parse_status(id, &status)
}

fn parse_status(id: &JobId, text: &str) -> Result<JobStatus, StoreError> {
    JobStatus::parse(text).ok_or_else(|| StoreError::CorruptRow {
        job: id.clone(),
        reason: format!("unknown status '{text}'"),
    })
}

fn map_job_row(row: &Row) -> rusqlite::Result<Result<Job, StoreError>> {
    let id = JobId::from_string(row.get::<_, String>(0)?);
    let queue: String = row.get(1)?;
    let handler: String = row.get(2)?;
    let args: String = row.get(3)?;
    let status: String = row.get(4)?;
    let created_at_ms: i64 = row.get(5)?;
    let started_at_ms: Option<i64> = row.get(6)?;
    let ended_at_ms: Option<i64> = row.get(7)?;
    let meta: String = row.get(8)?;
    let result: Option<String> = row.get(9)?;
    let error: Option<String> = row.get(10)?;

    Ok(build_job(
        id,
        queue,
        handler,
        args,
        status,
        created_at_ms,
        started_at_ms,
        ended_at_ms,
        meta,
        result,
        error,
    ))
}

#[allow(clippy::too_many_arguments)]
fn build_job(
    id: JobId,
    queue: String,
    handler: String,
    args: String,
    status: String,
    created_at_ms: i64,
    started_at_ms: Option<i64>,
    ended_at_ms: Option<i64>,
    meta: String,
    result: Option<String>,
    error: Option<String>,
) -> Result<Job, StoreError> {
    let status = parse_status(&id, &status)?;
    Ok(Job {
        id,
        queue: queue.into(),
        handler: handler.into(),
        args: serde_json::from_str(&args)?,
        status,
        created_at_ms: created_at_ms as u64,
        started_at_ms: started_at_ms.map(|ms| ms as u64),
        ended_at_ms: ended_at_ms.map(|ms| ms as u64),
        meta: serde_json::from_str(&meta)?,
        result: result.as_deref().map(serde_json::from_str).transpose()?,
        error,
    })
}

#[cfg(test)]
#[path = "job_store_tests.rs"]
mod tests;
