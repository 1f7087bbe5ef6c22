// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Queue-independent job history.
//!
//! Records are created on first observation of a job (often at submission
//! time with partial data), updated by whichever collaborator finalizes
//! the job, and deleted only by explicit user action. They outlive the
//! live queue row, so history survives queue cleanup.

use crate::error::StoreError;
use crate::fingerprint::Fingerprint;
use cq_core::{effective_progress, JobId, JobMeta, JobStatus};
use parking_lot::Mutex;
use rusqlite::{params, Connection, OptionalExtension, Row};
use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;

/// Durable history entry for one job, keyed by job id.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct JobRecord {
    pub job_id: JobId,
    pub filename: String,
    pub display_name: Option<String>,
    pub media_path: Option<String>,
    pub fingerprint: Option<Fingerprint>,
    pub status: JobStatus,
    pub language: Option<String>,
    pub device: Option<String>,
    pub summary: Option<String>,
    pub transcript: Option<Value>,
    pub created_at_ms: u64,
    pub updated_at_ms: u64,
}

/// Partial update applied by [`RecordStore::upsert`]: only set fields
/// overwrite, everything else is preserved.
#[derive(Debug, Clone, Default)]
pub struct JobRecordPatch {
    pub filename: Option<String>,
    pub display_name: Option<String>,
    pub media_path: Option<String>,
    pub fingerprint: Option<Fingerprint>,
    pub status: Option<JobStatus>,
    pub language: Option<String>,
    pub device: Option<String>,
    pub summary: Option<String>,
    pub transcript: Option<Value>,
}

impl JobRecordPatch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn filename(mut self, v: impl Into<String>) -> Self {
        self.filename = Some(v.into());
        self
    }

    pub fn display_name(mut self, v: impl Into<String>) -> Self {
        self.display_name = Some(v.into());
        self
    }

    pub fn media_path(mut self, v: impl Into<String>) -> Self {
        self.media_path = Some(v.into());
        self
    }

    pub fn fingerprint(mut self, v: Fingerprint) -> Self {
        self.fingerprint = Some(v);
        self
    }

    pub fn status(mut self, v: JobStatus) -> Self {
        self.status = Some(v);
        self
    }

    pub fn language(mut self, v: impl Into<String>) -> Self {
        self.language = Some(v.into());
        self
    }

    pub fn device(mut self, v: impl Into<String>) -> Self {
        self.device = Some(v.into());
        self
    }

    pub fn summary(mut self, v: impl Into<String>) -> Self {
        self.summary = Some(v.into());
        self
    }

    pub fn transcript(mut self, v: Value) -> Self {
        self.transcript = Some(v);
        self
    }
}

/// View over the `job_records` table.
#[derive(Clone)]
pub struct RecordStore {
    conn: Arc<Mutex<Connection>>,
}

const RECORD_COLUMNS: &str = "job_id, filename, display_name, media_path, \
     fp_size, fp_mtime_ms, fp_hash, status, language, device, summary, \
     transcript, created_at_ms, updated_at_ms";

impl RecordStore {
    pub(crate) fn new(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    /// Create or field-wise update the record for a job.
    ///
    /// A fresh record defaults its filename to the job id and its status
    /// to `queued` until a later patch fills them in. `created_at_ms` is
    /// set once; `updated_at_ms` is stamped on every call.
    pub fn upsert(
        &self,
        id: &JobId,
        patch: JobRecordPatch,
        now_ms: u64,
    ) -> Result<JobRecord, StoreError> {
        let conn = self.conn.lock();
        let existing = conn
            .query_row(
                &format!("SELECT {RECORD_COLUMNS} FROM job_records WHERE job_id = ?1"),
                params![id.as_str()],
                map_record_row,
            )
            .optional()?
            .transpose()?;

        let record = match existing {
            Some(mut record) => {
                if let Some(filename) = patch.filename {
                    record.filename = filename;
                }
                if let Some(display_name) = patch.display_name {
                    record.display_name = Some(display_name);
                }
                if let Some(media_path) = patch.media_path {
                    record.media_path = Some(media_path);
                }
                if let Some(fingerprint) = patch.fingerprint {
                    record.fingerprint = Some(fingerprint);
                }
                if let Some(status) = patch.status {
                    record.status = status;
                }
                if let Some(language) = patch.language {
                    record.language = Some(language);
                }
                if let Some(device) = patch.device {
                    record.device = Some(device);
                }
                if let Some(summary) = patch.summary {
                    record.summary = Some(summary);
                }
                if let Some(transcript) = patch.transcript {
                    record.transcript = Some(transcript);
                }
                record.updated_at_ms = now_ms;
                record
            }
            None => JobRecord {
                job_id: id.clone(),
                filename: patch.filename.unwrap_or_else(|| id.to_string()),
                display_name: patch.display_name,
                media_path: patch.media_path,
                fingerprint: patch.fingerprint,
                status: patch.status.unwrap_or(JobStatus::Queued),
                language: patch.language,
                device: patch.device,
                summary: patch.summary,
                transcript: patch.transcript,
                created_at_ms: now_ms,
                updated_at_ms: now_ms,
            },
        };

        let transcript_json =
            record.transcript.as_ref().map(|t| serde_json::to_string(t)).transpose()?;
        conn.execute(
            "INSERT OR REPLACE INTO job_records \
             (job_id, filename, display_name, media_path, fp_size, fp_mtime_ms, \
              fp_hash, status, language, device, summary, transcript, \
              created_at_ms, updated_at_ms) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14)",
            params![
                record.job_id.as_str(),
                record.filename,
                record.display_name,
                record.media_path,
                record.fingerprint.as_ref().map(|fp| fp.size as i64),
                record.fingerprint.as_ref().map(|fp| fp.mtime_ms as i64),
                record.fingerprint.as_ref().and_then(|fp| fp.hash.clone()),
                record.status.to_string(),
                record.language,
                record.device,
                record.summary,
                transcript_json,
                record.created_at_ms as i64,
                record.updated_at_ms as i64,
            ],
        )?;
        Ok(record)
    }

    pub fn get(&self, id: &JobId) -> Result<Option<JobRecord>, StoreError> {
        let conn = self.conn.lock();
        conn.query_row(
            &format!("SELECT {RECORD_COLUMNS} FROM job_records WHERE job_id = ?1"),
            params![id.as_str()],
            map_record_row,
        )
        .optional()?
        .transpose()
    }

    /// Delete a record. Only ever called for an explicit user action.
    pub fn delete(&self, id: &JobId) -> Result<(), StoreError> {
        let conn = self.conn.lock();
        conn.execute("DELETE FROM job_records WHERE job_id = ?1", params![id.as_str()])?;
        Ok(())
    }

    /// Most recently touched records first.
    pub fn recent(&self, limit: usize) -> Result<Vec<JobRecord>, StoreError> {
        let conn = self.conn.lock();
        let mut stmt = conn.prepare(&format!(
            "SELECT {RECORD_COLUMNS} FROM job_records ORDER BY updated_at_ms DESC LIMIT ?1"
        ))?;
        let rows = stmt
            .query_map(params![limit as i64], map_record_row)?
            .collect::<Result<Vec<_>, rusqlite::Error>>()?;
        rows.into_iter().collect()
    }

    /// History view over the live `jobs` table: jobs that reached an end
    /// state, newest outcome first.
    pub fn job_outcomes(&self, limit: usize) -> Result<Vec<HistoryEntry>, StoreError> {
        let conn = self.conn.lock();
        let mut stmt = conn.prepare(
            "SELECT job_id, status, meta, result, created_at_ms, ended_at_ms FROM jobs \
             WHERE status IN ('finished', 'failed', 'canceled') \
             ORDER BY COALESCE(ended_at_ms, created_at_ms) DESC LIMIT ?1",
        )?;
        let rows = stmt
            .query_map(params![limit as i64], |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, String>(2)?,
                    row.get::<_, Option<String>>(3)?,
                    row.get::<_, i64>(4)?,
                    row.get::<_, Option<i64>>(5)?,
                ))
            })?
            .collect::<Result<Vec<_>, rusqlite::Error>>()?;

        rows.into_iter()
            .map(|(id, status, meta, result, created_at_ms, ended_at_ms)| {
                let id = JobId::from_string(id);
                let status = JobStatus::parse(&status).ok_or_else(|| StoreError::CorruptRow {
                    job: id.clone(),
                    reason: format!("unknown status '{status}'"),
                })?;
                let meta: JobMeta = serde_json::from_str(&meta)?;
                let result: Option<Value> =
                    result.as_deref().map(serde_json::from_str).transpose()?;
                Ok(HistoryEntry::project(id, status, &meta, result.as_ref(), created_at_ms, ended_at_ms))
            })
            .collect()
    }
}

/// Denormalized history row for display, projected from a finished job.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HistoryEntry {
    pub job_id: JobId,
    pub status: JobStatus,
    pub progress: i32,
    pub message: String,
    pub original_filename: String,
    pub language: Option<String>,
    pub device: Option<String>,
    pub summary: Option<String>,
    /// ISO-8601, UTC
    pub created_at: Option<String>,
    pub completed_at: Option<String>,
}

impl HistoryEntry {
    fn project(
        job_id: JobId,
        status: JobStatus,
        meta: &JobMeta,
        result: Option<&Value>,
        created_at_ms: i64,
        ended_at_ms: Option<i64>,
    ) -> Self {
        let meta_str = |key: &str| {
            meta.extra.get(key).and_then(Value::as_str).map(str::to_string)
        };
        let result_str = |key: &str| {
            result.and_then(|r| r.get(key)).and_then(Value::as_str).map(str::to_string)
        };

        let original_filename = meta_str("original_filename")
            .or_else(|| {
                result_str("file_path")
                    .as_deref()
                    .map(std::path::Path::new)
                    .and_then(|p| p.file_name())
                    .map(|name| name.to_string_lossy().into_owned())
            })
            .unwrap_or_else(|| job_id.to_string());

        let summary = meta_str("summary")
            .or_else(|| result_str("text").map(|text| text.chars().take(500).collect()));

        Self {
            job_id,
            status,
            progress: effective_progress(status, meta),
            message: meta.message.clone().unwrap_or_default(),
            original_filename,
            language: result_str("language").or_else(|| meta_str("language")),
            device: result_str("device").or_else(|| meta_str("device")),
            summary,
            created_at: iso_utc(Some(created_at_ms)),
            completed_at: iso_utc(ended_at_ms),
        }
    }
}

fn iso_utc(ms: Option<i64>) -> Option<String> {
    ms.and_then(chrono::DateTime::from_timestamp_millis)
        .map(|dt| dt.to_rfc3339_opts(chrono::SecondsFormat::Secs, true))
}

fn map_record_row(row: &Row) -> rusqlite::Result<Result<JobRecord, StoreError>> {
    let id = JobId::from_string(row.get::<_, String>(0)?);
    let filename: String = row.get(1)?;
    let display_name: Option<String> = row.get(2)?;
    let media_path: Option<String> = row.get(3)?;
    let fp_size: Option<i64> = row.get(4)?;
    let fp_mtime_ms: Option<i64> = row.get(5)?;
    let fp_hash: Option<String> = row.get(6)?;
    let status: String = row.get(7)?;
    let language: Option<String> = row.get(8)?;
    let device: Option<String> = row.get(9)?;
    let summary: Option<String> = row.get(10)?;
    let transcript: Option<String> = row.get(11)?;
    let created_at_ms: i64 = row.get(12)?;
    let updated_at_ms: i64 = row.get(13)?;

    let fingerprint = match (fp_size, fp_mtime_ms) {
        (Some(size), Some(mtime_ms)) => Some(Fingerprint {
            size: size as u64,
            mtime_ms: mtime_ms as u64,
            hash: fp_hash,
        }),
        _ => None,
    };

    let parsed_status = match JobStatus::parse(&status) {
        Some(parsed) => parsed,
        None => {
            return Ok(Err(StoreError::CorruptRow {
                job: id,
                reason: format!("unknown status '{status}'"),
            }))
        }
    };
    let transcript = match transcript.as_deref().map(serde_json::from_str).transpose() {
        Ok(value) => value,
        Err(err) => return Ok(Err(StoreError::Json(err))),
    };

    Ok(Ok(JobRecord {
        job_id: id,
        filename,
        display_name,
        media_path,
        fingerprint,
        status: parsed_status,
        language,
        device,
        summary,
        transcript,
        created_at_ms: created_at_ms as u64,
        updated_at_ms: updated_at_ms as u64,
    }))
}

#[cfg(test)]
#[path = "records_tests.rs"]
mod tests;
