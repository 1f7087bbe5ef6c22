// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The poll composition: drained events plus a fresh snapshot.

use crate::error::EngineError;
use crate::registry::QueueRegistry;
use cq_core::{effective_progress, Clock, Job, JobEvent, JobId, JobMeta, JsonMap, JOB_UPDATE};
use cq_storage::{JobRecord, StoreError};
use serde_json::Value;

/// Return a job's pending events followed by one authoritative
/// current-state snapshot.
///
/// The snapshot is always computed from a fresh read, never drained, so
/// two independent pollers each observe the terminal state at least once
/// even though [`EventBuffer::drain`](crate::events::EventBuffer::drain)
/// is destructive and the buffer is capped. Jobs whose row has been
/// removed fall back to their history record.
pub fn poll_updates<C: Clock>(
    registry: &QueueRegistry<C>,
    id: &JobId,
) -> Result<Vec<JobEvent>, EngineError> {
    let mut updates = registry.events().drain(id);

    match registry.fetch_any(id) {
        Ok(job) => updates.push(job_snapshot(&job, registry.clock())),
        Err(err) if err.is_not_found() => match registry.records().get(id)? {
            Some(record) => updates.push(record_snapshot(&record, registry.clock())),
            None => return Err(EngineError::Store(StoreError::JobNotFound(id.clone()))),
        },
        Err(err) => return Err(err),
    }

    Ok(updates)
}

fn job_snapshot(job: &Job, clock: &impl Clock) -> JobEvent {
    let mut data = JsonMap::new();
    data.insert("job_id".into(), Value::String(job.id.to_string()));
    data.insert("status".into(), Value::String(job.status.to_string()));
    data.insert("progress".into(), effective_progress(job.status, &job.meta).into());
    data.insert(
        "message".into(),
        Value::String(job.meta.message.clone().unwrap_or_default()),
    );
    if let Some(stage) = &job.meta.stage {
        data.insert("stage".into(), Value::String(stage.clone()));
    }
    for (key, value) in &job.meta.extra {
        data.entry(key.clone()).or_insert_with(|| value.clone());
    }
    if let Some(result) = &job.result {
        data.insert("result".into(), result.clone());
    }
    if let Some(error) = &job.error {
        data.insert("error".into(), Value::String(error.clone()));
    }

    JobEvent::new(JOB_UPDATE, Value::Object(data), clock)
}

fn record_snapshot(record: &JobRecord, clock: &impl Clock) -> JobEvent {
    let mut data = JsonMap::new();
    data.insert("job_id".into(), Value::String(record.job_id.to_string()));
    data.insert("status".into(), Value::String(record.status.to_string()));
    data.insert(
        "progress".into(),
        effective_progress(record.status, &JobMeta::default()).into(),
    );
    data.insert("message".into(), Value::String(String::new()));
    if let Some(transcript) = &record.transcript {
        data.insert("result".into(), transcript.clone());
    }

    JobEvent::new(JOB_UPDATE, Value::Object(data), clock)
}

#[cfg(test)]
#[path = "poll_tests.rs"]
mod tests;
