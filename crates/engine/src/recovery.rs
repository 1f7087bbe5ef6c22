// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Crash recovery: re-admit work a prior process left outstanding.
//!
//! The dispatch buffer dies with the process, but persisted
//! `queued`/`started` rows prove work was never finished. Recovery runs
//! once per lane at registry construction: rows whose handler tag still
//! resolves are reset and re-pushed; rows whose handler is gone are
//! permanently failed. Terminal rows are never touched, so finished work
//! cannot run twice.

use crate::error::EngineError;
use crate::queue::{DispatchItem, Queue};
use cq_core::{Clock, HandlerRegistry, JobStatus, MetaPatch};
use cq_storage::{JobRecordPatch, RecordStore};

/// Fixed diagnostic stored on jobs that cannot be recovered.
pub const RECOVERY_HANDLER_GONE: &str =
    "failed to recover job after restart: handler is not registered in this build";

pub(crate) fn run<C: Clock>(
    queue: &Queue<C>,
    records: &RecordStore,
    handlers: &HandlerRegistry,
) -> Result<(), EngineError> {
    let outstanding = queue.store().outstanding(queue.name())?;
    if outstanding.is_empty() {
        return Ok(());
    }

    let mut recovered = 0usize;
    let mut failed = 0usize;

    for job in outstanding {
        let now_ms = queue.clock().epoch_ms();

        if handlers.resolve(&job.handler).is_none() {
            queue.store().update_status(
                &job.id,
                JobStatus::Failed,
                None,
                Some(RECOVERY_HANDLER_GONE),
                now_ms,
            )?;
            records.upsert(
                &job.id,
                JobRecordPatch::new()
                    .status(JobStatus::Failed)
                    .summary(RECOVERY_HANDLER_GONE),
                now_ms,
            )?;
            tracing::warn!(
                job = %job.id,
                queue = queue.name(),
                handler = %job.handler,
                "failed unrecoverable job"
            );
            failed += 1;
            continue;
        }

        queue.store().reset_for_retry(&job.id)?;
        queue.push(DispatchItem {
            job_id: job.id.clone(),
            handler: job.handler.clone(),
            args: job.args.clone(),
        });
        queue.store().merge_meta(
            &job.id,
            MetaPatch::new()
                .progress(0)
                .message("Recovered job after restart. Waiting to run again.")
                .extra("recovered", true),
        )?;
        recovered += 1;
    }

    tracing::info!(queue = queue.name(), recovered, failed, "job recovery complete");
    Ok(())
}

#[cfg(test)]
#[path = "recovery_tests.rs"]
mod tests;
