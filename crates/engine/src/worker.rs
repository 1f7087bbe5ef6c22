// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The worker pool: long-lived OS threads draining the priority lanes.

use crate::error::EngineError;
use crate::progress::ProgressSink;
use crate::queue::{Claim, DispatchItem, Queue};
use crate::registry::QueueRegistry;
use cq_core::{Clock, JobContext, JobStatus};
use cq_storage::Transition;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Duration;

/// N worker threads, started together, each scanning the lanes in strict
/// priority order. A slot is occupied for the whole duration of one job;
/// there is no further concurrency inside a thread's job execution.
pub struct WorkerPool {
    stop: Arc<AtomicBool>,
    handles: Vec<JoinHandle<()>>,
}

impl WorkerPool {
    pub fn start<C: Clock + 'static>(
        registry: Arc<QueueRegistry<C>>,
        threads: usize,
        idle_sleep: Duration,
    ) -> Result<Self, EngineError> {
        let stop = Arc::new(AtomicBool::new(false));
        let mut handles = Vec::with_capacity(threads);
        for worker in 0..threads {
            let registry = registry.clone();
            let stop = stop.clone();
            let handle = std::thread::Builder::new()
                .name(format!("cq-worker-{worker}"))
                .spawn(move || worker_loop(worker, &registry, &stop, idle_sleep))
                .map_err(EngineError::WorkerSpawn)?;
            handles.push(handle);
        }
        tracing::info!(threads, "started worker pool");
        Ok(Self { stop, handles })
    }

    /// Ask the threads to exit at their next scan. Best effort: a job
    /// already executing runs to its natural end first.
    pub fn shutdown(&self) {
        self.stop.store(true, Ordering::Relaxed);
    }

    /// Shut down and wait for every thread to exit.
    pub fn join(mut self) {
        self.shutdown();
        for handle in self.handles.drain(..) {
            handle.join().ok();
        }
    }
}

fn worker_loop<C: Clock + 'static>(
    worker: usize,
    registry: &Arc<QueueRegistry<C>>,
    stop: &AtomicBool,
    idle_sleep: Duration,
) {
    tracing::debug!(worker, "worker thread started");
    while !stop.load(Ordering::Relaxed) {
        let mut scanned_work = false;
        // Strict priority: scan from the highest lane on every iteration,
        // so a burst of high work drains before lower lanes get a turn.
        for queue in registry.queues() {
            if let Some(item) = queue.try_take() {
                process(registry, queue, item);
                scanned_work = true;
                break;
            }
        }
        if !scanned_work {
            std::thread::sleep(idle_sleep);
        }
    }
    tracing::debug!(worker, "worker thread stopped");
}

fn process<C: Clock + 'static>(
    registry: &Arc<QueueRegistry<C>>,
    queue: &Queue<C>,
    item: DispatchItem,
) {
    match queue.claim(&item) {
        Ok(Claim::Started) => {}
        Ok(Claim::Skip(status)) => {
            tracing::debug!(job = %item.job_id, %status, "skipping dispatch: job no longer queued");
            return;
        }
        Ok(Claim::Gone) => {
            tracing::debug!(job = %item.job_id, "skipping dispatch: job row removed");
            return;
        }
        Err(err) => {
            tracing::warn!(job = %item.job_id, error = %err, "failed to claim job");
            return;
        }
    }

    tracing::info!(job = %item.job_id, queue = queue.name(), handler = %item.handler, "processing job");

    let outcome = match registry.handlers().resolve(&item.handler) {
        Some(handler) => {
            let ctx = JobContext::new(
                item.job_id.clone(),
                Arc::new(ProgressSink::new(registry.clone())),
            );
            catch_unwind(AssertUnwindSafe(|| handler.run(&ctx, &item.args)))
        }
        None => Ok(Err(format!("no handler registered for '{}'", item.handler).into())),
    };

    match outcome {
        Ok(Ok(result)) => {
            match queue.update_status(&item.job_id, JobStatus::Finished, Some(&result), None) {
                Ok(Transition::Applied) => {
                    tracing::info!(job = %item.job_id, "job finished");
                }
                Ok(Transition::Rejected(status)) => {
                    tracing::debug!(job = %item.job_id, %status, "completion discarded: job already terminal");
                }
                Err(err) => {
                    tracing::warn!(job = %item.job_id, error = %err, "failed to record completion");
                }
            }
        }
        Ok(Err(err)) => {
            let error: &(dyn std::error::Error) = err.as_ref();
            fail_job(queue, &item, &error_chain(error));
        }
        Err(payload) => {
            fail_job(queue, &item, &format!("handler panicked: {}", panic_message(&payload)));
        }
    }
}

fn fail_job<C: Clock>(queue: &Queue<C>, item: &DispatchItem, trace: &str) {
    tracing::error!(job = %item.job_id, error = %trace, "job failed");
    match queue.update_status(&item.job_id, JobStatus::Failed, None, Some(trace)) {
        Ok(Transition::Rejected(status)) => {
            tracing::debug!(job = %item.job_id, %status, "failure discarded: job already terminal");
        }
        Err(err) => {
            tracing::warn!(job = %item.job_id, error = %err, "failed to record failure");
        }
        Ok(Transition::Applied) => {}
    }
}

/// Render an error with its full source chain, one frame per line.
fn error_chain(err: &(dyn std::error::Error)) -> String {
    use std::fmt::Write;
    let mut out = err.to_string();
    let mut source = err.source();
    while let Some(cause) = source {
        let _ = write!(out, "\ncaused by: {cause}");
        source = cause.source();
    }
    out
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> &str {
    if let Some(message) = payload.downcast_ref::<&str>() {
        message
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message
    } else {
        "unknown panic payload"
    }
}

#[cfg(test)]
#[path = "worker_tests.rs"]
mod tests;
