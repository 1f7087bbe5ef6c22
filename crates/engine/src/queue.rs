// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! A named priority lane over the shared job store.

use crate::error::EngineError;
use cq_core::{Clock, HandlerRegistry, Job, JobId, JobMeta, JobStatus, JsonMap, MetaPatch, SystemClock};
use cq_storage::{JobStore, StoreError, Transition};
use crossbeam_channel::{Receiver, Sender};
use parking_lot::Mutex;
use smol_str::SmolStr;
use std::collections::HashMap;
use std::sync::Arc;

/// One entry in a lane's in-memory dispatch buffer.
///
/// Carries everything a worker needs so execution never re-reads the row
/// before claiming it.
#[derive(Debug, Clone)]
pub struct DispatchItem {
    pub job_id: JobId,
    pub handler: SmolStr,
    pub args: JsonMap,
}

/// Optional enqueue parameters.
#[derive(Debug, Clone, Default)]
pub struct EnqueueOptions {
    /// Explicit job id; generated when absent.
    pub job_id: Option<JobId>,
    /// Advisory only: recorded into meta as `timeout_secs` for display,
    /// never enforced. The handler contract has no interruption point.
    pub timeout_secs: Option<u64>,
}

/// Outcome of a worker claiming a dispatch item.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Claim {
    /// The job is now `started`; run it.
    Started,
    /// The row is no longer `queued` (canceled or administratively
    /// exited while waiting); drop the item.
    Skip(JobStatus),
    /// The row was removed; drop the item.
    Gone,
}

/// What a read path may do with a cached job handle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CacheDecision {
    /// Terminal rows never change again; the cache is authoritative.
    Trust,
    /// Non-terminal rows may have advanced through another lane's view
    /// of the shared store; re-read before returning.
    Refresh,
}

fn cache_policy(status: JobStatus) -> CacheDecision {
    if status.is_terminal() {
        CacheDecision::Trust
    } else {
        CacheDecision::Refresh
    }
}

/// A named FIFO lane over the shared [`JobStore`], with its own dispatch
/// buffer and live-handle cache.
///
/// Distinct lanes are views, not separate stores: any job is visible
/// through any lane's store, which is why every non-terminal cached
/// handle is refreshed before being trusted.
pub struct Queue<C: Clock = SystemClock> {
    name: SmolStr,
    store: JobStore,
    handlers: Arc<HandlerRegistry>,
    cache: Mutex<HashMap<JobId, Job>>,
    tx: Sender<DispatchItem>,
    rx: Receiver<DispatchItem>,
    clock: C,
}

impl<C: Clock> Queue<C> {
    pub(crate) fn new(
        name: impl Into<SmolStr>,
        store: JobStore,
        handlers: Arc<HandlerRegistry>,
        clock: C,
    ) -> Self {
        let (tx, rx) = crossbeam_channel::unbounded();
        Self {
            name: name.into(),
            store,
            handlers,
            cache: Mutex::new(HashMap::new()),
            tx,
            rx,
            clock,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Enqueue work on this lane.
    pub fn enqueue(&self, handler: &str, args: JsonMap) -> Result<Job, EngineError> {
        self.enqueue_with(handler, args, EnqueueOptions::default())
    }

    /// Enqueue work with explicit options.
    ///
    /// The row is durable before the dispatch push: no job can run
    /// without a persisted row behind it.
    pub fn enqueue_with(
        &self,
        handler: &str,
        args: JsonMap,
        opts: EnqueueOptions,
    ) -> Result<Job, EngineError> {
        if !self.handlers.contains(handler) {
            return Err(EngineError::UnknownHandler(handler.to_string()));
        }

        let id = opts.job_id.unwrap_or_default();
        let mut job = Job::new(id, self.name.clone(), handler, args, &self.clock);
        if let Some(secs) = opts.timeout_secs {
            job.meta.extra.insert("timeout_secs".into(), secs.into());
        }

        self.store.insert(&job)?;
        self.cache.lock().insert(job.id.clone(), job.clone());
        self.push(DispatchItem {
            job_id: job.id.clone(),
            handler: job.handler.clone(),
            args: job.args.clone(),
        });

        tracing::info!(job = %job.id, queue = %self.name, handler = %job.handler, "enqueued job");
        Ok(job)
    }

    /// Return the freshest known state of a job.
    pub fn fetch(&self, id: &JobId) -> Result<Job, EngineError> {
        let cached = self.cache.lock().get(id).cloned();
        if let Some(job) = cached {
            match cache_policy(job.status) {
                CacheDecision::Trust => return Ok(job),
                CacheDecision::Refresh => {}
            }
        }

        let job = self.store.read(id)?;
        self.cache.lock().insert(id.clone(), job.clone());
        Ok(job)
    }

    /// Apply a status transition, mirroring the change onto the cached
    /// handle when one exists.
    pub fn update_status(
        &self,
        id: &JobId,
        status: JobStatus,
        result: Option<&serde_json::Value>,
        error: Option<&str>,
    ) -> Result<Transition, EngineError> {
        let transition =
            self.store.update_status(id, status, result, error, self.clock.epoch_ms())?;
        if transition.is_applied() {
            self.refresh_cached(id);
        }
        Ok(transition)
    }

    /// Merge a partial meta update, mirroring the merged value onto the
    /// cached handle when one exists.
    pub fn update_meta(&self, id: &JobId, patch: MetaPatch) -> Result<JobMeta, EngineError> {
        let merged = self.store.merge_meta(id, patch)?;
        if let Some(job) = self.cache.lock().get_mut(id) {
            job.meta = merged.clone();
        }
        Ok(merged)
    }

    /// Cooperatively cancel a job. Running work is not interrupted; its
    /// eventual natural completion is rejected by the sticky-terminal rule.
    pub fn cancel(&self, id: &JobId) -> Result<Transition, EngineError> {
        let transition = self.update_status(id, JobStatus::Canceled, None, None)?;
        if transition.is_applied() {
            tracing::info!(job = %id, queue = %self.name, "canceled job");
        }
        Ok(transition)
    }

    /// Delete the row and drop the cached handle. The dispatch-buffer
    /// entry, if still pending, is dropped lazily at claim time.
    pub fn remove(&self, id: &JobId) -> Result<(), EngineError> {
        self.store.delete(id)?;
        self.cache.lock().remove(id);
        tracing::info!(job = %id, queue = %self.name, "removed job");
        Ok(())
    }

    /// Number of jobs still waiting on this lane.
    pub fn len(&self) -> Result<u64, EngineError> {
        Ok(self.store.queued_count(&self.name)?)
    }

    pub fn is_empty(&self) -> Result<bool, EngineError> {
        Ok(self.len()? == 0)
    }

    /// Ids of jobs still waiting on this lane, in enqueue order.
    pub fn job_ids(&self) -> Result<Vec<JobId>, EngineError> {
        Ok(self.store.queued_ids(&self.name)?)
    }

    /// Worker-side gate: move a popped item to `started` iff its row
    /// still exists and is still `queued`.
    pub fn claim(&self, item: &DispatchItem) -> Result<Claim, EngineError> {
        match self.store.update_status(
            &item.job_id,
            JobStatus::Started,
            None,
            None,
            self.clock.epoch_ms(),
        ) {
            Ok(Transition::Applied) => {
                self.refresh_cached(&item.job_id);
                Ok(Claim::Started)
            }
            Ok(Transition::Rejected(current)) => Ok(Claim::Skip(current)),
            Err(StoreError::JobNotFound(_)) => Ok(Claim::Gone),
            Err(err) => Err(err.into()),
        }
    }

    /// Non-blocking pop from the dispatch buffer.
    pub(crate) fn try_take(&self) -> Option<DispatchItem> {
        self.rx.try_recv().ok()
    }

    pub(crate) fn push(&self, item: DispatchItem) {
        // The queue owns both channel ends, so the send cannot fail.
        self.tx.send(item).ok();
    }

    pub(crate) fn store(&self) -> &JobStore {
        &self.store
    }

    pub(crate) fn clock(&self) -> &C {
        &self.clock
    }

    fn refresh_cached(&self, id: &JobId) {
        let mut cache = self.cache.lock();
        if cache.contains_key(id) {
            if let Ok(job) = self.store.read(id) {
                cache.insert(id.clone(), job);
            }
        }
    }
}

#[cfg(test)]
#[path = "queue_tests.rs"]
mod tests;
