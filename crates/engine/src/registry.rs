// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The queue registry: one explicit object owning the priority lanes,
//! the shared stores, the event buffer, and the handler table.
//!
//! Constructed once at process start and passed by `Arc` to every
//! consumer. Crash recovery runs during construction, before any
//! external enqueue is possible.

use crate::config::EngineConfig;
use crate::error::EngineError;
use crate::events::EventBuffer;
use crate::queue::Queue;
use crate::recovery;
use cq_core::{Clock, HandlerRegistry, Job, JobId, JobMeta, MetaPatch, SystemClock};
use cq_storage::{Database, JobStore, RecordStore};
use std::sync::Arc;

/// Fixed set of priority lanes over one shared store.
///
/// Lane order is priority order, highest first, established at
/// construction and never changed.
pub struct QueueRegistry<C: Clock = SystemClock> {
    queues: Vec<Queue<C>>,
    store: JobStore,
    records: Arc<RecordStore>,
    events: Arc<EventBuffer>,
    handlers: Arc<HandlerRegistry>,
    clock: C,
}

impl QueueRegistry<SystemClock> {
    /// Open the database and build the lanes named by the config,
    /// running recovery on each.
    pub fn open(config: &EngineConfig, handlers: HandlerRegistry) -> Result<Self, EngineError> {
        Self::open_with_clock(config, handlers, SystemClock)
    }
}

impl<C: Clock> QueueRegistry<C> {
    pub fn open_with_clock(
        config: &EngineConfig,
        handlers: HandlerRegistry,
        clock: C,
    ) -> Result<Self, EngineError> {
        config.validate()?;
        let db = Database::open(&config.db_path)?;
        let store = db.job_store();
        let records = Arc::new(db.record_store());
        let handlers = Arc::new(handlers);

        let mut queues = Vec::with_capacity(config.queues.len());
        for name in &config.queues {
            let queue =
                Queue::new(name.as_str(), db.job_store(), handlers.clone(), clock.clone());
            recovery::run(&queue, &records, &handlers)?;
            queues.push(queue);
        }

        Ok(Self {
            queues,
            store,
            records,
            events: Arc::new(EventBuffer::new()),
            handlers,
            clock,
        })
    }

    /// Look up a lane by name.
    pub fn queue(&self, name: &str) -> Result<&Queue<C>, EngineError> {
        self.queues
            .iter()
            .find(|q| q.name() == name)
            .ok_or_else(|| EngineError::UnknownQueue(name.to_string()))
    }

    /// Lanes in priority order, highest first.
    pub fn queues(&self) -> &[Queue<C>] {
        &self.queues
    }

    /// Fetch a job regardless of which lane it was enqueued on.
    ///
    /// The lanes share one store, so a single read resolves any id; the
    /// result is routed through the owning lane's cache policy.
    pub fn fetch_any(&self, id: &JobId) -> Result<Job, EngineError> {
        let job = self.store.read(id)?;
        match self.queue(&job.queue) {
            Ok(queue) => queue.fetch(id),
            Err(_) => Ok(job),
        }
    }

    /// Merge a meta update for a job on whichever lane owns it.
    pub fn update_meta_any(&self, id: &JobId, patch: MetaPatch) -> Result<JobMeta, EngineError> {
        let job = self.store.read(id)?;
        match self.queue(&job.queue) {
            Ok(queue) => queue.update_meta(id, patch),
            Err(_) => Ok(self.store.merge_meta(id, patch)?),
        }
    }

    /// Delete a job everywhere: store row, lane cache, event log.
    pub fn remove_job(&self, id: &JobId) -> Result<(), EngineError> {
        let job = self.store.read(id)?;
        match self.queue(&job.queue) {
            Ok(queue) => queue.remove(id)?,
            Err(_) => self.store.delete(id)?,
        }
        self.events.clear(id);
        Ok(())
    }

    pub fn events(&self) -> &Arc<EventBuffer> {
        &self.events
    }

    pub fn records(&self) -> &Arc<RecordStore> {
        &self.records
    }

    pub fn handlers(&self) -> &Arc<HandlerRegistry> {
        &self.handlers
    }

    pub fn clock(&self) -> &C {
        &self.clock
    }
}

#[cfg(test)]
#[path = "registry_tests.rs"]
mod tests;
