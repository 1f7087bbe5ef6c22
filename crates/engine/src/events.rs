// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Bounded, in-process log of progress events per job.
//!
//! This buffer emulates push notifications over HTTP pull: publishers
//! append, pollers drain destructively. It is capped per job and lost on
//! restart by design; the job store stays authoritative for status and
//! meta, and pollers compose every drain with a fresh snapshot
//! ([`crate::poll::poll_updates`]) so nothing terminal is ever missed.

use cq_core::{JobEvent, JobId};
use parking_lot::Mutex;
use std::collections::{HashMap, VecDeque};

/// Most recent events kept per job; the oldest are dropped first.
pub const EVENT_BUFFER_CAP: usize = 100;

#[derive(Default)]
pub struct EventBuffer {
    inner: Mutex<HashMap<JobId, VecDeque<JobEvent>>>,
}

impl EventBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an event to a job's log, evicting the oldest past the cap.
    pub fn publish(&self, job: &JobId, event: JobEvent) {
        let mut inner = self.inner.lock();
        let log = inner.entry(job.clone()).or_default();
        while log.len() >= EVENT_BUFFER_CAP {
            log.pop_front();
        }
        log.push_back(event);
    }

    /// Atomically take and clear the job's pending events.
    pub fn drain(&self, job: &JobId) -> Vec<JobEvent> {
        let mut inner = self.inner.lock();
        match inner.get_mut(job) {
            Some(log) => log.drain(..).collect(),
            None => Vec::new(),
        }
    }

    /// Drop the job's log entirely (job removal).
    pub fn clear(&self, job: &JobId) {
        self.inner.lock().remove(job);
    }
}

#[cfg(test)]
#[path = "events_tests.rs"]
mod tests;
