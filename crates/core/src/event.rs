// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Ephemeral progress events delivered through the polling channel.

use crate::clock::Clock;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use smol_str::SmolStr;

/// Event name used for every progress/status publication.
pub const JOB_UPDATE: &str = "job_update";

/// One entry in a job's in-process event log.
///
/// Events are an observability side channel, not a durability boundary:
/// the buffer holding them is capped and lost on restart, and the job
/// store remains the source of truth for status and meta.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobEvent {
    pub event: SmolStr,
    pub data: Value,
    pub at_ms: u64,
}

impl JobEvent {
    pub fn new(event: impl Into<SmolStr>, data: Value, clock: &impl Clock) -> Self {
        Self::at_epoch_ms(event, data, clock.epoch_ms())
    }

    pub fn at_epoch_ms(event: impl Into<SmolStr>, data: Value, at_ms: u64) -> Self {
        Self { event: event.into(), data, at_ms }
    }
}

#[cfg(test)]
#[path = "event_tests.rs"]
mod tests;
