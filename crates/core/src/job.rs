// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Job identifier and state machine.

use crate::clock::Clock;
use crate::handler::JsonMap;
use crate::meta::JobMeta;
use serde::{Deserialize, Serialize};
use smol_str::SmolStr;

crate::define_id! {
    /// Unique identifier for a job.
    ///
    /// Globally unique across every queue sharing one store. Callers may
    /// supply their own ID at enqueue time; it is never reused once a row
    /// has been created for it.
    pub struct JobId("job-");
}

/// Lifecycle state of a job.
///
/// Transitions follow `queued → started → {finished | failed}`, with
/// `queued → failed` (recovery of a job whose handler is gone),
/// `{queued, started} → canceled`, and any non-terminal state `→ deleted`
/// as administrative exits. Terminal states never transition further;
/// a late write from a job that completes naturally after cancellation
/// is rejected rather than applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    /// Waiting in a queue for a worker
    Queued,
    /// A worker is executing the job
    Started,
    /// Handler returned successfully
    Finished,
    /// Handler raised or could not be recovered
    Failed,
    /// Canceled by the caller (cooperative; running work is not interrupted)
    Canceled,
    /// Administratively removed
    Deleted,
}

impl JobStatus {
    /// Check if this status is terminal (never transitions further).
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            JobStatus::Finished | JobStatus::Failed | JobStatus::Canceled | JobStatus::Deleted
        )
    }

    /// Check whether the state machine allows a transition to `next`.
    pub fn accepts(self, next: JobStatus) -> bool {
        match self {
            JobStatus::Queued => matches!(
                next,
                JobStatus::Started | JobStatus::Failed | JobStatus::Canceled | JobStatus::Deleted
            ),
            JobStatus::Started => matches!(
                next,
                JobStatus::Finished | JobStatus::Failed | JobStatus::Canceled | JobStatus::Deleted
            ),
            _ => false,
        }
    }

    /// Parse the lowercase wire/database form.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "queued" => Some(JobStatus::Queued),
            "started" => Some(JobStatus::Started),
            "finished" => Some(JobStatus::Finished),
            "failed" => Some(JobStatus::Failed),
            "canceled" => Some(JobStatus::Canceled),
            "deleted" => Some(JobStatus::Deleted),
            _ => None,
        }
    }
}

crate::simple_display! {
    JobStatus {
        Queued => "queued",
        Started => "started",
        Finished => "finished",
        Failed => "failed",
        Canceled => "canceled",
        Deleted => "deleted",
    }
}

/// One durable unit of scheduled work.
///
/// Mirrors a row of the job store: the work descriptor (handler tag plus
/// JSON arguments), the lifecycle state, timestamps, incrementally merged
/// progress metadata, and the terminal result or error.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Job {
    pub id: JobId,
    /// Name of the priority lane this job was enqueued on
    pub queue: SmolStr,
    /// Stable registry tag resolving to the handler (survives restarts)
    pub handler: SmolStr,
    pub args: JsonMap,
    pub status: JobStatus,
    pub created_at_ms: u64,
    pub started_at_ms: Option<u64>,
    pub ended_at_ms: Option<u64>,
    #[serde(default)]
    pub meta: JobMeta,
    /// Populated exactly once, on `finished`
    pub result: Option<serde_json::Value>,
    /// Populated exactly once, on `failed`
    pub error: Option<String>,
}

impl Job {
    /// Create a freshly queued job.
    pub fn new(
        id: JobId,
        queue: impl Into<SmolStr>,
        handler: impl Into<SmolStr>,
        args: JsonMap,
        clock: &impl Clock,
    ) -> Self {
        Self {
            id,
            queue: queue.into(),
            handler: handler.into(),
            args,
            status: JobStatus::Queued,
            created_at_ms: clock.epoch_ms(),
            started_at_ms: None,
            ended_at_ms: None,
            meta: JobMeta::default(),
            result: None,
            error: None,
        }
    }

    /// Check if the job is in a terminal state
    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }

    pub fn is_finished(&self) -> bool {
        self.status == JobStatus::Finished
    }

    pub fn is_failed(&self) -> bool {
        self.status == JobStatus::Failed
    }
}

crate::builder! {
    pub struct JobBuilder => Job {
        into {
            queue: SmolStr = "default",
            handler: SmolStr = "noop",
        }
        set {
            args: JsonMap = JsonMap::new(),
            status: JobStatus = JobStatus::Queued,
            meta: JobMeta = JobMeta::default(),
            created_at_ms: u64 = 1_000_000,
        }
        option {
            started_at_ms: u64 = None,
            ended_at_ms: u64 = None,
            result: serde_json::Value = None,
            error: String = None,
        }
        computed {
            id: JobId = JobId::new(),
        }
    }
}

#[cfg(test)]
#[path = "job_tests.rs"]
mod tests;
