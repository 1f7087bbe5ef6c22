// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Shared test helpers for use across crates.
//!
//! Gated behind `#[cfg(any(test, feature = "test-support"))]`.

use crate::handler::{JsonMap, Progress};
use crate::job::JobId;
use parking_lot::Mutex;

// ── Proptest strategies ─────────────────────────────────────────────────

/// Proptest strategies for metadata types.
pub mod strategies {
    use crate::meta::MetaPatch;
    use indexmap::IndexMap;
    use proptest::prelude::*;
    use serde_json::Value;

    pub fn arb_extra() -> impl Strategy<Value = IndexMap<String, Value>> {
        proptest::collection::btree_map("[a-e]", any::<i64>(), 0..4)
            .prop_map(|m| m.into_iter().map(|(k, v)| (k, Value::from(v))).collect())
    }

    pub fn arb_meta_patch() -> impl Strategy<Value = MetaPatch> {
        (
            any::<Option<i32>>(),
            any::<Option<bool>>().prop_map(|m| m.map(|v| format!("msg-{v}"))),
            any::<Option<bool>>().prop_map(|s| s.map(|v| format!("stage-{v}"))),
            arb_extra(),
        )
            .prop_map(|(progress, message, stage, extra)| MetaPatch {
                progress,
                message,
                stage,
                extra,
            })
    }
}

// ── Progress recording ──────────────────────────────────────────────────

/// A progress report captured by [`RecordingProgress`].
#[derive(Debug, Clone, PartialEq)]
pub struct ProgressCall {
    pub job_id: JobId,
    pub percent: i32,
    pub message: String,
    pub extra: Option<JsonMap>,
}

/// Progress sink that records every report for assertions.
#[derive(Default)]
pub struct RecordingProgress {
    calls: Mutex<Vec<ProgressCall>>,
}

impl RecordingProgress {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn calls(&self) -> Vec<ProgressCall> {
        self.calls.lock().clone()
    }
}

impl Progress for RecordingProgress {
    fn report(&self, job: &JobId, percent: i32, message: &str, extra: Option<JsonMap>) {
        self.calls.lock().push(ProgressCall {
            job_id: job.clone(),
            percent,
            message: message.to_string(),
            extra,
        });
    }
}
