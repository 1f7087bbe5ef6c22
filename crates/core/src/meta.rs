// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Typed progress metadata and the key-wise merge applied to it.

use crate::job::JobStatus;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Incrementally merged progress metadata attached to a job.
///
/// The well-known fields carry the progress surface the UI polls for;
/// anything else a handler reports lands in `extra`, an ordered map so
/// dynamic fields serialize in the order they were first set.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct JobMeta {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub progress: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stage: Option<String>,
    #[serde(flatten)]
    pub extra: IndexMap<String, Value>,
}

impl JobMeta {
    /// Apply a partial update: fields present in the patch overwrite,
    /// everything else is untouched. Previously-set keys outside the
    /// patch are never dropped.
    pub fn merge(&mut self, patch: MetaPatch) {
        if let Some(progress) = patch.progress {
            self.progress = Some(progress);
        }
        if let Some(message) = patch.message {
            self.message = Some(message);
        }
        if let Some(stage) = patch.stage {
            self.stage = Some(stage);
        }
        for (key, value) in patch.extra {
            self.extra.insert(key, value);
        }
    }

    pub fn is_empty(&self) -> bool {
        self.progress.is_none()
            && self.message.is_none()
            && self.stage.is_none()
            && self.extra.is_empty()
    }
}

/// A partial metadata update.
///
/// Same shape as [`JobMeta`] but read as "only the fields that are set";
/// [`JobMeta::merge`] is the single definition of how patches apply.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MetaPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub progress: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stage: Option<String>,
    #[serde(flatten)]
    pub extra: IndexMap<String, Value>,
}

impl MetaPatch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn progress(mut self, percent: i32) -> Self {
        self.progress = Some(percent);
        self
    }

    pub fn message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    pub fn stage(mut self, stage: impl Into<String>) -> Self {
        self.stage = Some(stage.into());
        self
    }

    pub fn extra(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.extra.insert(key.into(), value.into());
        self
    }

    pub fn is_empty(&self) -> bool {
        self.progress.is_none()
            && self.message.is_none()
            && self.stage.is_none()
            && self.extra.is_empty()
    }
}

/// Progress percentage to surface for a job, defaulting by status when no
/// handler has reported one: 100 for finished, -1 for failed or canceled,
/// 0 otherwise.
pub fn effective_progress(status: JobStatus, meta: &JobMeta) -> i32 {
    if let Some(progress) = meta.progress {
        return progress;
    }
    match status {
        JobStatus::Finished => 100,
        JobStatus::Failed | JobStatus::Canceled => -1,
        _ => 0,
    }
}

#[cfg(test)]
#[path = "meta_tests.rs"]
mod tests;
