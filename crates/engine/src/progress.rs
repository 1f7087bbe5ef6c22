// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The progress sink handed to running handlers.

use crate::registry::QueueRegistry;
use cq_core::{Clock, JobEvent, JobId, JsonMap, MetaPatch, Progress, JOB_UPDATE};
use serde_json::Value;
use std::sync::Arc;

/// Routes handler progress reports into both durable meta and the
/// ephemeral event log, in one call.
pub struct ProgressSink<C: Clock> {
    registry: Arc<QueueRegistry<C>>,
}

impl<C: Clock> ProgressSink<C> {
    pub fn new(registry: Arc<QueueRegistry<C>>) -> Self {
        Self { registry }
    }
}

impl<C: Clock + 'static> Progress for ProgressSink<C> {
    fn report(&self, job: &JobId, percent: i32, message: &str, extra: Option<JsonMap>) {
        let mut patch = MetaPatch::new().progress(percent).message(message);
        if let Some(fields) = &extra {
            for (key, value) in fields {
                patch.extra.insert(key.clone(), value.clone());
            }
        }
        if let Err(err) = self.registry.update_meta_any(job, patch) {
            tracing::warn!(job = %job, error = %err, "failed to merge progress meta");
        }

        let mut data = JsonMap::new();
        data.insert("job_id".into(), Value::String(job.to_string()));
        data.insert("progress".into(), percent.into());
        data.insert("message".into(), Value::String(message.to_string()));
        if let Some(fields) = extra {
            for (key, value) in fields {
                data.entry(key).or_insert(value);
            }
        }
        self.registry
            .events()
            .publish(job, JobEvent::new(JOB_UPDATE, Value::Object(data), self.registry.clock()));

        tracing::debug!(job = %job, percent, message, "progress reported");
    }
}

#[cfg(test)]
#[path = "progress_tests.rs"]
mod tests;
