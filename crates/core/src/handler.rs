// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Job handler contract and the statically-registered dispatch table.
//!
//! Handlers are looked up by a stable string tag so a job row can name its
//! work across process restarts without any runtime reflection: the table
//! is populated once at startup, before recovery runs.

use crate::job::JobId;
use smol_str::SmolStr;
use std::collections::HashMap;
use std::sync::Arc;

/// Structured arguments passed to a handler, and the dynamic portion of
/// results: a JSON object.
pub type JsonMap = serde_json::Map<String, serde_json::Value>;

/// Error type handlers raise to signal failure. The engine never inspects
/// it beyond formatting the diagnostic chain into the job's `error` field.
pub type HandlerError = Box<dyn std::error::Error + Send + Sync>;

pub type HandlerResult = Result<serde_json::Value, HandlerError>;

/// A registered job function.
///
/// Receives its structured arguments and a [`JobContext`] for progress
/// reporting; returns a serializable result or raises. Runs for the whole
/// duration of the work on one worker thread.
pub trait JobHandler: Send + Sync {
    fn run(&self, ctx: &JobContext, args: &JsonMap) -> HandlerResult;
}

impl<F> JobHandler for F
where
    F: Fn(&JobContext, &JsonMap) -> HandlerResult + Send + Sync,
{
    fn run(&self, ctx: &JobContext, args: &JsonMap) -> HandlerResult {
        self(ctx, args)
    }
}

/// Progress sink handlers report through.
///
/// One call both merges `{progress, message, ...extra}` into the job's
/// durable meta and publishes an ephemeral event for pollers.
pub trait Progress: Send + Sync {
    fn report(&self, job: &JobId, percent: i32, message: &str, extra: Option<JsonMap>);
}

/// Progress sink that drops every report. For handlers under test.
#[derive(Clone, Default)]
pub struct NoProgress;

impl Progress for NoProgress {
    fn report(&self, _job: &JobId, _percent: i32, _message: &str, _extra: Option<JsonMap>) {}
}

/// Execution context handed to a running handler.
pub struct JobContext {
    job_id: JobId,
    progress: Arc<dyn Progress>,
}

impl JobContext {
    pub fn new(job_id: JobId, progress: Arc<dyn Progress>) -> Self {
        Self { job_id, progress }
    }

    pub fn job_id(&self) -> &JobId {
        &self.job_id
    }

    /// Report progress for this job.
    pub fn report(&self, percent: i32, message: &str) {
        self.progress.report(&self.job_id, percent, message, None);
    }

    /// Report progress with additional dynamic fields.
    pub fn report_with(&self, percent: i32, message: &str, extra: JsonMap) {
        self.progress.report(&self.job_id, percent, message, Some(extra));
    }
}

/// Immutable tag → handler table, built once at process start.
#[derive(Default)]
pub struct HandlerRegistry {
    handlers: HashMap<SmolStr, Arc<dyn JobHandler>>,
}

impl HandlerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a handler under a stable tag. Last registration wins.
    pub fn register(mut self, tag: impl Into<SmolStr>, handler: impl JobHandler + 'static) -> Self {
        self.handlers.insert(tag.into(), Arc::new(handler));
        self
    }

    /// Resolve a tag back to an invokable handler.
    pub fn resolve(&self, tag: &str) -> Option<Arc<dyn JobHandler>> {
        self.handlers.get(tag).cloned()
    }

    pub fn contains(&self, tag: &str) -> bool {
        self.handlers.contains_key(tag)
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }

    pub fn len(&self) -> usize {
        self.handlers.len()
    }
}

#[cfg(test)]
#[path = "handler_tests.rs"]
mod tests;
