// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Shared helpers for the spec suite.

pub use cq_core::{
    HandlerRegistry, HandlerResult, JobContext, JobId, JobStatus, JsonMap,
};
pub use cq_engine::{poll_updates, EngineConfig, QueueRegistry, WorkerPool};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

pub const SPEC_WAIT_MAX_MS: u64 = 10_000;

pub fn spec_config(dir: &Path) -> EngineConfig {
    EngineConfig {
        db_path: dir.join("jobs.db"),
        queues: vec!["high".into(), "default".into(), "low".into()],
        worker_threads: 1,
        idle_sleep_ms: 5,
    }
}

pub fn open(dir: &Path, handlers: HandlerRegistry) -> Arc<QueueRegistry> {
    Arc::new(QueueRegistry::open(&spec_config(dir), handlers).unwrap())
}

pub fn start_worker(registry: &Arc<QueueRegistry>) -> WorkerPool {
    WorkerPool::start(registry.clone(), 1, Duration::from_millis(5)).unwrap()
}

/// Poll `predicate` until it holds or `max_ms` of wall time elapses.
pub fn wait_for(max_ms: u64, predicate: impl Fn() -> bool) -> bool {
    let deadline = std::time::Instant::now() + Duration::from_millis(max_ms);
    while std::time::Instant::now() < deadline {
        if predicate() {
            return true;
        }
        std::thread::sleep(Duration::from_millis(5));
    }
    predicate()
}

pub fn terminal(registry: &Arc<QueueRegistry>, id: &JobId) -> bool {
    registry.fetch_any(id).map(|j| j.is_terminal()).unwrap_or(false)
}

pub fn args(pairs: &[(&str, &str)]) -> JsonMap {
    let mut map = JsonMap::new();
    for (key, value) in pairs {
        map.insert((*key).to_string(), serde_json::json!(value));
    }
    map
}
