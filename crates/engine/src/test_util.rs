// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Shared fixtures for engine tests.

use crate::config::EngineConfig;
use crate::registry::QueueRegistry;
use cq_core::{FakeClock, HandlerRegistry, HandlerResult, JobContext, JsonMap};
use std::path::Path;
use std::sync::Arc;
use tempfile::TempDir;

pub fn test_config(dir: &Path) -> EngineConfig {
    EngineConfig {
        db_path: dir.join("jobs.db"),
        queues: vec!["high".into(), "default".into(), "low".into()],
        worker_threads: 1,
        idle_sleep_ms: 5,
    }
}

pub fn noop(_ctx: &JobContext, _args: &JsonMap) -> HandlerResult {
    Ok(serde_json::json!({}))
}

pub fn echo(_ctx: &JobContext, args: &JsonMap) -> HandlerResult {
    Ok(serde_json::Value::Object(args.clone()))
}

pub fn base_handlers() -> HandlerRegistry {
    HandlerRegistry::new().register("noop", noop).register("echo", echo)
}

pub fn open_registry(
    handlers: HandlerRegistry,
) -> (TempDir, Arc<QueueRegistry<FakeClock>>, FakeClock) {
    let temp = TempDir::new().unwrap();
    let clock = FakeClock::new();
    let registry = QueueRegistry::open_with_clock(&test_config(temp.path()), handlers, clock.clone())
        .unwrap();
    (temp, Arc::new(registry), clock)
}

/// Poll `predicate` until it holds or `max_ms` of wall time elapses.
pub fn wait_for(max_ms: u64, predicate: impl Fn() -> bool) -> bool {
    let deadline = std::time::Instant::now() + std::time::Duration::from_millis(max_ms);
    while std::time::Instant::now() < deadline {
        if predicate() {
            return true;
        }
        std::thread::sleep(std::time::Duration::from_millis(5));
    }
    predicate()
}
