// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Crash-recovery specs: a fresh registry over an old database.

use crate::prelude::*;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tempfile::TempDir;

#[test]
fn interrupted_jobs_rerun_exactly_once_after_restart() {
    let temp = TempDir::new().unwrap();
    let runs = Arc::new(AtomicUsize::new(0));

    let counting = {
        let runs = runs.clone();
        move |_: &JobContext, _: &JsonMap| -> HandlerResult {
            runs.fetch_add(1, Ordering::SeqCst);
            Ok(serde_json::json!({}))
        }
    };

    // First process: enqueue and mark one job as mid-execution, then
    // "crash" (drop the registry without running a worker).
    let (queued_id, started_id) = {
        let registry = open(temp.path(), HandlerRegistry::new().register("count", counting.clone()));
        let queue = registry.queue("default").unwrap();
        let queued = queue.enqueue("count", JsonMap::new()).unwrap();
        let started = queue.enqueue("count", JsonMap::new()).unwrap();
        queue.update_status(&started.id, JobStatus::Started, None, None).unwrap();
        (queued.id, started.id)
    };

    // Second process: recovery re-admits both, a worker drains them.
    let registry = open(temp.path(), HandlerRegistry::new().register("count", counting));
    for id in [&queued_id, &started_id] {
        let job = registry.fetch_any(id).unwrap();
        assert_eq!(job.status, JobStatus::Queued);
        assert_eq!(job.meta.extra["recovered"], true);
    }

    let pool = start_worker(&registry);
    assert!(wait_for(SPEC_WAIT_MAX_MS, || {
        terminal(&registry, &queued_id) && terminal(&registry, &started_id)
    }));
    pool.join();

    assert_eq!(registry.fetch_any(&queued_id).unwrap().status, JobStatus::Finished);
    assert_eq!(registry.fetch_any(&started_id).unwrap().status, JobStatus::Finished);
    assert_eq!(runs.load(Ordering::SeqCst), 2);
}

#[test]
fn jobs_whose_handler_is_gone_fail_and_never_rerun() {
    let temp = TempDir::new().unwrap();

    let orphan_id = {
        let handlers = HandlerRegistry::new().register(
            "removed_in_next_build",
            |_: &JobContext, _: &JsonMap| -> HandlerResult { Ok(serde_json::json!({})) },
        );
        let registry = open(temp.path(), handlers);
        let queue = registry.queue("default").unwrap();
        let job = queue.enqueue("removed_in_next_build", JsonMap::new()).unwrap();
        queue.update_status(&job.id, JobStatus::Started, None, None).unwrap();
        job.id
    };

    // Reopen without the handler; run a worker to prove nothing executes.
    let registry = open(temp.path(), HandlerRegistry::new());
    let failed = registry.fetch_any(&orphan_id).unwrap();
    assert_eq!(failed.status, JobStatus::Failed);
    assert_eq!(failed.error.as_deref(), Some(cq_engine::RECOVERY_HANDLER_GONE));

    let pool = start_worker(&registry);
    std::thread::sleep(std::time::Duration::from_millis(100));
    pool.join();

    assert_eq!(registry.fetch_any(&orphan_id).unwrap().status, JobStatus::Failed);

    // The permanent failure is part of history too.
    let record = registry.records().get(&orphan_id).unwrap().unwrap();
    assert_eq!(record.status, JobStatus::Failed);
}

#[test]
fn finished_work_is_never_recovered() {
    let temp = TempDir::new().unwrap();
    let runs = Arc::new(AtomicUsize::new(0));
    let counting = {
        let runs = runs.clone();
        move |_: &JobContext, _: &JsonMap| -> HandlerResult {
            runs.fetch_add(1, Ordering::SeqCst);
            Ok(serde_json::json!({}))
        }
    };

    let done_id = {
        let registry = open(temp.path(), HandlerRegistry::new().register("count", counting.clone()));
        let queue = registry.queue("default").unwrap();
        let job = queue.enqueue("count", JsonMap::new()).unwrap();
        let pool = start_worker(&registry);
        assert!(wait_for(SPEC_WAIT_MAX_MS, || terminal(&registry, &job.id)));
        pool.join();
        job.id
    };
    assert_eq!(runs.load(Ordering::SeqCst), 1);

    let registry = open(temp.path(), HandlerRegistry::new().register("count", counting));
    let pool = start_worker(&registry);
    std::thread::sleep(std::time::Duration::from_millis(100));
    pool.join();

    assert_eq!(registry.fetch_any(&done_id).unwrap().status, JobStatus::Finished);
    assert_eq!(runs.load(Ordering::SeqCst), 1);
}
