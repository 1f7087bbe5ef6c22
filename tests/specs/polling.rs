// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Polling specs: drained events plus the synthetic snapshot.

use crate::prelude::*;
use tempfile::TempDir;

fn reporting(ctx: &JobContext, _args: &JsonMap) -> HandlerResult {
    ctx.report(25, "decoding");
    ctx.report(75, "transcribing");
    Ok(serde_json::json!({"text": "done"}))
}

#[test]
fn poll_sees_progress_events_and_final_snapshot() {
    let temp = TempDir::new().unwrap();
    let registry = open(temp.path(), HandlerRegistry::new().register("report", reporting));
    let queue = registry.queue("default").unwrap();

    let job = queue.enqueue("report", JsonMap::new()).unwrap();
    let pool = start_worker(&registry);
    assert!(wait_for(SPEC_WAIT_MAX_MS, || terminal(&registry, &job.id)));
    pool.join();

    let updates = poll_updates(&registry, &job.id).unwrap();
    assert!(updates.len() >= 3);

    let progress: Vec<i64> = updates[..updates.len() - 1]
        .iter()
        .filter_map(|u| u.data["progress"].as_i64())
        .collect();
    assert_eq!(progress, vec![25, 75]);

    let snapshot = updates.last().unwrap();
    assert_eq!(snapshot.data["status"], "finished");
    assert_eq!(snapshot.data["result"]["text"], "done");
}

#[test]
fn every_poller_observes_the_terminal_state_at_least_once() {
    let temp = TempDir::new().unwrap();
    let registry = open(temp.path(), HandlerRegistry::new().register("report", reporting));
    let queue = registry.queue("default").unwrap();

    let job = queue.enqueue("report", JsonMap::new()).unwrap();
    let pool = start_worker(&registry);
    assert!(wait_for(SPEC_WAIT_MAX_MS, || terminal(&registry, &job.id)));
    pool.join();

    // Tab A drains everything; tab B arrives later to an empty buffer.
    let tab_a = poll_updates(&registry, &job.id).unwrap();
    let tab_b = poll_updates(&registry, &job.id).unwrap();

    for updates in [&tab_a, &tab_b] {
        let saw_finished =
            updates.iter().any(|u| u.data["status"] == "finished");
        assert!(saw_finished);
    }
    assert_eq!(tab_b.len(), 1);
}

#[test]
fn polling_a_running_job_is_repeatable() {
    let (release_tx, release_rx) = std::sync::mpsc::channel::<()>();
    let release_rx = std::sync::Mutex::new(release_rx);
    let gated = move |ctx: &JobContext, _: &JsonMap| -> HandlerResult {
        ctx.report(50, "halfway");
        if let Ok(rx) = release_rx.lock() {
            rx.recv().ok();
        }
        Ok(serde_json::json!({}))
    };

    let temp = TempDir::new().unwrap();
    let registry = open(temp.path(), HandlerRegistry::new().register("gated", gated));
    let queue = registry.queue("default").unwrap();

    let job = queue.enqueue("gated", JsonMap::new()).unwrap();
    let pool = start_worker(&registry);

    assert!(wait_for(SPEC_WAIT_MAX_MS, || {
        registry
            .fetch_any(&job.id)
            .map(|j| j.meta.progress == Some(50))
            .unwrap_or(false)
    }));

    let first = poll_updates(&registry, &job.id).unwrap();
    assert_eq!(first.last().unwrap().data["status"], "started");
    assert_eq!(first.last().unwrap().data["progress"], 50);

    // A second poll while still running repeats the snapshot.
    let second = poll_updates(&registry, &job.id).unwrap();
    assert_eq!(second.last().unwrap().data["status"], "started");

    release_tx.send(()).unwrap();
    assert!(wait_for(SPEC_WAIT_MAX_MS, || terminal(&registry, &job.id)));
    pool.join();
}
