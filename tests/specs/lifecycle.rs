// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Enqueue-to-completion specs.

use crate::prelude::*;
use tempfile::TempDir;

/// Stand-in for the transcription pipeline: reports staged progress and
/// returns a transcript-shaped result.
fn transcribe(ctx: &JobContext, args: &JsonMap) -> HandlerResult {
    let file_path = args.get("file_path").and_then(|v| v.as_str()).unwrap_or_default();
    ctx.report(10, "preparing audio");
    ctx.report(80, "transcribing");
    Ok(serde_json::json!({
        "file_path": file_path,
        "text": "hello world",
        "language": "en",
    }))
}

fn handlers() -> HandlerRegistry {
    HandlerRegistry::new().register("transcribe", transcribe)
}

#[test]
fn job_runs_to_finished_with_result_and_progress() {
    let temp = TempDir::new().unwrap();
    let registry = open(temp.path(), handlers());
    let queue = registry.queue("default").unwrap();

    let job = queue.enqueue("transcribe", args(&[("file_path", "/tmp/talk.mp3")])).unwrap();
    assert_eq!(job.status, JobStatus::Queued);

    let pool = start_worker(&registry);
    assert!(wait_for(SPEC_WAIT_MAX_MS, || terminal(&registry, &job.id)));
    pool.join();

    let done = registry.fetch_any(&job.id).unwrap();
    assert_eq!(done.status, JobStatus::Finished);
    assert_eq!(done.result.as_ref().unwrap()["text"], "hello world");
    assert_eq!(done.meta.progress, Some(80));
    assert_eq!(done.meta.message.as_deref(), Some("transcribing"));
    assert!(done.started_at_ms.is_some());
    assert!(done.ended_at_ms.is_some());
}

#[test]
fn failure_surfaces_through_fetch_not_the_enqueuer() {
    let registry_handlers = HandlerRegistry::new().register(
        "transcribe",
        |_: &JobContext, _: &JsonMap| -> HandlerResult { Err("model file is corrupt".into()) },
    );
    let temp = TempDir::new().unwrap();
    let registry = open(temp.path(), registry_handlers);
    let queue = registry.queue("default").unwrap();

    // Enqueue succeeds even though execution will fail.
    let job = queue.enqueue("transcribe", JsonMap::new()).unwrap();

    let pool = start_worker(&registry);
    assert!(wait_for(SPEC_WAIT_MAX_MS, || terminal(&registry, &job.id)));
    pool.join();

    let failed = registry.fetch_any(&job.id).unwrap();
    assert_eq!(failed.status, JobStatus::Failed);
    assert!(failed.error.as_deref().unwrap().contains("model file is corrupt"));
    assert!(failed.result.is_none());
}

#[test]
fn priority_order_beats_arrival_order() {
    let executed: std::sync::Arc<std::sync::Mutex<Vec<String>>> = Default::default();
    let recorder = {
        let executed = executed.clone();
        move |_: &JobContext, args: &JsonMap| -> HandlerResult {
            let lane = args["lane"].as_str().unwrap_or_default().to_string();
            executed.lock().unwrap().push(lane);
            Ok(serde_json::json!({}))
        }
    };
    let temp = TempDir::new().unwrap();
    let registry = open(temp.path(), HandlerRegistry::new().register("record", recorder));

    let mut ids = Vec::new();
    for lane in ["low", "high", "default"] {
        let queue = registry.queue(lane).unwrap();
        ids.push(queue.enqueue("record", args(&[("lane", lane)])).unwrap().id);
    }

    let pool = start_worker(&registry);
    assert!(wait_for(SPEC_WAIT_MAX_MS, || ids.iter().all(|id| terminal(&registry, id))));
    pool.join();

    assert_eq!(*executed.lock().unwrap(), vec!["high", "default", "low"]);
}
