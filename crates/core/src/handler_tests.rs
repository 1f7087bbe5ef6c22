// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::test_support::RecordingProgress;

fn echo(_ctx: &JobContext, args: &JsonMap) -> HandlerResult {
    Ok(serde_json::Value::Object(args.clone()))
}

#[test]
fn registry_resolves_registered_tags() {
    let registry = HandlerRegistry::new().register("echo", echo);

    assert!(registry.contains("echo"));
    assert!(registry.resolve("echo").is_some());
    assert!(registry.resolve("transcribe").is_none());
    assert_eq!(registry.len(), 1);
}

#[test]
fn last_registration_wins() {
    let registry = HandlerRegistry::new()
        .register("work", |_: &JobContext, _: &JsonMap| -> HandlerResult {
            Ok(serde_json::json!(1))
        })
        .register("work", |_: &JobContext, _: &JsonMap| -> HandlerResult {
            Ok(serde_json::json!(2))
        });

    let handler = registry.resolve("work").unwrap();
    let ctx = JobContext::new(JobId::new(), std::sync::Arc::new(NoProgress));
    let result = handler.run(&ctx, &JsonMap::new()).unwrap();
    assert_eq!(result, serde_json::json!(2));
    assert_eq!(registry.len(), 1);
}

#[test]
fn closures_run_with_their_arguments() {
    let registry = HandlerRegistry::new().register("echo", echo);
    let handler = registry.resolve("echo").unwrap();

    let mut args = JsonMap::new();
    args.insert("file".into(), serde_json::json!("a.wav"));

    let ctx = JobContext::new(JobId::new(), std::sync::Arc::new(NoProgress));
    let result = handler.run(&ctx, &args).unwrap();
    assert_eq!(result["file"], "a.wav");
}

#[test]
fn context_routes_reports_to_the_sink() {
    let sink = std::sync::Arc::new(RecordingProgress::new());
    let id = JobId::new();
    let ctx = JobContext::new(id.clone(), sink.clone());

    ctx.report(25, "decoding audio");
    let mut extra = JsonMap::new();
    extra.insert("stage".into(), serde_json::json!("vad"));
    ctx.report_with(50, "segmenting", extra);

    let calls = sink.calls();
    assert_eq!(calls.len(), 2);
    assert_eq!(calls[0].job_id, id);
    assert_eq!(calls[0].percent, 25);
    assert_eq!(calls[0].message, "decoding audio");
    assert!(calls[0].extra.is_none());
    assert_eq!(calls[1].extra.as_ref().unwrap()["stage"], "vad");
}

#[test]
fn handler_errors_pass_through() {
    let registry =
        HandlerRegistry::new().register("boom", |_: &JobContext, _: &JsonMap| -> HandlerResult {
            Err("decoder exploded".into())
        });

    let handler = registry.resolve("boom").unwrap();
    let ctx = JobContext::new(JobId::new(), std::sync::Arc::new(NoProgress));
    let err = handler.run(&ctx, &JsonMap::new()).unwrap_err();
    assert_eq!(err.to_string(), "decoder exploded");
}
