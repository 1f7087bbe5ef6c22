// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use tempfile::TempDir;

#[test]
fn defaults_are_valid() {
    let config = EngineConfig::default();
    config.validate().unwrap();
    assert_eq!(config.queues, vec!["high", "default", "low"]);
    assert_eq!(config.worker_threads, 2);
    assert_eq!(config.idle_sleep(), Duration::from_millis(100));
}

#[test]
fn load_fills_missing_keys_with_defaults() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("engine.toml");
    std::fs::write(&path, "worker_threads = 4\nqueues = [\"rush\", \"bulk\"]\n").unwrap();

    let config = EngineConfig::load(&path).unwrap();
    assert_eq!(config.worker_threads, 4);
    assert_eq!(config.queues, vec!["rush", "bulk"]);
    assert_eq!(config.idle_sleep_ms, 100);
    assert_eq!(config.db_path, default_db_path());
}

#[test]
fn load_missing_file_fails() {
    let temp = TempDir::new().unwrap();
    let err = EngineConfig::load(&temp.path().join("absent.toml")).unwrap_err();
    assert!(matches!(err, ConfigError::Read { .. }));
}

#[test]
fn load_rejects_bad_toml() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("engine.toml");
    std::fs::write(&path, "queues = \"not-a-list\"").unwrap();

    let err = EngineConfig::load(&path).unwrap_err();
    assert!(matches!(err, ConfigError::Parse { .. }));
}

#[yare::parameterized(
    no_queues       = { &[], 1 },
    zero_threads    = { &["high"], 0 },
)]
fn validate_rejects(queues: &[&str], worker_threads: usize) {
    let config = EngineConfig {
        queues: queues.iter().map(|s| s.to_string()).collect(),
        worker_threads,
        ..EngineConfig::default()
    };
    assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));
}

#[test]
fn validate_rejects_duplicate_lane() {
    let config = EngineConfig {
        queues: vec!["high".into(), "high".into()],
        ..EngineConfig::default()
    };
    let err = config.validate().unwrap_err();
    assert!(err.to_string().contains("duplicate queue 'high'"));
}

#[test]
fn default_db_path_is_under_a_cq_dir() {
    let path = default_db_path();
    assert!(path.ends_with("cq/jobs.db") || path.ends_with("cq\\jobs.db"));
}
