//! Integration tests for runbox
//!
//! These tests need the real toolchains on PATH: python3, node, javac/java
//! and g++.
//! Run with: cargo test -p runbox --features integration-tests
//!
//! Slow tests are marked `#[ignore]`. To include them:
//!    cargo test -p runbox --features integration-tests -- --include-ignored

#![cfg(feature = "integration-tests")]

use std::fs;
use std::path::Path;

use runbox::workspace::random_id;
use runbox::{Config, ExecutionRequest, ExecutionResult, Isolation, Runner};

mod compiled;
mod concurrency;
mod config_loading;
mod interpreted;
mod timeout;

const FIXTURES_PATH: &str = concat!(env!("CARGO_MANIFEST_DIR"), "/tests/fixtures");

/// Helper to get fixture file content
pub(crate) fn fixture_source(name: &str) -> String {
    let path = format!("{FIXTURES_PATH}/sources/{name}");
    fs::read_to_string(&path).unwrap_or_else(|e| panic!("Failed to read fixture {path}: {e}"))
}

/// Default config with a temp directory of its own
pub(crate) fn test_config(isolation: Isolation) -> Config {
    let mut config = Config::default();
    config.temp_dir = std::env::temp_dir().join(format!("runbox-it-{}", random_id()));
    config.isolation = isolation;
    config
}

pub(crate) async fn test_runner(isolation: Isolation) -> Runner {
    Runner::new(test_config(isolation))
        .await
        .expect("Failed to create runner")
}

pub(crate) async fn run(runner: &Runner, code: &str, language: &str) -> ExecutionResult {
    let request = ExecutionRequest::new(code, language).expect("invalid request");
    runner.execute(&request).await.expect("runner failed")
}

/// Every file under `dir`, recursively
pub(crate) fn leftover_files(dir: &Path) -> Vec<String> {
    let mut found = Vec::new();
    let Ok(entries) = fs::read_dir(dir) else {
        return found;
    };
    for entry in entries.flatten() {
        let path = entry.path();
        if path.is_dir() {
            found.extend(leftover_files(&path));
        }
        found.push(path.display().to_string());
    }
    found
}

pub(crate) fn remove_root(runner: &Runner) {
    let _ = fs::remove_dir_all(runner.workspace().path());
}
