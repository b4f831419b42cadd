// Copyright (c) 2026 relaygate contributors
// SPDX-License-Identifier: AGPL-3.0

//! Process executor against real OS processes.
//!
//! Covers exit code mapping, the watchdog kill and spawn failures with the
//! tokio launcher. Unix only: relies on `true`, `false`, `sh` and `sleep`.

#![cfg(unix)]

use relaygate_core::application::process_executor::ProcessExecutor;
use relaygate_core::domain::execution::{ExecutionError, ExitStatus};
use relaygate_core::infrastructure::process::TokioProcessLauncher;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};

fn executor() -> ProcessExecutor {
    ProcessExecutor::new(Arc::new(TokioProcessLauncher::new()), Duration::from_millis(100))
}

/// Script exiting with its first argument
fn exit_script(dir: &tempfile::TempDir) -> PathBuf {
    let path = dir.path().join("exit_with.sh");
    std::fs::write(&path, "exit \"$1\"\n").unwrap();
    path
}

#[tokio::test]
async fn test_true_is_ok() {
    let result = executor().run("true", Duration::from_secs(5)).await;
    assert_eq!(result.status, ExitStatus::Ok);
    assert!(result.cause.is_none());
}

#[tokio::test]
async fn test_false_is_warning() {
    let result = executor().run("false", Duration::from_secs(5)).await;
    assert_eq!(result.status, ExitStatus::Warning);
    assert!(result.is_success());
}

#[tokio::test]
async fn test_exit_codes_through_shell_script() {
    let dir = tempfile::tempdir().unwrap();
    let script = exit_script(&dir);

    for (code, expected) in [(0, ExitStatus::Ok), (1, ExitStatus::Warning), (2, ExitStatus::Failed), (42, ExitStatus::Failed)] {
        let line = format!("sh {} {}", script.display(), code);
        let result = executor().run(&line, Duration::from_secs(5)).await;
        assert_eq!(result.status, expected, "exit code {}", code);
    }
}

#[tokio::test]
async fn test_watchdog_kills_long_running_process() {
    let started = Instant::now();
    let result = executor().run("sleep 30", Duration::from_millis(200)).await;

    assert_eq!(result.status, ExitStatus::Failed);
    assert!(result.is_timeout());
    assert!(started.elapsed() < Duration::from_secs(10));
}

#[tokio::test]
async fn test_zero_timeout_waits_for_completion() {
    let result = executor().run("sleep 0.2", Duration::ZERO).await;
    assert_eq!(result.status, ExitStatus::Ok);
}

#[tokio::test]
async fn test_missing_program_fails_without_retry() {
    let result = executor().run("/nonexistent/relaygate-hook --flag", Duration::from_secs(5)).await;
    assert_eq!(result.status, ExitStatus::Failed);
    assert!(matches!(result.cause, Some(ExecutionError::Spawn { attempts: 1, .. })));
}

#[tokio::test]
async fn test_arguments_are_split_on_whitespace_only() {
    let dir = tempfile::tempdir().unwrap();
    let script = dir.path().join("count_args.sh");
    // Exit status is the number of arguments received
    std::fs::write(&script, "exit $#\n").unwrap();

    let line = format!("sh {}   a\tb   c", script.display());
    let result = executor().run(&line, Duration::from_secs(5)).await;
    assert!(matches!(result.cause, Some(ExecutionError::NonZeroExit { code: Some(3), .. })));
}
