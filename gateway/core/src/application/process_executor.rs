// Copyright (c) 2026 relaygate contributors
// SPDX-License-Identifier: AGPL-3.0
//! Process Executor
//!
//! Runs one hook command line to completion with a watchdog and a single
//! retry for transient spawn failures.
//!
//! # Architecture
//!
//! - **Layer:** Application Layer
//! - **Purpose:** Command execution policy (timeouts, retry, exit mapping)
//!   on top of a `ProcessLauncher`

use std::io;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

use crate::domain::execution::{
    CommandLine, ExecutionError, ExitStatus, LaunchedProcess, ProcessExecutionResult, ProcessLauncher,
};

pub struct ProcessExecutor {
    launcher: Arc<dyn ProcessLauncher>,
    spawn_retry_delay: Duration,
}

impl ProcessExecutor {
    pub fn new(launcher: Arc<dyn ProcessLauncher>, spawn_retry_delay: Duration) -> Self {
        Self {
            launcher,
            spawn_retry_delay,
        }
    }

    /// Run `command_line` and wait for it. A zero `timeout` waits forever.
    pub async fn run(&self, command_line: &str, timeout: Duration) -> ProcessExecutionResult {
        let Some(command) = CommandLine::tokenize(command_line) else {
            return ProcessExecutionResult::failed(ExecutionError::EmptyCommand);
        };

        let mut process = match self.spawn(&command).await {
            Ok(process) => process,
            Err(err) => {
                warn!(program = %command.program, error = %err, "Hook command could not be started");
                return ProcessExecutionResult::failed(err);
            }
        };
        debug!(program = %command.program, args = ?command.args, timeout_ms = timeout.as_millis() as u64, "Hook command started");

        let waited = if timeout.is_zero() {
            Some(process.wait().await)
        } else {
            tokio::time::timeout(timeout, process.wait()).await.ok()
        };

        match waited {
            None => {
                warn!(program = %command.program, ?timeout, "Hook command exceeded its timeout, killing it");
                if let Err(err) = process.kill().await {
                    warn!(program = %command.program, error = %err, "Failed to kill timed out hook command");
                }
                ProcessExecutionResult::failed(ExecutionError::Timeout {
                    program: command.program,
                    timeout,
                })
            }
            Some(Ok(Some(code))) => {
                debug!(program = %command.program, code, "Hook command exited");
                match ExitStatus::from_code(code) {
                    ExitStatus::Ok => ProcessExecutionResult::ok(),
                    ExitStatus::Warning => ProcessExecutionResult::warning(command.program),
                    ExitStatus::Failed => ProcessExecutionResult::failed(ExecutionError::NonZeroExit {
                        program: command.program,
                        code: Some(code),
                    }),
                }
            }
            Some(Ok(None)) => {
                debug!(program = %command.program, "Hook command terminated by signal");
                ProcessExecutionResult::failed(ExecutionError::NonZeroExit {
                    program: command.program,
                    code: None,
                })
            }
            Some(Err(source)) => {
                // The process may still be alive; do not leak it
                if let Err(err) = process.kill().await {
                    debug!(program = %command.program, error = %err, "Kill after wait failure did not succeed");
                }
                ProcessExecutionResult::failed(ExecutionError::Wait {
                    program: command.program,
                    source,
                })
            }
        }
    }

    async fn spawn(&self, command: &CommandLine) -> Result<Box<dyn LaunchedProcess>, ExecutionError> {
        match self.launcher.launch(command) {
            Ok(process) => Ok(process),
            Err(err) if is_transient_spawn_error(&err) => {
                warn!(
                    program = %command.program,
                    error = %err,
                    delay_ms = self.spawn_retry_delay.as_millis() as u64,
                    "Transient spawn failure, retrying once"
                );
                tokio::time::sleep(self.spawn_retry_delay).await;
                self.launcher.launch(command).map_err(|source| ExecutionError::Spawn {
                    program: command.program.clone(),
                    attempts: 2,
                    source,
                })
            }
            Err(source) => Err(ExecutionError::Spawn {
                program: command.program.clone(),
                attempts: 1,
                source,
            }),
        }
    }
}

/// EAGAIN and ENOMEM from fork/exec mean "cannot spawn right now"
pub fn is_transient_spawn_error(err: &io::Error) -> bool {
    matches!(err.kind(), io::ErrorKind::WouldBlock | io::ErrorKind::OutOfMemory)
}
