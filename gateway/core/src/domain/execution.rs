// Copyright (c) 2026 relaygate contributors
// SPDX-License-Identifier: AGPL-3.0
//! External Command Execution
//!
//! Result types of running a hook command, and the launcher contract the
//! executor spawns processes through.
//!
//! # Exit Code Convention
//!
//! - `0` - success
//! - `1` - success with warning
//! - anything else, or a watchdog kill - failure

use async_trait::async_trait;
use std::io;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitStatus {
    Ok,
    Warning,
    Failed,
}

impl ExitStatus {
    pub fn from_code(code: i32) -> Self {
        match code {
            0 => ExitStatus::Ok,
            1 => ExitStatus::Warning,
            _ => ExitStatus::Failed,
        }
    }
}

#[derive(Debug, Error)]
pub enum ExecutionError {
    #[error("Empty command line")]
    EmptyCommand,

    #[error("Failed to spawn {program} after {attempts} attempt(s): {source}")]
    Spawn {
        program: String,
        attempts: u32,
        #[source]
        source: io::Error,
    },

    #[error("Process {program} killed by watchdog after {timeout:?}")]
    Timeout { program: String, timeout: Duration },

    #[error("Process {program} exited with {}", describe_code(.code))]
    NonZeroExit { program: String, code: Option<i32> },

    #[error("Failed to wait for {program}: {source}")]
    Wait {
        program: String,
        #[source]
        source: io::Error,
    },
}

fn describe_code(code: &Option<i32>) -> String {
    match code {
        Some(code) => format!("code {}", code),
        None => "no exit code (terminated by signal)".to_string(),
    }
}

/// Outcome of one executor invocation
#[derive(Debug)]
pub struct ProcessExecutionResult {
    pub status: ExitStatus,
    pub cause: Option<ExecutionError>,
}

impl ProcessExecutionResult {
    pub fn ok() -> Self {
        Self { status: ExitStatus::Ok, cause: None }
    }

    pub fn warning(program: impl Into<String>) -> Self {
        Self {
            status: ExitStatus::Warning,
            cause: Some(ExecutionError::NonZeroExit { program: program.into(), code: Some(1) }),
        }
    }

    pub fn failed(cause: ExecutionError) -> Self {
        Self { status: ExitStatus::Failed, cause: Some(cause) }
    }

    /// Warning counts as success for protocol purposes
    pub fn is_success(&self) -> bool {
        self.status != ExitStatus::Failed
    }

    pub fn is_timeout(&self) -> bool {
        matches!(self.cause, Some(ExecutionError::Timeout { .. }))
    }
}

/// Tokenised command line: program followed by its arguments
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandLine {
    pub program: String,
    pub args: Vec<String>,
}

impl CommandLine {
    /// Split on whitespace. There is no quoting or escaping: an argument can
    /// never contain a space.
    pub fn tokenize(line: &str) -> Option<Self> {
        let mut tokens = line.split_whitespace().map(str::to_string);
        let program = tokens.next()?;
        Some(Self { program, args: tokens.collect() })
    }
}

/// A spawned process the executor can wait on or kill
#[async_trait]
pub trait LaunchedProcess: Send {
    /// Wait for exit. `None` when the process had no exit code (signal).
    async fn wait(&mut self) -> io::Result<Option<i32>>;

    /// Forcibly terminate and reap the process
    async fn kill(&mut self) -> io::Result<()>;
}

/// Spawns hook processes with all standard streams discarded
pub trait ProcessLauncher: Send + Sync {
    fn launch(&self, command: &CommandLine) -> io::Result<Box<dyn LaunchedProcess>>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exit_code_mapping() {
        assert_eq!(ExitStatus::from_code(0), ExitStatus::Ok);
        assert_eq!(ExitStatus::from_code(1), ExitStatus::Warning);
        assert_eq!(ExitStatus::from_code(2), ExitStatus::Failed);
        assert_eq!(ExitStatus::from_code(-1), ExitStatus::Failed);
        assert_eq!(ExitStatus::from_code(127), ExitStatus::Failed);
    }

    #[test]
    fn test_tokenize_collapses_whitespace() {
        let cmd = CommandLine::tokenize("  /bin/echo   a\tb  c ").unwrap();
        assert_eq!(cmd.program, "/bin/echo");
        assert_eq!(cmd.args, vec!["a", "b", "c"]);
    }

    #[test]
    fn test_tokenize_has_no_quoting() {
        let cmd = CommandLine::tokenize("/bin/echo \"two words\"").unwrap();
        assert_eq!(cmd.args, vec!["\"two", "words\""]);
    }

    #[test]
    fn test_tokenize_empty() {
        assert!(CommandLine::tokenize("   ").is_none());
    }

    #[test]
    fn test_warning_is_success() {
        assert!(ProcessExecutionResult::warning("x").is_success());
        assert!(ProcessExecutionResult::ok().is_success());
        assert!(!ProcessExecutionResult::failed(ExecutionError::EmptyCommand).is_success());
    }
}
