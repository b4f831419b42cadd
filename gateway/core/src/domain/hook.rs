// Copyright (c) 2026 relaygate contributors
// SPDX-License-Identifier: AGPL-3.0
//! Hook Outcomes
//!
//! Results of the pre-command and post-transfer hooks, and the error taxonomy
//! the protocol engine turns into reply codes.
//!
//! | Error | Reply |
//! |-------|-------|
//! | `PolicyRefusal` | 553 |
//! | `UnsafeContext` | 553 |
//! | `AdmissionRejected` | 421 |
//! | `HandoffParse` | 501 |
//! | everything else | 451 |

use std::fmt;
use std::io;
use std::path::PathBuf;
use thiserror::Error;

use crate::domain::execution::{ExecutionError, ProcessExecutionResult};
use crate::domain::handoff::{AsyncTransferDescriptor, HandoffError};
use crate::domain::transfer::Direction;

/// FTP-style reply codes the hooks can produce
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ReplyCode {
    ServiceNotAvailable,
    LocalProcessingError,
    SyntaxErrorInArguments,
    FileNameNotAllowed,
}

impl ReplyCode {
    pub fn code(self) -> u16 {
        match self {
            ReplyCode::ServiceNotAvailable => 421,
            ReplyCode::LocalProcessingError => 451,
            ReplyCode::SyntaxErrorInArguments => 501,
            ReplyCode::FileNameNotAllowed => 553,
        }
    }
}

impl fmt::Display for ReplyCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

#[derive(Debug, Error)]
pub enum HookError {
    #[error("{direction} operations are not allowed for user {user}")]
    PolicyRefusal { user: String, direction: Direction },

    #[error("Transfer {field} contains a reserved template marker")]
    UnsafeContext { field: &'static str },

    #[error("Server overloaded, rejected after {attempts} admission attempt(s)")]
    AdmissionRejected { attempts: u32 },

    #[error("Hook command could not be started: {0}")]
    Spawn(#[source] ExecutionError),

    #[error("Hook command timed out: {0}")]
    Timeout(#[source] ExecutionError),

    #[error("Hook command failed: {0}")]
    NonZeroExit(#[source] ExecutionError),

    #[error("Invalid transfer preparation: {0}")]
    HandoffParse(#[source] HandoffError),

    #[error("Transfer preparation failed: {0}")]
    HandoffPersistence(#[source] HandoffError),

    #[error("File {} is not readable: {source}", .path.display())]
    FileUnavailable {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

impl HookError {
    pub fn reply_code(&self) -> ReplyCode {
        match self {
            HookError::PolicyRefusal { .. } | HookError::UnsafeContext { .. } => ReplyCode::FileNameNotAllowed,
            HookError::AdmissionRejected { .. } => ReplyCode::ServiceNotAvailable,
            HookError::HandoffParse(_) => ReplyCode::SyntaxErrorInArguments,
            HookError::Spawn(_)
            | HookError::Timeout(_)
            | HookError::NonZeroExit(_)
            | HookError::HandoffPersistence(_)
            | HookError::FileUnavailable { .. } => ReplyCode::LocalProcessingError,
        }
    }

    /// Only overload is worth retrying from the client side
    pub fn is_transient(&self) -> bool {
        matches!(self, HookError::AdmissionRejected { .. })
    }
}

impl From<ExecutionError> for HookError {
    fn from(err: ExecutionError) -> Self {
        match err {
            ExecutionError::EmptyCommand | ExecutionError::Spawn { .. } => HookError::Spawn(err),
            ExecutionError::Timeout { .. } => HookError::Timeout(err),
            ExecutionError::NonZeroExit { .. } | ExecutionError::Wait { .. } => HookError::NonZeroExit(err),
        }
    }
}

impl From<HandoffError> for HookError {
    fn from(err: HandoffError) -> Self {
        if err.is_parse_error() {
            HookError::HandoffParse(err)
        } else {
            HookError::HandoffPersistence(err)
        }
    }
}

/// What the protocol engine does after `before_command`
#[derive(Debug)]
pub enum PreCommandOutcome {
    /// Execute the command, nothing ran
    Proceed,
    /// The retrieve action ran and succeeded (possibly with a warning)
    ProceedAfterAction(ProcessExecutionResult),
    /// The retrieve was handed off to the queued-transfer store
    Enqueued(AsyncTransferDescriptor),
}

/// Result of `after_transfer`. A post-action failure never turns a completed
/// transfer into a failed one.
#[derive(Debug)]
pub enum PostTransferOutcome {
    Completed,
    /// The transfer itself failed; no action was attempted
    Skipped,
    ActionSucceeded(ProcessExecutionResult),
    Enqueued(AsyncTransferDescriptor),
    CompletedWithAnomaly(HookError),
}

impl PostTransferOutcome {
    pub fn anomaly(&self) -> Option<&HookError> {
        match self {
            PostTransferOutcome::CompletedWithAnomaly(err) => Some(err),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_reply_codes_distinguish_refusal_overload_and_failure() {
        let refused = HookError::PolicyRefusal { user: "alice".into(), direction: Direction::Retrieve };
        let busy = HookError::AdmissionRejected { attempts: 2 };
        let failed: HookError = ExecutionError::NonZeroExit { program: "scan".into(), code: Some(3) }.into();

        assert_eq!(refused.reply_code().code(), 553);
        assert_eq!(HookError::UnsafeContext { field: "file" }.reply_code().code(), 553);
        assert_eq!(busy.reply_code().code(), 421);
        assert_eq!(failed.reply_code().code(), 451);
        assert!(busy.is_transient());
        assert!(!refused.is_transient());
    }

    #[test]
    fn test_execution_errors_keep_their_category() {
        let timeout: HookError = ExecutionError::Timeout { program: "scan".into(), timeout: Duration::from_secs(1) }.into();
        assert!(matches!(timeout, HookError::Timeout(_)));

        let spawn: HookError = ExecutionError::Spawn {
            program: "scan".into(),
            attempts: 2,
            source: io::Error::from(io::ErrorKind::WouldBlock),
        }
        .into();
        assert!(matches!(spawn, HookError::Spawn(_)));
    }

    #[test]
    fn test_handoff_errors_split_parse_from_persistence() {
        let parse: HookError = HandoffError::MissingFlag("-to").into();
        assert_eq!(parse.reply_code(), ReplyCode::SyntaxErrorInArguments);

        let missing_rule: HookError = HandoffError::RuleNotFound("push".into()).into();
        assert!(matches!(missing_rule, HookError::HandoffPersistence(_)));
        assert_eq!(missing_rule.reply_code(), ReplyCode::LocalProcessingError);
    }
}
