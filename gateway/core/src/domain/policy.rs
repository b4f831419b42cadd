// Copyright (c) 2026 relaygate contributors
// SPDX-License-Identifier: AGPL-3.0
//! Execution Policies
//!
//! What the gateway does around a transfer, per direction: refuse it, run a
//! local command, hand it off as a queued transfer, or defer to the global
//! policy.
//!
//! # Specification Grammar
//!
//! | Specification | Disposition | Template |
//! |---------------|-------------|----------|
//! | `REFUSED ...` | `Refuse` | ignored |
//! | `EXECUTE <cmd>` | `RunCommand` | `<cmd>` |
//! | `R66PREPARETRANSFER <cmd>` | `EnqueueAsyncTransfer` | `<cmd>` |
//! | `NONE` or empty | `None` | - |
//! | anything else | `RunCommand` | whole string |

use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

use crate::domain::transfer::Direction;

pub const REFUSED_KEYWORD: &str = "REFUSED";
pub const EXECUTE_KEYWORD: &str = "EXECUTE";
pub const PREPARE_TRANSFER_KEYWORD: &str = "R66PREPARETRANSFER";
pub const NONE_KEYWORD: &str = "NONE";

/// Malformed specification strings, reported at configuration time
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PolicyError {
    #[error("Keyword {keyword} requires a command template in {direction} specification")]
    MissingTemplate {
        keyword: &'static str,
        direction: Direction,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Disposition {
    Refuse,
    RunCommand,
    EnqueueAsyncTransfer,
    /// Defer to the global policy
    None,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecutionPolicy {
    pub disposition: Disposition,
    pub command_template: String,
    /// Zero means unbounded
    pub timeout: Duration,
}

impl ExecutionPolicy {
    pub fn none() -> Self {
        Self {
            disposition: Disposition::None,
            command_template: String::new(),
            timeout: Duration::ZERO,
        }
    }

    pub fn refuse() -> Self {
        Self {
            disposition: Disposition::Refuse,
            command_template: String::new(),
            timeout: Duration::ZERO,
        }
    }

    pub fn run_command(template: impl Into<String>, timeout: Duration) -> Self {
        Self {
            disposition: Disposition::RunCommand,
            command_template: template.into(),
            timeout,
        }
    }

    pub fn enqueue(template: impl Into<String>, timeout: Duration) -> Self {
        Self {
            disposition: Disposition::EnqueueAsyncTransfer,
            command_template: template.into(),
            timeout,
        }
    }

    /// Parse one specification string.
    pub fn parse(spec: &str, timeout: Duration, direction: Direction) -> Result<Self, PolicyError> {
        let spec = spec.trim();
        if spec.is_empty() {
            return Ok(Self::none());
        }

        let (keyword, rest) = match spec.split_once(char::is_whitespace) {
            Some((keyword, rest)) => (keyword, rest.trim()),
            None => (spec, ""),
        };

        match keyword {
            REFUSED_KEYWORD => Ok(Self::refuse()),
            NONE_KEYWORD if rest.is_empty() => Ok(Self::none()),
            EXECUTE_KEYWORD => {
                if rest.is_empty() {
                    return Err(PolicyError::MissingTemplate { keyword: EXECUTE_KEYWORD, direction });
                }
                Ok(Self::run_command(rest, timeout))
            }
            PREPARE_TRANSFER_KEYWORD => {
                if rest.is_empty() {
                    return Err(PolicyError::MissingTemplate {
                        keyword: PREPARE_TRANSFER_KEYWORD,
                        direction,
                    });
                }
                Ok(Self::enqueue(rest, timeout))
            }
            // Bare command lines predate the keywords and still mean EXECUTE
            _ => Ok(Self::run_command(spec, timeout)),
        }
    }

    pub fn is_refused(&self) -> bool {
        self.disposition == Disposition::Refuse
    }
}

impl Default for ExecutionPolicy {
    fn default() -> Self {
        Self::none()
    }
}

/// Store and retrieve policies held together, globally or per user
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecutionPolicySet {
    pub store: ExecutionPolicy,
    pub retrieve: ExecutionPolicy,
}

impl ExecutionPolicySet {
    pub fn parse(
        store_spec: &str,
        store_timeout: Duration,
        retrieve_spec: &str,
        retrieve_timeout: Duration,
    ) -> Result<Self, PolicyError> {
        Ok(Self {
            store: ExecutionPolicy::parse(store_spec, store_timeout, Direction::Store)?,
            retrieve: ExecutionPolicy::parse(retrieve_spec, retrieve_timeout, Direction::Retrieve)?,
        })
    }

    pub fn for_direction(&self, direction: Direction) -> &ExecutionPolicy {
        match direction {
            Direction::Store => &self.store,
            Direction::Retrieve => &self.retrieve,
        }
    }
}
