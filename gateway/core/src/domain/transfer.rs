// Copyright (c) 2026 relaygate contributors
// SPDX-License-Identifier: AGPL-3.0
//! Transfer Context
//!
//! Protocol commands as seen by the hook pipeline and the immutable context
//! a hook runs against.
//!
//! # Architecture
//!
//! - **Layer:** Domain Layer
//! - **Purpose:** Command classification and per-command transfer context

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

/// Direction an execution policy applies to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    /// Incoming file (STOR, APPE, STOU)
    Store,
    /// Outgoing file (RETR)
    Retrieve,
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Direction::Store => write!(f, "store"),
            Direction::Retrieve => write!(f, "retrieve"),
        }
    }
}

/// Transfer-triggering operation codes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum OperationCode {
    Retr,
    Stor,
    Appe,
    Stou,
}

impl OperationCode {
    pub fn direction(self) -> Direction {
        match self {
            OperationCode::Retr => Direction::Retrieve,
            OperationCode::Stor | OperationCode::Appe | OperationCode::Stou => Direction::Store,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            OperationCode::Retr => "RETR",
            OperationCode::Stor => "STOR",
            OperationCode::Appe => "APPE",
            OperationCode::Stou => "STOU",
        }
    }
}

impl fmt::Display for OperationCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A protocol command as handed to the hook pipeline by the protocol engine.
///
/// Only the commands the pipeline treats differently get their own variant;
/// everything else is carried verbatim in `Other`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProtocolCommand {
    Transfer(OperationCode),
    Quit,
    Abor,
    Noop,
    Stat,
    Feat,
    Syst,
    Help,
    Other(String),
}

impl ProtocolCommand {
    /// Commands that must never be throttled, so an overloaded session can
    /// still abort or leave.
    pub fn is_special(&self) -> bool {
        matches!(
            self,
            ProtocolCommand::Quit
                | ProtocolCommand::Abor
                | ProtocolCommand::Noop
                | ProtocolCommand::Stat
                | ProtocolCommand::Feat
                | ProtocolCommand::Syst
                | ProtocolCommand::Help
        )
    }

    pub fn operation_code(&self) -> Option<OperationCode> {
        match self {
            ProtocolCommand::Transfer(code) => Some(*code),
            _ => None,
        }
    }

    pub fn is_retrieve(&self) -> bool {
        self.operation_code().map(OperationCode::direction) == Some(Direction::Retrieve)
    }

    pub fn is_store(&self) -> bool {
        self.operation_code().map(OperationCode::direction) == Some(Direction::Store)
    }

    pub fn name(&self) -> &str {
        match self {
            ProtocolCommand::Transfer(code) => code.as_str(),
            ProtocolCommand::Quit => "QUIT",
            ProtocolCommand::Abor => "ABOR",
            ProtocolCommand::Noop => "NOOP",
            ProtocolCommand::Stat => "STAT",
            ProtocolCommand::Feat => "FEAT",
            ProtocolCommand::Syst => "SYST",
            ProtocolCommand::Help => "HELP",
            ProtocolCommand::Other(name) => name,
        }
    }
}

impl FromStr for ProtocolCommand {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let upper = s.trim().to_ascii_uppercase();
        Ok(match upper.as_str() {
            "RETR" => ProtocolCommand::Transfer(OperationCode::Retr),
            "STOR" => ProtocolCommand::Transfer(OperationCode::Stor),
            "APPE" => ProtocolCommand::Transfer(OperationCode::Appe),
            "STOU" => ProtocolCommand::Transfer(OperationCode::Stou),
            "QUIT" => ProtocolCommand::Quit,
            "ABOR" => ProtocolCommand::Abor,
            "NOOP" => ProtocolCommand::Noop,
            "STAT" => ProtocolCommand::Stat,
            "FEAT" => ProtocolCommand::Feat,
            "SYST" => ProtocolCommand::Syst,
            "HELP" => ProtocolCommand::Help,
            _ => ProtocolCommand::Other(upper),
        })
    }
}

impl fmt::Display for ProtocolCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Immutable context of one transfer-triggering command.
///
/// Built fresh for every hook invocation and dropped once the hook resolves.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransferContext {
    pub user: String,
    pub account: String,
    pub base_directory: String,
    /// Path of the file relative to `base_directory`
    pub relative_file_path: String,
    pub operation_code: OperationCode,
}

impl TransferContext {
    pub fn new(
        user: impl Into<String>,
        account: impl Into<String>,
        base_directory: impl Into<String>,
        relative_file_path: impl Into<String>,
        operation_code: OperationCode,
    ) -> Self {
        Self {
            user: user.into(),
            account: account.into(),
            base_directory: base_directory.into(),
            relative_file_path: relative_file_path.into(),
            operation_code,
        }
    }

    /// Location of the file on the local filesystem
    pub fn local_path(&self) -> PathBuf {
        let relative = self.relative_file_path.trim_start_matches('/');
        Path::new(&self.base_directory).join(relative)
    }
}
