// Copyright (c) 2026 relaygate contributors
// SPDX-License-Identifier: AGPL-3.0
//! Asynchronous Transfer Hand-off
//!
//! Descriptor of a prepared transfer waiting in the queued-transfer store for
//! the external scheduler, and the errors of building one.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

use crate::domain::repository::RepositoryError;

/// Literal stored when `-info` is absent
pub const DEFAULT_FILE_INFO: &str = "noinfo";

/// Smallest block size accepted from `-block`
pub const MIN_BLOCK_SIZE: u32 = 100;

/// Largest block size accepted from `-block`; the queue column is a 32-bit integer
pub const MAX_BLOCK_SIZE: u32 = i32::MAX as u32;

/// Transfer mode carried by a rule
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransferMode {
    Send,
    Receive,
    SendMd5,
    ReceiveMd5,
    SendThrough,
    ReceiveThrough,
    SendMd5Through,
    ReceiveMd5Through,
}

impl TransferMode {
    /// Checksum-enabled variant of this mode; idempotent
    pub fn with_checksum(self) -> Self {
        match self {
            TransferMode::Send | TransferMode::SendMd5 => TransferMode::SendMd5,
            TransferMode::Receive | TransferMode::ReceiveMd5 => TransferMode::ReceiveMd5,
            TransferMode::SendThrough | TransferMode::SendMd5Through => TransferMode::SendMd5Through,
            TransferMode::ReceiveThrough | TransferMode::ReceiveMd5Through => {
                TransferMode::ReceiveMd5Through
            }
        }
    }

    pub fn has_checksum(self) -> bool {
        self.with_checksum() == self
    }

    pub fn as_str(self) -> &'static str {
        match self {
            TransferMode::Send => "send",
            TransferMode::Receive => "receive",
            TransferMode::SendMd5 => "send_md5",
            TransferMode::ReceiveMd5 => "receive_md5",
            TransferMode::SendThrough => "send_through",
            TransferMode::ReceiveThrough => "receive_through",
            TransferMode::SendMd5Through => "send_md5_through",
            TransferMode::ReceiveMd5Through => "receive_md5_through",
        }
    }
}

impl FromStr for TransferMode {
    type Err = RepositoryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "send" => Ok(TransferMode::Send),
            "receive" => Ok(TransferMode::Receive),
            "send_md5" => Ok(TransferMode::SendMd5),
            "receive_md5" => Ok(TransferMode::ReceiveMd5),
            "send_through" => Ok(TransferMode::SendThrough),
            "receive_through" => Ok(TransferMode::ReceiveThrough),
            "send_md5_through" => Ok(TransferMode::SendMd5Through),
            "receive_md5_through" => Ok(TransferMode::ReceiveMd5Through),
            other => Err(RepositoryError::Serialization(format!("Unknown transfer mode: {}", other))),
        }
    }
}

/// Transfer rule known to the queued-transfer subsystem
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransferRule {
    pub name: String,
    pub mode: TransferMode,
}

/// Identifier allocated by the queued-transfer store
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SpecialId(pub i64);

impl fmt::Display for SpecialId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QueuedTransferState {
    /// Row allocated, not yet visible to the scheduler
    Undefined,
    /// Ready for pickup by the scheduler
    ToSubmit,
}

impl QueuedTransferState {
    pub fn as_str(self) -> &'static str {
        match self {
            QueuedTransferState::Undefined => "undefined",
            QueuedTransferState::ToSubmit => "to_submit",
        }
    }
}

/// Prepared asynchronous transfer.
///
/// `special_id` stays `None` until the store allocates one; after a
/// successful hand-off the descriptor belongs to the store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AsyncTransferDescriptor {
    pub requester: String,
    pub remote_host: String,
    pub rule_name: String,
    pub mode: TransferMode,
    pub filename: String,
    pub block_size: u32,
    pub use_checksum_mode: bool,
    pub no_log: bool,
    pub file_info: String,
    pub special_id: Option<SpecialId>,
    pub created_at: DateTime<Utc>,
}

/// Hand-off failures. Parse errors happen before any store access.
#[derive(Debug, Error)]
pub enum HandoffError {
    #[error("Empty transfer preparation command")]
    EmptyCommand,

    #[error("Mandatory flag {0} is missing")]
    MissingFlag(&'static str),

    #[error("Flag {0} requires a value")]
    MissingValue(&'static str),

    #[error("Invalid block size: {0}")]
    InvalidBlockSize(String),

    #[error("Rule not found: {0}")]
    RuleNotFound(String),

    #[error("Rule lookup failed: {0}")]
    RuleLookup(#[source] RepositoryError),

    #[error("Queued transfer persistence failed: {0}")]
    Persistence(#[source] RepositoryError),
}

impl HandoffError {
    pub fn is_parse_error(&self) -> bool {
        matches!(
            self,
            HandoffError::EmptyCommand
                | HandoffError::MissingFlag(_)
                | HandoffError::MissingValue(_)
                | HandoffError::InvalidBlockSize(_)
        )
    }
}
