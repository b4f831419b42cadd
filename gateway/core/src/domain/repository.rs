// Copyright (c) 2026 relaygate contributors
// SPDX-License-Identifier: AGPL-3.0
//! # Domain Repository Interfaces
//!
//! Persistence contracts the hook pipeline needs, implemented in
//! `crate::infrastructure::repositories`.
//!
//! | Trait | Entity | Implementations |
//! |-------|--------|----------------|
//! | `RuleRepository` | `TransferRule` | `InMemoryRuleRepository`, `PostgresRuleRepository` |
//! | `QueuedTransferRepository` | `AsyncTransferDescriptor` | `InMemoryQueuedTransferRepository`, `PostgresQueuedTransferRepository` |
//!
//! In-memory implementations back the no-database mode; PostgreSQL is used
//! when `spec.storage` selects it.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::domain::handoff::{AsyncTransferDescriptor, QueuedTransferState, SpecialId, TransferRule};

/// Storage backend enum for pluggable persistence
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "backend", rename_all = "snake_case")]
pub enum StorageBackend {
    InMemory,
    Postgres(PostgresConfig),
}

impl Default for StorageBackend {
    fn default() -> Self {
        StorageBackend::InMemory
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PostgresConfig {
    pub connection_string: String,
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
}

fn default_max_connections() -> u32 {
    5
}

/// Lookup of transfer rules by name
#[async_trait]
pub trait RuleRepository: Send + Sync {
    async fn find_by_name(&self, name: &str) -> Result<Option<TransferRule>, RepositoryError>;
}

/// Store of queued asynchronous transfers.
///
/// Implementations must hand out unique ids under concurrent callers.
#[async_trait]
pub trait QueuedTransferRepository: Send + Sync {
    /// Allocate an id and write the descriptor in state `Undefined`
    async fn create(&self, descriptor: &AsyncTransferDescriptor) -> Result<SpecialId, RepositoryError>;

    async fn mark_state(&self, id: SpecialId, state: QueuedTransferState) -> Result<(), RepositoryError>;

    /// Remove a row; used to roll back a hand-off that could not complete
    async fn delete(&self, id: SpecialId) -> Result<(), RepositoryError>;

    async fn find_by_id(
        &self,
        id: SpecialId,
    ) -> Result<Option<(AsyncTransferDescriptor, QueuedTransferState)>, RepositoryError>;
}

/// Repository errors
#[derive(Debug, thiserror::Error)]
pub enum RepositoryError {
    #[error("Entity not found: {0}")]
    NotFound(String),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl From<sqlx::Error> for RepositoryError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::RowNotFound => RepositoryError::NotFound("Row not found".to_string()),
            _ => RepositoryError::Database(err.to_string()),
        }
    }
}
