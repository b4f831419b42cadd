// Copyright (c) 2026 relaygate contributors
// SPDX-License-Identifier: AGPL-3.0
//! Postgres Queued Transfer
//!
//! Rows of `queued_transfers` are picked up by the external scheduler once
//! their state is `to_submit`. Ids come from the table's `BIGSERIAL`, which
//! serializes allocation across gateways.
//!
//! # Architecture
//!
//! - **Layer:** Infrastructure Layer
//! - **Purpose:** Implements `QueuedTransferRepository` over PostgreSQL

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::{PgPool, PgRow};
use sqlx::Row;

use crate::domain::handoff::{AsyncTransferDescriptor, QueuedTransferState, SpecialId, TransferMode};
use crate::domain::repository::{QueuedTransferRepository, RepositoryError};

pub struct PostgresQueuedTransferRepository {
    pool: PgPool,
}

impl PostgresQueuedTransferRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl QueuedTransferRepository for PostgresQueuedTransferRepository {
    async fn create(&self, descriptor: &AsyncTransferDescriptor) -> Result<SpecialId, RepositoryError> {
        let block_size = block_size_column(descriptor.block_size)?;
        let row = sqlx::query(
            r#"
            INSERT INTO queued_transfers (
                requester, requested, rule_name, mode, filename,
                block_size, file_info, no_log, state, created_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            RETURNING id
            "#,
        )
        .bind(&descriptor.requester)
        .bind(&descriptor.remote_host)
        .bind(&descriptor.rule_name)
        .bind(descriptor.mode.as_str())
        .bind(&descriptor.filename)
        .bind(block_size)
        .bind(&descriptor.file_info)
        .bind(descriptor.no_log)
        .bind(QueuedTransferState::Undefined.as_str())
        .bind(descriptor.created_at)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| RepositoryError::Database(format!("Failed to create queued transfer: {}", e)))?;

        let id: i64 = row.try_get("id")?;
        Ok(SpecialId(id))
    }

    async fn mark_state(&self, id: SpecialId, state: QueuedTransferState) -> Result<(), RepositoryError> {
        let result = sqlx::query("UPDATE queued_transfers SET state = $2 WHERE id = $1")
            .bind(id.0)
            .bind(state.as_str())
            .execute(&self.pool)
            .await
            .map_err(|e| RepositoryError::Database(format!("Failed to update queued transfer {}: {}", id, e)))?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound(format!("Queued transfer {}", id)));
        }
        Ok(())
    }

    async fn delete(&self, id: SpecialId) -> Result<(), RepositoryError> {
        sqlx::query("DELETE FROM queued_transfers WHERE id = $1")
            .bind(id.0)
            .execute(&self.pool)
            .await
            .map_err(|e| RepositoryError::Database(format!("Failed to delete queued transfer {}: {}", id, e)))?;
        Ok(())
    }

    async fn find_by_id(
        &self,
        id: SpecialId,
    ) -> Result<Option<(AsyncTransferDescriptor, QueuedTransferState)>, RepositoryError> {
        let row = sqlx::query(
            r#"
            SELECT
                id, requester, requested, rule_name, mode, filename,
                block_size, file_info, no_log, state, created_at
            FROM queued_transfers
            WHERE id = $1
            "#,
        )
        .bind(id.0)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| RepositoryError::Database(e.to_string()))?;

        row.map(parse_queued_transfer_row).transpose()
    }
}

fn parse_queued_transfer_row(row: PgRow) -> Result<(AsyncTransferDescriptor, QueuedTransferState), RepositoryError> {
    let id: i64 = row.try_get("id")?;
    let mode: String = row.try_get("mode")?;
    let block_size: i32 = row.try_get("block_size")?;
    let file_info: String = row.try_get("file_info")?;
    let state: String = row.try_get("state")?;
    let created_at: DateTime<Utc> = row.try_get("created_at")?;

    let state = match state.as_str() {
        "undefined" => QueuedTransferState::Undefined,
        "to_submit" => QueuedTransferState::ToSubmit,
        other => {
            return Err(RepositoryError::Serialization(format!("Unknown queued transfer state: {}", other)));
        }
    };
    let block_size = u32::try_from(block_size)
        .map_err(|_| RepositoryError::Serialization(format!("Negative block size: {}", block_size)))?;
    let mode = mode.parse::<TransferMode>()?;

    let descriptor = AsyncTransferDescriptor {
        requester: row.try_get("requester")?,
        remote_host: row.try_get("requested")?,
        rule_name: row.try_get("rule_name")?,
        mode,
        filename: row.try_get("filename")?,
        block_size,
        use_checksum_mode: mode.has_checksum(),
        no_log: row.try_get("no_log")?,
        file_info,
        special_id: Some(SpecialId(id)),
        created_at,
    };
    Ok((descriptor, state))
}

fn block_size_column(block_size: u32) -> Result<i32, RepositoryError> {
    i32::try_from(block_size)
        .map_err(|_| RepositoryError::Serialization(format!("Block size out of range: {}", block_size)))
}
