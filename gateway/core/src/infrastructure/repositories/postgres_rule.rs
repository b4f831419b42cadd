// Copyright (c) 2026 relaygate contributors
// SPDX-License-Identifier: AGPL-3.0
//! Postgres Rule
//!
//! Read-only lookup of transfer rules in the `rules` table.
//!
//! # Architecture
//!
//! - **Layer:** Infrastructure Layer
//! - **Purpose:** Implements `RuleRepository` over PostgreSQL

use async_trait::async_trait;
use sqlx::postgres::PgPool;
use sqlx::Row;

use crate::domain::handoff::{TransferMode, TransferRule};
use crate::domain::repository::{RepositoryError, RuleRepository};

pub struct PostgresRuleRepository {
    pool: PgPool,
}

impl PostgresRuleRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl RuleRepository for PostgresRuleRepository {
    async fn find_by_name(&self, name: &str) -> Result<Option<TransferRule>, RepositoryError> {
        let row = sqlx::query(
            r#"
            SELECT name, mode
            FROM rules
            WHERE name = $1
            "#,
        )
        .bind(name)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| RepositoryError::Database(format!("Failed to look up rule {}: {}", name, e)))?;

        match row {
            Some(row) => {
                let name: String = row.try_get("name")?;
                let mode: String = row.try_get("mode")?;
                Ok(Some(TransferRule {
                    name,
                    mode: mode.parse::<TransferMode>()?,
                }))
            }
            None => Ok(None),
        }
    }
}
