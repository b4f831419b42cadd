// Copyright (c) 2026 relaygate contributors
// SPDX-License-Identifier: AGPL-3.0

//! Repository Implementations
//!
//! Infrastructure implementations of the repository traits defined in
//! `crate::domain::repository`.
//!
//! # Available Implementations
//!
//! ## PostgreSQL Repositories
//!
//! - **PostgresRuleRepository** - Transfer rule lookup
//! - **PostgresQueuedTransferRepository** - Queued transfers for the scheduler
//!
//! ## In-Memory Repositories
//!
//! The no-database mode. Queued transfer ids are synthetic: seeded from the
//! clock at construction and handed out by an atomic counter, so concurrent
//! callers never collide.

pub mod postgres_queued_transfer;
pub mod postgres_rule;

use async_trait::async_trait;
use chrono::Utc;
use std::collections::HashMap;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::{Arc, RwLock};

use crate::domain::handoff::{AsyncTransferDescriptor, QueuedTransferState, SpecialId, TransferRule};
use crate::domain::repository::{QueuedTransferRepository, RepositoryError, RuleRepository};

fn poisoned() -> RepositoryError {
    RepositoryError::Database("Lock poisoned".to_string())
}

#[derive(Clone, Default)]
pub struct InMemoryRuleRepository {
    rules: Arc<RwLock<HashMap<String, TransferRule>>>,
}

impl InMemoryRuleRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_rules(rules: impl IntoIterator<Item = TransferRule>) -> Self {
        let rules = rules.into_iter().map(|rule| (rule.name.clone(), rule)).collect();
        Self {
            rules: Arc::new(RwLock::new(rules)),
        }
    }

    pub fn insert(&self, rule: TransferRule) -> Result<(), RepositoryError> {
        let mut rules = self.rules.write().map_err(|_| poisoned())?;
        rules.insert(rule.name.clone(), rule);
        Ok(())
    }
}

#[async_trait]
impl RuleRepository for InMemoryRuleRepository {
    async fn find_by_name(&self, name: &str) -> Result<Option<TransferRule>, RepositoryError> {
        let rules = self.rules.read().map_err(|_| poisoned())?;
        Ok(rules.get(name).cloned())
    }
}

#[derive(Clone)]
pub struct InMemoryQueuedTransferRepository {
    rows: Arc<RwLock<HashMap<SpecialId, (AsyncTransferDescriptor, QueuedTransferState)>>>,
    next_id: Arc<AtomicI64>,
}

impl InMemoryQueuedTransferRepository {
    pub fn new() -> Self {
        Self {
            rows: Arc::new(RwLock::new(HashMap::new())),
            next_id: Arc::new(AtomicI64::new(Utc::now().timestamp_millis())),
        }
    }

    pub fn len(&self) -> usize {
        self.rows.read().map(|rows| rows.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for InMemoryQueuedTransferRepository {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl QueuedTransferRepository for InMemoryQueuedTransferRepository {
    async fn create(&self, descriptor: &AsyncTransferDescriptor) -> Result<SpecialId, RepositoryError> {
        let id = SpecialId(self.next_id.fetch_add(1, Ordering::Relaxed));
        let mut stored = descriptor.clone();
        stored.special_id = Some(id);
        let mut rows = self.rows.write().map_err(|_| poisoned())?;
        rows.insert(id, (stored, QueuedTransferState::Undefined));
        Ok(id)
    }

    async fn mark_state(&self, id: SpecialId, state: QueuedTransferState) -> Result<(), RepositoryError> {
        let mut rows = self.rows.write().map_err(|_| poisoned())?;
        match rows.get_mut(&id) {
            Some(row) => {
                row.1 = state;
                Ok(())
            }
            None => Err(RepositoryError::NotFound(format!("Queued transfer {}", id))),
        }
    }

    async fn delete(&self, id: SpecialId) -> Result<(), RepositoryError> {
        let mut rows = self.rows.write().map_err(|_| poisoned())?;
        rows.remove(&id);
        Ok(())
    }

    async fn find_by_id(
        &self,
        id: SpecialId,
    ) -> Result<Option<(AsyncTransferDescriptor, QueuedTransferState)>, RepositoryError> {
        let rows = self.rows.read().map_err(|_| poisoned())?;
        Ok(rows.get(&id).cloned())
    }
}
