// Copyright (c) 2026 relaygate contributors
// SPDX-License-Identifier: AGPL-3.0
//! Service Factory - Application Layer
//!
//! Builds the hook pipeline from a `GatewayConfigManifest`: repositories for
//! the configured storage backend, the load sampler strategy, and the
//! orchestrator composed from them.
//!
//! # Architecture
//!
//! - **Layer:** Application Layer
//! - **Purpose:** Wiring; keeps the domain free of infrastructure choices

use anyhow::{Context, Result};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::info;

use crate::application::admission::AdmissionController;
use crate::application::async_handoff::AsyncTransferHandoff;
use crate::application::policy_registry::ExecutionPolicyRegistry;
use crate::application::process_executor::ProcessExecutor;
use crate::application::transfer_hooks::TransferHookOrchestrator;
use crate::domain::execution::ProcessLauncher;
use crate::domain::gateway_config::GatewayConfigManifest;
use crate::domain::policy::ExecutionPolicySet;
use crate::domain::repository::{QueuedTransferRepository, RuleRepository, StorageBackend};
use crate::domain::session::AuthenticatedSession;
use crate::infrastructure::connection_tracker::ConnectionTracker;
use crate::infrastructure::db::Database;
use crate::infrastructure::load_sampler::{create_load_sampler, ExternalLoadSampler, RandomJitter};
use crate::infrastructure::process::TokioProcessLauncher;
use crate::infrastructure::repositories::postgres_queued_transfer::PostgresQueuedTransferRepository;
use crate::infrastructure::repositories::postgres_rule::PostgresRuleRepository;
use crate::infrastructure::repositories::{InMemoryQueuedTransferRepository, InMemoryRuleRepository};

/// Creates a RuleRepository implementation based on the configured backend
pub fn create_rule_repository(
    manifest: &GatewayConfigManifest,
    database: Option<&Database>,
) -> Result<Arc<dyn RuleRepository>> {
    match (&manifest.spec.storage, database) {
        (StorageBackend::InMemory, _) => Ok(Arc::new(InMemoryRuleRepository::with_rules(
            manifest.spec.rules.iter().cloned(),
        ))),
        (StorageBackend::Postgres(_), Some(db)) => Ok(Arc::new(PostgresRuleRepository::new(db.get_pool().clone()))),
        (StorageBackend::Postgres(_), None) => anyhow::bail!("PostgreSQL storage selected but no database connection"),
    }
}

/// Creates a QueuedTransferRepository implementation based on the configured backend
pub fn create_queued_transfer_repository(
    backend: &StorageBackend,
    database: Option<&Database>,
) -> Result<Arc<dyn QueuedTransferRepository>> {
    match (backend, database) {
        (StorageBackend::InMemory, _) => Ok(Arc::new(InMemoryQueuedTransferRepository::new())),
        (StorageBackend::Postgres(_), Some(db)) => {
            Ok(Arc::new(PostgresQueuedTransferRepository::new(db.get_pool().clone())))
        }
        (StorageBackend::Postgres(_), None) => anyhow::bail!("PostgreSQL storage selected but no database connection"),
    }
}

/// Everything the protocol engine needs from the hook pipeline
pub struct GatewayServices {
    pub orchestrator: Arc<TransferHookOrchestrator>,
    pub connections: Arc<ConnectionTracker>,
    /// Present when `admission.sampler` is `external`
    pub external_load: Option<Arc<ExternalLoadSampler>>,
    pub queue: Arc<dyn QueuedTransferRepository>,
    pub handoff: Arc<AsyncTransferHandoff>,
    user_policies: HashMap<String, ExecutionPolicySet>,
}

impl GatewayServices {
    /// Build the pipeline with real OS processes
    pub async fn from_manifest(manifest: &GatewayConfigManifest) -> Result<Self> {
        Self::with_launcher(manifest, Arc::new(TokioProcessLauncher::new())).await
    }

    pub async fn with_launcher(manifest: &GatewayConfigManifest, launcher: Arc<dyn ProcessLauncher>) -> Result<Self> {
        manifest.validate().context("Invalid gateway configuration")?;

        let database = match &manifest.spec.storage {
            StorageBackend::Postgres(config) => Some(Database::connect(config).await?),
            StorageBackend::InMemory => None,
        };
        let rules = create_rule_repository(manifest, database.as_ref())?;
        let queue = create_queued_transfer_repository(&manifest.spec.storage, database.as_ref())?;

        let policies = Arc::new(ExecutionPolicyRegistry::new(manifest.spec.execution.policies()?));
        let user_policies = manifest.user_policies()?;

        let connections = Arc::new(ConnectionTracker::new());
        let (load_sampler, external_load) = create_load_sampler(manifest.spec.admission.sampler);
        let admission = Arc::new(AdmissionController::new(
            manifest.spec.admission.clone(),
            load_sampler,
            connections.clone(),
            Arc::new(RandomJitter),
        ));

        let executor = Arc::new(ProcessExecutor::new(launcher, manifest.spec.execution.spawn_retry_delay));
        let handoff = Arc::new(AsyncTransferHandoff::new(
            rules,
            queue.clone(),
            manifest.spec.host.id.clone(),
            manifest.spec.host.default_block_size,
        ));

        info!(
            host = %manifest.spec.host.id,
            sampler = ?manifest.spec.admission.sampler,
            users = user_policies.len(),
            "Transfer hook pipeline ready"
        );

        Ok(Self {
            orchestrator: Arc::new(TransferHookOrchestrator::new(policies, admission, executor, handoff.clone())),
            connections,
            external_load,
            queue,
            handoff,
            user_policies,
        })
    }

    /// Session identity for a user that just authenticated, carrying the
    /// user's configured overrides
    pub fn session_for(
        &self,
        manifest: &GatewayConfigManifest,
        user: &str,
        base_directory: impl Into<String>,
    ) -> AuthenticatedSession {
        let config = manifest.spec.users.get(user);
        let account = config
            .and_then(|c| c.account.clone())
            .unwrap_or_else(|| user.to_string());
        let mut session = AuthenticatedSession::new(user, account, base_directory)
            .with_admin(config.map(|c| c.admin).unwrap_or(false));
        if let Some(policies) = self.user_policies.get(user) {
            session = session.with_policies(policies.clone());
        }
        session
    }
}
