// Copyright (c) 2026 relaygate contributors
// SPDX-License-Identifier: AGPL-3.0
//! Transfer Hook Orchestrator
//!
//! Entry points the protocol engine calls around transfer commands. A session
//! task awaits each hook before it acknowledges the command, so hooks act as
//! gates, never as background work.
//!
//! # Flow
//!
//! ```text
//! before_command: admin? -> special? -> admission -> policy -> action -> Proceed
//! after_transfer: succeeded? -> store policy -> action -> Completed / anomaly
//! ```
//!
//! # Architecture
//!
//! - **Layer:** Application Layer
//! - **Purpose:** Composes admission, policies, executor and hand-off

use std::io;
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::application::admission::AdmissionController;
use crate::application::async_handoff::AsyncTransferHandoff;
use crate::application::policy_registry::ExecutionPolicyRegistry;
use crate::application::process_executor::ProcessExecutor;
use crate::domain::execution::{ExecutionError, ProcessExecutionResult};
use crate::domain::handoff::AsyncTransferDescriptor;
use crate::domain::hook::{HookError, PostTransferOutcome, PreCommandOutcome};
use crate::domain::policy::{Disposition, ExecutionPolicy};
use crate::domain::session::SessionIdentity;
use crate::domain::template::TemplateExpander;
use crate::domain::transfer::{Direction, OperationCode, ProtocolCommand, TransferContext};

pub struct TransferHookOrchestrator {
    policies: Arc<ExecutionPolicyRegistry>,
    admission: Arc<AdmissionController>,
    executor: Arc<ProcessExecutor>,
    handoff: Arc<AsyncTransferHandoff>,
}

impl TransferHookOrchestrator {
    pub fn new(
        policies: Arc<ExecutionPolicyRegistry>,
        admission: Arc<AdmissionController>,
        executor: Arc<ProcessExecutor>,
        handoff: Arc<AsyncTransferHandoff>,
    ) -> Self {
        Self {
            policies,
            admission,
            executor,
            handoff,
        }
    }

    pub fn policies(&self) -> &ExecutionPolicyRegistry {
        &self.policies
    }

    pub fn admission(&self) -> &AdmissionController {
        &self.admission
    }

    /// Gate a command before it executes. An `Err` means the command must be
    /// rejected with the error's reply code.
    pub async fn before_command(
        &self,
        session: &dyn SessionIdentity,
        command: &ProtocolCommand,
        relative_path: &str,
    ) -> Result<PreCommandOutcome, HookError> {
        if session.is_admin() {
            debug!(user = session.user(), command = command.name(), "Administrative session, hooks bypassed");
            return Ok(PreCommandOutcome::Proceed);
        }
        if command.is_special() {
            return Ok(PreCommandOutcome::Proceed);
        }

        self.admit(session, command).await?;

        let Some(operation) = command.operation_code() else {
            return Ok(PreCommandOutcome::Proceed);
        };
        let direction = operation.direction();
        let policy = self.policies.resolve(session.execution_policies(), direction);

        if policy.is_refused() {
            info!(user = session.user(), %direction, file = relative_path, "Operation refused by policy");
            return Err(HookError::PolicyRefusal {
                user: session.user().to_string(),
                direction,
            });
        }

        // Store actions run once the bytes have arrived
        if direction == Direction::Store {
            return Ok(PreCommandOutcome::Proceed);
        }

        if matches!(policy.disposition, Disposition::Refuse | Disposition::None) {
            return Ok(PreCommandOutcome::Proceed);
        }
        let context = transfer_context(session, relative_path, operation)?;
        match policy.disposition {
            Disposition::RunCommand => {
                let result = self.run_action(&policy, &context).await?;
                Ok(PreCommandOutcome::ProceedAfterAction(result))
            }
            Disposition::EnqueueAsyncTransfer => {
                let descriptor = self.enqueue(&policy, &context).await?;
                Ok(PreCommandOutcome::Enqueued(descriptor))
            }
            Disposition::Refuse | Disposition::None => Ok(PreCommandOutcome::Proceed),
        }
    }

    /// Post-process a finished transfer. Failures here are anomalies attached
    /// to a transfer that already completed; nothing is rolled back.
    pub async fn after_transfer(
        &self,
        session: &dyn SessionIdentity,
        operation: OperationCode,
        relative_path: &str,
        transfer_succeeded: bool,
    ) -> PostTransferOutcome {
        if !transfer_succeeded {
            debug!(user = session.user(), %operation, file = relative_path, "Transfer failed, post action skipped");
            return PostTransferOutcome::Skipped;
        }
        if session.is_admin() || operation.direction() == Direction::Retrieve {
            return PostTransferOutcome::Completed;
        }

        let policy = self.policies.resolve(session.execution_policies(), Direction::Store);
        if matches!(policy.disposition, Disposition::Refuse | Disposition::None) {
            return PostTransferOutcome::Completed;
        }

        let outcome = match transfer_context(session, relative_path, operation) {
            Ok(context) => self.store_action(&policy, &context).await,
            Err(err) => Err(err),
        };

        outcome.unwrap_or_else(|err| {
            warn!(
                user = session.user(),
                %operation,
                file = relative_path,
                error = %err,
                "Transfer completed but post action failed"
            );
            PostTransferOutcome::CompletedWithAnomaly(err)
        })
    }

    async fn store_action(
        &self,
        policy: &ExecutionPolicy,
        context: &TransferContext,
    ) -> Result<PostTransferOutcome, HookError> {
        match policy.disposition {
            Disposition::RunCommand => {
                self.check_readable(context).await?;
                self.run_action(policy, context).await.map(PostTransferOutcome::ActionSucceeded)
            }
            Disposition::EnqueueAsyncTransfer => self.enqueue(policy, context).await.map(PostTransferOutcome::Enqueued),
            Disposition::Refuse | Disposition::None => Ok(PostTransferOutcome::Completed),
        }
    }

    async fn admit(&self, session: &dyn SessionIdentity, command: &ProtocolCommand) -> Result<(), HookError> {
        let attempts = self.admission.limits().attempts.max(1);
        for attempt in 0..attempts {
            if !self.admission.check_overloaded_with_backoff(attempt).await {
                return Ok(());
            }
        }
        warn!(user = session.user(), command = command.name(), attempts, "Command rejected, server overloaded");
        Err(HookError::AdmissionRejected { attempts })
    }

    async fn run_action(
        &self,
        policy: &ExecutionPolicy,
        context: &TransferContext,
    ) -> Result<ProcessExecutionResult, HookError> {
        let command_line = TemplateExpander::expand(&policy.command_template, context);
        let result = self.executor.run(&command_line, policy.timeout).await;
        if result.is_success() {
            return Ok(result);
        }
        Err(match result.cause {
            Some(cause) => cause.into(),
            None => ExecutionError::NonZeroExit {
                program: command_line,
                code: None,
            }
            .into(),
        })
    }

    async fn enqueue(
        &self,
        policy: &ExecutionPolicy,
        context: &TransferContext,
    ) -> Result<AsyncTransferDescriptor, HookError> {
        let command_line = TemplateExpander::expand(&policy.command_template, context);
        Ok(self.handoff.prepare(&command_line).await?)
    }

    async fn check_readable(&self, context: &TransferContext) -> Result<(), HookError> {
        let path = context.local_path();
        let unavailable = |source: io::Error| HookError::FileUnavailable {
            path: path.clone(),
            source,
        };
        let file = tokio::fs::File::open(&path).await.map_err(unavailable)?;
        let metadata = file.metadata().await.map_err(unavailable)?;
        if !metadata.is_file() {
            return Err(unavailable(io::Error::new(io::ErrorKind::InvalidInput, "not a regular file")));
        }
        Ok(())
    }
}

/// Context for template expansion. Values carrying a marker would never
/// finish expanding, so they are rejected here.
fn transfer_context(
    session: &dyn SessionIdentity,
    relative_path: &str,
    operation: OperationCode,
) -> Result<TransferContext, HookError> {
    let context = TransferContext::new(
        session.user(),
        session.account(),
        session.base_directory(),
        relative_path,
        operation,
    );
    match TemplateExpander::field_with_marker(&context) {
        Some(field) => {
            warn!(user = session.user(), %operation, file = relative_path, field, "Template marker in transfer context");
            Err(HookError::UnsafeContext { field })
        }
        None => Ok(context),
    }
}
