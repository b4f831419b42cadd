// Copyright (c) 2026 relaygate contributors
// SPDX-License-Identifier: AGPL-3.0
//! Session Identity
//!
//! What the hook pipeline needs to know about the authenticated principal of
//! a protocol session. Credential storage and validation live elsewhere.

use crate::domain::policy::ExecutionPolicySet;

pub trait SessionIdentity: Send + Sync {
    fn user(&self) -> &str;
    fn account(&self) -> &str;
    fn base_directory(&self) -> &str;

    /// Administrative principals bypass admission control and policies
    fn is_admin(&self) -> bool;

    /// Per-user policy attached at login, if any
    fn execution_policies(&self) -> Option<&ExecutionPolicySet>;
}

/// Identity of an authenticated session, fixed for the session's lifetime
#[derive(Debug, Clone)]
pub struct AuthenticatedSession {
    user: String,
    account: String,
    base_directory: String,
    admin: bool,
    policies: Option<ExecutionPolicySet>,
}

impl AuthenticatedSession {
    pub fn new(user: impl Into<String>, account: impl Into<String>, base_directory: impl Into<String>) -> Self {
        Self {
            user: user.into(),
            account: account.into(),
            base_directory: base_directory.into(),
            admin: false,
            policies: None,
        }
    }

    pub fn with_admin(mut self, admin: bool) -> Self {
        self.admin = admin;
        self
    }

    pub fn with_policies(mut self, policies: ExecutionPolicySet) -> Self {
        self.policies = Some(policies);
        self
    }
}

impl SessionIdentity for AuthenticatedSession {
    fn user(&self) -> &str {
        &self.user
    }

    fn account(&self) -> &str {
        &self.account
    }

    fn base_directory(&self) -> &str {
        &self.base_directory
    }

    fn is_admin(&self) -> bool {
        self.admin
    }

    fn execution_policies(&self) -> Option<&ExecutionPolicySet> {
        self.policies.as_ref()
    }
}
