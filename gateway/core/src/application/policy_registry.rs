// Copyright (c) 2026 relaygate contributors
// SPDX-License-Identifier: AGPL-3.0
//! Execution Policy Registry
//!
//! Holds the global store/retrieve policies and resolves the effective
//! policy for a session. A user policy wins for a direction unless its
//! disposition is `None`.
//!
//! # Architecture
//!
//! - **Layer:** Application Layer
//! - **Purpose:** Owns global policy state; reconfiguration is an explicit call

use parking_lot::RwLock;
use std::time::Duration;
use tracing::info;

use crate::domain::policy::{Disposition, ExecutionPolicy, ExecutionPolicySet, PolicyError};
use crate::domain::transfer::Direction;

pub struct ExecutionPolicyRegistry {
    global: RwLock<ExecutionPolicySet>,
}

impl ExecutionPolicyRegistry {
    pub fn new(global: ExecutionPolicySet) -> Self {
        Self {
            global: RwLock::new(global),
        }
    }

    /// Replace the global policies. On a malformed specification the
    /// previous policies stay in place.
    pub fn configure(
        &self,
        store_spec: &str,
        store_timeout: Duration,
        retrieve_spec: &str,
        retrieve_timeout: Duration,
    ) -> Result<(), PolicyError> {
        let policies = ExecutionPolicySet::parse(store_spec, store_timeout, retrieve_spec, retrieve_timeout)?;
        info!(
            store = ?policies.store.disposition,
            retrieve = ?policies.retrieve.disposition,
            "Global execution policies configured"
        );
        *self.global.write() = policies;
        Ok(())
    }

    pub fn global(&self) -> ExecutionPolicySet {
        self.global.read().clone()
    }

    pub fn resolve(&self, user: Option<&ExecutionPolicySet>, direction: Direction) -> ExecutionPolicy {
        if let Some(user_policy) = user.map(|policies| policies.for_direction(direction)) {
            if user_policy.disposition != Disposition::None {
                return user_policy.clone();
            }
        }
        self.global.read().for_direction(direction).clone()
    }

    pub fn is_allowed(&self, user: Option<&ExecutionPolicySet>, direction: Direction) -> bool {
        !self.resolve(user, direction).is_refused()
    }
}

impl Default for ExecutionPolicyRegistry {
    fn default() -> Self {
        Self::new(ExecutionPolicySet::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TIMEOUT: Duration = Duration::from_secs(10);

    fn registry() -> ExecutionPolicyRegistry {
        let registry = ExecutionPolicyRegistry::default();
        registry
            .configure("EXECUTE /opt/store.sh #FILE#", TIMEOUT, "EXECUTE /opt/retr.sh #FILE#", TIMEOUT)
            .unwrap();
        registry
    }

    #[test]
    fn test_configure_then_resolve_each_keyword() {
        let registry = ExecutionPolicyRegistry::default();
        let cases = [
            ("REFUSED", Disposition::Refuse, ""),
            ("EXECUTE /bin/scan #FILE#", Disposition::RunCommand, "/bin/scan #FILE#"),
            ("R66PREPARETRANSFER -to h -rule r -file #FILE#", Disposition::EnqueueAsyncTransfer, "-to h -rule r -file #FILE#"),
            ("NONE", Disposition::None, ""),
        ];
        for (spec, disposition, template) in cases {
            registry.configure(spec, TIMEOUT, spec, TIMEOUT).unwrap();
            for direction in [Direction::Store, Direction::Retrieve] {
                let policy = registry.resolve(None, direction);
                assert_eq!(policy.disposition, disposition, "spec {}", spec);
                assert_eq!(policy.command_template, template, "spec {}", spec);
            }
        }
    }

    #[test]
    fn test_user_refusal_overrides_global_command() {
        let registry = registry();
        let user = ExecutionPolicySet {
            store: ExecutionPolicy::none(),
            retrieve: ExecutionPolicy::refuse(),
        };

        let resolved = registry.resolve(Some(&user), Direction::Retrieve);
        assert_eq!(resolved.disposition, Disposition::Refuse);
        assert!(!registry.is_allowed(Some(&user), Direction::Retrieve));
    }

    #[test]
    fn test_user_none_defers_to_global() {
        let registry = registry();
        let user = ExecutionPolicySet::default();

        let resolved = registry.resolve(Some(&user), Direction::Store);
        assert_eq!(resolved.disposition, Disposition::RunCommand);
        assert_eq!(resolved.command_template, "/opt/store.sh #FILE#");
        assert!(registry.is_allowed(Some(&user), Direction::Store));
    }

    #[test]
    fn test_failed_reconfiguration_keeps_previous_policies() {
        let registry = registry();
        assert!(registry.configure("EXECUTE", TIMEOUT, "REFUSED", TIMEOUT).is_err());
        assert_eq!(registry.resolve(None, Direction::Retrieve).disposition, Disposition::RunCommand);
    }
}
