// Copyright (c) 2026 relaygate contributors
// SPDX-License-Identifier: AGPL-3.0
//! Admission Control Contracts
//!
//! Limits and the read-only samplers the admission controller consults.
//! Samplers are supplied by the surrounding process and selected once at
//! startup.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Current host load as a fraction in `[0, 1]`
pub trait LoadSampler: Send + Sync {
    fn current_load(&self) -> f64;
}

/// Live connection counts of the gateway
pub trait ConnectionCounter: Send + Sync {
    fn network_connections(&self) -> u64;
    fn local_sessions(&self) -> u64;
}

/// Uniform random values in `[0, 1)` used to spread backoff sleeps
pub trait JitterSource: Send + Sync {
    fn next_unit(&self) -> f64;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SamplerKind {
    /// Host load average read from the operating system
    #[default]
    Native,
    /// Value pushed by an external monitor
    External,
    /// Always reports zero load
    None,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AdmissionLimits {
    /// CPU limit fraction; `0` or `1` disables the CPU check
    #[serde(default)]
    pub cpu_limit: f64,

    /// Connection limit; `0` disables the connection check
    #[serde(default)]
    pub connection_limit: u64,

    /// Minimum interval between two load samples
    #[serde(default = "default_min_recheck_interval", with = "humantime_serde")]
    pub min_recheck_interval: Duration,

    /// Connection timeout the overload sleep is derived from
    #[serde(default = "default_connection_timeout", with = "humantime_serde")]
    pub connection_timeout: Duration,

    /// Backoff rounds before an overloaded command is rejected
    #[serde(default = "default_attempts")]
    pub attempts: u32,

    #[serde(default)]
    pub sampler: SamplerKind,
}

impl AdmissionLimits {
    pub fn cpu_check_enabled(&self) -> bool {
        self.cpu_limit > 0.0 && self.cpu_limit < 1.0
    }

    pub fn connection_check_enabled(&self) -> bool {
        self.connection_limit > 0
    }
}

impl Default for AdmissionLimits {
    fn default() -> Self {
        Self {
            cpu_limit: 0.0,
            connection_limit: 0,
            min_recheck_interval: default_min_recheck_interval(),
            connection_timeout: default_connection_timeout(),
            attempts: default_attempts(),
            sampler: SamplerKind::default(),
        }
    }
}

fn default_min_recheck_interval() -> Duration {
    Duration::from_secs(1)
}

fn default_connection_timeout() -> Duration {
    Duration::from_secs(30)
}

fn default_attempts() -> u32 {
    2
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cpu_limit_bounds_disable_check() {
        let mut limits = AdmissionLimits::default();
        assert!(!limits.cpu_check_enabled());
        limits.cpu_limit = 1.0;
        assert!(!limits.cpu_check_enabled());
        limits.cpu_limit = 0.8;
        assert!(limits.cpu_check_enabled());
    }

    #[test]
    fn test_connection_limit_zero_disables_check() {
        let mut limits = AdmissionLimits::default();
        assert!(!limits.connection_check_enabled());
        limits.connection_limit = 100;
        assert!(limits.connection_check_enabled());
    }
}
