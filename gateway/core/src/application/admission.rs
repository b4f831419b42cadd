// Copyright (c) 2026 relaygate contributors
// SPDX-License-Identifier: AGPL-3.0
//! Admission Controller
//!
//! Decides whether a new protocol operation may proceed given host load and
//! connection pressure. One controller is shared by every session.
//!
//! # Algorithm
//!
//! - CPU: a fresh load sample is skipped while the previous one is younger
//!   than half the minimum recheck interval and was within the limit.
//! - Connections: network connections and local sessions are each compared
//!   against the connection limit.
//! - Backoff: a stale over-limit sample costs a jittered sleep proportional
//!   to the load and the attempt index before re-checking; a confirmed
//!   overload costs a further sleep derived from the connection timeout.
//!
//! Concurrent sessions may race on the cached sample; a slightly stale read
//! is acceptable, the hysteresis window already tolerates it.

use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, warn};

use crate::domain::admission::{AdmissionLimits, ConnectionCounter, JitterSource, LoadSampler};

const MIN_OVERLOAD_SLEEP: Duration = Duration::from_millis(1);

#[derive(Debug, Clone, Copy)]
struct LoadSample {
    load: f64,
    taken_at: Instant,
}

pub struct AdmissionController {
    limits: AdmissionLimits,
    load_sampler: Arc<dyn LoadSampler>,
    connections: Arc<dyn ConnectionCounter>,
    jitter: Arc<dyn JitterSource>,
    last_sample: Mutex<Option<LoadSample>>,
}

impl AdmissionController {
    pub fn new(
        limits: AdmissionLimits,
        load_sampler: Arc<dyn LoadSampler>,
        connections: Arc<dyn ConnectionCounter>,
        jitter: Arc<dyn JitterSource>,
    ) -> Self {
        Self {
            limits,
            load_sampler,
            connections,
            jitter,
            last_sample: Mutex::new(None),
        }
    }

    pub fn limits(&self) -> &AdmissionLimits {
        &self.limits
    }

    /// Last load sample taken, if any
    pub fn last_load(&self) -> Option<f64> {
        self.last_sample.lock().map(|sample| sample.load)
    }

    /// Non-blocking overload check. May refresh the cached load sample.
    pub fn check_overloaded(&self) -> bool {
        if self.limits.cpu_check_enabled() && self.cpu_overloaded() {
            return true;
        }

        if self.limits.connection_check_enabled() {
            let limit = self.limits.connection_limit;

            let network = self.connections.network_connections();
            if network > limit {
                warn!(network, limit, "Network connection limit exceeded");
                return true;
            }

            let local = self.connections.local_sessions();
            if local > limit {
                warn!(local, limit, "Local session limit exceeded");
                return true;
            }
        }

        false
    }

    /// Overload check with backoff; sleeps the calling task while the host
    /// is overloaded. `attempt` is zero-based.
    ///
    /// A fresh within-limit CPU sample skips the pre-check sleep but does not
    /// return early: the connection counters are still read through
    /// [`Self::check_overloaded`], so connection pressure is never masked.
    pub async fn check_overloaded_with_backoff(&self, attempt: u32) -> bool {
        let factor = attempt.saturating_add(1);

        if self.limits.cpu_check_enabled() {
            let base_delay = self.base_delay();
            let previous = *self.last_sample.lock();
            if let Some(sample) = previous {
                if sample.load > self.limits.cpu_limit && sample.taken_at.elapsed() >= base_delay {
                    let pause = base_delay
                        .mul_f64(sample.load.clamp(0.0, 1.0) * f64::from(factor) * self.jitter.next_unit());
                    debug!(attempt, load = sample.load, pause_ms = pause.as_millis() as u64, "Load backoff before re-check");
                    tokio::time::sleep(pause).await;
                }
            }
        }

        if !self.check_overloaded() {
            return false;
        }

        let pause = self.overload_sleep() * factor;
        debug!(attempt, pause_ms = pause.as_millis() as u64, "Still overloaded, backing off");
        tokio::time::sleep(pause).await;
        true
    }

    fn base_delay(&self) -> Duration {
        self.limits.min_recheck_interval / 2
    }

    fn overload_sleep(&self) -> Duration {
        (self.limits.connection_timeout / 2)
            .mul_f64(self.jitter.next_unit())
            .max(MIN_OVERLOAD_SLEEP)
    }

    fn cpu_overloaded(&self) -> bool {
        let now = Instant::now();
        let previous = *self.last_sample.lock();
        if let Some(sample) = previous {
            if now.duration_since(sample.taken_at) < self.base_delay() && sample.load <= self.limits.cpu_limit {
                return false;
            }
        }

        let load = self.load_sampler.current_load();
        *self.last_sample.lock() = Some(LoadSample { load, taken_at: now });

        if load > self.limits.cpu_limit {
            warn!(load, limit = self.limits.cpu_limit, "CPU limit exceeded");
            return true;
        }
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};

    struct CountingSampler {
        load: Mutex<f64>,
        calls: AtomicUsize,
    }

    impl CountingSampler {
        fn new(load: f64) -> Arc<Self> {
            Arc::new(Self { load: Mutex::new(load), calls: AtomicUsize::new(0) })
        }

        fn set(&self, load: f64) {
            *self.load.lock() = load;
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    impl LoadSampler for CountingSampler {
        fn current_load(&self) -> f64 {
            self.calls.fetch_add(1, Ordering::SeqCst);
            *self.load.lock()
        }
    }

    #[derive(Default)]
    struct FixedConnections {
        network: AtomicU64,
        local: AtomicU64,
    }

    impl ConnectionCounter for FixedConnections {
        fn network_connections(&self) -> u64 {
            self.network.load(Ordering::SeqCst)
        }

        fn local_sessions(&self) -> u64 {
            self.local.load(Ordering::SeqCst)
        }
    }

    struct FixedJitter(f64);

    impl JitterSource for FixedJitter {
        fn next_unit(&self) -> f64 {
            self.0
        }
    }

    fn limits(cpu_limit: f64, connection_limit: u64) -> AdmissionLimits {
        AdmissionLimits {
            cpu_limit,
            connection_limit,
            min_recheck_interval: Duration::from_secs(2),
            connection_timeout: Duration::from_secs(10),
            ..Default::default()
        }
    }

    fn controller(
        limits: AdmissionLimits,
        sampler: Arc<CountingSampler>,
        connections: Arc<FixedConnections>,
    ) -> AdmissionController {
        AdmissionController::new(limits, sampler, connections, Arc::new(FixedJitter(0.5)))
    }

    #[tokio::test(start_paused = true)]
    async fn test_hysteresis_skips_resample_within_window() {
        let sampler = CountingSampler::new(0.3);
        let admission = controller(limits(0.8, 0), sampler.clone(), Arc::default());

        assert!(!admission.check_overloaded());
        tokio::time::advance(Duration::from_millis(500)).await;
        assert!(!admission.check_overloaded());
        assert_eq!(sampler.calls(), 1);

        // Past half the recheck interval a fresh sample is taken
        tokio::time::advance(Duration::from_millis(600)).await;
        assert!(!admission.check_overloaded());
        assert_eq!(sampler.calls(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_over_limit_sample_is_always_refreshed() {
        let sampler = CountingSampler::new(0.95);
        let admission = controller(limits(0.8, 0), sampler.clone(), Arc::default());

        assert!(admission.check_overloaded());
        assert!(admission.check_overloaded());
        assert_eq!(sampler.calls(), 2);

        sampler.set(0.2);
        assert!(!admission.check_overloaded());
        assert_eq!(admission.last_load(), Some(0.2));
    }

    #[tokio::test(start_paused = true)]
    async fn test_disabled_cpu_limit_never_samples() {
        for cpu_limit in [0.0, 1.0] {
            let sampler = CountingSampler::new(1.0);
            let admission = controller(limits(cpu_limit, 0), sampler.clone(), Arc::default());
            assert!(!admission.check_overloaded());
            assert_eq!(sampler.calls(), 0);
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_connection_limits_checked_independently() {
        let connections = Arc::new(FixedConnections::default());
        let admission = controller(limits(0.0, 10), CountingSampler::new(0.0), connections.clone());

        connections.network.store(10, Ordering::SeqCst);
        connections.local.store(10, Ordering::SeqCst);
        assert!(!admission.check_overloaded());

        connections.network.store(11, Ordering::SeqCst);
        assert!(admission.check_overloaded());

        connections.network.store(0, Ordering::SeqCst);
        connections.local.store(11, Ordering::SeqCst);
        assert!(admission.check_overloaded());
    }

    #[tokio::test(start_paused = true)]
    async fn test_backoff_within_limit_does_not_sleep() {
        let admission = controller(limits(0.8, 0), CountingSampler::new(0.1), Arc::default());

        let start = Instant::now();
        assert!(!admission.check_overloaded_with_backoff(3).await);
        assert_eq!(start.elapsed(), Duration::ZERO);
    }

    #[tokio::test(start_paused = true)]
    async fn test_backoff_grows_with_attempt_index() {
        let sampler = CountingSampler::new(0.9);
        let admission = controller(limits(0.5, 0), sampler, Arc::default());

        assert!(admission.check_overloaded());
        tokio::time::advance(Duration::from_secs(2)).await;

        let mut previous = Duration::ZERO;
        for attempt in 0..4 {
            let start = Instant::now();
            assert!(admission.check_overloaded_with_backoff(attempt).await);
            let slept = start.elapsed();
            assert!(slept >= previous, "attempt {} slept {:?} < {:?}", attempt, slept, previous);
            previous = slept;
        }
        assert!(previous > Duration::ZERO);
    }

    #[tokio::test(start_paused = true)]
    async fn test_backoff_recovers_when_load_drops() {
        let sampler = CountingSampler::new(0.9);
        let admission = controller(limits(0.5, 0), sampler.clone(), Arc::default());

        assert!(admission.check_overloaded());
        tokio::time::advance(Duration::from_secs(2)).await;
        sampler.set(0.1);

        let start = Instant::now();
        assert!(!admission.check_overloaded_with_backoff(0).await);
        // Only the jittered pre-check pause: 1s * 0.9 * 1 * 0.5
        let slept = start.elapsed();
        assert!(slept >= Duration::from_millis(449) && slept <= Duration::from_millis(451), "slept {:?}", slept);
    }
}
