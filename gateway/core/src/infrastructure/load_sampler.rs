// Copyright (c) 2026 relaygate contributors
// SPDX-License-Identifier: AGPL-3.0
//! Load Samplers
//!
//! Strategies behind `LoadSampler`, chosen once from `admission.sampler`:
//!
//! - `NativeLoadSampler` reads the one-minute load average and divides it by
//!   the number of available CPUs
//! - `ExternalLoadSampler` reports whatever an external monitor last pushed
//! - `NoOpLoadSampler` always reports an idle host
//!
//! Every sampler reports a fraction in `[0, 1]`.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use systemstat::{Platform, System};
use tracing::debug;

use crate::domain::admission::{JitterSource, LoadSampler, SamplerKind};

pub struct NativeLoadSampler {
    system: System,
    cpus: f64,
}

impl NativeLoadSampler {
    pub fn new() -> Self {
        let cpus = std::thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(1);
        Self {
            system: System::new(),
            cpus: cpus as f64,
        }
    }
}

impl Default for NativeLoadSampler {
    fn default() -> Self {
        Self::new()
    }
}

impl LoadSampler for NativeLoadSampler {
    fn current_load(&self) -> f64 {
        match self.system.load_average() {
            Ok(load) => (f64::from(load.one) / self.cpus).clamp(0.0, 1.0),
            Err(err) => {
                debug!(error = %err, "Load average unavailable, reporting idle");
                0.0
            }
        }
    }
}

/// Load fed by an external system monitor
#[derive(Debug, Default)]
pub struct ExternalLoadSampler {
    bits: AtomicU64,
}

impl ExternalLoadSampler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Publish a new reading. Out-of-range values are clamped, NaN reads as 0.
    pub fn set_load(&self, load: f64) {
        let load = if load.is_nan() { 0.0 } else { load.clamp(0.0, 1.0) };
        self.bits.store(load.to_bits(), Ordering::Relaxed);
    }
}

impl LoadSampler for ExternalLoadSampler {
    fn current_load(&self) -> f64 {
        f64::from_bits(self.bits.load(Ordering::Relaxed))
    }
}

#[derive(Debug, Default, Clone, Copy)]
pub struct NoOpLoadSampler;

impl LoadSampler for NoOpLoadSampler {
    fn current_load(&self) -> f64 {
        0.0
    }
}

/// Sampler selected by configuration. The external sampler is returned
/// separately so its owner can keep publishing readings.
pub fn create_load_sampler(kind: SamplerKind) -> (Arc<dyn LoadSampler>, Option<Arc<ExternalLoadSampler>>) {
    match kind {
        SamplerKind::Native => (Arc::new(NativeLoadSampler::new()), None),
        SamplerKind::External => {
            let external = Arc::new(ExternalLoadSampler::new());
            (external.clone(), Some(external))
        }
        SamplerKind::None => (Arc::new(NoOpLoadSampler), None),
    }
}

/// Uniform jitter in `[0, 1)` from the thread-local generator
#[derive(Debug, Default, Clone, Copy)]
pub struct RandomJitter;

impl JitterSource for RandomJitter {
    fn next_unit(&self) -> f64 {
        rand::random::<f64>()
    }
}
