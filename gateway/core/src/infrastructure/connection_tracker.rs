// Copyright (c) 2026 relaygate contributors
// SPDX-License-Identifier: AGPL-3.0
//! Connection Tracker
//!
//! Live counts of network connections and authenticated local sessions. The
//! protocol engine holds a guard for as long as a connection or session is
//! open; dropping the guard releases the slot.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use crate::domain::admission::ConnectionCounter;

#[derive(Debug, Default)]
pub struct ConnectionTracker {
    network: Arc<AtomicU64>,
    sessions: Arc<AtomicU64>,
}

impl ConnectionTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn enter_network(&self) -> ConnectionGuard {
        ConnectionGuard::acquire(self.network.clone())
    }

    pub fn enter_session(&self) -> ConnectionGuard {
        ConnectionGuard::acquire(self.sessions.clone())
    }
}

impl ConnectionCounter for ConnectionTracker {
    fn network_connections(&self) -> u64 {
        self.network.load(Ordering::Acquire)
    }

    fn local_sessions(&self) -> u64 {
        self.sessions.load(Ordering::Acquire)
    }
}

#[must_use = "the slot is released as soon as the guard is dropped"]
#[derive(Debug)]
pub struct ConnectionGuard {
    counter: Arc<AtomicU64>,
}

impl ConnectionGuard {
    fn acquire(counter: Arc<AtomicU64>) -> Self {
        counter.fetch_add(1, Ordering::AcqRel);
        Self { counter }
    }
}

impl Drop for ConnectionGuard {
    fn drop(&mut self) {
        self.counter.fetch_sub(1, Ordering::AcqRel);
    }
}
