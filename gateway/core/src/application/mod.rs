// Copyright (c) 2026 relaygate contributors
// SPDX-License-Identifier: AGPL-3.0
//! Application
//!
//! Services of the transfer hook pipeline.
//!
//! # Architecture
//!
//! - **Layer:** Application Layer
//! - **Purpose:** Orchestrates domain types over injected collaborators

pub mod admission;
pub mod async_handoff;
pub mod policy_registry;
pub mod process_executor;
pub mod service_factory;
pub mod transfer_hooks;
