// Copyright (c) 2026 relaygate contributors
// SPDX-License-Identifier: AGPL-3.0
//! relaygate core
//!
//! Transfer hook pipeline for the relaygate file-transfer gateway: admission
//! control, per-user execution policies, external command execution and the
//! hand-off of prepared transfers to the queued-transfer store.
//!
//! # Architecture
//!
//! - **Layer:** Core System
//! - **Purpose:** Exposes the domain, application and infrastructure layers

pub mod domain;
pub mod application;
pub mod infrastructure;

pub use domain::*;
