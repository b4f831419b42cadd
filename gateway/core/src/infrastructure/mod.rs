// Copyright (c) 2026 relaygate contributors
// SPDX-License-Identifier: AGPL-3.0
//! Infrastructure
//!
//! Concrete adapters for the domain collaborator traits.
//!
//! # Architecture
//!
//! - **Layer:** Infrastructure Layer
//! - **Purpose:** OS processes, load sampling, connection counting, persistence

pub mod connection_tracker;
pub mod db;
pub mod load_sampler;
pub mod process;
pub mod repositories;
