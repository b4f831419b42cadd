// Copyright (c) 2026 relaygate contributors
// SPDX-License-Identifier: AGPL-3.0
//! Domain
//!
//! Value types, policies and collaborator contracts of the hook pipeline.
//!
//! # Architecture
//!
//! - **Layer:** Domain Layer
//! - **Purpose:** Pure types and traits, no I/O

pub mod admission;
pub mod execution;
pub mod gateway_config;
pub mod handoff;
pub mod hook;
pub mod policy;
pub mod repository;
pub mod session;
pub mod template;
pub mod transfer;
