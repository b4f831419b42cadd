// Copyright (c) 2026 relaygate contributors
// SPDX-License-Identifier: AGPL-3.0

//! Command implementations for the relaygate CLI

pub mod admission;
pub mod config;
pub mod handoff;
pub mod hook;

pub use self::admission::AdmissionCommand;
pub use self::config::ConfigCommand;
pub use self::handoff::HandoffCommand;
pub use self::hook::HookCommand;

use anyhow::{Context, Result};
use relaygate_core::domain::gateway_config::GatewayConfigManifest;
use std::path::PathBuf;

/// Load and validate the configuration the way every command needs it
pub(crate) fn load_manifest(config_override: Option<PathBuf>) -> Result<GatewayConfigManifest> {
    let manifest = GatewayConfigManifest::load_or_default(config_override).context("Failed to load configuration")?;
    manifest.validate().context("Configuration validation failed")?;
    Ok(manifest)
}
