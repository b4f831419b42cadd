// Copyright (c) 2026 relaygate contributors
// SPDX-License-Identifier: AGPL-3.0

//! Asynchronous transfer hand-off commands

use anyhow::{Context, Result};
use clap::Subcommand;
use colored::Colorize;
use std::path::PathBuf;

use relaygate_core::application::service_factory::GatewayServices;
use relaygate_core::domain::repository::StorageBackend;

use super::load_manifest;

#[derive(Subcommand)]
pub enum HandoffCommand {
    /// Parse a preparation command line and queue the transfer.
    /// Put the command line after `--`.
    Prepare {
        /// `-to <host> -rule <name> -file <path> [-md5] [-block <n>] [-nolog] [-info <text...>]`
        #[arg(required = true, trailing_var_arg = true, allow_hyphen_values = true, num_args = 1..)]
        args: Vec<String>,
    },
}

pub async fn handle_command(command: HandoffCommand, config_override: Option<PathBuf>) -> Result<()> {
    match command {
        HandoffCommand::Prepare { args } => prepare(config_override, &args.join(" ")).await,
    }
}

async fn prepare(config_override: Option<PathBuf>, command_line: &str) -> Result<()> {
    let manifest = load_manifest(config_override)?;
    let volatile = is_volatile(&manifest.spec.storage);
    if volatile {
        println!(
            "{}",
            "WARNING: storage backend is in_memory; the queued transfer is discarded when this command exits.".yellow()
        );
    }
    let services = GatewayServices::from_manifest(&manifest).await?;

    let descriptor = services
        .handoff
        .prepare(command_line)
        .await
        .context("Transfer preparation failed")?;

    if volatile {
        println!("{}", "✓ Transfer prepared (not persisted)".yellow());
    } else {
        println!("{}", "✓ Transfer queued".green());
    }
    if let Some(id) = descriptor.special_id {
        println!("  Special id: {}", id);
    }
    println!("  Remote host: {}", descriptor.remote_host);
    println!("  Rule: {} ({})", descriptor.rule_name, descriptor.mode.as_str());
    println!("  File: {}", descriptor.filename);
    println!("  Block size: {}", descriptor.block_size);
    println!("  Info: {}", descriptor.file_info);
    if descriptor.no_log {
        println!("  Logging: {}", "disabled".dimmed());
    }
    Ok(())
}

/// Queued transfers only outlive the process with a database backend
fn is_volatile(storage: &StorageBackend) -> bool {
    matches!(storage, StorageBackend::InMemory)
}
