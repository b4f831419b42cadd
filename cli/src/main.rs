// Copyright (c) 2026 relaygate contributors
// SPDX-License-Identifier: AGPL-3.0

//! # relaygate operator CLI
//!
//! Loads the gateway configuration and drives the transfer hook pipeline
//! outside a live protocol session.
//!
//! ## Commands
//!
//! - `relaygate config show|validate|generate` - Configuration management
//! - `relaygate admission check` - Sample load and connection pressure
//! - `relaygate hook run` - Run the pre-command or post-transfer hook for a user
//! - `relaygate handoff prepare` - Queue an asynchronous transfer

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;

mod commands;

use commands::{AdmissionCommand, ConfigCommand, HandoffCommand, HookCommand};

/// relaygate - file-transfer gateway hook tooling
#[derive(Parser)]
#[command(name = "relaygate")]
#[command(version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Path to configuration file (overrides discovery)
    #[arg(short, long, global = true, env = "RELAYGATE_CONFIG_PATH", value_name = "FILE")]
    config: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, global = true, env = "RELAYGATE_LOG_LEVEL", default_value = "info")]
    log_level: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Configuration management
    #[command(name = "config")]
    Config {
        #[command(subcommand)]
        command: ConfigCommand,
    },

    /// Admission control diagnostics
    #[command(name = "admission")]
    Admission {
        #[command(subcommand)]
        command: AdmissionCommand,
    },

    /// Transfer hook execution
    #[command(name = "hook")]
    Hook {
        #[command(subcommand)]
        command: HookCommand,
    },

    /// Asynchronous transfer hand-off
    #[command(name = "handoff")]
    Handoff {
        #[command(subcommand)]
        command: HandoffCommand,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    init_logging(&cli.log_level)?;

    match cli.command {
        Commands::Config { command } => commands::config::handle_command(command, cli.config).await,
        Commands::Admission { command } => commands::admission::handle_command(command, cli.config).await,
        Commands::Hook { command } => commands::hook::handle_command(command, cli.config).await,
        Commands::Handoff { command } => commands::handoff::handle_command(command, cli.config).await,
    }
}

/// Initialize tracing subscriber for logging
fn init_logging(level: &str) -> Result<()> {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .or_else(|_| tracing_subscriber::EnvFilter::try_new(level))
        .context("Failed to create log filter")?;

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .compact()
        .init();

    Ok(())
}
