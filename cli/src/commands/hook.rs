// Copyright (c) 2026 relaygate contributors
// SPDX-License-Identifier: AGPL-3.0

//! Transfer hook commands
//!
//! Runs the pre-command or post-transfer hook exactly as a protocol session
//! would, for a configured or ad-hoc user.

use anyhow::{bail, Result};
use clap::Subcommand;
use colored::Colorize;
use std::path::PathBuf;

use relaygate_core::application::service_factory::GatewayServices;
use relaygate_core::domain::hook::{PostTransferOutcome, PreCommandOutcome};
use relaygate_core::domain::transfer::ProtocolCommand;

use super::load_manifest;

#[derive(Subcommand)]
pub enum HookCommand {
    /// Run a hook for one command
    Run {
        /// Authenticated user
        #[arg(short, long)]
        user: String,

        /// Base directory of the user's session
        #[arg(long, default_value = ".")]
        base_dir: String,

        /// Run the post-transfer hook instead of the pre-command hook
        #[arg(long)]
        after: bool,

        /// With --after: report the transfer itself as failed
        #[arg(long, requires = "after")]
        transfer_failed: bool,

        /// Protocol command (RETR, STOR, APPE, STOU, ...)
        command: String,

        /// File path relative to the base directory
        path: String,
    },
}

pub async fn handle_command(command: HookCommand, config_override: Option<PathBuf>) -> Result<()> {
    match command {
        HookCommand::Run {
            user,
            base_dir,
            after,
            transfer_failed,
            command,
            path,
        } => {
            let protocol_command: ProtocolCommand = match command.parse() {
                Ok(parsed) => parsed,
                Err(never) => match never {},
            };
            run(config_override, &user, base_dir, after, !transfer_failed, protocol_command, &path).await
        }
    }
}

async fn run(
    config_override: Option<PathBuf>,
    user: &str,
    base_dir: String,
    after: bool,
    transfer_succeeded: bool,
    command: ProtocolCommand,
    path: &str,
) -> Result<()> {
    let manifest = load_manifest(config_override)?;
    let services = GatewayServices::from_manifest(&manifest).await?;
    let session = services.session_for(&manifest, user, base_dir);

    if after {
        let Some(operation) = command.operation_code() else {
            bail!("{} is not a transfer command", command);
        };
        let outcome = services
            .orchestrator
            .after_transfer(&session, operation, path, transfer_succeeded)
            .await;
        match outcome {
            PostTransferOutcome::Completed => println!("{}", "Transfer completed, no post action".green()),
            PostTransferOutcome::Skipped => println!("{}", "Transfer failed, post action skipped".yellow()),
            PostTransferOutcome::ActionSucceeded(result) => {
                println!("{} ({:?})", "Post action succeeded".green(), result.status)
            }
            PostTransferOutcome::Enqueued(descriptor) => println!(
                "{} special id {}",
                "Transfer handed off,".green(),
                descriptor.special_id.map(|id| id.to_string()).unwrap_or_default()
            ),
            PostTransferOutcome::CompletedWithAnomaly(err) => {
                println!("{} {}: {}", "Transfer completed with anomaly".yellow(), err.reply_code(), err);
            }
        }
        return Ok(());
    }

    match services.orchestrator.before_command(&session, &command, path).await {
        Ok(PreCommandOutcome::Proceed) => println!("{} {}", command, "may proceed".green()),
        Ok(PreCommandOutcome::ProceedAfterAction(result)) => {
            println!("{} {} ({:?})", command, "may proceed after action".green(), result.status)
        }
        Ok(PreCommandOutcome::Enqueued(descriptor)) => println!(
            "{} {} special id {}",
            command,
            "handed off,".green(),
            descriptor.special_id.map(|id| id.to_string()).unwrap_or_default()
        ),
        Err(err) => bail!("{} rejected with {}: {}", command, err.reply_code(), err),
    }
    Ok(())
}
