// Copyright (c) 2026 relaygate contributors
// SPDX-License-Identifier: AGPL-3.0

//! Admission control diagnostics

use anyhow::Result;
use clap::Subcommand;
use colored::Colorize;
use std::path::PathBuf;
use std::time::Duration;

use relaygate_core::application::service_factory::GatewayServices;

use super::load_manifest;

#[derive(Subcommand)]
pub enum AdmissionCommand {
    /// Sample host load against the configured limits
    Check {
        /// Number of checks to run
        #[arg(short, long, default_value_t = 1)]
        samples: u32,

        /// Pause between checks, in milliseconds
        #[arg(long, default_value_t = 1000)]
        interval_ms: u64,

        /// Use the backoff variant, as a session would
        #[arg(long)]
        backoff: bool,
    },
}

pub async fn handle_command(command: AdmissionCommand, config_override: Option<PathBuf>) -> Result<()> {
    match command {
        AdmissionCommand::Check {
            samples,
            interval_ms,
            backoff,
        } => check(config_override, samples.max(1), Duration::from_millis(interval_ms), backoff).await,
    }
}

async fn check(config_override: Option<PathBuf>, samples: u32, interval: Duration, backoff: bool) -> Result<()> {
    let manifest = load_manifest(config_override)?;
    let services = GatewayServices::from_manifest(&manifest).await?;
    let admission = services.orchestrator.admission();

    if !admission.limits().cpu_check_enabled() && !admission.limits().connection_check_enabled() {
        println!("{}", "Admission control is disabled (no CPU or connection limit)".yellow());
    }

    for attempt in 0..samples {
        if attempt > 0 {
            tokio::time::sleep(interval).await;
        }
        let overloaded = if backoff {
            admission.check_overloaded_with_backoff(attempt).await
        } else {
            admission.check_overloaded()
        };
        let load = admission
            .last_load()
            .map(|load| format!("{:.3}", load))
            .unwrap_or_else(|| "not sampled".to_string());
        let verdict = if overloaded { "OVERLOADED".red().bold() } else { "ok".green() };
        println!("[{}] load {} (limit {}) -> {}", attempt + 1, load, admission.limits().cpu_limit, verdict);
    }

    Ok(())
}
