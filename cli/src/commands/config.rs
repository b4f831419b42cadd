// Copyright (c) 2026 relaygate contributors
// SPDX-License-Identifier: AGPL-3.0

//! Configuration management commands
//!
//! Commands: show, validate, generate

use anyhow::{Context, Result};
use clap::Subcommand;
use colored::Colorize;
use std::path::{Path, PathBuf};

use relaygate_core::domain::gateway_config::{GatewayConfigManifest, CONFIG_PATH_ENV};
use relaygate_core::domain::policy::Disposition;
use relaygate_core::domain::repository::StorageBackend;

#[derive(Subcommand)]
pub enum ConfigCommand {
    /// Show current configuration
    Show {
        /// Show config file paths checked
        #[arg(long)]
        paths: bool,

        /// Print the effective manifest as YAML
        #[arg(long)]
        yaml: bool,
    },

    /// Validate configuration file
    Validate {
        /// Path to config file (default: discover)
        #[arg(value_name = "FILE")]
        file: Option<PathBuf>,
    },

    /// Generate sample configuration
    Generate {
        /// Output path
        #[arg(short, long, default_value = "./relaygate-config.yaml")]
        output: PathBuf,
    },
}

pub async fn handle_command(command: ConfigCommand, config_override: Option<PathBuf>) -> Result<()> {
    match command {
        ConfigCommand::Show { paths, yaml } => show(config_override, paths, yaml),
        ConfigCommand::Validate { file } => validate(file.or(config_override)),
        ConfigCommand::Generate { output } => generate(&output),
    }
}

fn show(config_override: Option<PathBuf>, show_paths: bool, as_yaml: bool) -> Result<()> {
    let config = GatewayConfigManifest::load_or_default(config_override.clone()).context("Failed to load configuration")?;

    if show_paths {
        println!("{}", "Configuration discovery paths:".bold());
        match &config_override {
            Some(path) => println!("  1. --config flag: {}", path.display()),
            None => println!("  1. --config flag: {}", "(not set)".dimmed()),
        }
        println!(
            "  2. {}: {}",
            CONFIG_PATH_ENV,
            std::env::var(CONFIG_PATH_ENV)
                .unwrap_or_else(|_| "(not set)".to_string())
                .dimmed()
        );
        println!("  3. ./relaygate-config.yaml");
        println!("  4. ~/.relaygate/config.yaml");
        println!("  5. /etc/relaygate/config.yaml");
        println!();
    }

    if as_yaml {
        print!("{}", config.to_yaml_string()?);
        return Ok(());
    }

    println!("{}", "Current configuration:".bold());
    println!();

    println!("{}", "Host:".bold());
    println!("  ID: {}", config.spec.host.id);
    println!("  Default block size: {}", config.spec.host.default_block_size);
    println!();

    println!("{}", "Execution:".bold());
    match config.spec.execution.policies() {
        Ok(policies) => {
            println!("  Store: {}", describe(&policies.store.disposition, &policies.store.command_template));
            println!("  Retrieve: {}", describe(&policies.retrieve.disposition, &policies.retrieve.command_template));
        }
        Err(e) => println!("  {}", format!("invalid: {}", e).red()),
    }
    println!("  Spawn retry delay: {:?}", config.spec.execution.spawn_retry_delay);
    println!();

    let admission = &config.spec.admission;
    println!("{}", "Admission:".bold());
    println!("  CPU limit: {}", if admission.cpu_check_enabled() { admission.cpu_limit.to_string() } else { "disabled".to_string() });
    println!(
        "  Connection limit: {}",
        if admission.connection_check_enabled() { admission.connection_limit.to_string() } else { "disabled".to_string() }
    );
    println!("  Min recheck interval: {:?}", admission.min_recheck_interval);
    println!("  Connection timeout: {:?}", admission.connection_timeout);
    println!("  Sampler: {:?}", admission.sampler);
    println!();

    println!("{}", "Storage:".bold());
    match &config.spec.storage {
        StorageBackend::InMemory => println!("  In-memory ({} rule(s))", config.spec.rules.len()),
        StorageBackend::Postgres(pg) => println!("  PostgreSQL (max {} connections)", pg.max_connections),
    }
    println!();

    if !config.spec.users.is_empty() {
        println!("{}", "User overrides:".bold());
        let mut names: Vec<_> = config.spec.users.keys().collect();
        names.sort();
        for name in names {
            let user = &config.spec.users[name];
            let admin = if user.admin { " (admin)".yellow().to_string() } else { String::new() };
            println!("  {}{}", name.bold(), admin);
        }
        println!();
    }

    Ok(())
}

fn describe(disposition: &Disposition, template: &str) -> String {
    match disposition {
        Disposition::Refuse => "refused".red().to_string(),
        Disposition::RunCommand => format!("execute `{}`", template),
        Disposition::EnqueueAsyncTransfer => format!("hand off `{}`", template),
        Disposition::None => "none".dimmed().to_string(),
    }
}

fn validate(config_path: Option<PathBuf>) -> Result<()> {
    println!("Validating configuration...");

    let config = GatewayConfigManifest::load_or_default(config_path).context("Failed to load configuration")?;

    config.validate().context("Configuration validation failed")?;

    println!("{}", "✓ Configuration is valid".green());

    Ok(())
}

fn generate(output: &Path) -> Result<()> {
    let sample = include_str!("../../templates/relaygate-config.yaml");

    std::fs::write(output, sample).with_context(|| format!("Failed to write config to {:?}", output))?;

    println!("{}", format!("✓ Configuration generated: {}", output.display()).green());

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generated_sample_is_valid() {
        let dir = tempfile::tempdir().unwrap();
        let output = dir.path().join("relaygate-config.yaml");
        generate(&output).unwrap();

        let manifest = GatewayConfigManifest::from_yaml_file(&output).unwrap();
        manifest.validate().unwrap();
    }
}
