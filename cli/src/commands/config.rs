// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Configuration management commands
//!
//! Commands: show, validate

use anyhow::{Context, Result};
use clap::Subcommand;
use colored::Colorize;
use std::path::PathBuf;

use agentmolt_core::domain::config::{
    BackendKind, ControlPlaneConfig, ENV_API_KEY, ENV_CONFIG_PATH,
};

use crate::bootstrap::BackendOptions;

#[derive(Subcommand)]
pub enum ConfigCommand {
    /// Show the effective configuration
    Show {
        /// Show config file paths checked
        #[arg(long)]
        paths: bool,
    },

    /// Validate a configuration file
    Validate {
        /// Path to config file (default: discover)
        #[arg(value_name = "FILE")]
        file: Option<PathBuf>,
    },
}

pub async fn handle_command(command: ConfigCommand, options: &BackendOptions) -> Result<()> {
    match command {
        ConfigCommand::Show { paths } => show(options, paths),
        ConfigCommand::Validate { file } => validate(file.or_else(|| options.config.clone())),
    }
}

fn show(options: &BackendOptions, show_paths: bool) -> Result<()> {
    let config = options.resolve()?;

    if show_paths {
        println!("{}", "Configuration discovery paths:".bold());
        match &options.config {
            Some(path) => println!("  1. --config flag: {}", path.display()),
            None => println!("  1. --config flag: {}", "(not set)".dimmed()),
        }
        println!(
            "  2. {}: {}",
            ENV_CONFIG_PATH,
            std::env::var(ENV_CONFIG_PATH)
                .unwrap_or_else(|_| "(not set)".to_string())
                .dimmed()
        );
        println!("  3. ./agentmolt.yaml");
        println!("  4. ~/.agentmolt/config.yaml");
        println!();
    }

    print!("{}", render(&config));
    Ok(())
}

/// Human-readable summary; the API key is only reported as set or not.
pub fn render(config: &ControlPlaneConfig) -> String {
    let mut out = String::new();
    out.push_str(&format!("{}\n", "Current configuration:".bold()));
    out.push_str(&format!("  Backend: {:?}\n", config.backend));

    match config.backend {
        BackendKind::Local => {
            out.push_str(&format!(
                "  Database: {}\n",
                config.local.resolved_db_path().display()
            ));
        }
        BackendKind::Remote => {
            let remote = &config.remote;
            out.push_str(&format!(
                "  Base URL: {}\n",
                remote.base_url.as_deref().unwrap_or("(default)")
            ));
            let key = if remote.api_key.is_some() {
                "set".green()
            } else {
                format!("not set (falls back to {})", ENV_API_KEY).yellow()
            };
            out.push_str(&format!("  API key: {}\n", key));
            out.push_str(&format!(
                "  Retries: {} (backoff {} ms, timeout {} s)\n",
                remote.max_retries, remote.backoff_base_ms, remote.timeout_seconds
            ));
        }
    }

    out.push_str(&format!(
        "  Kill switch poll interval: {} ms\n",
        config.killswitch.poll_interval_ms
    ));
    out
}

fn validate(config_path: Option<PathBuf>) -> Result<()> {
    println!("Validating configuration...");

    let config = ControlPlaneConfig::load_or_default(config_path)
        .context("Failed to load configuration")?;

    if config.backend == BackendKind::Remote {
        config
            .remote
            .transport()
            .context("Configuration validation failed")?;
    }
    if config.killswitch.poll_interval_ms == 0 {
        anyhow::bail!("Configuration validation failed: killswitch.poll_interval_ms must be > 0");
    }

    println!("{}", "✓ Configuration is valid".green());
    Ok(())
}
