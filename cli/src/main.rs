// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! # AgentMolt CLI
//!
//! The `agentmolt` binary talks to either control-plane backend:
//!
//! - **Local** (default): an embedded SQLite database (`--local`, `--db-path`)
//! - **Remote**: the hosted HTTP API (`--remote`), authenticated with
//!   `--api-key` / `AGENTMOLT_API_KEY`
//!
//! Without either flag the backend comes from `agentmolt.yaml` or
//! `AGENTMOLT_BACKEND`.
//!
//! ## Commands
//!
//! - `agentmolt agents list|get|register` - Agent registry
//! - `agentmolt kill|status|set-status <id>` - Lifecycle
//! - `agentmolt events|metrics <id>` - Audit trail and usage
//! - `agentmolt policy add|list|check` - Governance rules
//! - `agentmolt watch <id>` - Foreground kill switch
//! - `agentmolt stats` - Local store row counts
//! - `agentmolt config show|validate` - Configuration management

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use colored::Colorize;
use std::path::PathBuf;
use std::time::Duration;

use agentmolt::bootstrap::{open_local, BackendOptions};
use agentmolt::commands::{self, AgentCommand, ConfigCommand, PolicyCommand};
use agentmolt_core::domain::agent::AgentStatus;

/// AgentMolt - control plane for autonomous agents
#[derive(Parser)]
#[command(name = "agentmolt")]
#[command(version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Use the local SQLite backend
    #[arg(long, global = true, conflicts_with = "remote")]
    local: bool,

    /// Use the remote HTTP API
    #[arg(long, global = true)]
    remote: bool,

    /// Local database path
    #[arg(long, global = true, env = "AGENTMOLT_DB_PATH", value_name = "FILE")]
    db_path: Option<PathBuf>,

    /// API key for the remote backend
    #[arg(long, global = true, env = "AGENTMOLT_API_KEY", hide_env_values = true)]
    api_key: Option<String>,

    /// Base URL of the remote API
    #[arg(long, global = true, env = "AGENTMOLT_BASE_URL", value_name = "URL")]
    base_url: Option<String>,

    /// Path to configuration file (overrides discovery)
    #[arg(
        short,
        long,
        global = true,
        env = "AGENTMOLT_CONFIG_PATH",
        value_name = "FILE"
    )]
    config: Option<PathBuf>,

    /// Log every control-plane request and its duration
    #[arg(long, global = true)]
    trace_requests: bool,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, global = true, env = "AGENTMOLT_LOG_LEVEL", default_value = "warn")]
    log_level: String,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Agent registry
    #[command(name = "agents")]
    Agents {
        #[command(subcommand)]
        command: AgentCommand,
    },

    /// Kill an agent (sticky: it stays killed)
    Kill {
        #[arg(value_name = "AGENT_ID")]
        agent_id: String,
    },

    /// Print an agent's current status
    Status {
        #[arg(value_name = "AGENT_ID")]
        agent_id: String,
    },

    /// Set an agent's status (idle, running, stopped, failed, killed)
    #[command(name = "set-status")]
    SetStatus {
        #[arg(value_name = "AGENT_ID")]
        agent_id: String,

        #[arg(value_name = "STATUS")]
        status: AgentStatus,
    },

    /// List an agent's events, newest first
    Events {
        #[arg(value_name = "AGENT_ID")]
        agent_id: String,
    },

    /// Summarize an agent's metrics
    Metrics {
        #[arg(value_name = "AGENT_ID")]
        agent_id: String,
    },

    /// Policy management
    #[command(name = "policy")]
    Policy {
        #[command(subcommand)]
        command: PolicyCommand,
    },

    /// Block until the agent is killed or stopped, then exit with status 1
    Watch {
        #[arg(value_name = "AGENT_ID")]
        agent_id: String,

        /// Poll interval (default: killswitch.poll_interval_ms from config)
        #[arg(long, value_name = "MS")]
        interval_ms: Option<u64>,
    },

    /// Row counts of the local database
    Stats,

    /// Configuration management
    #[command(name = "config")]
    Config {
        #[command(subcommand)]
        command: ConfigCommand,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    // A missing .env is fine
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();

    // Request traces are info-level, raise the default so they show
    let level = if cli.trace_requests && cli.log_level == "warn" {
        "info"
    } else {
        cli.log_level.as_str()
    };
    init_logging(level)?;

    let options = BackendOptions {
        local: cli.local,
        remote: cli.remote,
        db_path: cli.db_path,
        api_key: cli.api_key,
        base_url: cli.base_url,
        config: cli.config,
        trace_requests: cli.trace_requests,
    };

    let Some(command) = cli.command else {
        // No command provided - show help
        eprintln!("{}", "No command specified. Use --help for usage.".yellow());
        std::process::exit(1);
    };

    match command {
        Commands::Config { command } => commands::config::handle_command(command, &options).await,
        Commands::Stats => {
            let config = options.resolve()?;
            let cp = open_local(&config).await?;
            commands::stats::execute(&cp).await
        }
        Commands::Watch {
            agent_id,
            interval_ms,
        } => {
            let config = options.resolve()?;
            let interval = interval_ms
                .map(Duration::from_millis)
                .unwrap_or_else(|| config.killswitch.poll_interval());
            let cp = options.connect_with(&config).await?;
            commands::watch::execute(cp, &agent_id, interval).await
        }
        Commands::Agents { command } => {
            let cp = options.connect().await?;
            commands::agent::handle_command(command, cp.as_ref()).await
        }
        Commands::Kill { agent_id } => {
            let cp = options.connect().await?;
            commands::agent::kill(cp.as_ref(), &agent_id).await
        }
        Commands::Status { agent_id } => {
            let cp = options.connect().await?;
            commands::agent::status(cp.as_ref(), &agent_id).await
        }
        Commands::SetStatus { agent_id, status } => {
            let cp = options.connect().await?;
            commands::agent::set_status(cp.as_ref(), &agent_id, status).await
        }
        Commands::Events { agent_id } => {
            let cp = options.connect().await?;
            commands::agent::events(cp.as_ref(), &agent_id).await
        }
        Commands::Metrics { agent_id } => {
            let cp = options.connect().await?;
            commands::agent::metrics(cp.as_ref(), &agent_id).await
        }
        Commands::Policy { command } => {
            let cp = options.connect().await?;
            commands::policy::handle_command(command, cp.as_ref()).await
        }
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
        .with_writer(std::io::stderr)
        .compact()
        .init();

    Ok(())
}
