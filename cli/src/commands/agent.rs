// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Agent registry commands and the per-agent shortcuts
//! (`kill`, `status`, `set-status`, `events`, `metrics`).

use anyhow::{anyhow, Result};
use clap::Subcommand;
use colored::Colorize;
use serde_json::Value;

use agentmolt_core::application::control_plane::ControlPlane;
use agentmolt_core::domain::agent::{AgentStatus, Metadata};

use crate::output;

#[derive(Subcommand)]
pub enum AgentCommand {
    /// List registered agents
    List,

    /// Show one agent
    Get {
        #[arg(value_name = "AGENT_ID")]
        agent_id: String,
    },

    /// Register a new agent
    Register {
        #[arg(value_name = "NAME")]
        name: String,

        /// Model the agent runs on
        #[arg(short, long, default_value = "")]
        model: String,

        /// Metadata entry, repeatable (`--meta team=search --meta tier=2`)
        #[arg(long = "meta", value_name = "KEY=VALUE", value_parser = parse_meta)]
        meta: Vec<(String, Value)>,
    },
}

/// `key=value`; the value is taken as JSON when it parses, else as a string.
pub fn parse_meta(raw: &str) -> Result<(String, Value)> {
    let (key, value) = raw
        .split_once('=')
        .ok_or_else(|| anyhow!("expected KEY=VALUE, got '{}'", raw))?;
    if key.is_empty() {
        return Err(anyhow!("metadata key must not be empty"));
    }
    let value = serde_json::from_str(value).unwrap_or_else(|_| Value::String(value.to_string()));
    Ok((key.to_string(), value))
}

pub async fn handle_command(command: AgentCommand, cp: &dyn ControlPlane) -> Result<()> {
    match command {
        AgentCommand::List => list_agents(cp).await,
        AgentCommand::Get { agent_id } => show_agent(cp, &agent_id).await,
        AgentCommand::Register { name, model, meta } => {
            register_agent(cp, &name, &model, meta).await
        }
    }
}

async fn list_agents(cp: &dyn ControlPlane) -> Result<()> {
    let agents = cp.list_agents().await?;

    if agents.is_empty() {
        println!("{}", "No agents found".yellow());
        return Ok(());
    }

    println!("{} agents found:", agents.len());
    print!("{}", output::agent_table(&agents));
    Ok(())
}

async fn show_agent(cp: &dyn ControlPlane, agent_id: &str) -> Result<()> {
    let agent = cp.get_agent(agent_id).await?;
    print!("{}", output::agent_detail(&agent));
    Ok(())
}

async fn register_agent(
    cp: &dyn ControlPlane,
    name: &str,
    model: &str,
    meta: Vec<(String, Value)>,
) -> Result<()> {
    let metadata: Metadata = meta.into_iter().collect();
    let agent = cp.register_agent(name, model, metadata).await?;
    println!("{}", format!("✓ Agent registered: {}", agent.id).green());
    Ok(())
}

pub async fn kill(cp: &dyn ControlPlane, agent_id: &str) -> Result<()> {
    let receipt = cp.kill(agent_id).await?;
    println!(
        "{}",
        format!("✓ Agent {} is now {}", receipt.agent_id, receipt.status)
            .red()
            .bold()
    );
    Ok(())
}

pub async fn status(cp: &dyn ControlPlane, agent_id: &str) -> Result<()> {
    let agent = cp.get_agent(agent_id).await?;
    println!("{}", output::status_label(agent.status));
    Ok(())
}

pub async fn set_status(cp: &dyn ControlPlane, agent_id: &str, status: AgentStatus) -> Result<()> {
    let agent = cp.update_status(agent_id, status).await?;
    println!(
        "✓ Agent {} status: {}",
        agent.id,
        output::status_label(agent.status)
    );
    Ok(())
}

pub async fn events(cp: &dyn ControlPlane, agent_id: &str) -> Result<()> {
    let events = cp.list_events(agent_id).await?;

    if events.is_empty() {
        println!("{}", "No events recorded".yellow());
        return Ok(());
    }

    print!("{}", output::event_table(&events));
    Ok(())
}

pub async fn metrics(cp: &dyn ControlPlane, agent_id: &str) -> Result<()> {
    let summary = cp.metrics_summary(agent_id).await?;
    print!("{}", output::metrics_summary(agent_id, &summary));
    Ok(())
}
