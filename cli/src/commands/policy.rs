// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Policy commands: add, list, check

use anyhow::Result;
use clap::Subcommand;
use colored::Colorize;

use agentmolt_core::application::control_plane::ControlPlane;
use agentmolt_core::domain::policy::{NewPolicyRule, RuleType};

use crate::output;

#[derive(Subcommand)]
pub enum PolicyCommand {
    /// Add a rule (allowlist, denylist, cost_limit, token_limit)
    Add {
        #[arg(value_name = "RULE_TYPE")]
        rule_type: RuleType,

        #[arg(value_name = "VALUE")]
        value: String,

        /// Scope the rule to one agent (global when omitted)
        #[arg(short, long, value_name = "AGENT_ID")]
        agent: Option<String>,
    },

    /// List rules, optionally those applying to one agent
    List {
        #[arg(short, long, value_name = "AGENT_ID")]
        agent: Option<String>,
    },

    /// Evaluate an action for an agent
    Check {
        #[arg(value_name = "AGENT_ID")]
        agent_id: String,

        #[arg(value_name = "ACTION")]
        action: String,

        /// Exit with status 2 when the action is denied
        #[arg(long)]
        strict: bool,
    },
}

pub async fn handle_command(command: PolicyCommand, cp: &dyn ControlPlane) -> Result<()> {
    match command {
        PolicyCommand::Add {
            rule_type,
            value,
            agent,
        } => add(cp, rule_type, value, agent).await,
        PolicyCommand::List { agent } => list(cp, agent.as_deref()).await,
        PolicyCommand::Check {
            agent_id,
            action,
            strict,
        } => check(cp, &agent_id, &action, strict).await,
    }
}

async fn add(
    cp: &dyn ControlPlane,
    rule_type: RuleType,
    value: String,
    agent: Option<String>,
) -> Result<()> {
    let rule = match agent {
        Some(agent_id) => NewPolicyRule::for_agent(rule_type, value, agent_id),
        None => NewPolicyRule::global(rule_type, value),
    };
    let rule = cp.add_policy(rule).await?;
    println!("{}", format!("✓ Policy added: {}", rule.id).green());
    Ok(())
}

async fn list(cp: &dyn ControlPlane, agent: Option<&str>) -> Result<()> {
    let rules = cp.list_policies(agent).await?;

    if rules.is_empty() {
        println!("{}", "No policies found".yellow());
        return Ok(());
    }

    print!("{}", output::policy_table(&rules));
    Ok(())
}

async fn check(cp: &dyn ControlPlane, agent_id: &str, action: &str, strict: bool) -> Result<()> {
    let result = cp.check_policy(agent_id, action).await?;
    println!("{}", output::policy_result(&result));

    if strict && !result.allowed {
        std::process::exit(2);
    }
    Ok(())
}
