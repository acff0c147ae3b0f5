// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Table and detail rendering shared by the commands.

use colored::{ColoredString, Colorize};
use std::fmt::Write;

use agentmolt_core::domain::agent::{Agent, AgentStatus, Metadata};
use agentmolt_core::domain::events::Event;
use agentmolt_core::domain::metric::MetricsSummary;
use agentmolt_core::domain::policy::{PolicyResult, PolicyRule};

pub fn status_label(status: AgentStatus) -> ColoredString {
    match status {
        AgentStatus::Running => status.as_str().green(),
        AgentStatus::Idle => status.as_str().normal(),
        AgentStatus::Stopped => status.as_str().yellow(),
        AgentStatus::Failed => status.as_str().red(),
        AgentStatus::Killed => status.as_str().red().bold(),
    }
}

fn when(at: Option<chrono::DateTime<chrono::Utc>>) -> String {
    at.map(|t| t.format("%Y-%m-%d %H:%M:%S").to_string())
        .unwrap_or_else(|| "-".to_string())
}

pub fn agent_table(agents: &[Agent]) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "{:<14} {:<24} {:<16} {:<8}", "ID", "NAME", "MODEL", "STATUS");
    for agent in agents {
        let _ = writeln!(
            out,
            "{:<14} {:<24} {:<16} {}",
            agent.id,
            agent.name.bold(),
            agent.model,
            status_label(agent.status)
        );
    }
    out
}

pub fn agent_detail(agent: &Agent) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "{}", agent.name.bold());
    let _ = writeln!(out, "  ID:      {}", agent.id);
    let _ = writeln!(out, "  Model:   {}", if agent.model.is_empty() { "-" } else { &agent.model });
    let _ = writeln!(out, "  Status:  {}", status_label(agent.status));
    let _ = writeln!(out, "  Created: {}", when(agent.created_at));
    let _ = writeln!(out, "  Updated: {}", when(agent.updated_at));
    if !agent.metadata.is_empty() {
        let _ = writeln!(out, "  Metadata:");
        write_metadata(&mut out, &agent.metadata);
    }
    out
}

fn write_metadata(out: &mut String, metadata: &Metadata) {
    for (key, value) in metadata {
        let _ = writeln!(out, "    {}: {}", key, value);
    }
}

pub fn event_table(events: &[Event]) -> String {
    let mut out = String::new();
    let _ = writeln!(
        out,
        "{:<20} {:<20} {:<20} {:<8}",
        "TIME", "ACTION", "TARGET", "STATUS"
    );
    for event in events {
        let status = match event.status.as_str() {
            "failed" | "denied" => event.status.red(),
            "allowed" => event.status.green(),
            _ => event.status.normal(),
        };
        let _ = writeln!(
            out,
            "{:<20} {:<20} {:<20} {}",
            when(event.created_at),
            event.action,
            event.target,
            status
        );
    }
    out
}

pub fn metrics_summary(agent_id: &str, summary: &MetricsSummary) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "{}", format!("Metrics for {}", agent_id).bold());
    let _ = writeln!(out, "  Tokens used: {}", summary.tokens_used);
    let _ = writeln!(out, "  Cost:        ${:.4}", summary.cost);
    let _ = writeln!(out, "  Tool calls:  {}", summary.tool_calls);
    let _ = writeln!(out, "  Records:     {}", summary.count);
    out
}

pub fn policy_table(rules: &[PolicyRule]) -> String {
    let mut out = String::new();
    let _ = writeln!(
        out,
        "{:<14} {:<12} {:<24} {:<14}",
        "ID", "TYPE", "VALUE", "SCOPE"
    );
    for rule in rules {
        let scope = if rule.is_global() {
            "global".dimmed().to_string()
        } else {
            rule.agent_id.clone()
        };
        let _ = writeln!(
            out,
            "{:<14} {:<12} {:<24} {}",
            rule.id,
            rule.rule_type.as_str(),
            rule.value,
            scope
        );
    }
    out
}

pub fn policy_result(result: &PolicyResult) -> String {
    let verdict = if result.allowed {
        "✓ Allowed".green()
    } else {
        "✗ Denied".red().bold()
    };
    match &result.policy_id {
        Some(id) => format!("{}: {} (policy {})", verdict, result.reason, id),
        None => format!("{}: {}", verdict, result.reason),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use agentmolt_core::domain::policy::RuleType;

    fn plain() {
        colored::control::set_override(false);
    }

    #[test]
    fn test_agent_table_has_one_row_per_agent() {
        plain();
        let agents = vec![
            Agent::new("alpha", "gpt-4", Metadata::new()),
            Agent::new("beta", "", Metadata::new()),
        ];
        let table = agent_table(&agents);

        assert_eq!(table.lines().count(), 3);
        assert!(table.lines().next().unwrap().starts_with("ID"));
        assert!(table.contains("alpha"));
        assert!(table.contains("idle"));
    }

    #[test]
    fn test_policy_result_mentions_policy_id() {
        plain();
        let denied = PolicyResult::deny("Action 'rm' is denied by policy p1", Some("p1".into()));
        assert_eq!(
            policy_result(&denied),
            "✗ Denied: Action 'rm' is denied by policy p1 (policy p1)"
        );
        assert_eq!(policy_result(&PolicyResult::allow()), "✓ Allowed: allowed");
    }

    #[test]
    fn test_policy_table_marks_global_rules() {
        plain();
        let rule = PolicyRule {
            id: "p1".into(),
            rule_type: RuleType::CostLimit,
            value: "10".into(),
            agent_id: String::new(),
            created_at: None,
        };
        let table = policy_table(&[rule]);
        assert!(table.contains("cost_limit"));
        assert!(table.contains("global"));
    }
}
