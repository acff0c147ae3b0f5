// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! # Policy Evaluator
//!
//! Decides whether an agent may perform an action, from the rules in scope
//! (global plus agent-specific) and the agent's accumulated metrics.
//!
//! Passes run in strict precedence; the first decisive rule wins:
//!
//! 1. **denylist**: a rule whose value equals the action denies.
//! 2. **allowlist**: when any allowlist rule is in scope the action must be
//!    listed, otherwise deny (attributed to the first allowlist rule).
//! 3. **cost_limit**: accumulated cost at or above the threshold denies.
//! 4. **token_limit**: accumulated tokens at or above the threshold denies.
//!
//! Nothing fired means allow. The evaluator never returns an error: a store
//! failure or a malformed stored threshold fails closed.

use std::sync::Arc;
use tracing::{debug, warn};

use crate::domain::metric::MetricsSummary;
use crate::domain::policy::{parse_cost_limit, parse_token_limit, PolicyResult, PolicyRule, RuleType};
use crate::domain::repository::{ControlPlaneStore, RepositoryError};

pub struct PolicyEvaluator {
    store: Arc<dyn ControlPlaneStore>,
}

impl PolicyEvaluator {
    pub fn new(store: Arc<dyn ControlPlaneStore>) -> Self {
        Self { store }
    }

    pub async fn evaluate(&self, agent_id: &str, action: &str) -> PolicyResult {
        match self.try_evaluate(agent_id, action).await {
            Ok(result) => {
                debug!(agent_id = %agent_id, action = %action, allowed = result.allowed, "Policy evaluated");
                result
            }
            Err(e) => {
                warn!(agent_id = %agent_id, action = %action, "Policy evaluation failed, denying: {}", e);
                PolicyResult::deny(format!("Policy evaluation failed: {}", e), None)
            }
        }
    }

    async fn try_evaluate(&self, agent_id: &str, action: &str) -> Result<PolicyResult, RepositoryError> {
        let mut rules = self.store.list_policy_rules(Some(agent_id)).await?;
        rules.retain(|rule| rule.applies_to(agent_id));

        if let Some(rule) = of_type(&rules, RuleType::Denylist)
            .into_iter()
            .find(|r| r.value == action)
        {
            return Ok(PolicyResult::deny(
                format!("Action '{}' is denied by policy {}", action, rule.id),
                Some(rule.id.clone()),
            ));
        }

        let allowlist = of_type(&rules, RuleType::Allowlist);
        if let Some(first) = allowlist.first() {
            if !allowlist.iter().any(|r| r.value == action) {
                return Ok(PolicyResult::deny(
                    format!("Action '{}' not in allowlist", action),
                    Some(first.id.clone()),
                ));
            }
        }

        // Summed at most once per evaluation, and only when a limit rule exists
        let mut summary: Option<MetricsSummary> = None;

        for rule in of_type(&rules, RuleType::CostLimit) {
            let limit = match parse_cost_limit(&rule.value) {
                Ok(limit) => limit,
                Err(_) => return Ok(malformed(rule)),
            };
            let totals = self.summary(agent_id, &mut summary).await?;
            if totals.cost >= limit {
                return Ok(PolicyResult::deny(
                    format!("Cost limit ${:.2} exceeded (${:.2})", limit, totals.cost),
                    Some(rule.id.clone()),
                ));
            }
        }

        for rule in of_type(&rules, RuleType::TokenLimit) {
            let limit = match parse_token_limit(&rule.value) {
                Ok(limit) => limit,
                Err(_) => return Ok(malformed(rule)),
            };
            let totals = self.summary(agent_id, &mut summary).await?;
            if totals.tokens_used >= limit {
                return Ok(PolicyResult::deny(
                    format!("Token limit {} exceeded ({})", limit, totals.tokens_used),
                    Some(rule.id.clone()),
                ));
            }
        }

        Ok(PolicyResult::allow())
    }

    async fn summary(
        &self,
        agent_id: &str,
        cached: &mut Option<MetricsSummary>,
    ) -> Result<MetricsSummary, RepositoryError> {
        if let Some(summary) = cached {
            return Ok(*summary);
        }
        let summary = self.store.summarize_metrics(agent_id).await?;
        *cached = Some(summary);
        Ok(summary)
    }
}

/// Rules of one type, in listing order.
fn of_type(rules: &[PolicyRule], rule_type: RuleType) -> Vec<&PolicyRule> {
    rules.iter().filter(|r| r.rule_type == rule_type).collect()
}

fn malformed(rule: &PolicyRule) -> PolicyResult {
    warn!(policy_id = %rule.id, "Malformed {} value '{}'", rule.rule_type, rule.value);
    PolicyResult::deny(
        format!(
            "Malformed {} value '{}' in policy {}",
            rule.rule_type, rule.value, rule.id
        ),
        Some(rule.id.clone()),
    )
}
