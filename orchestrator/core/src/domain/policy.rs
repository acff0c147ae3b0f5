// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

use crate::domain::error::ControlPlaneError;

#[derive(Debug, Error, PartialEq)]
pub enum PolicyError {
    #[error("Unknown rule type: {0}")]
    UnknownRuleType(String),

    #[error("Rule value must not be empty for {0} rules")]
    EmptyValue(RuleType),

    #[error("Invalid {rule_type} value '{value}': {reason}")]
    InvalidLimit {
        rule_type: RuleType,
        value: String,
        reason: String,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RuleType {
    Allowlist,
    Denylist,
    CostLimit,
    TokenLimit,
}

impl RuleType {
    pub fn as_str(&self) -> &'static str {
        match self {
            RuleType::Allowlist => "allowlist",
            RuleType::Denylist => "denylist",
            RuleType::CostLimit => "cost_limit",
            RuleType::TokenLimit => "token_limit",
        }
    }

    /// Check a rule value before it is persisted.
    ///
    /// Allow/deny rules need a non-empty action name. Limit rules need a
    /// threshold that the evaluator can parse: a finite non-negative real for
    /// `cost_limit`, a non-negative integer for `token_limit`.
    pub fn validate_value(&self, value: &str) -> Result<(), PolicyError> {
        match self {
            RuleType::Allowlist | RuleType::Denylist => {
                if value.is_empty() {
                    return Err(PolicyError::EmptyValue(*self));
                }
                Ok(())
            }
            RuleType::CostLimit => parse_cost_limit(value).map(|_| ()),
            RuleType::TokenLimit => parse_token_limit(value).map(|_| ()),
        }
    }
}

impl fmt::Display for RuleType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RuleType {
    type Err = PolicyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "allowlist" => Ok(RuleType::Allowlist),
            "denylist" => Ok(RuleType::Denylist),
            "cost_limit" => Ok(RuleType::CostLimit),
            "token_limit" => Ok(RuleType::TokenLimit),
            other => Err(PolicyError::UnknownRuleType(other.to_string())),
        }
    }
}

pub fn parse_cost_limit(value: &str) -> Result<f64, PolicyError> {
    let invalid = |reason: &str| PolicyError::InvalidLimit {
        rule_type: RuleType::CostLimit,
        value: value.to_string(),
        reason: reason.to_string(),
    };
    let limit: f64 = value.trim().parse().map_err(|_| invalid("not a number"))?;
    if !limit.is_finite() || limit < 0.0 {
        return Err(invalid("must be a finite non-negative number"));
    }
    Ok(limit)
}

pub fn parse_token_limit(value: &str) -> Result<u64, PolicyError> {
    value.trim().parse().map_err(|_| PolicyError::InvalidLimit {
        rule_type: RuleType::TokenLimit,
        value: value.to_string(),
        reason: "must be a non-negative integer".to_string(),
    })
}

/// A persisted governance rule. An empty `agent_id` scopes the rule globally.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PolicyRule {
    pub id: String,
    pub rule_type: RuleType,
    pub value: String,
    #[serde(default)]
    pub agent_id: String,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

impl PolicyRule {
    pub fn is_global(&self) -> bool {
        self.agent_id.is_empty()
    }

    pub fn applies_to(&self, agent_id: &str) -> bool {
        self.is_global() || self.agent_id == agent_id
    }
}

/// Request to add a rule. Serializes as the `POST /api/v1/policies` payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewPolicyRule {
    pub rule_type: RuleType,
    pub value: String,
    #[serde(default)]
    pub agent_id: String,
}

impl NewPolicyRule {
    pub fn global(rule_type: RuleType, value: impl Into<String>) -> Self {
        Self {
            rule_type,
            value: value.into(),
            agent_id: String::new(),
        }
    }

    pub fn for_agent(rule_type: RuleType, value: impl Into<String>, agent_id: impl Into<String>) -> Self {
        Self {
            rule_type,
            value: value.into(),
            agent_id: agent_id.into(),
        }
    }
}

/// Outcome of a policy check. A denial is data, not an error.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PolicyResult {
    #[serde(default)]
    pub allowed: bool,
    #[serde(default)]
    pub reason: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub policy_id: Option<String>,
}

impl PolicyResult {
    pub fn allow() -> Self {
        Self {
            allowed: true,
            reason: "allowed".to_string(),
            policy_id: None,
        }
    }

    pub fn deny(reason: impl Into<String>, policy_id: Option<String>) -> Self {
        Self {
            allowed: false,
            reason: reason.into(),
            policy_id,
        }
    }

    /// Turn a denial into a hard [`ControlPlaneError::PolicyDenied`] failure.
    pub fn enforce(self) -> Result<Self, ControlPlaneError> {
        if self.allowed {
            Ok(self)
        } else {
            Err(ControlPlaneError::PolicyDenied {
                reason: self.reason,
                policy_id: self.policy_id,
            })
        }
    }
}
