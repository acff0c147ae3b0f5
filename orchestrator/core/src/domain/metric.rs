// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::agent::Metadata;

/// One resource-consumption delta attributed to an agent.
///
/// Metric rows are never updated in place; running totals are derived by
/// summing every row of an agent (see [`MetricsSummary`]).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Metric {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub agent_id: String,
    #[serde(default)]
    pub tokens_used: u64,
    #[serde(default)]
    pub cost: f64,
    #[serde(default)]
    pub tool_calls: u64,
    #[serde(default)]
    pub files_accessed: u64,
    #[serde(default)]
    pub metadata: Metadata,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

/// Request to append a metric delta. Serializes as the `POST /api/v1/metrics` payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewMetric {
    pub agent_id: String,
    #[serde(default)]
    pub tokens_used: u64,
    #[serde(default)]
    pub cost: f64,
    #[serde(default)]
    pub tool_calls: u64,
    #[serde(default)]
    pub files_accessed: u64,
    #[serde(default)]
    pub metadata: Metadata,
}

impl NewMetric {
    pub fn new(agent_id: impl Into<String>) -> Self {
        Self {
            agent_id: agent_id.into(),
            tokens_used: 0,
            cost: 0.0,
            tool_calls: 0,
            files_accessed: 0,
            metadata: Metadata::new(),
        }
    }

    pub fn tokens_used(mut self, tokens: u64) -> Self {
        self.tokens_used = tokens;
        self
    }

    pub fn cost(mut self, cost: f64) -> Self {
        self.cost = cost;
        self
    }

    pub fn tool_calls(mut self, calls: u64) -> Self {
        self.tool_calls = calls;
        self
    }

    pub fn files_accessed(mut self, files: u64) -> Self {
        self.files_accessed = files;
        self
    }

    pub fn metadata(mut self, metadata: Metadata) -> Self {
        self.metadata = metadata;
        self
    }

    /// Cost must be a finite, non-negative amount.
    pub fn validate(&self) -> Result<(), String> {
        if !self.cost.is_finite() || self.cost < 0.0 {
            return Err(format!(
                "metric cost must be a finite non-negative number, got {}",
                self.cost
            ));
        }
        Ok(())
    }

    pub fn into_metric(self, id: String, created_at: DateTime<Utc>) -> Metric {
        Metric {
            id,
            agent_id: self.agent_id,
            tokens_used: self.tokens_used,
            cost: self.cost,
            tool_calls: self.tool_calls,
            files_accessed: self.files_accessed,
            metadata: self.metadata,
            created_at: Some(created_at),
        }
    }
}

/// Accumulated totals over every metric row of one agent.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct MetricsSummary {
    #[serde(default)]
    pub tokens_used: u64,
    #[serde(default)]
    pub cost: f64,
    #[serde(default)]
    pub tool_calls: u64,
    #[serde(default)]
    pub count: u64,
}
