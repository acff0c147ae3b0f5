// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! # Domain Repository Interface
//!
//! Persistence contract for the four control-plane entity kinds. The trait
//! lives in the domain layer; the SQLite implementation lives in
//! `crate::infrastructure::repositories`.
//!
//! | Entity | Write | Read |
//! |--------|-------|------|
//! | `Agent` | `create_agent`, `update_agent_status`, `kill_agent` | `get_agent`, `list_agents` |
//! | `Event` | `create_event` | `list_events` |
//! | `Metric` | `create_metric` | `summarize_metrics` |
//! | `PolicyRule` | `add_policy_rule` | `list_policy_rules` |
//!
//! Implementations serialize every operation (reads included) through a
//! single exclusion domain per store instance.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::domain::agent::{Agent, AgentStatus, KillReceipt, Metadata};
use crate::domain::events::{Event, NewEvent};
use crate::domain::metric::{Metric, MetricsSummary, NewMetric};
use crate::domain::policy::{NewPolicyRule, PolicyError, PolicyRule};

/// Row counts per table.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreStats {
    pub agents: u64,
    pub events: u64,
    pub metrics: u64,
    pub policies: u64,
}

#[async_trait]
pub trait ControlPlaneStore: Send + Sync {
    /// Insert a fresh agent with status `idle`.
    async fn create_agent(
        &self,
        name: &str,
        model: &str,
        metadata: &Metadata,
    ) -> Result<Agent, RepositoryError>;

    async fn get_agent(&self, id: &str) -> Result<Option<Agent>, RepositoryError>;

    /// All agents, newest first
    async fn list_agents(&self) -> Result<Vec<Agent>, RepositoryError>;

    /// Returns `None` when the agent does not exist.
    async fn update_agent_status(
        &self,
        id: &str,
        status: AgentStatus,
    ) -> Result<Option<Agent>, RepositoryError>;

    /// Set status to `killed`. Fails with `NotFound` for unknown ids.
    async fn kill_agent(&self, id: &str) -> Result<KillReceipt, RepositoryError>;

    async fn create_event(&self, event: NewEvent) -> Result<Event, RepositoryError>;

    /// Events of one agent, newest first
    async fn list_events(&self, agent_id: &str) -> Result<Vec<Event>, RepositoryError>;

    async fn create_metric(&self, metric: NewMetric) -> Result<Metric, RepositoryError>;

    /// Sum every metric row of the agent. Zeros when there are none.
    async fn summarize_metrics(&self, agent_id: &str) -> Result<MetricsSummary, RepositoryError>;

    /// Validates the rule value before persisting it.
    async fn add_policy_rule(&self, rule: NewPolicyRule) -> Result<PolicyRule, RepositoryError>;

    /// `Some(agent)` returns global rules plus that agent's rules; `None`
    /// returns every rule. Creation order.
    async fn list_policy_rules(
        &self,
        agent_id: Option<&str>,
    ) -> Result<Vec<PolicyRule>, RepositoryError>;

    async fn stats(&self) -> Result<StoreStats, RepositoryError>;
}

/// Repository errors
#[derive(Debug, thiserror::Error)]
pub enum RepositoryError {
    #[error("{0}")]
    NotFound(String),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Invalid policy rule: {0}")]
    InvalidRule(#[from] PolicyError),
}

impl From<sqlx::Error> for RepositoryError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::RowNotFound => RepositoryError::NotFound("Row not found".to_string()),
            _ => RepositoryError::Database(err.to_string()),
        }
    }
}

impl From<serde_json::Error> for RepositoryError {
    fn from(err: serde_json::Error) -> Self {
        RepositoryError::Serialization(err.to_string())
    }
}
