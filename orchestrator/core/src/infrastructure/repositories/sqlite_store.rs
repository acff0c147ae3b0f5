// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! # SQLite Control-Plane Store
//!
//! `ControlPlaneStore` backed by a single SQLite connection. Translates
//! between the domain entities and the `agents`, `events`, `metrics` and
//! `policies` tables. Metadata columns hold serialized JSON; timestamps hold
//! fixed-width RFC 3339 text so string order is chronological order.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::sqlite::SqliteRow;
use sqlx::Row;
use std::path::Path;

use crate::domain::agent::{now, short_id, timestamp_text, Agent, AgentStatus, KillReceipt, Metadata};
use crate::domain::events::{Event, NewEvent};
use crate::domain::metric::{Metric, MetricsSummary, NewMetric};
use crate::domain::policy::{NewPolicyRule, PolicyRule};
use crate::domain::repository::{ControlPlaneStore, RepositoryError, StoreStats};
use crate::infrastructure::db::Database;

pub struct SqliteStore {
    db: Database,
}

impl SqliteStore {
    pub async fn open(path: impl AsRef<Path>) -> Result<Self, RepositoryError> {
        Ok(Self {
            db: Database::open(path.as_ref()).await?,
        })
    }

    pub async fn in_memory() -> Result<Self, RepositoryError> {
        Ok(Self {
            db: Database::in_memory().await?,
        })
    }

    /// Persist a rule without validating its value.
    #[cfg(test)]
    pub(crate) async fn insert_rule_unchecked(
        &self,
        id: &str,
        rule_type: crate::domain::policy::RuleType,
        value: &str,
        agent_id: &str,
    ) -> Result<(), RepositoryError> {
        let mut conn = self.db.lock().await;
        sqlx::query(
            "INSERT INTO policies (id, rule_type, value, agent_id, created_at) VALUES (?, ?, ?, ?, ?)",
        )
        .bind(id)
        .bind(rule_type.as_str())
        .bind(value)
        .bind(agent_id)
        .bind(timestamp_text(now()))
        .execute(&mut *conn)
        .await?;
        Ok(())
    }
}

fn parse_timestamp(text: &str) -> Result<DateTime<Utc>, RepositoryError> {
    DateTime::parse_from_rfc3339(text)
        .map(|t| t.with_timezone(&Utc))
        .map_err(|e| RepositoryError::Serialization(format!("Invalid timestamp '{}': {}", text, e)))
}

fn parse_metadata(text: &str) -> Result<Metadata, RepositoryError> {
    if text.is_empty() {
        return Ok(Metadata::new());
    }
    Ok(serde_json::from_str(text)?)
}

fn to_sql_int(field: &str, value: u64) -> Result<i64, RepositoryError> {
    i64::try_from(value)
        .map_err(|_| RepositoryError::Serialization(format!("{} out of range: {}", field, value)))
}

fn from_sql_int(value: i64) -> u64 {
    u64::try_from(value).unwrap_or(0)
}

fn agent_from_row(row: &SqliteRow) -> Result<Agent, RepositoryError> {
    let status: String = row.try_get("status")?;
    let metadata: String = row.try_get("metadata")?;
    let created_at: String = row.try_get("created_at")?;
    let updated_at: String = row.try_get("updated_at")?;

    Ok(Agent {
        id: row.try_get("id")?,
        name: row.try_get("name")?,
        model: row.try_get("model")?,
        status: status.parse().map_err(RepositoryError::Serialization)?,
        metadata: parse_metadata(&metadata)?,
        created_at: Some(parse_timestamp(&created_at)?),
        updated_at: Some(parse_timestamp(&updated_at)?),
    })
}

fn event_from_row(row: &SqliteRow) -> Result<Event, RepositoryError> {
    let metadata: String = row.try_get("metadata")?;
    let created_at: String = row.try_get("created_at")?;

    Ok(Event {
        id: row.try_get("id")?,
        agent_id: row.try_get("agent_id")?,
        action: row.try_get("action")?,
        target: row.try_get("target")?,
        status: row.try_get("status")?,
        metadata: parse_metadata(&metadata)?,
        created_at: Some(parse_timestamp(&created_at)?),
    })
}

fn policy_from_row(row: &SqliteRow) -> Result<PolicyRule, RepositoryError> {
    let rule_type: String = row.try_get("rule_type")?;
    let created_at: String = row.try_get("created_at")?;

    Ok(PolicyRule {
        id: row.try_get("id")?,
        rule_type: rule_type
            .parse()
            .map_err(|e: crate::domain::policy::PolicyError| RepositoryError::Serialization(e.to_string()))?,
        value: row.try_get("value")?,
        agent_id: row.try_get("agent_id")?,
        created_at: Some(parse_timestamp(&created_at)?),
    })
}

const AGENT_COLUMNS: &str = "id, name, model, status, metadata, created_at, updated_at";

#[async_trait]
impl ControlPlaneStore for SqliteStore {
    async fn create_agent(
        &self,
        name: &str,
        model: &str,
        metadata: &Metadata,
    ) -> Result<Agent, RepositoryError> {
        let agent = Agent::new(name, model, metadata.clone());
        let stamp = timestamp_text(agent.created_at.unwrap_or_else(now));
        let metadata_json = serde_json::to_string(&agent.metadata)?;

        let mut conn = self.db.lock().await;
        sqlx::query(
            r#"
            INSERT INTO agents (id, name, model, status, metadata, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&agent.id)
        .bind(&agent.name)
        .bind(&agent.model)
        .bind(agent.status.as_str())
        .bind(metadata_json)
        .bind(&stamp)
        .bind(&stamp)
        .execute(&mut *conn)
        .await
        .map_err(|e| RepositoryError::Database(format!("Failed to create agent: {}", e)))?;

        Ok(agent)
    }

    async fn get_agent(&self, id: &str) -> Result<Option<Agent>, RepositoryError> {
        let mut conn = self.db.lock().await;
        let row = sqlx::query(&format!("SELECT {} FROM agents WHERE id = ?", AGENT_COLUMNS))
            .bind(id)
            .fetch_optional(&mut *conn)
            .await?;

        row.as_ref().map(agent_from_row).transpose()
    }

    async fn list_agents(&self) -> Result<Vec<Agent>, RepositoryError> {
        let mut conn = self.db.lock().await;
        let rows = sqlx::query(&format!(
            "SELECT {} FROM agents ORDER BY created_at DESC, rowid DESC",
            AGENT_COLUMNS
        ))
        .fetch_all(&mut *conn)
        .await?;

        rows.iter().map(agent_from_row).collect()
    }

    async fn update_agent_status(
        &self,
        id: &str,
        status: AgentStatus,
    ) -> Result<Option<Agent>, RepositoryError> {
        let mut conn = self.db.lock().await;
        let updated = sqlx::query("UPDATE agents SET status = ?, updated_at = ? WHERE id = ?")
            .bind(status.as_str())
            .bind(timestamp_text(now()))
            .bind(id)
            .execute(&mut *conn)
            .await?;

        if updated.rows_affected() == 0 {
            return Ok(None);
        }

        let row = sqlx::query(&format!("SELECT {} FROM agents WHERE id = ?", AGENT_COLUMNS))
            .bind(id)
            .fetch_optional(&mut *conn)
            .await?;

        row.as_ref().map(agent_from_row).transpose()
    }

    async fn kill_agent(&self, id: &str) -> Result<KillReceipt, RepositoryError> {
        let mut conn = self.db.lock().await;
        let updated = sqlx::query("UPDATE agents SET status = ?, updated_at = ? WHERE id = ?")
            .bind(AgentStatus::Killed.as_str())
            .bind(timestamp_text(now()))
            .bind(id)
            .execute(&mut *conn)
            .await?;

        if updated.rows_affected() == 0 {
            return Err(RepositoryError::NotFound(format!("Agent {} not found", id)));
        }
        Ok(KillReceipt::new(id))
    }

    async fn create_event(&self, event: NewEvent) -> Result<Event, RepositoryError> {
        let event = event.into_event(short_id(), now());
        let metadata_json = serde_json::to_string(&event.metadata)?;
        let created_at = timestamp_text(event.created_at.unwrap_or_else(now));

        let mut conn = self.db.lock().await;
        sqlx::query(
            r#"
            INSERT INTO events (id, agent_id, action, target, status, metadata, created_at)
            VALUES (?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&event.id)
        .bind(&event.agent_id)
        .bind(&event.action)
        .bind(&event.target)
        .bind(&event.status)
        .bind(metadata_json)
        .bind(created_at)
        .execute(&mut *conn)
        .await
        .map_err(|e| RepositoryError::Database(format!("Failed to create event: {}", e)))?;

        Ok(event)
    }

    async fn list_events(&self, agent_id: &str) -> Result<Vec<Event>, RepositoryError> {
        let mut conn = self.db.lock().await;
        let rows = sqlx::query(
            r#"
            SELECT id, agent_id, action, target, status, metadata, created_at
            FROM events
            WHERE agent_id = ?
            ORDER BY created_at DESC, rowid DESC
            "#,
        )
        .bind(agent_id)
        .fetch_all(&mut *conn)
        .await?;

        rows.iter().map(event_from_row).collect()
    }

    async fn create_metric(&self, metric: NewMetric) -> Result<Metric, RepositoryError> {
        let metric = metric.into_metric(short_id(), now());
        let metadata_json = serde_json::to_string(&metric.metadata)?;
        let created_at = timestamp_text(metric.created_at.unwrap_or_else(now));

        let mut conn = self.db.lock().await;
        sqlx::query(
            r#"
            INSERT INTO metrics (id, agent_id, tokens_used, cost, tool_calls, files_accessed, metadata, created_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&metric.id)
        .bind(&metric.agent_id)
        .bind(to_sql_int("tokens_used", metric.tokens_used)?)
        .bind(metric.cost)
        .bind(to_sql_int("tool_calls", metric.tool_calls)?)
        .bind(to_sql_int("files_accessed", metric.files_accessed)?)
        .bind(metadata_json)
        .bind(created_at)
        .execute(&mut *conn)
        .await
        .map_err(|e| RepositoryError::Database(format!("Failed to create metric: {}", e)))?;

        Ok(metric)
    }

    async fn summarize_metrics(&self, agent_id: &str) -> Result<MetricsSummary, RepositoryError> {
        let mut conn = self.db.lock().await;
        let row = sqlx::query(
            r#"
            SELECT
                COALESCE(SUM(tokens_used), 0) AS tokens_used,
                TOTAL(cost) AS cost,
                COALESCE(SUM(tool_calls), 0) AS tool_calls,
                COUNT(*) AS count
            FROM metrics
            WHERE agent_id = ?
            "#,
        )
        .bind(agent_id)
        .fetch_one(&mut *conn)
        .await?;

        Ok(MetricsSummary {
            tokens_used: from_sql_int(row.try_get("tokens_used")?),
            cost: row.try_get("cost")?,
            tool_calls: from_sql_int(row.try_get("tool_calls")?),
            count: from_sql_int(row.try_get("count")?),
        })
    }

    async fn add_policy_rule(&self, rule: NewPolicyRule) -> Result<PolicyRule, RepositoryError> {
        rule.rule_type.validate_value(&rule.value)?;

        let policy = PolicyRule {
            id: short_id(),
            rule_type: rule.rule_type,
            value: rule.value,
            agent_id: rule.agent_id,
            created_at: Some(now()),
        };
        let created_at = timestamp_text(policy.created_at.unwrap_or_else(now));

        let mut conn = self.db.lock().await;
        sqlx::query(
            "INSERT INTO policies (id, rule_type, value, agent_id, created_at) VALUES (?, ?, ?, ?, ?)",
        )
        .bind(&policy.id)
        .bind(policy.rule_type.as_str())
        .bind(&policy.value)
        .bind(&policy.agent_id)
        .bind(created_at)
        .execute(&mut *conn)
        .await
        .map_err(|e| RepositoryError::Database(format!("Failed to add policy: {}", e)))?;

        Ok(policy)
    }

    async fn list_policy_rules(
        &self,
        agent_id: Option<&str>,
    ) -> Result<Vec<PolicyRule>, RepositoryError> {
        let mut conn = self.db.lock().await;
        let rows = match agent_id.filter(|id| !id.is_empty()) {
            Some(id) => {
                sqlx::query(
                    r#"
                    SELECT id, rule_type, value, agent_id, created_at
                    FROM policies
                    WHERE agent_id = ? OR agent_id = ''
                    ORDER BY created_at, rowid
                    "#,
                )
                .bind(id)
                .fetch_all(&mut *conn)
                .await?
            }
            None => {
                sqlx::query(
                    "SELECT id, rule_type, value, agent_id, created_at FROM policies ORDER BY created_at, rowid",
                )
                .fetch_all(&mut *conn)
                .await?
            }
        };

        rows.iter().map(policy_from_row).collect()
    }

    async fn stats(&self) -> Result<StoreStats, RepositoryError> {
        let mut conn = self.db.lock().await;
        let row = sqlx::query(
            r#"
            SELECT
                (SELECT COUNT(*) FROM agents) AS agents,
                (SELECT COUNT(*) FROM events) AS events,
                (SELECT COUNT(*) FROM metrics) AS metrics,
                (SELECT COUNT(*) FROM policies) AS policies
            "#,
        )
        .fetch_one(&mut *conn)
        .await?;

        Ok(StoreStats {
            agents: from_sql_int(row.try_get("agents")?),
            events: from_sql_int(row.try_get("events")?),
            metrics: from_sql_int(row.try_get("metrics")?),
            policies: from_sql_int(row.try_get("policies")?),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::policy::RuleType;
    use serde_json::json;

    fn metadata(value: serde_json::Value) -> Metadata {
        value.as_object().cloned().unwrap_or_default()
    }

    #[tokio::test]
    async fn test_create_and_get_agent() {
        let store = SqliteStore::in_memory().await.unwrap();
        let created = store
            .create_agent("bot", "gpt-4", &metadata(json!({"team": {"name": "core"}})))
            .await
            .unwrap();

        let fetched = store.get_agent(&created.id).await.unwrap().unwrap();
        assert_eq!(fetched.id, created.id);
        assert_eq!(fetched.name, "bot");
        assert_eq!(fetched.model, "gpt-4");
        assert_eq!(fetched.status, AgentStatus::Idle);
        assert_eq!(fetched.metadata["team"]["name"], "core");
        assert_eq!(fetched.created_at, fetched.updated_at);

        assert!(store.get_agent("missing").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_list_agents_newest_first() {
        let store = SqliteStore::in_memory().await.unwrap();
        let a = store.create_agent("a", "", &Metadata::new()).await.unwrap();
        let b = store.create_agent("b", "", &Metadata::new()).await.unwrap();
        let c = store.create_agent("c", "", &Metadata::new()).await.unwrap();

        let ids: Vec<String> = store
            .list_agents()
            .await
            .unwrap()
            .into_iter()
            .map(|a| a.id)
            .collect();
        assert_eq!(ids, vec![c.id, b.id, a.id]);
    }

    #[tokio::test]
    async fn test_update_status_and_kill() {
        let store = SqliteStore::in_memory().await.unwrap();
        let agent = store.create_agent("bot", "", &Metadata::new()).await.unwrap();

        let running = store
            .update_agent_status(&agent.id, AgentStatus::Running)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(running.status, AgentStatus::Running);
        assert!(running.updated_at >= agent.updated_at);

        assert!(store
            .update_agent_status("missing", AgentStatus::Running)
            .await
            .unwrap()
            .is_none());

        let receipt = store.kill_agent(&agent.id).await.unwrap();
        assert_eq!(receipt, KillReceipt::new(agent.id.clone()));
        let killed = store.get_agent(&agent.id).await.unwrap().unwrap();
        assert_eq!(killed.status, AgentStatus::Killed);

        assert!(matches!(
            store.kill_agent("missing").await,
            Err(RepositoryError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_events_are_scoped_and_ordered() {
        let store = SqliteStore::in_memory().await.unwrap();
        store
            .create_event(NewEvent::new("a1", "search").target("web"))
            .await
            .unwrap();
        let second = store
            .create_event(NewEvent::new("a1", "write").status("denied"))
            .await
            .unwrap();
        // Orphaned agent ids are accepted
        store.create_event(NewEvent::new("ghost", "read")).await.unwrap();

        let events = store.list_events("a1").await.unwrap();
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].id, second.id);
        assert_eq!(events[0].status, "denied");
        assert_eq!(events[1].target, "web");
        assert_eq!(events[1].status, "allowed");
    }

    #[tokio::test]
    async fn test_metric_summation() {
        let store = SqliteStore::in_memory().await.unwrap();
        assert_eq!(
            store.summarize_metrics("a1").await.unwrap(),
            MetricsSummary::default()
        );

        store
            .create_metric(NewMetric::new("a1").tokens_used(100).cost(0.25).tool_calls(1))
            .await
            .unwrap();
        store
            .create_metric(NewMetric::new("a1").tokens_used(50).cost(0.5).files_accessed(3))
            .await
            .unwrap();
        store
            .create_metric(NewMetric::new("a2").tokens_used(7))
            .await
            .unwrap();

        let summary = store.summarize_metrics("a1").await.unwrap();
        assert_eq!(summary.tokens_used, 150);
        assert!((summary.cost - 0.75).abs() < 1e-9);
        assert_eq!(summary.tool_calls, 1);
        assert_eq!(summary.count, 2);
    }

    #[tokio::test]
    async fn test_policy_scoping_and_validation() {
        let store = SqliteStore::in_memory().await.unwrap();
        let global = store
            .add_policy_rule(NewPolicyRule::global(RuleType::Denylist, "rm"))
            .await
            .unwrap();
        let scoped = store
            .add_policy_rule(NewPolicyRule::for_agent(RuleType::TokenLimit, "10", "a1"))
            .await
            .unwrap();
        store
            .add_policy_rule(NewPolicyRule::for_agent(RuleType::Allowlist, "x", "a2"))
            .await
            .unwrap();

        let for_a1: Vec<String> = store
            .list_policy_rules(Some("a1"))
            .await
            .unwrap()
            .into_iter()
            .map(|r| r.id)
            .collect();
        assert_eq!(for_a1, vec![global.id, scoped.id]);
        assert_eq!(store.list_policy_rules(None).await.unwrap().len(), 3);
        assert_eq!(store.list_policy_rules(Some("")).await.unwrap().len(), 3);

        let err = store
            .add_policy_rule(NewPolicyRule::global(RuleType::CostLimit, "abc"))
            .await
            .unwrap_err();
        assert!(matches!(err, RepositoryError::InvalidRule(_)));
        assert_eq!(store.stats().await.unwrap().policies, 3);
    }

    #[tokio::test]
    async fn test_stats() {
        let store = SqliteStore::in_memory().await.unwrap();
        let agent = store.create_agent("bot", "", &Metadata::new()).await.unwrap();
        store.create_event(NewEvent::new(&agent.id, "a")).await.unwrap();
        store.create_metric(NewMetric::new(&agent.id)).await.unwrap();

        assert_eq!(
            store.stats().await.unwrap(),
            StoreStats {
                agents: 1,
                events: 1,
                metrics: 1,
                policies: 0,
            }
        );
    }
}
