// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! # Local Control Plane
//!
//! The durable backend: a [`ControlPlaneStore`] plus a [`PolicyEvaluator`]
//! behind the [`ControlPlane`] contract. Runs entirely in-process, so the
//! only failures are unknown ids, invalid input and storage errors; none of
//! them are retried.
//!
//! Hooks fire around every operation with the same method and path the HTTP
//! backend would use. Post hooks only run when the operation succeeded.

use async_trait::async_trait;
use serde::Serialize;
use serde_json::{json, Value};
use std::future::Future;
use std::path::Path;
use std::sync::Arc;
use tracing::info;

use crate::application::control_plane::{ControlPlane, Result, Route};
use crate::application::hooks::{Hook, HookRegistry, HookStage};
use crate::application::policy::PolicyEvaluator;
use crate::domain::agent::{Agent, AgentStatus, KillReceipt, Metadata};
use crate::domain::error::ControlPlaneError;
use crate::domain::events::{Event, NewEvent};
use crate::domain::metric::{Metric, MetricsSummary, NewMetric};
use crate::domain::policy::{NewPolicyRule, PolicyResult, PolicyRule};
use crate::domain::repository::{ControlPlaneStore, StoreStats};
use crate::infrastructure::repositories::SqliteStore;

pub struct LocalControlPlane {
    store: Arc<dyn ControlPlaneStore>,
    evaluator: PolicyEvaluator,
    hooks: HookRegistry,
}

impl LocalControlPlane {
    pub fn new(store: Arc<dyn ControlPlaneStore>) -> Self {
        Self {
            evaluator: PolicyEvaluator::new(store.clone()),
            store,
            hooks: HookRegistry::new(),
        }
    }

    /// Open (or create) the SQLite database at `path`.
    pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
        let store = SqliteStore::open(path).await?;
        Ok(Self::new(Arc::new(store)))
    }

    pub async fn in_memory() -> Result<Self> {
        let store = SqliteStore::in_memory().await?;
        Ok(Self::new(Arc::new(store)))
    }

    pub fn store(&self) -> &Arc<dyn ControlPlaneStore> {
        &self.store
    }

    /// Row counts of every table.
    pub async fn stats(&self) -> Result<StoreStats> {
        Ok(self.store.stats().await?)
    }

    async fn require_agent(&self, agent_id: &str) -> Result<Agent> {
        self.store
            .get_agent(agent_id)
            .await?
            .ok_or_else(|| ControlPlaneError::agent_not_found(agent_id))
    }

    /// Run `op` between the pre and post hooks of `route`.
    async fn observe<T, F>(&self, route: Route, payload: Option<Value>, op: F) -> Result<T>
    where
        T: Serialize,
        F: Future<Output = Result<T>> + Send,
    {
        let method = route.method.as_str();
        self.hooks.run_pre(method, &route.path, payload.as_ref());

        let output = op.await?;

        if self.hooks.len(HookStage::Post) > 0 {
            let result = serde_json::to_value(&output)?;
            self.hooks
                .run_post(method, &route.path, payload.as_ref(), &result);
        }
        Ok(output)
    }
}

fn payload_of<T: Serialize>(value: &T) -> Result<Option<Value>> {
    Ok(Some(serde_json::to_value(value)?))
}

#[async_trait]
impl ControlPlane for LocalControlPlane {
    async fn register_agent(&self, name: &str, model: &str, metadata: Metadata) -> Result<Agent> {
        let payload = json!({"name": name, "model": model, "metadata": metadata});
        self.observe(Route::register_agent(), Some(payload), async {
            let agent = self.store.create_agent(name, model, &metadata).await?;
            info!(agent_id = %agent.id, "Registered agent {}", agent.name);
            Ok(agent)
        })
        .await
    }

    async fn list_agents(&self) -> Result<Vec<Agent>> {
        self.observe(Route::list_agents(), None, async {
            Ok(self.store.list_agents().await?)
        })
        .await
    }

    async fn get_agent(&self, agent_id: &str) -> Result<Agent> {
        self.observe(Route::get_agent(agent_id), None, self.require_agent(agent_id))
            .await
    }

    async fn update_status(&self, agent_id: &str, status: AgentStatus) -> Result<Agent> {
        let payload = json!({"status": status});
        self.observe(Route::update_status(agent_id), Some(payload), async {
            self.store
                .update_agent_status(agent_id, status)
                .await?
                .ok_or_else(|| ControlPlaneError::agent_not_found(agent_id))
        })
        .await
    }

    async fn kill(&self, agent_id: &str) -> Result<KillReceipt> {
        self.observe(Route::kill(agent_id), None, async {
            let receipt = self.store.kill_agent(agent_id).await?;
            info!(agent_id = %agent_id, "Agent killed");
            Ok(receipt)
        })
        .await
    }

    async fn log_event(&self, event: NewEvent) -> Result<Event> {
        let payload = payload_of(&event)?;
        self.observe(Route::log_event(), payload, async {
            Ok(self.store.create_event(event).await?)
        })
        .await
    }

    async fn list_events(&self, agent_id: &str) -> Result<Vec<Event>> {
        self.observe(Route::list_events(agent_id), None, async {
            self.require_agent(agent_id).await?;
            Ok(self.store.list_events(agent_id).await?)
        })
        .await
    }

    async fn log_metric(&self, metric: NewMetric) -> Result<Metric> {
        let payload = payload_of(&metric)?;
        self.observe(Route::log_metric(), payload, async {
            metric.validate().map_err(ControlPlaneError::InvalidRequest)?;
            Ok(self.store.create_metric(metric).await?)
        })
        .await
    }

    async fn metrics_summary(&self, agent_id: &str) -> Result<MetricsSummary> {
        self.observe(Route::metrics_summary(agent_id), None, async {
            self.require_agent(agent_id).await?;
            Ok(self.store.summarize_metrics(agent_id).await?)
        })
        .await
    }

    async fn check_policy(&self, agent_id: &str, action: &str) -> Result<PolicyResult> {
        let payload = json!({"agent_id": agent_id, "action": action});
        self.observe(Route::check_policy(), Some(payload), async {
            Ok(self.evaluator.evaluate(agent_id, action).await)
        })
        .await
    }

    async fn add_policy(&self, rule: NewPolicyRule) -> Result<PolicyRule> {
        let payload = payload_of(&rule)?;
        self.observe(Route::add_policy(), payload, async {
            let rule = self.store.add_policy_rule(rule).await?;
            info!(policy_id = %rule.id, "Added {} policy '{}'", rule.rule_type, rule.value);
            Ok(rule)
        })
        .await
    }

    async fn list_policies(&self, agent_id: Option<&str>) -> Result<Vec<PolicyRule>> {
        self.observe(Route::list_policies(agent_id), None, async {
            Ok(self.store.list_policy_rules(agent_id).await?)
        })
        .await
    }

    fn add_hook(&self, hook: Hook) {
        self.hooks.add(hook);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::policy::RuleType;
    use parking_lot::Mutex;

    #[tokio::test]
    async fn test_not_found_on_unknown_agent() {
        let cp = LocalControlPlane::in_memory().await.unwrap();

        assert!(cp.get_agent("nope").await.unwrap_err().is_not_found());
        assert!(cp.kill("nope").await.unwrap_err().is_not_found());
        assert!(cp
            .update_status("nope", AgentStatus::Running)
            .await
            .unwrap_err()
            .is_not_found());
        assert!(cp.list_events("nope").await.unwrap_err().is_not_found());
        assert!(cp.metrics_summary("nope").await.unwrap_err().is_not_found());

        // Creates and policy checks never fail on unknown ids
        cp.log_event(NewEvent::new("nope", "search")).await.unwrap();
        cp.log_metric(NewMetric::new("nope").tokens_used(3)).await.unwrap();
        assert!(cp.check_policy("nope", "search").await.unwrap().allowed);
    }

    #[tokio::test]
    async fn test_kill_is_sticky() {
        let cp = LocalControlPlane::in_memory().await.unwrap();
        let agent = cp.register_agent("bot", "gpt-4", Metadata::new()).await.unwrap();
        cp.update_status(&agent.id, AgentStatus::Running).await.unwrap();

        let receipt = cp.kill(&agent.id).await.unwrap();
        assert_eq!(receipt.status, AgentStatus::Killed);
        assert_eq!(receipt.agent_id, agent.id);

        for _ in 0..2 {
            assert_eq!(cp.get_agent(&agent.id).await.unwrap().status, AgentStatus::Killed);
        }
    }

    #[tokio::test]
    async fn test_hooks_see_wire_routes() {
        let cp = LocalControlPlane::in_memory().await.unwrap();
        let seen: Arc<Mutex<Vec<String>>> = Arc::default();

        let pre_seen = seen.clone();
        cp.add_hook(Hook::pre(move |method, path, _| {
            pre_seen.lock().push(format!("pre {} {}", method, path));
        }));
        let post_seen = seen.clone();
        cp.add_hook(Hook::post(move |method, path, _, result| {
            post_seen
                .lock()
                .push(format!("post {} {} {}", method, path, result.is_object()));
        }));

        let agent = cp.register_agent("bot", "", Metadata::new()).await.unwrap();
        assert!(cp.get_agent("missing").await.is_err());

        let seen = seen.lock().clone();
        assert_eq!(
            seen,
            vec![
                "pre POST /api/v1/agents/register".to_string(),
                "post POST /api/v1/agents/register true".to_string(),
                "pre GET /api/v1/agents/missing".to_string(),
            ]
        );
        assert!(!agent.id.is_empty());
    }

    #[tokio::test]
    async fn test_invalid_input_is_rejected() {
        let cp = LocalControlPlane::in_memory().await.unwrap();

        let err = cp
            .add_policy(NewPolicyRule::global(RuleType::TokenLimit, "many"))
            .await
            .unwrap_err();
        assert!(matches!(err, ControlPlaneError::InvalidPolicy(_)));

        let err = cp
            .log_metric(NewMetric::new("a1").cost(-1.0))
            .await
            .unwrap_err();
        assert!(matches!(err, ControlPlaneError::InvalidRequest(_)));
    }

    #[tokio::test]
    async fn test_stats_and_summary() {
        let cp = LocalControlPlane::in_memory().await.unwrap();
        let agent = cp.register_agent("bot", "", Metadata::new()).await.unwrap();
        cp.log_metric(NewMetric::new(&agent.id).tokens_used(10).tool_calls(2))
            .await
            .unwrap();
        cp.log_metric(NewMetric::new(&agent.id).tokens_used(5))
            .await
            .unwrap();

        let summary = cp.metrics_summary(&agent.id).await.unwrap();
        assert_eq!(summary.tokens_used, 15);
        assert_eq!(summary.tool_calls, 2);
        assert_eq!(summary.count, 2);

        let stats = cp.stats().await.unwrap();
        assert_eq!(stats.agents, 1);
        assert_eq!(stats.metrics, 2);
    }
}
