// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

use agentmolt_core::application::control_plane::{is_unroutable_id, ControlPlane, Result, Route};
use agentmolt_core::application::hooks::{Hook, HookRegistry};
use agentmolt_core::domain::agent::{Agent, AgentStatus, KillReceipt, Metadata};
use agentmolt_core::domain::config::TransportConfig;
use agentmolt_core::domain::error::ControlPlaneError;
use agentmolt_core::domain::events::{Event, NewEvent};
use agentmolt_core::domain::metric::{Metric, MetricsSummary, NewMetric};
use agentmolt_core::domain::policy::{NewPolicyRule, PolicyResult, PolicyRule};
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::fmt;
use std::sync::Arc;
use tracing::{debug, warn};

use crate::sender::{HttpRequest, HttpResponse, ReqwestSender, RequestSender};

/// Statuses worth another attempt.
pub const RETRYABLE_STATUS_CODES: [u16; 5] = [429, 500, 502, 503, 504];

/// Client for a remote AgentMolt control plane.
///
/// Every call carries the bearer credential and a JSON body. Transient
/// failures (retryable statuses, network errors) are retried with
/// exponential backoff: `backoff_base * 2^attempt` between attempts.
///
/// ```no_run
/// # async fn demo() -> agentmolt_core::application::control_plane::Result<()> {
/// use agentmolt_core::application::ControlPlane;
/// use agentmolt_sdk::AgentMoltClient;
///
/// let am = AgentMoltClient::from_env()?;
/// let agent = am.register_agent("my-agent", "gpt-4", Default::default()).await?;
/// am.kill(&agent.id).await?;
/// # Ok(())
/// # }
/// ```
pub struct AgentMoltClient {
    config: TransportConfig,
    sender: Arc<dyn RequestSender>,
    hooks: HookRegistry,
}

#[derive(Deserialize)]
struct AgentList {
    #[serde(default)]
    agents: Vec<Agent>,
}

#[derive(Deserialize)]
struct EventList {
    #[serde(default)]
    events: Vec<Event>,
}

#[derive(Deserialize)]
struct PolicyList {
    #[serde(default)]
    policies: Vec<PolicyRule>,
}

impl AgentMoltClient {
    pub fn new(config: TransportConfig) -> Result<Self> {
        let sender = ReqwestSender::new(config.request_timeout)?;
        Ok(Self::with_sender(config, Arc::new(sender)))
    }

    /// Credential and base address from `AGENTMOLT_API_KEY` / `AGENTMOLT_BASE_URL`.
    pub fn from_env() -> Result<Self> {
        Self::new(TransportConfig::resolve(None, None)?)
    }

    pub fn with_sender(config: TransportConfig, sender: Arc<dyn RequestSender>) -> Self {
        Self {
            config,
            sender,
            hooks: HookRegistry::new(),
        }
    }

    pub fn config(&self) -> &TransportConfig {
        &self.config
    }

    pub fn base_url(&self) -> &str {
        &self.config.base_url
    }

    /// One logical call: pre hooks, the retry loop, decoding, post hooks.
    async fn request<T: DeserializeOwned>(&self, route: Route, payload: Option<Value>) -> Result<T> {
        let method = route.method.as_str();
        self.hooks.run_pre(method, &route.path, payload.as_ref());

        let path = route.path.clone();
        let request = HttpRequest {
            method: route.method,
            url: format!("{}{}", self.config.base_url, route.path),
            query: route.query,
            api_key: self.config.api_key.clone(),
            body: payload,
        };

        let response = self.dispatch(&request, &path).await?;
        let decoded = serde_json::from_value(response.clone()).map_err(|e| {
            ControlPlaneError::Serialization(format!(
                "Unexpected response from {} {}: {}",
                method, path, e
            ))
        })?;

        self.hooks
            .run_post(method, &path, request.body.as_ref(), &response);
        Ok(decoded)
    }

    /// The retry loop. Returns the decoded JSON body of the first 2xx answer.
    async fn dispatch(&self, request: &HttpRequest, path: &str) -> Result<Value> {
        let method = request.method;
        let attempts = self.config.attempts();
        let mut attempt = 0;

        loop {
            let failure = match self.sender.send(request).await {
                Ok(response) if response.is_success() => return parse_success(&response),
                Ok(response) => {
                    let error = classify(&response);
                    if !RETRYABLE_STATUS_CODES.contains(&response.status) {
                        return Err(error);
                    }
                    error
                }
                Err(e) => ControlPlaneError::Connection(e.0),
            };

            if attempt + 1 >= attempts {
                return Err(failure);
            }

            let wait = self.config.backoff_for(attempt);
            match failure.status_code() {
                Some(status) => warn!(
                    "Retryable error {} on {} {}, retrying in {:.1}s",
                    status,
                    method,
                    path,
                    wait.as_secs_f64()
                ),
                None => warn!(
                    "Connection error on {} {}, retrying in {:.1}s: {}",
                    method,
                    path,
                    wait.as_secs_f64(),
                    failure
                ),
            }
            tokio::time::sleep(wait).await;
            attempt += 1;
        }
    }
}

fn parse_success(response: &HttpResponse) -> Result<Value> {
    serde_json::from_str(&response.body).map_err(|e| {
        ControlPlaneError::Serialization(format!(
            "Invalid JSON in {} response: {}",
            response.status, e
        ))
    })
}

/// Server-provided `error` field, or the raw body.
fn error_message(body: &str) -> String {
    match serde_json::from_str::<Value>(body) {
        Ok(Value::Object(map)) => match map.get("error") {
            Some(Value::String(message)) => message.clone(),
            Some(other) => other.to_string(),
            None => body.to_string(),
        },
        _ => body.to_string(),
    }
}

fn classify(response: &HttpResponse) -> ControlPlaneError {
    let message = error_message(&response.body);
    let status_code = Some(response.status);
    match response.status {
        401 => ControlPlaneError::Authentication {
            message,
            status_code,
        },
        404 => ControlPlaneError::NotFound {
            message,
            status_code,
        },
        status => ControlPlaneError::Api {
            status_code: status,
            message,
        },
    }
}

fn routable(agent_id: &str) -> Result<()> {
    if is_unroutable_id(agent_id) {
        return Err(ControlPlaneError::InvalidRequest(format!(
            "Agent id '{}' cannot be addressed",
            agent_id
        )));
    }
    Ok(())
}

fn payload_of<T: Serialize>(value: &T) -> Result<Option<Value>> {
    Ok(Some(serde_json::to_value(value)?))
}

impl fmt::Debug for AgentMoltClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AgentMoltClient")
            .field("base_url", &self.config.base_url)
            .field("max_retries", &self.config.max_retries)
            .field("hooks", &self.hooks)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl ControlPlane for AgentMoltClient {
    async fn register_agent(&self, name: &str, model: &str, metadata: Metadata) -> Result<Agent> {
        let payload = json!({"name": name, "model": model, "metadata": metadata});
        self.request(Route::register_agent(), Some(payload)).await
    }

    async fn list_agents(&self) -> Result<Vec<Agent>> {
        let list: AgentList = self.request(Route::list_agents(), None).await?;
        Ok(list.agents)
    }

    async fn get_agent(&self, agent_id: &str) -> Result<Agent> {
        routable(agent_id)?;
        self.request(Route::get_agent(agent_id), None).await
    }

    async fn update_status(&self, agent_id: &str, status: AgentStatus) -> Result<Agent> {
        routable(agent_id)?;
        let payload = json!({"status": status});
        self.request(Route::update_status(agent_id), Some(payload)).await
    }

    async fn kill(&self, agent_id: &str) -> Result<KillReceipt> {
        routable(agent_id)?;
        let mut receipt: KillReceipt = self.request(Route::kill(agent_id), None).await?;
        if receipt.agent_id.is_empty() {
            receipt.agent_id = agent_id.to_string();
        }
        debug!(agent_id = %agent_id, "Kill acknowledged");
        Ok(receipt)
    }

    async fn log_event(&self, event: NewEvent) -> Result<Event> {
        self.request(Route::log_event(), payload_of(&event)?).await
    }

    async fn list_events(&self, agent_id: &str) -> Result<Vec<Event>> {
        routable(agent_id)?;
        let list: EventList = self.request(Route::list_events(agent_id), None).await?;
        Ok(list.events)
    }

    async fn log_metric(&self, metric: NewMetric) -> Result<Metric> {
        metric.validate().map_err(ControlPlaneError::InvalidRequest)?;
        self.request(Route::log_metric(), payload_of(&metric)?).await
    }

    async fn metrics_summary(&self, agent_id: &str) -> Result<MetricsSummary> {
        routable(agent_id)?;
        self.request(Route::metrics_summary(agent_id), None).await
    }

    async fn check_policy(&self, agent_id: &str, action: &str) -> Result<PolicyResult> {
        let payload = json!({"agent_id": agent_id, "action": action});
        self.request(Route::check_policy(), Some(payload)).await
    }

    async fn add_policy(&self, rule: NewPolicyRule) -> Result<PolicyRule> {
        rule.rule_type.validate_value(&rule.value)?;
        self.request(Route::add_policy(), payload_of(&rule)?).await
    }

    async fn list_policies(&self, agent_id: Option<&str>) -> Result<Vec<PolicyRule>> {
        let list: PolicyList = self.request(Route::list_policies(agent_id), None).await?;
        Ok(list.policies)
    }

    fn add_hook(&self, hook: Hook) {
        self.hooks.add(hook);
    }
}
