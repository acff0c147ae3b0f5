// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! # Control-Plane Interface
//!
//! The contract shared by the durable [`LocalControlPlane`] and the HTTP
//! `AgentMoltClient`. Exactly one backend serves a process; consumers such as
//! the kill switch, the monitor wrapper and the CLI hold an
//! `Arc<dyn ControlPlane>` and never know which one.
//!
//! [`Route`] is the method/path table of the wire contract. The HTTP backend
//! dispatches on it; the local backend reports the same method/path to its
//! hooks so observers see identical traffic from both.
//!
//! [`LocalControlPlane`]: crate::application::local_control_plane::LocalControlPlane

use async_trait::async_trait;
use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use std::fmt;

use crate::application::hooks::Hook;
use crate::domain::agent::{Agent, AgentStatus, KillReceipt, Metadata};
use crate::domain::error::ControlPlaneError;
use crate::domain::events::{Event, NewEvent};
use crate::domain::metric::{Metric, MetricsSummary, NewMetric};
use crate::domain::policy::{NewPolicyRule, PolicyResult, PolicyRule};

pub type Result<T> = std::result::Result<T, ControlPlaneError>;

#[async_trait]
pub trait ControlPlane: Send + Sync {
    async fn register_agent(&self, name: &str, model: &str, metadata: Metadata) -> Result<Agent>;

    async fn list_agents(&self) -> Result<Vec<Agent>>;

    /// `NotFound` for unknown ids.
    async fn get_agent(&self, agent_id: &str) -> Result<Agent>;

    /// `NotFound` for unknown ids.
    async fn update_status(&self, agent_id: &str, status: AgentStatus) -> Result<Agent>;

    /// Kill switch. `NotFound` for unknown ids.
    async fn kill(&self, agent_id: &str) -> Result<KillReceipt>;

    async fn log_event(&self, event: NewEvent) -> Result<Event>;

    /// Events of a known agent, newest first.
    async fn list_events(&self, agent_id: &str) -> Result<Vec<Event>>;

    async fn log_metric(&self, metric: NewMetric) -> Result<Metric>;

    /// Accumulated totals of a known agent.
    async fn metrics_summary(&self, agent_id: &str) -> Result<MetricsSummary>;

    /// Never fails on unknown agent ids; a denial is returned, not raised.
    async fn check_policy(&self, agent_id: &str, action: &str) -> Result<PolicyResult>;

    async fn add_policy(&self, rule: NewPolicyRule) -> Result<PolicyRule>;

    /// `Some(agent)` lists global plus agent-scoped rules, `None` lists all.
    async fn list_policies(&self, agent_id: Option<&str>) -> Result<Vec<PolicyRule>>;

    fn add_hook(&self, hook: Hook);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HttpMethod {
    Get,
    Post,
}

impl HttpMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            HttpMethod::Get => "GET",
            HttpMethod::Post => "POST",
        }
    }
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One endpoint of the wire contract.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Route {
    pub method: HttpMethod,
    pub path: String,
    pub query: Vec<(&'static str, String)>,
}

/// Unreserved characters stay literal, everything else in an id is escaped.
const SEGMENT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'~');

/// An agent id as a single path segment.
fn segment(agent_id: &str) -> String {
    utf8_percent_encode(agent_id, SEGMENT).to_string()
}

/// Ids that a URL parser would resolve as dot segments or drop entirely.
pub fn is_unroutable_id(agent_id: &str) -> bool {
    matches!(agent_id, "" | "." | "..")
}

impl Route {
    fn get(path: impl Into<String>) -> Self {
        Self {
            method: HttpMethod::Get,
            path: path.into(),
            query: Vec::new(),
        }
    }

    fn post(path: impl Into<String>) -> Self {
        Self {
            method: HttpMethod::Post,
            path: path.into(),
            query: Vec::new(),
        }
    }

    pub fn register_agent() -> Self {
        Self::post("/api/v1/agents/register")
    }

    pub fn list_agents() -> Self {
        Self::get("/api/v1/agents")
    }

    pub fn get_agent(agent_id: &str) -> Self {
        Self::get(format!("/api/v1/agents/{}", segment(agent_id)))
    }

    pub fn update_status(agent_id: &str) -> Self {
        Self::post(format!("/api/v1/agents/{}/status", segment(agent_id)))
    }

    pub fn kill(agent_id: &str) -> Self {
        Self::post(format!("/api/v1/agents/{}/kill", segment(agent_id)))
    }

    pub fn log_event() -> Self {
        Self::post("/api/v1/events")
    }

    pub fn list_events(agent_id: &str) -> Self {
        Self::get(format!("/api/v1/agents/{}/events", segment(agent_id)))
    }

    pub fn log_metric() -> Self {
        Self::post("/api/v1/metrics")
    }

    pub fn metrics_summary(agent_id: &str) -> Self {
        Self::get(format!("/api/v1/agents/{}/metrics/summary", segment(agent_id)))
    }

    pub fn check_policy() -> Self {
        Self::post("/api/v1/policy/check")
    }

    pub fn add_policy() -> Self {
        Self::post("/api/v1/policies")
    }

    pub fn list_policies(agent_id: Option<&str>) -> Self {
        let mut route = Self::get("/api/v1/policies");
        if let Some(id) = agent_id.filter(|id| !id.is_empty()) {
            route.query.push(("agent_id", id.to_string()));
        }
        route
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_route_table() {
        assert_eq!(Route::register_agent().path, "/api/v1/agents/register");
        assert_eq!(Route::register_agent().method, HttpMethod::Post);
        assert_eq!(Route::get_agent("a1").path, "/api/v1/agents/a1");
        assert_eq!(Route::get_agent("a1").method, HttpMethod::Get);
        assert_eq!(Route::kill("a1").path, "/api/v1/agents/a1/kill");
        assert_eq!(
            Route::metrics_summary("a1").path,
            "/api/v1/agents/a1/metrics/summary"
        );
        assert!(Route::list_policies(None).query.is_empty());
        assert!(Route::list_policies(Some("")).query.is_empty());
        assert_eq!(
            Route::list_policies(Some("a1")).query,
            vec![("agent_id", "a1".to_string())]
        );
    }

    #[test]
    fn test_agent_ids_stay_one_path_segment() {
        assert_eq!(
            Route::kill("a1/../../policies").path,
            "/api/v1/agents/a1%2F..%2F..%2Fpolicies/kill"
        );
        assert_eq!(Route::get_agent("a1?x=1").path, "/api/v1/agents/a1%3Fx%3D1");
        assert_eq!(Route::list_events("a1#frag").path, "/api/v1/agents/a1%23frag/events");
        assert_eq!(
            Route::update_status("bot 7").path,
            "/api/v1/agents/bot%207/status"
        );
        assert_eq!(
            Route::metrics_summary("agent-1_v2.0~x").path,
            "/api/v1/agents/agent-1_v2.0~x/metrics/summary"
        );
    }

    #[test]
    fn test_dot_segment_ids_are_unroutable() {
        assert!(is_unroutable_id(""));
        assert!(is_unroutable_id("."));
        assert!(is_unroutable_id(".."));
        assert!(!is_unroutable_id("..."));
        assert!(!is_unroutable_id("a1"));
    }
}
