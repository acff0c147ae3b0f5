// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

use chrono::{DateTime, SecondsFormat, SubsecRound, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Free-form, arbitrarily nested metadata attached to agents, events and metrics.
pub type Metadata = serde_json::Map<String, serde_json::Value>;

/// Length of the opaque identifiers handed out by the control plane.
const SHORT_ID_LEN: usize = 12;

/// Generate a short opaque identifier (12 hex chars of a v4 UUID).
pub fn short_id() -> String {
    let mut id = Uuid::new_v4().simple().to_string();
    id.truncate(SHORT_ID_LEN);
    id
}

/// Current time at the microsecond precision timestamps are persisted with.
pub fn now() -> DateTime<Utc> {
    Utc::now().trunc_subsecs(6)
}

/// Fixed-width UTC timestamp text, so lexical order matches chronological order.
pub fn timestamp_text(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Micros, true)
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AgentStatus {
    #[default]
    Idle,
    Running,
    Stopped,
    Failed,
    Killed,
}

impl AgentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            AgentStatus::Idle => "idle",
            AgentStatus::Running => "running",
            AgentStatus::Stopped => "stopped",
            AgentStatus::Failed => "failed",
            AgentStatus::Killed => "killed",
        }
    }

    /// Statuses that tell a watching kill switch to terminate its process.
    pub fn is_terminal(&self) -> bool {
        matches!(self, AgentStatus::Killed | AgentStatus::Stopped)
    }
}

impl fmt::Display for AgentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AgentStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "idle" => Ok(AgentStatus::Idle),
            "running" => Ok(AgentStatus::Running),
            "stopped" => Ok(AgentStatus::Stopped),
            "failed" => Ok(AgentStatus::Failed),
            "killed" => Ok(AgentStatus::Killed),
            other => Err(format!(
                "unknown agent status '{}' (expected idle, running, stopped, failed or killed)",
                other
            )),
        }
    }
}

/// A tracked autonomous agent.
///
/// Agents are created by registration and only ever mutated through status
/// transitions. Timestamps are optional on the wire because older servers
/// omit them; the local store always fills them in.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Agent {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub model: String,
    #[serde(default)]
    pub status: AgentStatus,
    #[serde(default)]
    pub metadata: Metadata,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

impl Agent {
    pub fn new(name: impl Into<String>, model: impl Into<String>, metadata: Metadata) -> Self {
        let now = now();
        Self {
            id: short_id(),
            name: name.into(),
            model: model.into(),
            status: AgentStatus::Idle,
            metadata,
            created_at: Some(now),
            updated_at: Some(now),
        }
    }
}

/// Acknowledgement returned by the kill switch endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KillReceipt {
    #[serde(default = "killed")]
    pub status: AgentStatus,
    #[serde(default)]
    pub agent_id: String,
}

fn killed() -> AgentStatus {
    AgentStatus::Killed
}

impl KillReceipt {
    pub fn new(agent_id: impl Into<String>) -> Self {
        Self {
            status: AgentStatus::Killed,
            agent_id: agent_id.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_short_id_shape() {
        let id = short_id();
        assert_eq!(id.len(), 12);
        assert!(id.chars().all(|c| c.is_ascii_hexdigit()));
        assert_ne!(id, short_id());
    }

    #[test]
    fn test_status_parse_and_display() {
        for status in [
            AgentStatus::Idle,
            AgentStatus::Running,
            AgentStatus::Stopped,
            AgentStatus::Failed,
            AgentStatus::Killed,
        ] {
            assert_eq!(status.as_str().parse::<AgentStatus>().unwrap(), status);
        }
        assert!("paused".parse::<AgentStatus>().is_err());
        assert!(AgentStatus::Killed.is_terminal());
        assert!(AgentStatus::Stopped.is_terminal());
        assert!(!AgentStatus::Running.is_terminal());
    }

    #[test]
    fn test_agent_decode_ignores_unknown_fields() {
        let agent: Agent = serde_json::from_value(serde_json::json!({
            "id": "x",
            "name": "bot",
            "extra_field": 1
        }))
        .unwrap();
        assert_eq!(agent.id, "x");
        assert_eq!(agent.status, AgentStatus::Idle);
        assert!(agent.created_at.is_none());
    }

    #[test]
    fn test_timestamp_text_is_fixed_width() {
        let a = timestamp_text(Utc::now());
        let b = timestamp_text(DateTime::<Utc>::from_timestamp(0, 0).unwrap());
        assert_eq!(a.len(), b.len());
        assert!(b.ends_with('Z'));
    }
}
