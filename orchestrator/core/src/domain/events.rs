// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! # Audit Events
//!
//! Immutable records of single actions taken by an agent. Events are
//! append-only: once written they are never updated or deleted.
//!
//! The `status` field is deliberately an open string. The monitoring wrapper
//! writes `started`, `allowed` and `failed`; enforcement points commonly add
//! `denied`, and callers are free to invent their own.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::agent::Metadata;

pub const STATUS_STARTED: &str = "started";
pub const STATUS_ALLOWED: &str = "allowed";
pub const STATUS_FAILED: &str = "failed";
pub const STATUS_DENIED: &str = "denied";

fn default_status() -> String {
    STATUS_ALLOWED.to_string()
}

/// A persisted audit event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub agent_id: String,
    #[serde(default)]
    pub action: String,
    #[serde(default)]
    pub target: String,
    #[serde(default = "default_status")]
    pub status: String,
    #[serde(default)]
    pub metadata: Metadata,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

/// Request to append an event. Serializes as the `POST /api/v1/events` payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewEvent {
    pub agent_id: String,
    pub action: String,
    #[serde(default)]
    pub target: String,
    #[serde(default = "default_status")]
    pub status: String,
    #[serde(default)]
    pub metadata: Metadata,
}

impl NewEvent {
    pub fn new(agent_id: impl Into<String>, action: impl Into<String>) -> Self {
        Self {
            agent_id: agent_id.into(),
            action: action.into(),
            target: String::new(),
            status: default_status(),
            metadata: Metadata::new(),
        }
    }

    pub fn target(mut self, target: impl Into<String>) -> Self {
        self.target = target.into();
        self
    }

    pub fn status(mut self, status: impl Into<String>) -> Self {
        self.status = status.into();
        self
    }

    pub fn metadata(mut self, metadata: Metadata) -> Self {
        self.metadata = metadata;
        self
    }

    /// Materialize the event with a fresh id and creation time.
    pub fn into_event(self, id: String, created_at: DateTime<Utc>) -> Event {
        Event {
            id,
            agent_id: self.agent_id,
            action: self.action,
            target: self.target,
            status: self.status,
            metadata: self.metadata,
            created_at: Some(created_at),
        }
    }
}
