// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Automatic audit trail around a unit of agent work.
//!
//! ```no_run
//! # use std::sync::Arc;
//! # use agentmolt_core::application::{control_plane::ControlPlane, monitor::Monitor};
//! # async fn demo(cp: Arc<dyn ControlPlane>) -> Result<(), std::io::Error> {
//! let hits = Monitor::new(cp, "agent-123")
//!     .action("search")
//!     .target("web")
//!     .run(async { Ok::<_, std::io::Error>(42) })
//!     .await?;
//! # Ok(())
//! # }
//! ```

use serde_json::json;
use std::fmt::Display;
use std::future::Future;
use std::sync::Arc;
use std::time::Instant;
use tracing::debug;

use crate::application::control_plane::ControlPlane;
use crate::domain::agent::Metadata;
use crate::domain::events::{NewEvent, STATUS_ALLOWED, STATUS_FAILED, STATUS_STARTED};
use crate::domain::metric::NewMetric;

pub const DEFAULT_ACTION: &str = "function_call";

/// Logs `started`, then `failed` or `allowed` events (plus a one tool-call
/// metric on success) for the wrapped future. Control-plane failures never
/// affect the wrapped work.
pub struct Monitor {
    client: Arc<dyn ControlPlane>,
    agent_id: String,
    action: String,
    target: String,
}

impl Monitor {
    pub fn new(client: Arc<dyn ControlPlane>, agent_id: impl Into<String>) -> Self {
        Self {
            client,
            agent_id: agent_id.into(),
            action: DEFAULT_ACTION.to_string(),
            target: String::new(),
        }
    }

    pub fn action(mut self, action: impl Into<String>) -> Self {
        self.action = action.into();
        self
    }

    pub fn target(mut self, target: impl Into<String>) -> Self {
        self.target = target.into();
        self
    }

    pub async fn run<T, E, F>(&self, work: F) -> Result<T, E>
    where
        F: Future<Output = Result<T, E>>,
        E: Display,
    {
        self.record(STATUS_STARTED, Metadata::new()).await;

        let start = Instant::now();
        let outcome = work.await;

        match &outcome {
            Err(e) => {
                let mut metadata = Metadata::new();
                metadata.insert("error".into(), json!(e.to_string()));
                self.record(STATUS_FAILED, metadata).await;
            }
            Ok(_) => {
                let elapsed = (start.elapsed().as_secs_f64() * 1000.0).round() / 1000.0;
                let mut metadata = Metadata::new();
                metadata.insert("duration_s".into(), json!(elapsed));
                self.record(STATUS_ALLOWED, metadata).await;

                if let Err(e) = self
                    .client
                    .log_metric(NewMetric::new(&self.agent_id).tool_calls(1))
                    .await
                {
                    debug!(action = %self.action, "Failed to log metric: {}", e);
                }
            }
        }
        outcome
    }

    async fn record(&self, status: &str, metadata: Metadata) {
        let event = NewEvent::new(&self.agent_id, &self.action)
            .target(&self.target)
            .status(status)
            .metadata(metadata);

        if let Err(e) = self.client.log_event(event).await {
            debug!(action = %self.action, status, "Failed to log {} event: {}", status, e);
        }
    }
}
