// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Kill Switch - background poller enforcing externally signalled termination
//!
//! Watches one agent through any [`ControlPlane`] backend. When the agent's
//! status becomes `killed` or `stopped` the termination callback fires once
//! and the worker exits. The default callback terminates the process.
//!
//! The wait between polls races the poll interval against a
//! `CancellationToken`, so [`KillSwitch::stop`] returns without waiting out
//! a full interval.

use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::application::control_plane::ControlPlane;
use crate::domain::agent::Agent;
use crate::domain::config::DEFAULT_POLL_INTERVAL_MS;

/// Invoked with the agent snapshot that carried the terminal status.
pub type OnKill = Arc<dyn Fn(&Agent) + Send + Sync>;

struct Worker {
    token: CancellationToken,
    handle: JoinHandle<()>,
}

pub struct KillSwitch {
    client: Arc<dyn ControlPlane>,
    agent_id: String,
    poll_interval: Duration,
    on_kill: OnKill,
    worker: Mutex<Option<Worker>>,
}

impl KillSwitch {
    pub fn new(client: Arc<dyn ControlPlane>, agent_id: impl Into<String>) -> Self {
        Self {
            client,
            agent_id: agent_id.into(),
            poll_interval: Duration::from_millis(DEFAULT_POLL_INTERVAL_MS),
            on_kill: Arc::new(exit_process),
            worker: Mutex::new(None),
        }
    }

    pub fn with_poll_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = poll_interval;
        self
    }

    pub fn with_on_kill(mut self, on_kill: impl Fn(&Agent) + Send + Sync + 'static) -> Self {
        self.on_kill = Arc::new(on_kill);
        self
    }

    pub fn agent_id(&self) -> &str {
        &self.agent_id
    }

    pub fn poll_interval(&self) -> Duration {
        self.poll_interval
    }

    /// Spawn the polling task. No-op while a worker is still alive.
    pub fn start(&self) {
        let mut worker = self.worker.lock();
        if worker.as_ref().is_some_and(|w| !w.handle.is_finished()) {
            return;
        }

        let token = CancellationToken::new();
        let handle = tokio::spawn(poll_loop(
            self.client.clone(),
            self.agent_id.clone(),
            self.poll_interval,
            self.on_kill.clone(),
            token.clone(),
        ));
        *worker = Some(Worker { token, handle });

        info!(agent_id = %self.agent_id, "Kill switch polling started");
    }

    /// Signal the worker and wait for it, at most `poll_interval + 1s`.
    pub async fn stop(&self) {
        let Some(worker) = self.worker.lock().take() else {
            return;
        };
        worker.token.cancel();

        let grace = self.poll_interval + Duration::from_secs(1);
        match tokio::time::timeout(grace, worker.handle).await {
            Ok(Ok(())) => debug!(agent_id = %self.agent_id, "Kill switch stopped"),
            Ok(Err(e)) => warn!(agent_id = %self.agent_id, "Kill switch worker failed: {}", e),
            Err(_) => warn!(
                agent_id = %self.agent_id,
                "Kill switch worker did not exit within {:?}", grace
            ),
        }
    }

    pub fn is_running(&self) -> bool {
        self.worker
            .lock()
            .as_ref()
            .is_some_and(|w| !w.handle.is_finished())
    }
}

impl Drop for KillSwitch {
    fn drop(&mut self) {
        if let Some(worker) = self.worker.get_mut().take() {
            worker.token.cancel();
        }
    }
}

fn exit_process(agent: &Agent) {
    error!(agent_id = %agent.id, "Kill signal received, terminating process");
    std::process::exit(1);
}

async fn poll_loop(
    client: Arc<dyn ControlPlane>,
    agent_id: String,
    poll_interval: Duration,
    on_kill: OnKill,
    token: CancellationToken,
) {
    while !token.is_cancelled() {
        match client.get_agent(&agent_id).await {
            Ok(agent) if agent.status.is_terminal() => {
                warn!(
                    agent_id = %agent_id,
                    "Agent status is {}, triggering kill", agent.status
                );
                on_kill(&agent);
                return;
            }
            Ok(_) => {}
            Err(e) => debug!(agent_id = %agent_id, "Kill switch poll error: {}", e),
        }

        tokio::select! {
            _ = tokio::time::sleep(poll_interval) => {}
            _ = token.cancelled() => break,
        }
    }
}
