// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! `agentmolt watch`: run the kill switch in the foreground.

use anyhow::{Context, Result};
use colored::Colorize;
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Notify;
use tracing::info;

use agentmolt_core::application::control_plane::ControlPlane;
use agentmolt_core::application::killswitch::KillSwitch;
use agentmolt_core::domain::agent::{Agent, AgentStatus};

/// How `watch` ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WatchOutcome {
    Terminated(AgentStatus),
    Interrupted,
}

/// Poll until the agent reaches a terminal status or `shutdown` resolves.
pub async fn watch_until<S>(
    cp: Arc<dyn ControlPlane>,
    agent_id: &str,
    poll_interval: Duration,
    shutdown: S,
) -> Result<WatchOutcome>
where
    S: std::future::Future<Output = ()>,
{
    let fired = Arc::new(Notify::new());
    let status = Arc::new(Mutex::new(None));

    let on_kill = {
        let fired = fired.clone();
        let status = status.clone();
        move |agent: &Agent| {
            *status.lock() = Some(agent.status);
            fired.notify_one();
        }
    };

    let switch = KillSwitch::new(cp, agent_id)
        .with_poll_interval(poll_interval)
        .with_on_kill(on_kill);
    switch.start();

    let outcome = tokio::select! {
        _ = fired.notified() => {
            WatchOutcome::Terminated((*status.lock()).unwrap_or(AgentStatus::Killed))
        }
        _ = shutdown => WatchOutcome::Interrupted,
    };

    switch.stop().await;
    Ok(outcome)
}

pub async fn execute(cp: Arc<dyn ControlPlane>, agent_id: &str, poll_interval: Duration) -> Result<()> {
    // Fail fast on an unknown id instead of polling it forever
    let agent = cp
        .get_agent(agent_id)
        .await
        .with_context(|| format!("Cannot watch agent {}", agent_id))?;

    println!(
        "{}",
        format!(
            "Watching agent {} ({}) every {:?}, Ctrl-C to stop...",
            agent.name, agent.id, poll_interval
        )
        .dimmed()
    );

    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::warn!("Failed to listen for Ctrl-C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    match watch_until(cp, agent_id, poll_interval, ctrl_c).await? {
        WatchOutcome::Terminated(status) => {
            println!(
                "{}",
                format!("✗ Agent {} is {}", agent_id, status).red().bold()
            );
            std::process::exit(1);
        }
        WatchOutcome::Interrupted => {
            info!(agent_id = %agent_id, "Watch interrupted");
            println!("{}", "Stopped watching".yellow());
            Ok(())
        }
    }
}
