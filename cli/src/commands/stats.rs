// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

use anyhow::Result;
use colored::Colorize;

use agentmolt_core::application::local_control_plane::LocalControlPlane;

/// Row counts of the local database.
pub async fn execute(cp: &LocalControlPlane) -> Result<()> {
    let stats = cp.stats().await?;

    println!("{}", "Local store:".bold());
    println!("  Agents:   {}", stats.agents);
    println!("  Events:   {}", stats.events);
    println!("  Metrics:  {}", stats.metrics);
    println!("  Policies: {}", stats.policies);
    Ok(())
}
