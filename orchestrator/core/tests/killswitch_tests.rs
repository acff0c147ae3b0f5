// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Kill switch behaviour against the local control plane.
//!
//! Uses real (short) poll intervals: the SQLite store answers from a
//! background thread, which does not mix well with paused tokio time.

use agentmolt_core::application::{ControlPlane, Hook, KillSwitch, LocalControlPlane};
use agentmolt_core::domain::agent::{AgentStatus, Metadata};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

async fn running_agent() -> (Arc<LocalControlPlane>, String) {
    let cp = Arc::new(LocalControlPlane::in_memory().await.unwrap());
    let agent = cp.register_agent("worker", "gpt-4", Metadata::new()).await.unwrap();
    cp.update_status(&agent.id, AgentStatus::Running).await.unwrap();
    (cp, agent.id)
}

async fn wait_for(condition: impl Fn() -> bool) {
    let deadline = Instant::now() + Duration::from_secs(5);
    while !condition() {
        assert!(Instant::now() < deadline, "condition not met in time");
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
}

#[tokio::test]
async fn test_kill_fires_callback_once_and_stops_worker() {
    let (cp, agent_id) = running_agent().await;
    let fired = Arc::new(AtomicUsize::new(0));

    let counter = fired.clone();
    let switch = KillSwitch::new(cp.clone(), &agent_id)
        .with_poll_interval(Duration::from_millis(20))
        .with_on_kill(move |agent| {
            assert_eq!(agent.status, AgentStatus::Killed);
            counter.fetch_add(1, Ordering::SeqCst);
        });
    switch.start();

    tokio::time::sleep(Duration::from_millis(80)).await;
    assert_eq!(fired.load(Ordering::SeqCst), 0);
    assert!(switch.is_running());

    cp.kill(&agent_id).await.unwrap();
    wait_for(|| fired.load(Ordering::SeqCst) > 0).await;
    wait_for(|| !switch.is_running()).await;

    tokio::time::sleep(Duration::from_millis(80)).await;
    assert_eq!(fired.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_stopped_status_also_triggers() {
    let (cp, agent_id) = running_agent().await;
    let fired = Arc::new(AtomicUsize::new(0));

    let counter = fired.clone();
    let switch = KillSwitch::new(cp.clone(), &agent_id)
        .with_poll_interval(Duration::from_millis(20))
        .with_on_kill(move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
        });
    switch.start();

    cp.update_status(&agent_id, AgentStatus::Stopped).await.unwrap();
    wait_for(|| fired.load(Ordering::SeqCst) == 1).await;
}

#[tokio::test]
async fn test_stop_interrupts_the_wait() {
    let (cp, agent_id) = running_agent().await;
    let switch = KillSwitch::new(cp, &agent_id)
        .with_poll_interval(Duration::from_secs(60))
        .with_on_kill(|_| panic!("agent was never killed"));

    switch.start();
    tokio::time::sleep(Duration::from_millis(50)).await;

    let started = Instant::now();
    switch.stop().await;
    assert!(started.elapsed() < Duration::from_secs(5));
    assert!(!switch.is_running());

    // Stopping twice is harmless
    switch.stop().await;
}

#[tokio::test]
async fn test_start_is_idempotent() {
    let (cp, agent_id) = running_agent().await;
    let polls = Arc::new(AtomicUsize::new(0));

    let counter = polls.clone();
    let watched = format!("/api/v1/agents/{}", agent_id);
    cp.add_hook(Hook::pre(move |method, path, _| {
        if method == "GET" && path == watched {
            counter.fetch_add(1, Ordering::SeqCst);
        }
    }));

    let switch = KillSwitch::new(cp, &agent_id).with_poll_interval(Duration::from_secs(60));
    switch.start();
    switch.start();
    wait_for(|| polls.load(Ordering::SeqCst) >= 1).await;
    tokio::time::sleep(Duration::from_millis(100)).await;

    assert_eq!(polls.load(Ordering::SeqCst), 1);
    switch.stop().await;
}

#[tokio::test]
async fn test_poll_errors_are_tolerated() {
    let cp = Arc::new(LocalControlPlane::in_memory().await.unwrap());
    let fired = Arc::new(AtomicUsize::new(0));

    let counter = fired.clone();
    let switch = KillSwitch::new(cp, "unknown-agent")
        .with_poll_interval(Duration::from_millis(10))
        .with_on_kill(move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
        });
    switch.start();

    tokio::time::sleep(Duration::from_millis(80)).await;
    assert!(switch.is_running());
    assert_eq!(fired.load(Ordering::SeqCst), 0);
    switch.stop().await;
}
