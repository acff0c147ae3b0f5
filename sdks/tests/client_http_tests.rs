// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! AgentMoltClient against a real HTTP server (mockito).

use agentmolt_core::domain::agent::{AgentStatus, Metadata};
use agentmolt_core::domain::events::NewEvent;
use agentmolt_core::domain::policy::{NewPolicyRule, RuleType};
use agentmolt_sdk::{AgentMoltClient, ControlPlane, ControlPlaneError, TransportConfig};
use mockito::Matcher;
use serde_json::json;
use std::time::Duration;

fn client_for(server: &mockito::ServerGuard) -> AgentMoltClient {
    let config = TransportConfig::resolve_with(Some("am_test".into()), Some(server.url()), |_| None)
        .unwrap()
        .with_backoff_base(Duration::from_millis(1));
    AgentMoltClient::new(config).unwrap()
}

#[tokio::test]
async fn test_register_sends_bearer_and_json() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("POST", "/api/v1/agents/register")
        .match_header("authorization", "Bearer am_test")
        .match_header("content-type", "application/json")
        .match_body(Matcher::Json(json!({
            "name": "bot",
            "model": "gpt-4",
            "metadata": {}
        })))
        .with_status(201)
        .with_header("content-type", "application/json")
        .with_body(r#"{"id": "a1", "name": "bot", "model": "gpt-4", "status": "idle", "unknown": true}"#)
        .create_async()
        .await;

    let am = client_for(&server);
    let agent = am.register_agent("bot", "gpt-4", Metadata::new()).await.unwrap();

    assert_eq!(agent.id, "a1");
    assert_eq!(agent.status, AgentStatus::Idle);
    mock.assert_async().await;
}

#[tokio::test]
async fn test_retry_then_success() {
    let mut server = mockito::Server::new_async().await;
    let busy = server
        .mock("GET", "/api/v1/agents/a1")
        .with_status(503)
        .with_body(r#"{"error": "busy"}"#)
        .expect(2)
        .create_async()
        .await;
    let ready = server
        .mock("GET", "/api/v1/agents/a1")
        .with_status(200)
        .with_body(r#"{"id": "a1", "name": "bot", "status": "killed"}"#)
        .expect(1)
        .create_async()
        .await;

    let am = client_for(&server);
    let agent = am.get_agent("a1").await.unwrap();

    assert_eq!(agent.status, AgentStatus::Killed);
    busy.assert_async().await;
    ready.assert_async().await;
}

#[tokio::test]
async fn test_retries_exhausted() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("POST", "/api/v1/events")
        .with_status(500)
        .with_body("Internal Server Error")
        .expect(3)
        .create_async()
        .await;

    let am = client_for(&server);
    let err = am
        .log_event(NewEvent::new("a1", "search"))
        .await
        .unwrap_err();

    match err {
        ControlPlaneError::Api {
            status_code,
            message,
        } => {
            assert_eq!(status_code, 500);
            assert_eq!(message, "Internal Server Error");
        }
        other => panic!("unexpected error: {other:?}"),
    }
    mock.assert_async().await;
}

#[tokio::test]
async fn test_error_classification() {
    let mut server = mockito::Server::new_async().await;
    server
        .mock("GET", "/api/v1/agents")
        .with_status(401)
        .with_body(r#"{"error": "invalid api key"}"#)
        .create_async()
        .await;
    server
        .mock("POST", "/api/v1/agents/ghost/kill")
        .with_status(404)
        .with_body(r#"{"error": "agent not found"}"#)
        .create_async()
        .await;

    let am = client_for(&server);

    let err = am.list_agents().await.unwrap_err();
    assert!(matches!(err, ControlPlaneError::Authentication { .. }));
    assert_eq!(err.to_string(), "Authentication failed: invalid api key");

    let err = am.kill("ghost").await.unwrap_err();
    assert!(err.is_not_found());
    assert_eq!(err.status_code(), Some(404));
}

#[tokio::test]
async fn test_policy_endpoints() {
    let mut server = mockito::Server::new_async().await;
    let add = server
        .mock("POST", "/api/v1/policies")
        .match_body(Matcher::Json(json!({
            "rule_type": "denylist",
            "value": "rm",
            "agent_id": "a1"
        })))
        .with_status(200)
        .with_body(r#"{"id": "p1", "rule_type": "denylist", "value": "rm", "agent_id": "a1"}"#)
        .create_async()
        .await;
    let list = server
        .mock("GET", "/api/v1/policies")
        .match_query(Matcher::UrlEncoded("agent_id".into(), "a1".into()))
        .with_status(200)
        .with_body(r#"{"policies": [{"id": "p1", "rule_type": "denylist", "value": "rm", "agent_id": "a1"}]}"#)
        .create_async()
        .await;
    let check = server
        .mock("POST", "/api/v1/policy/check")
        .match_body(Matcher::Json(json!({"agent_id": "a1", "action": "rm"})))
        .with_status(200)
        .with_body(r#"{"allowed": false, "reason": "Action 'rm' is denied by policy p1", "policy_id": "p1"}"#)
        .create_async()
        .await;

    let am = client_for(&server);
    let rule = am
        .add_policy(NewPolicyRule::for_agent(RuleType::Denylist, "rm", "a1"))
        .await
        .unwrap();
    assert_eq!(rule.id, "p1");

    let rules = am.list_policies(Some("a1")).await.unwrap();
    assert_eq!(rules.len(), 1);

    let result = am.check_policy("a1", "rm").await.unwrap();
    assert!(!result.allowed);
    assert_eq!(result.policy_id.as_deref(), Some("p1"));

    add.assert_async().await;
    list.assert_async().await;
    check.assert_async().await;
}

#[tokio::test]
async fn test_connection_refused() {
    let port = {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        listener.local_addr().unwrap().port()
    };
    let config = TransportConfig::resolve_with(
        Some("am_test".into()),
        Some(format!("http://127.0.0.1:{}", port)),
        |_| None,
    )
    .unwrap()
    .with_max_retries(2)
    .with_backoff_base(Duration::from_millis(1));
    let am = AgentMoltClient::new(config).unwrap();

    let err = am.get_agent("a1").await.unwrap_err();
    assert!(matches!(err, ControlPlaneError::Connection(_)));
    assert!(err.to_string().starts_with("Connection error: "));
}

#[tokio::test]
async fn test_agent_id_reaches_server_as_one_segment() {
    let mut server = mockito::Server::new_async().await;
    let kill = server
        .mock("POST", "/api/v1/agents/a1%2F..%2F..%2Fpolicies/kill")
        .with_status(200)
        .with_body(r#"{"status": "killed"}"#)
        .expect(1)
        .create_async()
        .await;
    let policies = server
        .mock("POST", "/api/v1/policies")
        .expect(0)
        .create_async()
        .await;
    let summary = server
        .mock("GET", "/api/v1/agents/a1%3Fx%3D1/metrics/summary")
        .with_status(200)
        .with_body(r#"{"tokens_used": 3, "cost": 0.5, "tool_calls": 1, "count": 1}"#)
        .expect(1)
        .create_async()
        .await;

    let am = client_for(&server);
    let receipt = am.kill("a1/../../policies").await.unwrap();
    assert_eq!(receipt.agent_id, "a1/../../policies");
    assert_eq!(am.metrics_summary("a1?x=1").await.unwrap().tokens_used, 3);

    kill.assert_async().await;
    policies.assert_async().await;
    summary.assert_async().await;
}
