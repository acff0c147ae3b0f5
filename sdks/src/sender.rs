// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! The single HTTP exchange beneath the retry loop.
//!
//! [`RequestSender`] performs exactly one attempt and reports either the
//! raw response or a network-level failure. Status classification, retries
//! and hooks live in [`AgentMoltClient`](crate::client::AgentMoltClient).

use agentmolt_core::application::control_plane::HttpMethod;
use agentmolt_core::domain::error::ControlPlaneError;
use async_trait::async_trait;
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE};
use reqwest::Client;
use serde_json::Value;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq)]
pub struct HttpRequest {
    pub method: HttpMethod,
    /// Absolute URL, without query string
    pub url: String,
    pub query: Vec<(&'static str, String)>,
    pub api_key: String,
    pub body: Option<Value>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    pub status: u16,
    pub body: String,
}

impl HttpResponse {
    pub fn new(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Connection refused, timeout, DNS failure, truncated body...
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("{0}")]
pub struct SendError(pub String);

#[async_trait]
pub trait RequestSender: Send + Sync {
    async fn send(&self, request: &HttpRequest) -> Result<HttpResponse, SendError>;
}

pub struct ReqwestSender {
    client: Client,
}

impl ReqwestSender {
    pub fn new(timeout: Duration) -> Result<Self, ControlPlaneError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ControlPlaneError::Connection(format!("Failed to build HTTP client: {}", e)))?;
        Ok(Self { client })
    }
}

#[async_trait]
impl RequestSender for ReqwestSender {
    async fn send(&self, request: &HttpRequest) -> Result<HttpResponse, SendError> {
        let mut req = match request.method {
            HttpMethod::Get => self.client.get(&request.url),
            HttpMethod::Post => self.client.post(&request.url),
        }
        .header(AUTHORIZATION, format!("Bearer {}", request.api_key))
        .header(CONTENT_TYPE, "application/json");

        if !request.query.is_empty() {
            req = req.query(&request.query);
        }
        if let Some(body) = &request.body {
            req = req.json(body);
        }

        let response = req.send().await.map_err(|e| SendError(e.to_string()))?;
        let status = response.status().as_u16();
        let body = response.text().await.map_err(|e| SendError(e.to_string()))?;

        Ok(HttpResponse { status, body })
    }
}
