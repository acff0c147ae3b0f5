// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! AgentMolt Rust SDK
//!
//! Talk to a remote AgentMolt control plane through the same `ControlPlane`
//! trait the local SQLite backend implements.

pub mod client;
pub mod sender;

pub use agentmolt_core::application::{ControlPlane, Hook, KillSwitch, Monitor};
pub use agentmolt_core::domain::config::TransportConfig;
pub use agentmolt_core::domain::error::ControlPlaneError;
pub use client::AgentMoltClient;
pub use sender::{HttpRequest, HttpResponse, ReqwestSender, RequestSender, SendError};
