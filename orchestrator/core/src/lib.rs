// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! AgentMolt Core
//!
//! Tracks autonomous agents, records their actions and resource consumption,
//! and makes allow/deny decisions about what they may do next.
//!
//! # Architecture
//!
//! - **domain:** entities, error taxonomy, configuration, store contract
//! - **application:** the `ControlPlane` contract, policy evaluator, local
//!   backend, hooks, kill switch and monitor
//! - **infrastructure:** SQLite persistence
//!
//! The HTTP backend lives in the `agentmolt-sdk` crate and implements the
//! same `ControlPlane` trait.

pub mod application;
pub mod domain;
pub mod infrastructure;

pub use domain::*;
