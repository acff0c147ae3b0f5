// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Command implementations for the AgentMolt CLI

pub mod agent;
pub mod config;
pub mod policy;
pub mod stats;
pub mod watch;

pub use self::agent::AgentCommand;
pub use self::config::ConfigCommand;
pub use self::policy::PolicyCommand;
