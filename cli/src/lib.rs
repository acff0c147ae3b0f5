// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! AgentMolt CLI library - exposes testable components
//!
//! # Architecture
//!
//! - **Layer:** Interface / Presentation Layer
//! - **Purpose:** Backend bootstrap, command handlers and terminal rendering

pub mod bootstrap;
pub mod commands;
pub mod output;

pub use bootstrap::{backend_from_config, open_local, BackendOptions};
