// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Domain Layer
//!
//! Entities, value objects, the error taxonomy and the persistence contract
//! of the control plane. Nothing in here performs I/O except configuration
//! loading.

pub mod agent;
pub mod config;
pub mod error;
pub mod events;
pub mod metric;
pub mod policy;
pub mod repository;
