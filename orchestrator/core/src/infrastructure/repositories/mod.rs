// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Repository Implementations
//!
//! Infrastructure implementations of the `ControlPlaneStore` contract defined
//! in the domain layer.
//!
//! - **SqliteStore** - file-backed (or in-memory) SQLite persistence of
//!   agents, events, metrics and policy rules
//!
//! # Usage
//!
//! ```no_run
//! # async fn demo() -> Result<(), agentmolt_core::domain::repository::RepositoryError> {
//! use agentmolt_core::domain::repository::ControlPlaneStore;
//! use agentmolt_core::infrastructure::repositories::SqliteStore;
//!
//! let store = SqliteStore::open("/tmp/agentmolt.db").await?;
//! let agents = store.list_agents().await?;
//! # Ok(())
//! # }
//! ```

pub mod sqlite_store;

pub use sqlite_store::SqliteStore;
