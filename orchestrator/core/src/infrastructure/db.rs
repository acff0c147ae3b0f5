// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! # SQLite Connection Handle
//!
//! Wraps one `sqlx::SqliteConnection` in a `Database` that owns it
//! exclusively. Every store operation goes through [`Database::lock`], so a
//! store instance runs at most one statement sequence at a time, reads
//! included. The guard is released on every exit path, errors too.
//!
//! Opening a database provisions its parent directory, the file and the
//! schema; all of it is idempotent.

use sqlx::sqlite::{SqliteConnectOptions, SqliteConnection, SqliteJournalMode};
use sqlx::ConnectOptions;
use std::path::Path;
use std::str::FromStr;
use tokio::sync::{Mutex, MutexGuard};
use tracing::{debug, info};

use crate::domain::repository::RepositoryError;

const SCHEMA: &[&str] = &[
    r#"
    CREATE TABLE IF NOT EXISTS agents (
        id TEXT PRIMARY KEY,
        name TEXT NOT NULL,
        model TEXT NOT NULL DEFAULT '',
        status TEXT NOT NULL DEFAULT 'idle',
        metadata TEXT NOT NULL DEFAULT '{}',
        created_at TEXT NOT NULL,
        updated_at TEXT NOT NULL
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS events (
        id TEXT PRIMARY KEY,
        agent_id TEXT NOT NULL,
        action TEXT NOT NULL,
        target TEXT NOT NULL DEFAULT '',
        status TEXT NOT NULL DEFAULT 'allowed',
        metadata TEXT NOT NULL DEFAULT '{}',
        created_at TEXT NOT NULL
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS metrics (
        id TEXT PRIMARY KEY,
        agent_id TEXT NOT NULL,
        tokens_used INTEGER NOT NULL DEFAULT 0,
        cost REAL NOT NULL DEFAULT 0.0,
        tool_calls INTEGER NOT NULL DEFAULT 0,
        files_accessed INTEGER NOT NULL DEFAULT 0,
        metadata TEXT NOT NULL DEFAULT '{}',
        created_at TEXT NOT NULL
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS policies (
        id TEXT PRIMARY KEY,
        rule_type TEXT NOT NULL,
        value TEXT NOT NULL,
        agent_id TEXT NOT NULL DEFAULT '',
        created_at TEXT NOT NULL
    )
    "#,
    "CREATE INDEX IF NOT EXISTS idx_events_agent ON events(agent_id)",
    "CREATE INDEX IF NOT EXISTS idx_metrics_agent ON metrics(agent_id)",
    "CREATE INDEX IF NOT EXISTS idx_policies_agent ON policies(agent_id)",
];

pub struct Database {
    conn: Mutex<SqliteConnection>,
}

impl Database {
    /// Open (creating if needed) the database file at `path`, in WAL mode.
    pub async fn open(path: &Path) -> Result<Self, RepositoryError> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| {
                RepositoryError::Database(format!(
                    "Failed to create database directory {:?}: {}",
                    parent, e
                ))
            })?;
        }

        let conn = SqliteConnectOptions::new()
            .filename(path)
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .connect()
            .await?;

        info!("Opened control-plane database at {:?}", path);
        Self::with_schema(conn).await
    }

    /// Private database that disappears with the handle.
    pub async fn in_memory() -> Result<Self, RepositoryError> {
        let conn = SqliteConnectOptions::from_str("sqlite::memory:")?
            .connect()
            .await?;
        Self::with_schema(conn).await
    }

    async fn with_schema(mut conn: SqliteConnection) -> Result<Self, RepositoryError> {
        for statement in SCHEMA {
            sqlx::query(*statement).execute(&mut conn).await?;
        }
        debug!("Control-plane schema ready");
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Enter the store's single exclusion domain.
    pub async fn lock(&self) -> MutexGuard<'_, SqliteConnection> {
        self.conn.lock().await
    }
}
