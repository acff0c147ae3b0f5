// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Backend selection
//!
//! Turns global CLI flags plus the discovered `agentmolt.yaml` into a
//! [`ControlPlaneConfig`], then builds the matching [`ControlPlane`].
//! Precedence: flags > environment > config file > defaults.

use anyhow::{bail, Context, Result};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::debug;

use agentmolt_core::application::control_plane::ControlPlane;
use agentmolt_core::application::hooks::{logging_hooks, timing_hooks};
use agentmolt_core::application::local_control_plane::LocalControlPlane;
use agentmolt_core::domain::config::{BackendKind, ControlPlaneConfig};
use agentmolt_sdk::AgentMoltClient;

/// Backend-related global flags.
#[derive(Debug, Clone, Default)]
pub struct BackendOptions {
    pub local: bool,
    pub remote: bool,
    pub db_path: Option<PathBuf>,
    pub api_key: Option<String>,
    pub base_url: Option<String>,
    pub config: Option<PathBuf>,
    pub trace_requests: bool,
}

impl BackendOptions {
    /// Load the config file (explicit or discovered) and layer the flags on top.
    pub fn resolve(&self) -> Result<ControlPlaneConfig> {
        let config = ControlPlaneConfig::load_or_default(self.config.clone())
            .context("Failed to load configuration")?;
        Ok(self.apply(config))
    }

    pub fn apply(&self, mut config: ControlPlaneConfig) -> ControlPlaneConfig {
        if self.local {
            config.backend = BackendKind::Local;
        } else if self.remote {
            config.backend = BackendKind::Remote;
        }
        if let Some(path) = &self.db_path {
            config.local.db_path = Some(path.clone());
        }
        if let Some(key) = &self.api_key {
            config.remote.api_key = Some(key.clone());
        }
        if let Some(url) = &self.base_url {
            config.remote.base_url = Some(url.clone());
        }
        config
    }

    pub async fn connect(&self) -> Result<Arc<dyn ControlPlane>> {
        self.connect_with(&self.resolve()?).await
    }

    pub async fn connect_with(&self, config: &ControlPlaneConfig) -> Result<Arc<dyn ControlPlane>> {
        let backend = backend_from_config(config).await?;
        if self.trace_requests {
            install_trace_hooks(backend.as_ref());
        }
        Ok(backend)
    }
}

pub async fn backend_from_config(config: &ControlPlaneConfig) -> Result<Arc<dyn ControlPlane>> {
    match config.backend {
        BackendKind::Local => Ok(Arc::new(open_local(config).await?)),
        BackendKind::Remote => {
            let transport = config
                .remote
                .transport()
                .context("Remote backend needs an API key (--api-key or AGENTMOLT_API_KEY)")?;
            debug!(base_url = %transport.base_url, "Using remote backend");
            Ok(Arc::new(AgentMoltClient::new(transport)?))
        }
    }
}

/// Open the local database, rejecting a config that selects the remote backend.
pub async fn open_local(config: &ControlPlaneConfig) -> Result<LocalControlPlane> {
    if config.backend != BackendKind::Local {
        bail!("This command requires the local backend (use --local)");
    }
    let path = config.local.resolved_db_path();
    debug!(db_path = %path.display(), "Using local backend");
    LocalControlPlane::open(&path)
        .await
        .with_context(|| format!("Failed to open database at {}", path.display()))
}

fn install_trace_hooks(backend: &dyn ControlPlane) {
    for (pre, post) in [logging_hooks(), timing_hooks()] {
        backend.add_hook(pre);
        backend.add_hook(post);
    }
}
