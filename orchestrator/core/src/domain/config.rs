// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

// Control-Plane Configuration
//
// Two layers:
// - TransportConfig: what the HTTP backend needs (credential, base address,
//   retry schedule). Resolved from explicit arguments, then environment.
// - ControlPlaneConfig: the YAML file selecting a backend and its settings,
//   discovered on disk and patched by environment overrides.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::domain::error::ControlPlaneError;

pub const DEFAULT_BASE_URL: &str = "https://agentmolt.dev";
pub const DEFAULT_MAX_RETRIES: u32 = 3;
pub const DEFAULT_BACKOFF_BASE_MS: u64 = 500;
pub const DEFAULT_TIMEOUT_SECONDS: u64 = 30;
pub const DEFAULT_POLL_INTERVAL_MS: u64 = 5_000;

pub const ENV_API_KEY: &str = "AGENTMOLT_API_KEY";
pub const ENV_BASE_URL: &str = "AGENTMOLT_BASE_URL";
pub const ENV_BACKEND: &str = "AGENTMOLT_BACKEND";
pub const ENV_DB_PATH: &str = "AGENTMOLT_DB_PATH";
pub const ENV_CONFIG_PATH: &str = "AGENTMOLT_CONFIG_PATH";

/// `~/.agentmolt/agentmolt.db`, or `./agentmolt.db` without a home directory.
pub fn default_db_path() -> PathBuf {
    match dirs::home_dir() {
        Some(home) => home.join(".agentmolt").join("agentmolt.db"),
        None => PathBuf::from("agentmolt.db"),
    }
}

/// Settings for the resilient HTTP backend.
#[derive(Debug, Clone, PartialEq)]
pub struct TransportConfig {
    pub api_key: String,
    /// Never ends with `/`
    pub base_url: String,
    pub max_retries: u32,
    pub backoff_base: Duration,
    pub request_timeout: Duration,
}

impl TransportConfig {
    /// Explicit argument, then `AGENTMOLT_API_KEY` / `AGENTMOLT_BASE_URL`,
    /// then defaults. Fails without an api key.
    pub fn resolve(
        api_key: Option<String>,
        base_url: Option<String>,
    ) -> Result<Self, ControlPlaneError> {
        Self::resolve_with(api_key, base_url, |key| std::env::var(key).ok())
    }

    pub fn resolve_with(
        api_key: Option<String>,
        base_url: Option<String>,
        env: impl Fn(&str) -> Option<String>,
    ) -> Result<Self, ControlPlaneError> {
        let api_key = api_key
            .filter(|k| !k.is_empty())
            .or_else(|| env(ENV_API_KEY).filter(|k| !k.is_empty()))
            .ok_or_else(|| ControlPlaneError::Authentication {
                message: format!("api_key is required (pass it or set {})", ENV_API_KEY),
                status_code: None,
            })?;

        let base_url = base_url
            .filter(|u| !u.is_empty())
            .or_else(|| env(ENV_BASE_URL).filter(|u| !u.is_empty()))
            .unwrap_or_else(|| DEFAULT_BASE_URL.to_string());

        Ok(Self {
            api_key,
            base_url: base_url.trim_end_matches('/').to_string(),
            max_retries: DEFAULT_MAX_RETRIES,
            backoff_base: Duration::from_millis(DEFAULT_BACKOFF_BASE_MS),
            request_timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECONDS),
        })
    }

    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    pub fn with_backoff_base(mut self, backoff_base: Duration) -> Self {
        self.backoff_base = backoff_base;
        self
    }

    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    /// At least one attempt is always made.
    pub fn attempts(&self) -> u32 {
        self.max_retries.max(1)
    }

    /// Delay after the 0-based `attempt`: `backoff_base * 2^attempt`.
    pub fn backoff_for(&self, attempt: u32) -> Duration {
        self.backoff_base
            .saturating_mul(2u32.saturating_pow(attempt))
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    #[default]
    Local,
    Remote,
}

impl std::str::FromStr for BackendKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "local" => Ok(BackendKind::Local),
            "remote" => Ok(BackendKind::Remote),
            other => Err(format!("unknown backend '{}' (expected local or remote)", other)),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LocalConfig {
    /// Defaults to `~/.agentmolt/agentmolt.db`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub db_path: Option<PathBuf>,
}

impl LocalConfig {
    pub fn resolved_db_path(&self) -> PathBuf {
        self.db_path.clone().unwrap_or_else(default_db_path)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RemoteConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    #[serde(default = "default_backoff_base_ms")]
    pub backoff_base_ms: u64,

    #[serde(default = "default_timeout_seconds")]
    pub timeout_seconds: u64,
}

impl Default for RemoteConfig {
    fn default() -> Self {
        Self {
            base_url: None,
            api_key: None,
            max_retries: DEFAULT_MAX_RETRIES,
            backoff_base_ms: DEFAULT_BACKOFF_BASE_MS,
            timeout_seconds: DEFAULT_TIMEOUT_SECONDS,
        }
    }
}

impl RemoteConfig {
    /// Builds the transport settings; the usual env fallback still applies to
    /// fields left unset in the file.
    pub fn transport(&self) -> Result<TransportConfig, ControlPlaneError> {
        Ok(TransportConfig::resolve(self.api_key.clone(), self.base_url.clone())?
            .with_max_retries(self.max_retries)
            .with_backoff_base(Duration::from_millis(self.backoff_base_ms))
            .with_request_timeout(Duration::from_secs(self.timeout_seconds)))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KillSwitchConfig {
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
}

impl Default for KillSwitchConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: DEFAULT_POLL_INTERVAL_MS,
        }
    }
}

impl KillSwitchConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}

fn default_max_retries() -> u32 {
    DEFAULT_MAX_RETRIES
}

fn default_backoff_base_ms() -> u64 {
    DEFAULT_BACKOFF_BASE_MS
}

fn default_timeout_seconds() -> u64 {
    DEFAULT_TIMEOUT_SECONDS
}

fn default_poll_interval_ms() -> u64 {
    DEFAULT_POLL_INTERVAL_MS
}

/// Top-level configuration file (`agentmolt.yaml`)
///
/// ```yaml
/// backend: remote
/// remote:
///   base_url: https://agentmolt.dev
///   max_retries: 5
/// killswitch:
///   poll_interval_ms: 2000
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ControlPlaneConfig {
    #[serde(default)]
    pub backend: BackendKind,

    #[serde(default)]
    pub local: LocalConfig,

    #[serde(default)]
    pub remote: RemoteConfig,

    #[serde(default)]
    pub killswitch: KillSwitchConfig,
}

impl ControlPlaneConfig {
    pub fn from_yaml_file(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config = serde_yaml::from_str(&content)?;
        Ok(config)
    }

    pub fn from_yaml_str(yaml: &str) -> anyhow::Result<Self> {
        let config = serde_yaml::from_str(yaml)?;
        Ok(config)
    }

    /// Discover configuration file using precedence order
    /// 1. AGENTMOLT_CONFIG_PATH environment variable
    /// 2. ./agentmolt.yaml (working directory)
    /// 3. ~/.agentmolt/config.yaml (user home)
    pub fn discover_config() -> Option<PathBuf> {
        if let Ok(path) = std::env::var(ENV_CONFIG_PATH) {
            let path = PathBuf::from(path);
            if path.exists() {
                return Some(path);
            }
        }

        let cwd = PathBuf::from("./agentmolt.yaml");
        if cwd.exists() {
            return Some(cwd);
        }

        if let Some(home) = dirs::home_dir() {
            let user_config = home.join(".agentmolt").join("config.yaml");
            if user_config.exists() {
                return Some(user_config);
            }
        }

        None
    }

    /// Load configuration with discovery, fallback to default
    pub fn load_or_default(cli_path: Option<PathBuf>) -> anyhow::Result<Self> {
        // Explicit path must exist and parse
        if let Some(path) = cli_path {
            tracing::info!("Loading configuration from explicit path: {:?}", path);
            let mut config = Self::from_yaml_file(&path)
                .map_err(|e| anyhow::anyhow!("Failed to load config at {:?}: {}", path, e))?;
            config.apply_env_overrides();
            return Ok(config);
        }

        let mut config = match Self::discover_config() {
            Some(config_path) => {
                tracing::info!("Loading configuration from discovered path: {:?}", config_path);
                Self::from_yaml_file(config_path)?
            }
            None => {
                tracing::debug!("No configuration file found, using defaults");
                Self::default()
            }
        };
        config.apply_env_overrides();
        Ok(config)
    }

    pub fn apply_env_overrides(&mut self) {
        self.apply_overrides_from(|key| std::env::var(key).ok());
    }

    /// Environment variable overrides, read through `env` so callers can
    /// substitute the process environment.
    pub fn apply_overrides_from(&mut self, env: impl Fn(&str) -> Option<String>) {
        if let Some(val) = env(ENV_BACKEND) {
            match val.parse::<BackendKind>() {
                Ok(kind) => {
                    tracing::info!("Environment override: {}={:?}", ENV_BACKEND, kind);
                    self.backend = kind;
                }
                Err(e) => tracing::warn!("Ignoring {}: {}", ENV_BACKEND, e),
            }
        }

        if let Some(path) = env(ENV_DB_PATH).filter(|p| !p.is_empty()) {
            tracing::info!("Environment override: {}={}", ENV_DB_PATH, path);
            self.local.db_path = Some(PathBuf::from(path));
        }

        if let Some(url) = env(ENV_BASE_URL).filter(|u| !u.is_empty()) {
            self.remote.base_url = Some(url);
        }

        // Never log the key itself
        if let Some(key) = env(ENV_API_KEY).filter(|k| !k.is_empty()) {
            self.remote.api_key = Some(key);
        }
    }
}
