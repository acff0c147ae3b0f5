// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! # Control-Plane Error Taxonomy
//!
//! One error type shared by every [`ControlPlane`](crate::application::control_plane::ControlPlane)
//! backend, so callers can match on the same variants whether they talk to
//! the local SQLite store or the remote service.
//!
//! | Variant | Raised by |
//! |---------|-----------|
//! | `Authentication` | transport (HTTP 401, missing api key) |
//! | `NotFound` | both backends, unknown agent id |
//! | `PolicyDenied` | [`PolicyResult::enforce`](crate::domain::policy::PolicyResult::enforce) only |
//! | everything else | generic control-plane failures |
//!
//! A denied policy check is *not* an error: the evaluator returns a
//! `PolicyResult` with `allowed == false`.

use thiserror::Error;

use crate::domain::policy::PolicyError;
use crate::domain::repository::RepositoryError;

#[derive(Debug, Error)]
pub enum ControlPlaneError {
    #[error("Authentication failed: {message}")]
    Authentication {
        message: String,
        status_code: Option<u16>,
    },

    #[error("Not found: {message}")]
    NotFound {
        message: String,
        status_code: Option<u16>,
    },

    #[error("Policy denied: {reason}")]
    PolicyDenied {
        reason: String,
        policy_id: Option<String>,
    },

    #[error("API error {status_code}: {message}")]
    Api { status_code: u16, message: String },

    #[error("Connection error: {0}")]
    Connection(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Invalid policy: {0}")]
    InvalidPolicy(String),

    #[error("Invalid request: {0}")]
    InvalidRequest(String),
}

impl ControlPlaneError {
    pub fn not_found(message: impl Into<String>) -> Self {
        ControlPlaneError::NotFound {
            message: message.into(),
            status_code: None,
        }
    }

    pub fn agent_not_found(agent_id: &str) -> Self {
        Self::not_found(format!("Agent {} not found", agent_id))
    }

    /// HTTP status that produced this error, when it came off the wire.
    pub fn status_code(&self) -> Option<u16> {
        match self {
            ControlPlaneError::Authentication { status_code, .. }
            | ControlPlaneError::NotFound { status_code, .. } => *status_code,
            ControlPlaneError::Api { status_code, .. } => Some(*status_code),
            _ => None,
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, ControlPlaneError::NotFound { .. })
    }
}

impl From<RepositoryError> for ControlPlaneError {
    fn from(err: RepositoryError) -> Self {
        match err {
            RepositoryError::NotFound(message) => ControlPlaneError::not_found(message),
            RepositoryError::Database(message) => ControlPlaneError::Storage(message),
            RepositoryError::Serialization(message) => ControlPlaneError::Serialization(message),
            RepositoryError::InvalidRule(err) => ControlPlaneError::InvalidPolicy(err.to_string()),
        }
    }
}

impl From<PolicyError> for ControlPlaneError {
    fn from(err: PolicyError) -> Self {
        ControlPlaneError::InvalidPolicy(err.to_string())
    }
}

impl From<serde_json::Error> for ControlPlaneError {
    fn from(err: serde_json::Error) -> Self {
        ControlPlaneError::Serialization(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_code_accessor() {
        let err = ControlPlaneError::Api {
            status_code: 503,
            message: "unavailable".into(),
        };
        assert_eq!(err.status_code(), Some(503));
        assert_eq!(err.to_string(), "API error 503: unavailable");

        let err = ControlPlaneError::Authentication {
            message: "bad key".into(),
            status_code: Some(401),
        };
        assert_eq!(err.status_code(), Some(401));

        assert_eq!(ControlPlaneError::Connection("refused".into()).status_code(), None);
    }

    #[test]
    fn test_repository_error_mapping() {
        let err: ControlPlaneError = RepositoryError::NotFound("Agent x not found".into()).into();
        assert!(err.is_not_found());
        assert_eq!(err.status_code(), None);

        let err: ControlPlaneError = RepositoryError::Database("disk I/O error".into()).into();
        assert!(matches!(err, ControlPlaneError::Storage(_)));
    }
}
