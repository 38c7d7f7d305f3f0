//! Error types for Nexus core.
//!
//! [`NexusError`] is the taxonomy every channel boundary speaks. Each
//! variant maps to exactly one user-visible error kind; internal faults
//! (IO, serialization, storage) collapse into `Internal` before they reach
//! a channel response.

use std::path::PathBuf;
use thiserror::Error;

/// Core result type alias.
pub type Result<T> = std::result::Result<T, NexusError>;

/// Unified error taxonomy for gateway operations.
#[derive(Debug, Error)]
pub enum NexusError {
    /// Malformed or missing input, schema mismatch. Client-caused, not retriable.
    #[error("Validation error: {0}")]
    Validation(String),

    /// Missing, invalid, or expired credentials. Client must re-authenticate.
    #[error("Authentication failed: {0}")]
    Authentication(String),

    /// Insufficient permission or tenant-isolation violation. Never retried.
    #[error("Authorization denied on {resource} ({action}): {reason}")]
    Authorization {
        resource: String,
        action: String,
        reason: String,
    },

    /// Unknown workflow, tool, session, or run identifier.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Quota or rate window exceeded. Caller may retry after the hint.
    #[error("Rate limited: retry after {retry_after_ms}ms")]
    RateLimit { retry_after_ms: u64 },

    /// The external runtime failed. Retried only if the runtime declares
    /// the failure transient, and never by this core.
    #[error("Execution failed: {message}")]
    Execution { message: String, transient: bool },

    /// Configuration error.
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Internal fault. Detail is logged, never surfaced to callers.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl NexusError {
    /// Stable machine-readable kind string used in response envelopes and
    /// audit records.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Validation(_) => "validation",
            Self::Authentication(_) => "authentication",
            Self::Authorization { .. } => "authorization",
            Self::NotFound(_) => "not_found",
            Self::RateLimit { .. } => "rate_limit",
            Self::Execution { .. } => "execution",
            Self::Config(_) => "config",
            Self::Internal(_) => "internal",
        }
    }

    /// Whether a caller may reasonably retry the same request.
    pub fn is_retriable(&self) -> bool {
        match self {
            Self::RateLimit { .. } => true,
            Self::Execution { transient, .. } => *transient,
            _ => false,
        }
    }

    /// Construct an authorization error.
    pub fn authorization(
        resource: impl Into<String>,
        action: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        Self::Authorization {
            resource: resource.into(),
            action: action.into(),
            reason: reason.into(),
        }
    }

    /// Construct a non-transient execution error.
    pub fn execution(message: impl Into<String>) -> Self {
        Self::Execution {
            message: message.into(),
            transient: false,
        }
    }
}

impl From<std::io::Error> for NexusError {
    fn from(e: std::io::Error) -> Self {
        Self::Internal(format!("IO error: {e}"))
    }
}

impl From<serde_json::Error> for NexusError {
    fn from(e: serde_json::Error) -> Self {
        Self::Internal(format!("JSON error: {e}"))
    }
}

/// Configuration-related errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Configuration file not found: {0}")]
    NotFound(PathBuf),

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON5 parse error: {0}")]
    Json5(String),
}
