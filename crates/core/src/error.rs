//! Error types for Workbox.

use std::time::Duration;

use thiserror::Error;

/// Result type alias using Workbox's Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Boxed underlying cause carried by wrapping variants.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Core error type for Workbox.
#[derive(Error, Debug)]
pub enum Error {
    // =========================================================================
    // Lifecycle Errors
    // =========================================================================
    #[error("Failed to create sandbox: {message}")]
    Creation {
        message: String,
        #[source]
        source: Option<BoxError>,
    },

    #[error("Sandbox is not ready: {0}")]
    InvalidState(String),

    // =========================================================================
    // Operation Errors
    // =========================================================================
    #[error("File not found in sandbox: {0}")]
    NotFound(String),

    #[error("Sandbox execution failed: {message}")]
    Execution {
        message: String,
        #[source]
        source: Option<BoxError>,
    },

    #[error("Command timed out after {}s: {command}", timeout.as_secs_f64())]
    Timeout { command: String, timeout: Duration },

    #[error("Archive error: {0}")]
    Archive(String),

    #[error("Security violation: {0}")]
    SecurityViolation(String),

    // =========================================================================
    // Generic Errors
    // =========================================================================
    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Create a creation error wrapping the underlying cause.
    pub fn creation(msg: impl Into<String>, source: impl Into<BoxError>) -> Self {
        Self::Creation {
            message: msg.into(),
            source: Some(source.into()),
        }
    }

    /// Create an execution error wrapping the underlying cause.
    pub fn execution(msg: impl Into<String>, source: impl Into<BoxError>) -> Self {
        Self::Execution {
            message: msg.into(),
            source: Some(source.into()),
        }
    }

    /// Create an execution error with no underlying cause.
    pub fn execution_msg(msg: impl Into<String>) -> Self {
        Self::Execution {
            message: msg.into(),
            source: None,
        }
    }

    /// Create a not-found error.
    pub fn not_found(path: impl Into<String>) -> Self {
        Self::NotFound(path.into())
    }

    /// Create a timeout error.
    pub fn timeout(command: impl Into<String>, timeout: Duration) -> Self {
        Self::Timeout {
            command: command.into(),
            timeout,
        }
    }

    /// Create an archive decoding/encoding error.
    pub fn archive(msg: impl Into<String>) -> Self {
        Self::Archive(msg.into())
    }

    /// Create a security violation error.
    pub fn security(msg: impl Into<String>) -> Self {
        Self::SecurityViolation(msg.into())
    }

    /// Create an invalid state error.
    pub fn invalid_state(msg: impl Into<String>) -> Self {
        Self::InvalidState(msg.into())
    }

    /// Create an internal error.
    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    /// Whether this error is a timeout.
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout { .. })
    }

    /// Whether this error reports a missing path.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }

    /// Wrap any non-typed failure as an execution error, keeping typed
    /// sandbox errors (not found, timeout, security) intact.
    pub fn into_execution(self, context: &str) -> Self {
        match self {
            Self::NotFound(_)
            | Self::Timeout { .. }
            | Self::SecurityViolation(_)
            | Self::InvalidState(_)
            | Self::Execution { .. } => self,
            other => Self::execution(context.to_string(), other),
        }
    }
}
