//! Error types for hirepipe.
//!
//! Library crates use [`HirePipeError`] via `thiserror`.
//! App crates (cli/tui) wrap this with `color-eyre` for rich diagnostics.

use std::path::PathBuf;

/// Top-level error type for all hirepipe operations.
#[derive(Debug, thiserror::Error)]
pub enum HirePipeError {
    /// Configuration loading or validation error.
    #[error("config error: {message}")]
    Config { message: String },

    /// Transport failure: the request never produced a response.
    #[error("network error: {0}")]
    Network(String),

    /// The backend answered with a non-success status.
    #[error("upstream error (HTTP {status}): {}", .detail.as_deref().unwrap_or("no detail"))]
    Upstream {
        status: u16,
        /// The `detail` string of the error body, when the backend sent one.
        detail: Option<String>,
    },

    /// A success response whose body does not match the expected schema.
    #[error("invalid response: {message}")]
    InvalidResponse { message: String },

    /// Database or storage layer error.
    #[error("storage error: {0}")]
    Storage(String),

    /// Filesystem I/O error.
    #[error("I/O error at {path:?}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Missing or invalid input, detected before any network call.
    #[error("validation error: {message}")]
    Validation { message: String },
}

/// Convenience alias used throughout the codebase.
pub type Result<T> = std::result::Result<T, HirePipeError>;

impl HirePipeError {
    /// Create a config error from any displayable message.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config {
            message: msg.into(),
        }
    }

    /// Create an invalid-response error from any displayable message.
    pub fn invalid_response(msg: impl Into<String>) -> Self {
        Self::InvalidResponse {
            message: msg.into(),
        }
    }

    /// Create a validation error from any displayable message.
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation {
            message: msg.into(),
        }
    }

    /// Wrap a `std::io::Error` with a path for context.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Whether this error was raised before any request left the client.
    pub fn is_validation(&self) -> bool {
        matches!(self, Self::Validation { .. })
    }

    /// The single human-readable line shown to the operator.
    ///
    /// Validation messages are shown as-is, upstream errors show the backend's
    /// `detail` when present, and everything else collapses to `fallback`.
    pub fn user_message(&self, fallback: &str) -> String {
        match self {
            Self::Validation { message } => message.clone(),
            Self::Upstream {
                detail: Some(detail),
                ..
            } if !detail.trim().is_empty() => detail.clone(),
            _ => fallback.to_string(),
        }
    }
}
