//! Error types for brandctx.
//!
//! Library crates use [`ContextError`] via `thiserror`.
//! The CLI wraps this with `color-eyre` for rich diagnostics.

use std::path::PathBuf;

/// Top-level error type for all Context Store operations.
///
/// Every variant is surfaced to the caller. The store guarantees its own
/// in-memory state is unchanged whenever one of these is returned.
#[derive(Debug, thiserror::Error)]
pub enum ContextError {
    /// Malformed document during load or import (parse or shape failure).
    #[error("format error: {message}")]
    Format { message: String },

    /// Persistence backend unreachable or write rejected.
    #[error("storage error: {0}")]
    Storage(String),

    /// An operation that needs a current document ran while none is loaded.
    #[error("no context document loaded (onboarding not yet started)")]
    NoDocument,

    /// A document offered to `save` failed semantic validation.
    #[error("validation error: {message}")]
    Validation { message: String },

    /// Configuration loading or parsing error.
    #[error("config error: {message}")]
    Config { message: String },

    /// Filesystem I/O error.
    #[error("I/O error at {path:?}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    /// The store was used after `dispose()`.
    #[error("context store has been disposed")]
    Disposed,
}

/// Convenience alias used throughout the codebase.
pub type Result<T> = std::result::Result<T, ContextError>;

impl ContextError {
    /// Create a format error from any displayable message.
    pub fn format(msg: impl Into<String>) -> Self {
        Self::Format {
            message: msg.into(),
        }
    }

    /// Create a validation error from any displayable message.
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation {
            message: msg.into(),
        }
    }

    /// Create a config error from any displayable message.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config {
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

    /// Whether retrying the same call can succeed (storage hiccups only).
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Storage(_) | Self::Io { .. })
    }
}

impl From<serde_json::Error> for ContextError {
    fn from(e: serde_json::Error) -> Self {
        Self::format(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display_formatting() {
        let err = ContextError::format("expected value at line 1 column 1");
        assert_eq!(
            err.to_string(),
            "format error: expected value at line 1 column 1"
        );

        let err = ContextError::Storage("quota exceeded".into());
        assert!(err.to_string().contains("quota exceeded"));

        assert!(ContextError::NoDocument.to_string().contains("onboarding"));
    }

    #[test]
    fn json_errors_map_to_format() {
        let err: ContextError = serde_json::from_str::<serde_json::Value>("{not json")
            .unwrap_err()
            .into();
        assert!(matches!(err, ContextError::Format { .. }));
    }

    #[test]
    fn only_storage_failures_are_retryable() {
        assert!(ContextError::Storage("down".into()).is_retryable());
        assert!(!ContextError::format("bad").is_retryable());
        assert!(!ContextError::NoDocument.is_retryable());
    }
}
