//! Error types for webcontext.
//!
//! Library crates use [`WebContextError`] via `thiserror`.
//! The CLI wraps this with `color-eyre` for rich diagnostics.

use std::path::PathBuf;

/// Top-level error type for all webcontext operations.
#[derive(Debug, thiserror::Error)]
pub enum WebContextError {
    /// Configuration loading or validation error.
    #[error("config error: {message}")]
    Config { message: String },

    /// Network/HTTP error while talking to a collaborator.
    #[error("network error: {0}")]
    Network(String),

    /// Malformed data from a collaborator (URL, JSON, etc.).
    #[error("parse error: {message}")]
    Parse { message: String },

    /// Search provider failure (transport or response shape).
    #[error("search error: {0}")]
    Search(String),

    /// Embedding endpoint failure.
    #[error("embedding error: {0}")]
    Embedding(String),

    /// HTML-to-text extraction error.
    #[error("extraction error: {0}")]
    Extraction(String),

    /// Query generation error (LLM call or empty output).
    #[error("query generation error: {0}")]
    QueryGeneration(String),

    /// The filtered candidate set was empty.
    #[error("no results found for this search query")]
    NoResults,

    /// Every carried-forward page segmented to nothing.
    #[error("no text found on the first {pages} results")]
    NoExtractableText { pages: usize },

    /// The requested embedding model has no profile and there is no default.
    #[error("embedding model {id} not available anymore")]
    ModelUnavailable { id: String },

    /// Filesystem I/O error.
    #[error("I/O error at {path:?}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Data validation error (bad input, oversized body, etc.).
    #[error("validation error: {message}")]
    Validation { message: String },
}

/// Convenience alias used throughout the codebase.
pub type Result<T> = std::result::Result<T, WebContextError>;

impl WebContextError {
    /// Create a config error from any displayable message.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config {
            message: msg.into(),
        }
    }

    /// Create a parse error from any displayable message.
    pub fn parse(msg: impl Into<String>) -> Self {
        Self::Parse {
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

    /// Whether this error is one of the conditions that ends a run with no
    /// context (as opposed to a collaborator failure).
    pub fn is_run_fatal(&self) -> bool {
        matches!(
            self,
            Self::NoResults | Self::NoExtractableText { .. } | Self::ModelUnavailable { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display_formatting() {
        let err = WebContextError::config("missing API key");
        assert_eq!(err.to_string(), "config error: missing API key");

        let err = WebContextError::NoExtractableText { pages: 5 };
        assert_eq!(err.to_string(), "no text found on the first 5 results");

        let err = WebContextError::ModelUnavailable {
            id: "Xenova/gte-small".into(),
        };
        assert!(err.to_string().contains("Xenova/gte-small"));
    }

    #[test]
    fn run_fatal_classification() {
        assert!(WebContextError::NoResults.is_run_fatal());
        assert!(WebContextError::NoExtractableText { pages: 1 }.is_run_fatal());
        assert!(!WebContextError::Network("timeout".into()).is_run_fatal());
        assert!(!WebContextError::Search("HTTP 500".into()).is_run_fatal());
    }
}
