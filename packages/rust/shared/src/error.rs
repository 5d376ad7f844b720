//! Error types for assetlink.
//!
//! Library crates use [`AssetLinkError`] via `thiserror`.
//! The CLI wraps this with `color-eyre` for rich diagnostics.

use std::path::PathBuf;

/// Top-level error type for all assetlink operations.
#[derive(Debug, thiserror::Error)]
pub enum AssetLinkError {
    /// Network or protocol failure reported by the transport.
    #[error("transport error: {0}")]
    Transport(String),

    /// The catalog answered with a status the operation does not accept.
    #[error("unexpected status {status} (expected {expected}): {body}")]
    UnexpectedStatus {
        /// Status code returned by the catalog.
        status: u16,
        /// Status code the operation declares as success.
        expected: u16,
        /// Response body, serialized for diagnosis.
        body: String,
        /// The request body that was sent, if any.
        request_body: Option<String>,
    },

    /// A resolution query returned no results.
    #[error("{what} not found (query: {query})")]
    NotFound {
        /// What was being resolved (e.g. `RID for database_table 'T'`).
        what: String,
        /// The query that was attempted, as JSON text.
        query: String,
    },

    /// An operation expected a precondition about the catalog that did not hold.
    #[error("invariant violated: {message}")]
    Invariant { message: String },

    /// Configuration loading or validation error.
    #[error("config error: {message}")]
    Config { message: String },

    /// A response could not be interpreted.
    #[error("parse error: {message}")]
    Parse { message: String },

    /// Input rejected before any request was issued.
    #[error("validation error: {message}")]
    Validation { message: String },

    /// Filesystem I/O error.
    #[error("I/O error at {path:?}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
}

/// Convenience alias used throughout the codebase.
pub type Result<T> = std::result::Result<T, AssetLinkError>;

impl AssetLinkError {
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

    /// Create an invariant violation from any displayable message.
    pub fn invariant(msg: impl Into<String>) -> Self {
        Self::Invariant {
            message: msg.into(),
        }
    }

    /// Create a not-found error for `what`, keeping the attempted query.
    pub fn not_found(what: impl Into<String>, query: impl Into<String>) -> Self {
        Self::NotFound {
            what: what.into(),
            query: query.into(),
        }
    }

    /// Wrap a `std::io::Error` with a path for context.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Whether this error means a resolution query matched nothing.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }
}
