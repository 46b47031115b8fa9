//! Error types for SiteBundle.
//!
//! Library crates use [`SiteBundleError`] via `thiserror`.
//! The CLI wraps this with `color-eyre` for rich diagnostics.

use std::path::PathBuf;

/// Top-level error type for all SiteBundle operations.
#[derive(Debug, thiserror::Error)]
pub enum SiteBundleError {
    /// Configuration loading or validation error.
    #[error("config error: {message}")]
    Config { message: String },

    /// Network/HTTP error during discovery.
    #[error("network error: {0}")]
    Network(String),

    /// Sitemap or URL list parsing error.
    #[error("parse error: {message}")]
    Parse { message: String },

    /// Filesystem I/O error.
    #[error("I/O error at {path:?}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Data validation error (empty input, bad output path, etc.).
    #[error("validation error: {message}")]
    Validation { message: String },

    /// Bundling parameters violate their preconditions.
    #[error("invalid bundle parameters: {message}")]
    InvalidParams { message: String },

    /// Page rendering failed.
    #[error("render error: {0}")]
    Render(String),

    /// Word counting on a rendered document failed.
    #[error("measure error: {0}")]
    Measure(String),

    /// Concatenating rendered documents failed.
    #[error("merge error: {0}")]
    Merge(String),

    /// An external tool could not be spawned or timed out.
    #[error("process error: {0}")]
    Process(String),
}

/// Convenience alias used throughout the codebase.
pub type Result<T> = std::result::Result<T, SiteBundleError>;

impl SiteBundleError {
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

    /// Create an invalid-parameters error from any displayable message.
    pub fn invalid_params(msg: impl Into<String>) -> Self {
        Self::InvalidParams {
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
}
