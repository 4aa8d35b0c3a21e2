//! Common error types for gcat

use thiserror::Error;

/// Common result type for gcat operations
pub type Result<T> = std::result::Result<T, Error>;

/// Common error types across gcat tools
#[derive(Error, Debug)]
pub enum Error {
    /// I/O operation error (wraps std::io::Error)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON encode/decode error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Configuration loading or validation error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Catalog document could not be read or is malformed
    #[error("Catalog error: {0}")]
    Catalog(String),
}
