//! Common error types for CareWatch

use thiserror::Error;

/// Common result type for CareWatch operations
pub type Result<T> = std::result::Result<T, Error>;

/// Common error types across CareWatch crates
#[derive(Error, Debug)]
pub enum Error {
    /// Configuration loading or validation error
    #[error("Configuration error: {0}")]
    Config(String),

    /// I/O operation error (wraps std::io::Error)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Requested resource not found (message key, config file)
    #[error("Not found: {0}")]
    NotFound(String),
}
