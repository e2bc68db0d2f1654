//! Error types for carewatch-monitor
//!
//! Module-specific error types using thiserror. Notification failures are
//! values the frame loop can log and continue past, never panics.

use thiserror::Error;

/// Main error type for the monitor service
#[derive(Error, Debug)]
pub enum Error {
    /// Configuration or environment errors, fatal at startup
    #[error("Configuration error: {0}")]
    Config(String),

    /// Transport send failure. Recoverable: the next eligible notify
    /// retries naturally once the throttle window allows.
    #[error("Notification to {recipient} failed: {reason}")]
    Notification { reason: String, recipient: String },

    /// Frame source errors (unreadable frame, bad sidecar data)
    #[error("Frame source error: {0}")]
    Source(String),

    /// Image decode/encode errors
    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),

    /// File I/O errors
    #[error("File I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Errors from the shared library (config, message catalog)
    #[error(transparent)]
    Common(#[from] carewatch_common::Error),
}

/// Convenience Result type using the monitor Error
pub type Result<T> = std::result::Result<T, Error>;
