//! Error types for drive-sentry

use thiserror::Error;

/// Main error type for drive-sentry operations
#[derive(Error, Debug)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid configuration: {reason}")]
    Config { reason: String },

    #[error("Volume lookup failed: {reason}")]
    VolumeLookup { reason: String },

    #[error("{name} invocation failed: {reason}")]
    Tool { name: &'static str, reason: String },

    #[error("Copy timed out after {secs} seconds")]
    Timeout { secs: u64 },
}

/// Result type alias for drive-sentry operations
pub type Result<T> = std::result::Result<T, Error>;
