//! Error handling module for the TrimX server process

use thiserror::Error;

use crate::domain::errors::DomainError;

/// Errors that stop the server from starting or running.
///
/// Per-request failures are [`DomainError`]s and never leave the HTTP layer;
/// this type covers configuration, startup and listener problems.
#[derive(Error, Debug)]
pub enum ServerError {
    /// Configuration could not be loaded or failed validation
    #[error("Configuration error: {message}")]
    Config { message: String },

    /// Storage directories could not be prepared
    #[error("Storage error: {0}")]
    Storage(#[from] DomainError),

    /// Logging subscriber could not be installed
    #[error("Failed to initialize logging: {message}")]
    Logging { message: String },

    /// Listener bind or serve failure
    #[error("Server error on {address}: {source}")]
    Listener {
        address: String,
        #[source]
        source: std::io::Error,
    },

    /// I/O error
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),
}

/// Result type alias for server operations
pub type ServerResult<T> = std::result::Result<T, ServerError>;
