//! Server error types

use std::net::SocketAddr;

use sapi_telemetry::TelemetryError;
use thiserror::Error;

use crate::config::ConfigError;

/// Result type alias for server operations
pub type ServerResult<T> = Result<T, ServerError>;

/// Failures while assembling or running the gateway
#[derive(Debug, Error)]
pub enum ServerError {
    /// Configuration could not be loaded
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Logging could not be set up
    #[error(transparent)]
    Telemetry(#[from] TelemetryError),

    /// The listener could not be bound
    #[error("failed to bind {addr}: {source}")]
    Bind {
        /// Requested address
        addr: SocketAddr,
        /// Underlying error
        #[source]
        source: std::io::Error,
    },

    /// The server stopped with an I/O error
    #[error("server error: {0}")]
    Io(#[from] std::io::Error),
}
