//! Telemetry error types

use thiserror::Error;

/// Errors that can occur during telemetry setup
///
/// Emitting a record never fails from the caller's point of view; these errors
/// only come out of initialisation and configuration.
#[derive(Debug, Error)]
pub enum TelemetryError {
    /// Failed to initialize telemetry
    #[error("Failed to initialize telemetry: {0}")]
    InitializationFailed(String),

    /// Invalid configuration
    #[error("Invalid telemetry configuration: {0}")]
    InvalidConfiguration(String),

    /// Tracing subscriber error
    #[error("Tracing subscriber error: {0}")]
    TracingError(String),

    /// An exclusion pattern could not be compiled
    #[error("Invalid exclusion pattern {pattern:?}: {reason}")]
    InvalidPattern {
        /// The offending pattern
        pattern: String,
        /// Why it was rejected
        reason: String,
    },
}

/// Result type for telemetry operations
pub type TelemetryResult<T> = Result<T, TelemetryError>;
