//! Telemetry error types.

use thiserror::Error;

/// Errors raised while configuring logging.
#[derive(Debug, Error)]
pub enum TelemetryError {
    /// The log configuration is invalid (bad level, directive or directory).
    #[error("invalid logging configuration: {0}")]
    ConfigError(String),

    /// A global subscriber could not be installed.
    #[error("failed to initialize logging: {0}")]
    InitError(String),
}

/// Result type for telemetry operations.
pub type TelemetryResult<T> = Result<T, TelemetryError>;
