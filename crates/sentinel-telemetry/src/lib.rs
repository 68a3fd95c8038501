//! Sentinel Telemetry - logging setup for Sentinel.
//!
//! This crate provides:
//! - Configurable logging setup with multiple formats
//! - Stdout, stderr and rotating file targets
//! - A switch for the permission diagnostics target
//!
//! # Example
//!
//! ```rust,no_run
//! use sentinel_telemetry::{LogConfig, LogFormat, setup_logging};
//!
//! # fn main() -> Result<(), sentinel_telemetry::TelemetryError> {
//! let config = LogConfig::new("warn")
//!     .with_format(LogFormat::Compact)
//!     .with_directive("sentinel_permissions=debug");
//!
//! setup_logging(&config)?;
//! tracing::info!("Logging ready");
//! # Ok(())
//! # }
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]
#![deny(clippy::unwrap_used)]
#![cfg_attr(test, allow(clippy::unwrap_used))]

pub mod prelude;

mod error;
mod logging;

pub use error::{TelemetryError, TelemetryResult};
pub use logging::{
    DIAGNOSTICS_DIRECTIVE_TARGET, FileLogConfig, FileRotation, LogConfig, LogFormat, LogTarget,
    setup_default_logging, setup_logging,
};
