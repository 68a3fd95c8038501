#![deny(unsafe_code)]
#![warn(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]
#![deny(clippy::unwrap_used)]
#![cfg_attr(test, allow(clippy::unwrap_used))]
//! Layered configuration for Sentinel.
//!
//! This crate provides a single [`Config`] type covering permission
//! resolution, the decision cache, logging, and the permission document
//! location.
//!
//! # Usage
//!
//! ```rust,no_run
//! use sentinel_config::Config;
//!
//! // Load with full precedence chain (defaults → system → user → explicit → env).
//! let resolved = Config::load(None).unwrap();
//! let config = resolved.config;
//! println!("Precedence: {}", config.permissions.precedence);
//! ```
//!
//! # Configuration Precedence
//!
//! From highest to lowest priority:
//!
//! 1. **Environment variables** (`SENTINEL_*`)
//! 2. **Explicit file** (`--config <path>`)
//! 3. **User** (`~/.sentinel/config.toml`)
//! 4. **System** (`/etc/sentinel/config.toml`)
//! 5. **Embedded defaults** (`defaults.toml` compiled into binary)
//!
//! # Design
//!
//! This crate has **no dependencies on other internal sentinel crates**.
//! Conversion from config types to domain types happens at the integration
//! boundary (CLI startup) via a bridge module.

/// `SENTINEL_*` environment overrides.
pub mod env;
/// Configuration error types.
pub mod error;
/// Configuration file discovery and loading.
pub mod loader;
/// Layered configuration merging with precedence.
pub mod merge;
/// Resolved configuration display and serialization.
pub mod show;
/// Configuration struct definitions.
pub mod types;
/// Configuration validation rules.
pub mod validate;

// Re-export primary types at the crate root.
pub use error::{ConfigError, ConfigResult};
pub use merge::ConfigLayer;
pub use show::{ResolvedConfig, ShowFormat};
pub use types::*;

impl Config {
    /// Load configuration with full precedence chain.
    ///
    /// See [`loader::load`] for the full algorithm.
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigError`] if any config file is malformed or the final
    /// configuration fails validation.
    pub fn load(explicit_file: Option<&std::path::Path>) -> ConfigResult<ResolvedConfig> {
        loader::load(explicit_file, None)
    }

    /// Load configuration with an explicit home directory override.
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigError`] if any config file is malformed or the final
    /// configuration fails validation.
    pub fn load_with_home(
        explicit_file: Option<&std::path::Path>,
        home_dir: &std::path::Path,
    ) -> ConfigResult<ResolvedConfig> {
        loader::load(explicit_file, Some(home_dir))
    }

    /// Load configuration from a single file (no layering).
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigError`] if the file cannot be read, parsed, or fails
    /// validation.
    pub fn load_file(path: &std::path::Path) -> ConfigResult<Self> {
        loader::load_file(path)
    }
}
