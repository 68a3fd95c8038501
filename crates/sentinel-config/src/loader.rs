//! Config file discovery and layered loading.
//!
//! Implements the `Config::load()` algorithm:
//! 1. Parse `defaults.toml` → base
//! 2. Merge `/etc/sentinel/config.toml` (system)
//! 3. Merge `~/.sentinel/config.toml` (user)
//! 4. Merge the explicit `--config` file, which must exist
//! 5. Apply `SENTINEL_*` environment overrides
//! 6. Deserialize merged tree → `Config`
//! 7. Validate
//! 8. Return `ResolvedConfig`

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use tracing::{debug, info};

use crate::env::{apply_env_overrides, collect_env_vars};
use crate::error::{ConfigError, ConfigResult};
use crate::merge::{ConfigLayer, FieldSources, attribute_leaves, merge_layer};
use crate::show::ResolvedConfig;
use crate::types::Config;
use crate::validate;

/// Embedded default configuration.
const DEFAULTS_TOML: &str = include_str!("defaults.toml");

/// System-wide config file.
const SYSTEM_CONFIG: &str = "/etc/sentinel/config.toml";

/// Maximum allowed config file size (1 MB).
const MAX_CONFIG_FILE_SIZE: u64 = 1_048_576;

/// Load the configuration with layered file precedence.
///
/// `explicit_file` is merged last among the files and must exist.
/// `home_override` replaces the user's home directory for locating
/// `.sentinel/config.toml`.
///
/// # Errors
///
/// Returns a [`ConfigError`] if the home directory is unknown, any config
/// file is malformed, an explicit file is missing, or the merged
/// configuration fails validation.
pub fn load(explicit_file: Option<&Path>, home_override: Option<&Path>) -> ConfigResult<ResolvedConfig> {
    let home_dir = match home_override {
        Some(h) => h.to_path_buf(),
        None => home_directory()?,
    };
    let user_path = home_dir.join(".sentinel").join("config.toml");

    load_layers(
        Path::new(SYSTEM_CONFIG),
        &user_path,
        explicit_file,
        &collect_env_vars(),
    )
}

/// Merge every layer from the given locations and environment snapshot.
pub(crate) fn load_layers(
    system_path: &Path,
    user_path: &Path,
    explicit_file: Option<&Path>,
    env_vars: &HashMap<String, String>,
) -> ConfigResult<ResolvedConfig> {
    // 1. Parse embedded defaults.
    let mut merged: toml::Value =
        toml::from_str(DEFAULTS_TOML).map_err(|e| ConfigError::ParseError {
            path: "<embedded defaults>".to_owned(),
            source: e,
        })?;

    let mut field_sources = FieldSources::new();
    let mut loaded_files = Vec::new();
    attribute_leaves(&merged, &ConfigLayer::Defaults, &mut field_sources);

    // 2-3. System and user files are optional.
    for (path, layer) in [
        (system_path, ConfigLayer::System),
        (user_path, ConfigLayer::User),
    ] {
        if let Some(overlay) = try_load_file(path)? {
            merge_layer(&mut merged, &overlay, &layer, &mut field_sources);
            loaded_files.push(path.display().to_string());
            info!(path = %path.display(), layer = %layer, "loaded config");
        }
    }

    // 4. An explicitly requested file must exist.
    if let Some(path) = explicit_file {
        let overlay = read_toml(path)?;
        merge_layer(&mut merged, &overlay, &ConfigLayer::Explicit, &mut field_sources);
        loaded_files.push(path.display().to_string());
        info!(path = %path.display(), "loaded explicit config");
    }

    // 5. Environment overrides.
    let env_count = apply_env_overrides(&mut merged, &mut field_sources, env_vars)?;
    if env_count > 0 {
        debug!(count = env_count, "applied environment overrides");
    }

    // 6. Deserialize.
    let config: Config =
        merged
            .try_into()
            .map_err(|e: toml::de::Error| ConfigError::ParseError {
                path: "<merged config>".to_owned(),
                source: e,
            })?;

    // 7. Validate.
    validate::validate(&config)?;

    Ok(ResolvedConfig {
        config,
        field_sources,
        loaded_files,
    })
}

/// Load a config from a specific file path (no layering).
///
/// # Errors
///
/// Returns a [`ConfigError`] if the file cannot be read, parsed, or fails
/// validation.
pub fn load_file(path: &Path) -> ConfigResult<Config> {
    let content = read_bounded(path)?;
    let config: Config = toml::from_str(&content).map_err(|e| ConfigError::ParseError {
        path: path.display().to_string(),
        source: e,
    })?;

    validate::validate(&config)?;
    Ok(config)
}

/// Try to load a file, returning `None` if the file doesn't exist.
///
/// Uses a single read operation to avoid TOCTOU races (no separate
/// exists/metadata checks before reading).
fn try_load_file(path: &Path) -> ConfigResult<Option<toml::Value>> {
    match read_toml(path) {
        Ok(value) => Ok(Some(value)),
        Err(ConfigError::ReadError { source, .. })
            if source.kind() == std::io::ErrorKind::NotFound =>
        {
            debug!(path = %path.display(), "config file not found, skipping");
            Ok(None)
        },
        Err(e) => Err(e),
    }
}

fn read_toml(path: &Path) -> ConfigResult<toml::Value> {
    let content = read_bounded(path)?;
    toml::from_str(&content).map_err(|e| ConfigError::ParseError {
        path: path.display().to_string(),
        source: e,
    })
}

fn read_bounded(path: &Path) -> ConfigResult<String> {
    let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
        path: path.display().to_string(),
        source: e,
    })?;

    // Check size after reading to avoid TOCTOU between stat and read.
    if content.len() as u64 > MAX_CONFIG_FILE_SIZE {
        return Err(ConfigError::ValidationError {
            field: path.display().to_string(),
            message: format!(
                "config file is {} bytes, exceeding the {MAX_CONFIG_FILE_SIZE} byte limit",
                content.len(),
            ),
        });
    }
    Ok(content)
}

/// Determine the user's home directory.
fn home_directory() -> ConfigResult<PathBuf> {
    directories::BaseDirs::new()
        .map(|d| d.home_dir().to_path_buf())
        .ok_or(ConfigError::NoHomeDir)
}
