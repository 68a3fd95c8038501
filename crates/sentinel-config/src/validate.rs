//! Post-merge configuration validation.
//!
//! Validates that deserialized [`Config`](crate::Config) values are within
//! acceptable ranges and that enumerated strings name known variants.

use crate::error::{ConfigError, ConfigResult};
use crate::types::Config;

/// Upper bound for `permissions.max_inheritance_depth`.
const MAX_DEPTH_UPPER_BOUND: usize = 1024;

/// Upper bound for `permissions.max_visited_groups`.
const MAX_VISITED_UPPER_BOUND: usize = 65_536;

/// Validate a fully-merged and deserialized configuration.
///
/// # Errors
///
/// Returns the first validation error found.
pub fn validate(config: &Config) -> ConfigResult<()> {
    validate_permissions(config)?;
    validate_cache(config)?;
    validate_logging(config)?;
    validate_store(config)?;
    Ok(())
}

fn one_of(field: &str, value: &str, allowed: &[&str]) -> ConfigResult<()> {
    if allowed.contains(&value) {
        return Ok(());
    }
    Err(ConfigError::ValidationError {
        field: field.to_owned(),
        message: format!(
            "unsupported value '{value}'; expected one of: {}",
            allowed.join(", ")
        ),
    })
}

fn validate_permissions(config: &Config) -> ConfigResult<()> {
    let p = &config.permissions;

    one_of(
        "permissions.precedence",
        &p.precedence,
        &["specificity", "source"],
    )?;
    one_of(
        "permissions.missing_groups",
        &p.missing_groups,
        &["skip", "deny"],
    )?;

    if p.max_inheritance_depth == 0 || p.max_inheritance_depth > MAX_DEPTH_UPPER_BOUND {
        return Err(ConfigError::ValidationError {
            field: "permissions.max_inheritance_depth".to_owned(),
            message: format!("must be between 1 and {MAX_DEPTH_UPPER_BOUND}"),
        });
    }

    if p.max_visited_groups == 0 || p.max_visited_groups > MAX_VISITED_UPPER_BOUND {
        return Err(ConfigError::ValidationError {
            field: "permissions.max_visited_groups".to_owned(),
            message: format!("must be between 1 and {MAX_VISITED_UPPER_BOUND}"),
        });
    }

    Ok(())
}

fn validate_cache(config: &Config) -> ConfigResult<()> {
    // A zero cap is only meaningful as "disabled"; say so explicitly.
    if config.cache.enabled && config.cache.max_decisions_per_profile == 0 {
        return Err(ConfigError::ValidationError {
            field: "cache.max_decisions_per_profile".to_owned(),
            message: "must be positive while the cache is enabled; set cache.enabled = false instead"
                .to_owned(),
        });
    }
    Ok(())
}

fn validate_logging(config: &Config) -> ConfigResult<()> {
    one_of(
        "logging.level",
        &config.logging.level,
        &["trace", "debug", "info", "warn", "error"],
    )?;
    one_of(
        "logging.format",
        &config.logging.format,
        &["pretty", "compact", "json", "full"],
    )?;
    one_of(
        "logging.target",
        &config.logging.target,
        &["stderr", "stdout", "file"],
    )?;
    one_of(
        "logging.rotation",
        &config.logging.rotation,
        &["daily", "hourly", "never"],
    )?;

    match &config.logging.directory {
        Some(dir) if dir.as_os_str().is_empty() => {
            return Err(ConfigError::ValidationError {
                field: "logging.directory".to_owned(),
                message: "log directory must not be empty".to_owned(),
            });
        },
        None if config.logging.target == "file" => {
            return Err(ConfigError::ValidationError {
                field: "logging.directory".to_owned(),
                message: "target \"file\" needs a log directory".to_owned(),
            });
        },
        _ => {},
    }

    if let Some(bad) = config
        .logging
        .directives
        .iter()
        .find(|d| d.trim().is_empty() || d.contains(char::is_whitespace))
    {
        return Err(ConfigError::ValidationError {
            field: "logging.directives".to_owned(),
            message: format!("directive '{bad}' must be non-empty and contain no whitespace"),
        });
    }

    Ok(())
}

fn validate_store(config: &Config) -> ConfigResult<()> {
    if config
        .store
        .document
        .as_ref()
        .is_some_and(|p| p.as_os_str().is_empty())
    {
        return Err(ConfigError::ValidationError {
            field: "store.document".to_owned(),
            message: "document path must not be empty".to_owned(),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn test_default_config_is_valid() {
        let config = Config::default();
        assert!(validate(&config).is_ok());
    }

    #[test]
    fn test_invalid_precedence() {
        let mut config = Config::default();
        config.permissions.precedence = "loudest".to_owned();
        let err = validate(&config).unwrap_err();
        assert!(matches!(err, ConfigError::ValidationError { field, .. } if field == "permissions.precedence"));
    }

    #[test]
    fn test_invalid_missing_group_policy() {
        let mut config = Config::default();
        config.permissions.missing_groups = "ignore".to_owned();
        assert!(validate(&config).is_err());
    }

    #[test]
    fn test_depth_bounds() {
        let mut config = Config::default();
        config.permissions.max_inheritance_depth = 0;
        assert!(validate(&config).is_err());

        config.permissions.max_inheritance_depth = MAX_DEPTH_UPPER_BOUND;
        assert!(validate(&config).is_ok());

        config.permissions.max_visited_groups = 0;
        assert!(validate(&config).is_err());
    }

    #[test]
    fn test_zero_cache_cap_requires_disabled_cache() {
        let mut config = Config::default();
        config.cache.max_decisions_per_profile = 0;
        assert!(validate(&config).is_err());

        config.cache.enabled = false;
        assert!(validate(&config).is_ok());
    }

    #[test]
    fn test_invalid_logging() {
        let mut config = Config::default();
        config.logging.level = "loud".to_owned();
        assert!(validate(&config).is_err());

        let mut config = Config::default();
        config.logging.format = "xml".to_owned();
        assert!(validate(&config).is_err());

        let mut config = Config::default();
        config.logging.directives = vec!["sentinel_permissions = debug".to_owned()];
        assert!(validate(&config).is_err());
    }

    #[test]
    fn test_file_logging_needs_directory() {
        let mut config = Config::default();
        config.logging.target = "file".to_owned();
        let err = validate(&config).unwrap_err();
        assert!(matches!(
            err,
            ConfigError::ValidationError { ref field, .. } if field == "logging.directory"
        ));

        config.logging.directory = Some(PathBuf::from("/var/log/sentinel"));
        assert!(validate(&config).is_ok());

        config.logging.rotation = "weekly".to_owned();
        assert!(validate(&config).is_err());

        let mut config = Config::default();
        config.logging.target = "syslog".to_owned();
        assert!(validate(&config).is_err());
    }

    #[test]
    fn test_empty_document_path() {
        let mut config = Config::default();
        config.store.document = Some(PathBuf::new());
        assert!(validate(&config).is_err());

        config.store.document = Some(PathBuf::from("perms.toml"));
        assert!(validate(&config).is_ok());
    }
}
