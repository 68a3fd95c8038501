//! Bridge from `sentinel_config::Config` to domain types.
//!
//! The config crate keeps enumerated settings as strings; validation has
//! already rejected unknown values by the time these conversions run, so
//! the fallbacks below only apply to hand-built configs.

use sentinel_config::Config;
use sentinel_permissions::{CacheSettings, MissingGroupPolicy, PermissionSettings, PrecedenceMode};
use sentinel_telemetry::{FileRotation, LogConfig, LogFormat, LogTarget};

/// Convert config to [`PermissionSettings`].
#[must_use]
pub fn to_permission_settings(cfg: &Config) -> PermissionSettings {
    let precedence = cfg
        .permissions
        .precedence
        .parse::<PrecedenceMode>()
        .unwrap_or_default();
    let missing_groups = cfg
        .permissions
        .missing_groups
        .parse::<MissingGroupPolicy>()
        .unwrap_or_default();

    PermissionSettings {
        precedence,
        max_inheritance_depth: cfg.permissions.max_inheritance_depth,
        max_visited_groups: cfg.permissions.max_visited_groups,
        missing_groups,
        cache: CacheSettings {
            enabled: cfg.cache.enabled,
            max_decisions_per_profile: cfg.cache.max_decisions_per_profile,
        },
    }
}

/// Convert config to [`LogConfig`].
#[must_use]
pub fn to_log_config(cfg: &Config) -> LogConfig {
    let format = cfg
        .logging
        .format
        .parse::<LogFormat>()
        .unwrap_or_default();

    let log = LogConfig::new(&cfg.logging.level)
        .with_format(format)
        .with_directives(cfg.logging.directives.iter().cloned());

    match (cfg.logging.target.as_str(), &cfg.logging.directory) {
        ("file", Some(directory)) => {
            let rotation = cfg
                .logging
                .rotation
                .parse::<FileRotation>()
                .unwrap_or_default();
            log.with_file_logging(directory, "sentinel", rotation)
        },
        ("stdout", _) => log.with_target(LogTarget::Stdout),
        _ => log,
    }
}
