//! `SENTINEL_*` environment overrides.
//!
//! Environment variables are the last layer applied, so they win over every
//! config file. Each recognised variable maps to exactly one field; values
//! are parsed into the field's TOML type before merging.

use std::collections::HashMap;

use tracing::debug;

use crate::error::{ConfigError, ConfigResult};
use crate::merge::{ConfigLayer, FieldSources};

/// Prefix shared by every recognised variable.
pub const ENV_PREFIX: &str = "SENTINEL_";

#[derive(Debug, Clone, Copy)]
enum Kind {
    Str,
    Int,
    Bool,
}

/// Variable name, dotted field path, value kind.
const OVERRIDES: &[(&str, &str, Kind)] = &[
    ("SENTINEL_PRECEDENCE", "permissions.precedence", Kind::Str),
    (
        "SENTINEL_MAX_INHERITANCE_DEPTH",
        "permissions.max_inheritance_depth",
        Kind::Int,
    ),
    (
        "SENTINEL_MAX_VISITED_GROUPS",
        "permissions.max_visited_groups",
        Kind::Int,
    ),
    ("SENTINEL_MISSING_GROUPS", "permissions.missing_groups", Kind::Str),
    ("SENTINEL_CACHE_ENABLED", "cache.enabled", Kind::Bool),
    (
        "SENTINEL_CACHE_MAX_DECISIONS",
        "cache.max_decisions_per_profile",
        Kind::Int,
    ),
    ("SENTINEL_LOG_LEVEL", "logging.level", Kind::Str),
    ("SENTINEL_LOG_FORMAT", "logging.format", Kind::Str),
    ("SENTINEL_LOG_TARGET", "logging.target", Kind::Str),
    ("SENTINEL_LOG_DIR", "logging.directory", Kind::Str),
    ("SENTINEL_DOCUMENT", "store.document", Kind::Str),
];

/// Snapshot the process environment, keeping only `SENTINEL_*` variables.
#[must_use]
pub fn collect_env_vars() -> HashMap<String, String> {
    std::env::vars()
        .filter(|(key, _)| key.starts_with(ENV_PREFIX))
        .collect()
}

/// Names of every variable [`apply_env_overrides`] understands.
pub fn known_variables() -> impl Iterator<Item = &'static str> {
    OVERRIDES.iter().map(|(name, _, _)| *name)
}

/// Apply recognised variables from `env_vars` onto the merged tree.
///
/// Empty values are ignored. Returns the number of fields overridden.
///
/// # Errors
///
/// Returns [`ConfigError::ValidationError`] if an integer or boolean
/// variable does not parse.
pub fn apply_env_overrides(
    merged: &mut toml::Value,
    sources: &mut FieldSources,
    env_vars: &HashMap<String, String>,
) -> ConfigResult<usize> {
    let mut applied = 0usize;
    for (name, field, kind) in OVERRIDES {
        let Some(raw) = env_vars.get(*name) else {
            continue;
        };
        let raw = raw.trim();
        if raw.is_empty() {
            continue;
        }

        let value = parse_value(name, raw, *kind)?;
        let path: Vec<&str> = field.split('.').collect();
        set_field(merged, &path, value);
        sources.insert((*field).to_owned(), ConfigLayer::Environment);
        debug!(variable = name, field, "applied environment override");
        applied = applied.saturating_add(1);
    }
    Ok(applied)
}

fn parse_value(name: &str, raw: &str, kind: Kind) -> ConfigResult<toml::Value> {
    match kind {
        Kind::Str => Ok(toml::Value::String(raw.to_owned())),
        Kind::Int => raw
            .parse::<i64>()
            .ok()
            .filter(|n| *n >= 0)
            .map(toml::Value::Integer)
            .ok_or_else(|| ConfigError::ValidationError {
                field: name.to_owned(),
                message: format!("expected a non-negative integer, got '{raw}'"),
            }),
        Kind::Bool => match raw.to_ascii_lowercase().as_str() {
            "1" | "true" | "yes" | "on" => Ok(toml::Value::Boolean(true)),
            "0" | "false" | "no" | "off" => Ok(toml::Value::Boolean(false)),
            _ => Err(ConfigError::ValidationError {
                field: name.to_owned(),
                message: format!("expected a boolean, got '{raw}'"),
            }),
        },
    }
}

/// Set a value at a dotted path, creating intermediate tables as needed.
fn set_field(root: &mut toml::Value, path: &[&str], value: toml::Value) {
    let Some((leaf, parents)) = path.split_last() else {
        return;
    };

    let mut current = root;
    for segment in parents {
        let Some(table) = current.as_table_mut() else {
            return;
        };
        current = table
            .entry((*segment).to_owned())
            .or_insert_with(|| toml::Value::Table(toml::map::Map::new()));
    }

    if let Some(table) = current.as_table_mut() {
        table.insert((*leaf).to_owned(), value);
    }
}
