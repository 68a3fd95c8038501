//! Configuration types for Sentinel.
//!
//! All types in this module are self-contained with no dependencies on other
//! internal sentinel crates. Enumerated settings are kept as strings here and
//! converted to domain types at the boundary. Every struct implements
//! [`Default`] so that a bare `[section]` header in TOML produces a working
//! configuration.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Top-level Config
// ---------------------------------------------------------------------------

/// Root configuration for Sentinel.
///
/// Loaded from layered TOML files (system, user, explicit) with `SENTINEL_*`
/// environment overrides on top.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Resolution and precedence settings.
    pub permissions: PermissionsSection,
    /// Decision cache settings.
    pub cache: CacheSection,
    /// Logging level, format, and per-crate directives.
    pub logging: LoggingSection,
    /// Where permission records come from.
    pub store: StoreSection,
}

// ---------------------------------------------------------------------------
// PermissionsSection
// ---------------------------------------------------------------------------

/// How effective permissions are resolved.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PermissionsSection {
    /// `"specificity"` (most specific node wins) or `"source"` (first source
    /// with a match decides).
    pub precedence: String,
    /// Longest group chain followed before a query denies.
    pub max_inheritance_depth: usize,
    /// Most distinct groups visited for one profile before a query denies.
    pub max_visited_groups: usize,
    /// What a membership in an unknown group does: `"skip"` or `"deny"`.
    pub missing_groups: String,
}

impl Default for PermissionsSection {
    fn default() -> Self {
        Self {
            precedence: "specificity".to_owned(),
            max_inheritance_depth: 16,
            max_visited_groups: 256,
            missing_groups: "skip".to_owned(),
        }
    }
}

// ---------------------------------------------------------------------------
// CacheSection
// ---------------------------------------------------------------------------

/// Decision cache configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheSection {
    /// Whether decisions are cached at all.
    pub enabled: bool,
    /// Cached decisions kept per profile before its entries are dropped.
    pub max_decisions_per_profile: usize,
}

impl Default for CacheSection {
    fn default() -> Self {
        Self {
            enabled: true,
            max_decisions_per_profile: 1024,
        }
    }
}

// ---------------------------------------------------------------------------
// LoggingSection
// ---------------------------------------------------------------------------

/// Logging and tracing configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingSection {
    /// Global log level filter (`"trace"`, `"debug"`, `"info"`, `"warn"`,
    /// `"error"`).
    pub level: String,
    /// Output format: `"pretty"` (human-friendly), `"compact"` (one-line),
    /// `"json"` (structured), or `"full"` (verbose).
    pub format: String,
    /// Per-crate tracing directives (e.g. `["sentinel_permissions=debug"]`).
    pub directives: Vec<String>,
    /// Where logs go: `"stderr"`, `"stdout"` or `"file"`.
    pub target: String,
    /// Log directory, required when `target = "file"`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub directory: Option<PathBuf>,
    /// File rotation: `"daily"`, `"hourly"` or `"never"`.
    pub rotation: String,
}

impl Default for LoggingSection {
    fn default() -> Self {
        Self {
            level: "warn".to_owned(),
            format: "compact".to_owned(),
            directives: Vec::new(),
            target: "stderr".to_owned(),
            directory: None,
            rotation: "daily".to_owned(),
        }
    }
}

// ---------------------------------------------------------------------------
// StoreSection
// ---------------------------------------------------------------------------

/// Permission record source.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreSection {
    /// Permission document (TOML or JSON) to read groups and profiles from.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub document: Option<PathBuf>,
}
