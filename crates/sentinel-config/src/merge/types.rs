use std::collections::HashMap;

/// Which configuration layer a value came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigLayer {
    /// Compiled-in defaults (`defaults.toml`).
    Defaults,
    /// System-wide configuration (`/etc/sentinel/config.toml`).
    System,
    /// User-level configuration (`~/.sentinel/config.toml`).
    User,
    /// A file passed explicitly (`--config`).
    Explicit,
    /// `SENTINEL_*` environment override.
    Environment,
}

impl std::fmt::Display for ConfigLayer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Defaults => write!(f, "defaults"),
            Self::System => write!(f, "system (/etc/sentinel/config.toml)"),
            Self::User => write!(f, "user (~/.sentinel/config.toml)"),
            Self::Explicit => write!(f, "explicit (--config)"),
            Self::Environment => write!(f, "environment variable"),
        }
    }
}

/// Tracks which layer set each field's value.
pub type FieldSources = HashMap<String, ConfigLayer>;
