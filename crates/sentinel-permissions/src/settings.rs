//! Evaluation settings.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// How matches from different sources are ranked against each other.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PrecedenceMode {
    /// The most specific matching node wins regardless of source; ties go to
    /// the entry that comes first in the effective set.
    #[default]
    Specificity,
    /// The first source (profile, then groups in traversal order) with any
    /// match decides; specificity only breaks ties inside that source.
    Source,
}

impl fmt::Display for PrecedenceMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Specificity => f.write_str("specificity"),
            Self::Source => f.write_str("source"),
        }
    }
}

impl FromStr for PrecedenceMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "specificity" => Ok(Self::Specificity),
            "source" => Ok(Self::Source),
            other => Err(format!(
                "unknown precedence mode '{other}' (expected 'specificity' or 'source')"
            )),
        }
    }
}

/// What to do when a profile or group references a group that is not loaded.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MissingGroupPolicy {
    /// Log a warning and continue without the group.
    #[default]
    Skip,
    /// Fail resolution, which denies every check for the profile.
    Deny,
}

impl FromStr for MissingGroupPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "skip" => Ok(Self::Skip),
            "deny" => Ok(Self::Deny),
            other => Err(format!(
                "unknown missing group policy '{other}' (expected 'skip' or 'deny')"
            )),
        }
    }
}

/// Decision cache settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheSettings {
    /// Whether decisions and effective sets are cached at all.
    pub enabled: bool,
    /// Cached decisions kept per profile before that profile's decisions are
    /// dropped and rebuilt.
    pub max_decisions_per_profile: usize,
}

impl Default for CacheSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            max_decisions_per_profile: 1024,
        }
    }
}

/// Settings for resolution and evaluation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PermissionSettings {
    /// Cross-source precedence.
    pub precedence: PrecedenceMode,
    /// Maximum inheritance depth; a profile's own groups are depth 1.
    pub max_inheritance_depth: usize,
    /// Maximum number of distinct groups visited for one profile.
    pub max_visited_groups: usize,
    /// Handling of references to unloaded groups.
    pub missing_groups: MissingGroupPolicy,
    /// Decision cache.
    pub cache: CacheSettings,
}

impl Default for PermissionSettings {
    fn default() -> Self {
        Self {
            precedence: PrecedenceMode::default(),
            max_inheritance_depth: 16,
            max_visited_groups: 256,
            missing_groups: MissingGroupPolicy::default(),
            cache: CacheSettings::default(),
        }
    }
}

impl PermissionSettings {
    /// Set the precedence mode.
    #[must_use]
    pub fn with_precedence(mut self, precedence: PrecedenceMode) -> Self {
        self.precedence = precedence;
        self
    }

    /// Set the missing group policy.
    #[must_use]
    pub fn with_missing_groups(mut self, policy: MissingGroupPolicy) -> Self {
        self.missing_groups = policy;
        self
    }

    /// Set the inheritance depth limit.
    #[must_use]
    pub fn with_max_inheritance_depth(mut self, depth: usize) -> Self {
        self.max_inheritance_depth = depth;
        self
    }

    /// Set the visited group limit.
    #[must_use]
    pub fn with_max_visited_groups(mut self, groups: usize) -> Self {
        self.max_visited_groups = groups;
        self
    }

    /// Enable or disable the decision cache.
    #[must_use]
    pub fn with_cache_enabled(mut self, enabled: bool) -> Self {
        self.cache.enabled = enabled;
        self
    }
}
