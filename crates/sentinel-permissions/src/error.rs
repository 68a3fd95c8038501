//! Permission error types.

use thiserror::Error;

/// Errors that can occur while parsing, resolving or mutating permissions.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PermissionError {
    /// The permission string could not be parsed into a node.
    #[error("invalid permission format '{raw}': {reason}")]
    InvalidPermissionFormat {
        /// The raw input that failed to parse.
        raw: String,
        /// Why the input was rejected.
        reason: String,
    },

    /// The group inheritance graph contains a cycle.
    #[error("cyclic group inheritance involving: {}", groups.join(", "))]
    CyclicInheritance {
        /// Groups on the cycle, sorted. Ancestors and descendants of the
        /// cycle are not listed.
        groups: Vec<String>,
    },

    /// Inheritance is nested deeper than the configured limit.
    #[error("group inheritance exceeds maximum depth of {max_depth}")]
    InheritanceTooDeep {
        /// The configured depth limit.
        max_depth: usize,
    },

    /// Inheritance touches more groups than the configured limit.
    #[error("group inheritance visits more than {max_groups} groups")]
    InheritanceTooWide {
        /// The configured group limit.
        max_groups: usize,
    },

    /// No profile with this identifier is loaded.
    #[error("unknown profile: {profile_id}")]
    UnknownProfile {
        /// The profile identifier.
        profile_id: String,
    },

    /// No group with this identifier is loaded.
    #[error("unknown group: {group_id}")]
    UnknownGroup {
        /// The group identifier.
        group_id: String,
    },

    /// A group with this identifier already exists.
    #[error("group already exists: {group_id}")]
    DuplicateGroup {
        /// The group identifier.
        group_id: String,
    },

    /// A staged profile snapshot was overtaken by another writer.
    #[error("profile {profile_id} was modified concurrently")]
    ConcurrentModification {
        /// The profile identifier.
        profile_id: String,
    },

    /// Storage backend error (lock poisoned, persistence failed, etc.).
    #[error("storage error: {0}")]
    Storage(String),
}

impl PermissionError {
    /// Build an [`InvalidPermissionFormat`](Self::InvalidPermissionFormat) error.
    pub(crate) fn invalid(raw: &str, reason: impl Into<String>) -> Self {
        Self::InvalidPermissionFormat {
            raw: raw.to_owned(),
            reason: reason.into(),
        }
    }

    /// Whether this error came from the shape of the group graph
    /// (cycle, depth or width overflow).
    #[must_use]
    pub fn is_inheritance_fault(&self) -> bool {
        matches!(
            self,
            Self::CyclicInheritance { .. }
                | Self::InheritanceTooDeep { .. }
                | Self::InheritanceTooWide { .. }
        )
    }
}

/// Result type for permission operations.
pub type PermissionResult<T> = Result<T, PermissionError>;
