//! The decision entry point.
//!
//! [`PermissionEvaluator::has_effective_permission`] is total: every failure
//! (bad query, cyclic or oversized inheritance, missing group under the
//! strict policy) becomes a deny. [`PermissionEvaluator::check`] exposes the
//! same decision together with what produced it.

use serde::Serialize;
use std::fmt;
use std::sync::Arc;

use crate::cache::DecisionCache;
use crate::error::{PermissionError, PermissionResult};
use crate::group::GroupGraph;
use crate::node::PermissionNode;
use crate::profile::Profile;
use crate::resolver::{self, EffectiveEntry, EffectiveSet};
use crate::settings::{PermissionSettings, PrecedenceMode};

/// Log target for inheritance faults.
pub const DIAGNOSTICS_TARGET: &str = "sentinel::diagnostics";

/// The outcome of a permission check.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Decision {
    /// The canonical form of the queried permission.
    pub permission: String,
    /// Whether the actor may proceed.
    pub allowed: bool,
    /// The entry that decided, or `None` for the default deny.
    pub matched: Option<EffectiveEntry>,
}

impl Decision {
    /// Decide `queried` against an effective set.
    #[must_use]
    pub fn evaluate(effective: &EffectiveSet, queried: &PermissionNode, mode: PrecedenceMode) -> Self {
        let matched = effective.find_best_match(queried, mode).cloned();
        Self {
            permission: queried.to_string(),
            allowed: matched.as_ref().is_some_and(|entry| !entry.node.is_negated()),
            matched,
        }
    }
}

impl fmt::Display for Decision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let verdict = if self.allowed { "ALLOW" } else { "DENY" };
        match &self.matched {
            Some(entry) => write!(
                f,
                "{verdict} {} (matched {} from {})",
                self.permission, entry.node, entry.source
            ),
            None => write!(f, "{verdict} {} (no matching node)", self.permission),
        }
    }
}

/// Parse a queried permission.
///
/// # Errors
///
/// Returns [`PermissionError::InvalidPermissionFormat`] for malformed input
/// and for negated queries, which have no meaning as a question.
pub fn parse_query(raw: &str) -> PermissionResult<PermissionNode> {
    let node = PermissionNode::parse(raw)?;
    if node.is_negated() {
        return Err(PermissionError::invalid(raw, "a queried permission cannot be negated"));
    }
    Ok(node)
}

/// Evaluates permissions for profile snapshots, caching as it goes.
#[derive(Debug, Default)]
pub struct PermissionEvaluator {
    settings: PermissionSettings,
    cache: DecisionCache,
}

impl PermissionEvaluator {
    /// Create an evaluator with its own cache.
    #[must_use]
    pub fn new(settings: PermissionSettings) -> Self {
        let cache = DecisionCache::new(&settings.cache);
        Self { settings, cache }
    }

    /// Settings in effect.
    #[must_use]
    pub fn settings(&self) -> &PermissionSettings {
        &self.settings
    }

    /// The decision cache.
    #[must_use]
    pub fn cache(&self) -> &DecisionCache {
        &self.cache
    }

    /// The effective set for `profile`, from cache when the snapshot's
    /// revision matches. Unpublished snapshots (revision zero) are never
    /// cached.
    ///
    /// # Errors
    ///
    /// Propagates resolution failures; see [`resolver::resolve_effective`].
    pub fn effective_set(&self, profile: &Profile, graph: &GroupGraph) -> PermissionResult<Arc<EffectiveSet>> {
        let cacheable = is_published(profile);
        let cached = if cacheable {
            self.cache.effective(&profile.id, profile.revision)
        } else {
            None
        };
        if let Some(effective) = cached {
            return Ok(effective);
        }

        tracing::debug!(
            profile_id = %profile.id,
            revision = profile.revision,
            "Resolving effective permissions"
        );
        let effective = match resolver::resolve_effective(profile, graph, &self.settings) {
            Ok(effective) => Arc::new(effective),
            Err(e) => {
                if e.is_inheritance_fault() {
                    tracing::error!(
                        target: DIAGNOSTICS_TARGET,
                        profile_id = %profile.id,
                        error = %e,
                        "Group inheritance is broken, denying all checks for profile"
                    );
                }
                return Err(e);
            },
        };
        if cacheable {
            self.cache
                .store_effective(profile.id, profile.revision, Arc::clone(&effective));
        }
        Ok(effective)
    }

    /// Evaluate `permission` for `profile`, returning the deciding entry.
    ///
    /// # Errors
    ///
    /// Returns [`PermissionError::InvalidPermissionFormat`] for a bad query
    /// and any resolution failure.
    pub fn check(&self, profile: &Profile, graph: &GroupGraph, permission: &str) -> PermissionResult<Decision> {
        let queried = parse_query(permission)?;
        let effective = self.effective_set(profile, graph)?;
        Ok(Decision::evaluate(&effective, &queried, self.settings.precedence))
    }

    /// Whether `profile` holds `permission`. Never fails; errors deny.
    #[must_use]
    pub fn has_effective_permission(&self, profile: &Profile, graph: &GroupGraph, permission: &str) -> bool {
        let cacheable = is_published(profile);
        let cached = if cacheable {
            self.cache.decision(&profile.id, profile.revision, permission)
        } else {
            None
        };
        if let Some(allowed) = cached {
            return allowed;
        }

        let allowed = match self.check(profile, graph, permission) {
            Ok(decision) => decision.allowed,
            Err(PermissionError::InvalidPermissionFormat { raw, reason }) => {
                tracing::debug!(
                    profile_id = %profile.id,
                    permission = %raw,
                    reason = %reason,
                    "Denying malformed permission query"
                );
                false
            },
            Err(e) => {
                tracing::warn!(
                    profile_id = %profile.id,
                    permission,
                    error = %e,
                    "Permission check failed, denying"
                );
                false
            },
        };

        if cacheable {
            self.cache
                .store_decision(profile.id, profile.revision, permission, allowed);
        }
        allowed
    }
}

/// Revision zero marks a snapshot the store never published; nothing keyed
/// on it can be trusted to stay current.
fn is_published(profile: &Profile) -> bool {
    profile.revision != 0
}

#[cfg(test)]
#[path = "evaluator_tests.rs"]
mod tests;
