//! Effective set resolution.
//!
//! A profile's effective set is its own nodes followed by the nodes of every
//! group reachable through inheritance, visited breadth-first in membership
//! and parent order. Each group contributes once; a group reached along a
//! second path (a diamond) is skipped.

use serde::Serialize;
use std::collections::{HashSet, VecDeque};

use crate::error::{PermissionError, PermissionResult};
use crate::group::{GroupGraph, GroupId};
use crate::node::PermissionNode;
use crate::profile::Profile;
use crate::settings::{MissingGroupPolicy, PermissionSettings, PrecedenceMode};

/// Where an effective entry came from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum GrantSource {
    /// Granted directly to the profile.
    Profile,
    /// Inherited from a group.
    Group {
        /// The contributing group.
        id: GroupId,
        /// Inheritance depth; the profile's own groups are depth 1.
        depth: usize,
    },
}

impl std::fmt::Display for GrantSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Profile => f.write_str("profile"),
            Self::Group { id, depth } => write!(f, "group {id} (depth {depth})"),
        }
    }
}

/// One node in an effective set, tagged with its source.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EffectiveEntry {
    /// The node.
    #[serde(serialize_with = "serialize_node")]
    pub node: PermissionNode,
    /// Where it came from.
    pub source: GrantSource,
}

fn serialize_node<S: serde::Serializer>(node: &PermissionNode, s: S) -> Result<S::Ok, S::Error> {
    s.collect_str(node)
}

/// The ordered, source-tagged entries that apply to a profile.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct EffectiveSet {
    entries: Vec<EffectiveEntry>,
}

impl EffectiveSet {
    /// Entries in precedence order.
    #[must_use]
    pub fn entries(&self) -> &[EffectiveEntry] {
        &self.entries
    }

    /// Number of entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether there are no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterate in precedence order.
    pub fn iter(&self) -> impl Iterator<Item = &EffectiveEntry> {
        self.entries.iter()
    }

    /// Find the entry that decides `queried` under `mode`, if any.
    #[must_use]
    pub fn find_best_match(
        &self,
        queried: &PermissionNode,
        mode: PrecedenceMode,
    ) -> Option<&EffectiveEntry> {
        let mut candidates = self
            .entries
            .iter()
            .enumerate()
            .filter(|(_, entry)| entry.node.matches(queried))
            .peekable();

        let deciding_source = match mode {
            PrecedenceMode::Specificity => None,
            PrecedenceMode::Source => Some(candidates.peek()?.1.source.clone()),
        };

        candidates
            .filter(|(_, entry)| deciding_source.as_ref().is_none_or(|s| *s == entry.source))
            .max_by_key(|(index, entry)| (entry.node.specificity(), std::cmp::Reverse(*index)))
            .map(|(_, entry)| entry)
    }
}

/// Build the effective set for `profile` against `graph`.
///
/// # Errors
///
/// - [`PermissionError::InheritanceTooDeep`] if a group sits deeper than
///   `max_inheritance_depth`.
/// - [`PermissionError::InheritanceTooWide`] if more than
///   `max_visited_groups` groups are reachable.
/// - [`PermissionError::CyclicInheritance`] if the reachable groups contain
///   a cycle.
/// - [`PermissionError::UnknownGroup`] for a missing group under
///   [`MissingGroupPolicy::Deny`].
pub fn resolve_effective(
    profile: &Profile,
    graph: &GroupGraph,
    settings: &PermissionSettings,
) -> PermissionResult<EffectiveSet> {
    let mut entries: Vec<EffectiveEntry> = profile
        .permissions
        .iter_newest_first()
        .map(|node| EffectiveEntry {
            node: node.clone(),
            source: GrantSource::Profile,
        })
        .collect();

    let mut seen: HashSet<&GroupId> = HashSet::new();
    let mut queue: VecDeque<(&GroupId, usize)> = VecDeque::new();
    for id in &profile.groups {
        if seen.insert(id) {
            queue.push_back((id, 1));
        }
    }

    let mut visited: Vec<&GroupId> = Vec::new();
    while let Some((id, depth)) = queue.pop_front() {
        if depth > settings.max_inheritance_depth {
            return Err(PermissionError::InheritanceTooDeep {
                max_depth: settings.max_inheritance_depth,
            });
        }

        let Some(group) = graph.get(id) else {
            match settings.missing_groups {
                MissingGroupPolicy::Skip => {
                    tracing::warn!(
                        profile_id = %profile.id,
                        group_id = %id,
                        "Skipping unknown group during resolution"
                    );
                    continue;
                },
                MissingGroupPolicy::Deny => {
                    return Err(PermissionError::UnknownGroup {
                        group_id: id.to_string(),
                    });
                },
            }
        };

        if visited.len() >= settings.max_visited_groups {
            return Err(PermissionError::InheritanceTooWide {
                max_groups: settings.max_visited_groups,
            });
        }
        visited.push(id);

        entries.extend(group.permissions.iter_newest_first().map(|node| EffectiveEntry {
            node: node.clone(),
            source: GrantSource::Group {
                id: id.clone(),
                depth,
            },
        }));

        let next = depth.saturating_add(1);
        for parent in &group.parents {
            if seen.insert(parent) {
                queue.push_back((parent, next));
            }
        }
    }

    if let Some(groups) = graph.find_cycle(visited.iter().copied()) {
        return Err(PermissionError::CyclicInheritance { groups });
    }

    Ok(EffectiveSet { entries })
}

#[cfg(test)]
#[path = "resolver_tests.rs"]
mod tests;
