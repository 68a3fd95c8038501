//! Profiles - the permission-bearing identity behind an actor.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use crate::error::{PermissionError, PermissionResult};
use crate::group::{Group, GroupGraph, GroupId};
use crate::node::PermissionNode;
use crate::set::PermissionSet;

/// Unique identifier for a profile.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProfileId(pub Uuid);

impl ProfileId {
    /// Create a new random profile ID.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Wrap an existing UUID.
    #[must_use]
    pub fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    /// Derive a stable ID from a name, for fixtures and offline documents
    /// that only know a player's name.
    #[must_use]
    pub fn from_name(name: &str) -> Self {
        Self(Uuid::new_v5(&Uuid::NAMESPACE_OID, name.to_lowercase().as_bytes()))
    }
}

impl Default for ProfileId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ProfileId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for ProfileId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s.trim()).map(Self)
    }
}

/// A single change to a profile. Lists of mutations are applied atomically.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "op", content = "value", rename_all = "snake_case")]
pub enum ProfileMutation {
    /// Add (or replace) a node; a `-` prefix grants a denial.
    Grant(String),
    /// Remove the node with the same shape, if present.
    Revoke(String),
    /// Join a group, which must exist.
    JoinGroup(GroupId),
    /// Leave a group.
    LeaveGroup(GroupId),
}

impl fmt::Display for ProfileMutation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Grant(node) => write!(f, "grant {node}"),
            Self::Revoke(node) => write!(f, "revoke {node}"),
            Self::JoinGroup(group) => write!(f, "join {group}"),
            Self::LeaveGroup(group) => write!(f, "leave {group}"),
        }
    }
}

/// An immutable-by-convention profile snapshot.
///
/// The store publishes profiles as `Arc<Profile>`; every published change
/// carries a fresh `revision`, which is what cached decisions are keyed on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Profile {
    /// Profile identifier.
    pub id: ProfileId,
    /// Optional display name.
    pub name: Option<String>,
    /// Nodes granted directly to the profile.
    pub permissions: PermissionSet,
    /// Group memberships, in precedence order.
    pub groups: Vec<GroupId>,
    pub(crate) revision: u64,
}

impl Profile {
    /// Create an empty profile.
    #[must_use]
    pub fn new(id: ProfileId) -> Self {
        Self {
            id,
            name: None,
            permissions: PermissionSet::new(),
            groups: Vec::new(),
            revision: 0,
        }
    }

    /// Set the display name.
    #[must_use]
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Add a group membership. Duplicates are ignored.
    #[must_use]
    pub fn with_group(mut self, group: impl Into<GroupId>) -> Self {
        let group = group.into();
        if !self.groups.contains(&group) {
            self.groups.push(group);
            self.revision = 0;
        }
        self
    }

    /// Parse and add permission records.
    ///
    /// # Errors
    ///
    /// Returns [`PermissionError::InvalidPermissionFormat`] for the first
    /// record that fails to parse.
    pub fn with_permissions<I, S>(mut self, records: I) -> PermissionResult<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        for node in PermissionSet::from_records(records)? {
            self.permissions.insert(node);
        }
        self.revision = 0;
        Ok(self)
    }

    /// Revision of this snapshot. Zero means never published.
    #[must_use]
    pub fn revision(&self) -> u64 {
        self.revision
    }

    /// Whether the profile is a member of `group` (directly).
    #[must_use]
    pub fn in_group(&self, group: &GroupId) -> bool {
        self.groups.contains(group)
    }

    /// The highest-weight loaded group the profile belongs to directly.
    /// Ties go to the earlier membership.
    #[must_use]
    pub fn primary_group<'a>(&self, graph: &'a GroupGraph) -> Option<&'a Group> {
        let mut best: Option<&Group> = None;
        for group in self.groups.iter().filter_map(|id| graph.get(id)) {
            match best {
                Some(current) if current.weight >= group.weight => {},
                _ => best = Some(group),
            }
        }
        best
    }

    /// Apply one mutation in place.
    ///
    /// Returns whether the profile changed. A changed profile is no longer
    /// the published snapshot, so its revision drops back to zero.
    ///
    /// # Errors
    ///
    /// Returns [`PermissionError::InvalidPermissionFormat`] for an unparsable
    /// node and [`PermissionError::UnknownGroup`] when joining a group that is
    /// not in `graph`.
    pub fn apply(&mut self, mutation: &ProfileMutation, graph: &GroupGraph) -> PermissionResult<bool> {
        let changed = self.mutate(mutation, graph)?;
        if changed {
            self.revision = 0;
        }
        Ok(changed)
    }

    fn mutate(&mut self, mutation: &ProfileMutation, graph: &GroupGraph) -> PermissionResult<bool> {
        match mutation {
            ProfileMutation::Grant(raw) => {
                let node = PermissionNode::parse(raw)?;
                if self.permissions.contains(&node) {
                    return Ok(false);
                }
                self.permissions.insert(node);
                Ok(true)
            },
            ProfileMutation::Revoke(raw) => {
                let node = PermissionNode::parse(raw)?;
                Ok(self.permissions.remove(&node).is_some())
            },
            ProfileMutation::JoinGroup(group) => {
                if !graph.contains(group) {
                    return Err(PermissionError::UnknownGroup {
                        group_id: group.to_string(),
                    });
                }
                if self.groups.contains(group) {
                    return Ok(false);
                }
                self.groups.push(group.clone());
                Ok(true)
            },
            ProfileMutation::LeaveGroup(group) => {
                let before = self.groups.len();
                self.groups.retain(|g| g != group);
                Ok(self.groups.len() != before)
            },
        }
    }
}
