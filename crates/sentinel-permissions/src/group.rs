//! Groups and the group inheritance graph.

use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet, VecDeque};
use std::fmt;

use crate::error::{PermissionError, PermissionResult};
use crate::node::strip_record_suffix;
use crate::set::PermissionSet;

/// Case-insensitive group identifier, stored lower-cased.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub struct GroupId(String);

impl GroupId {
    /// Create a group ID, trimming and lower-casing the input.
    #[must_use]
    pub fn new(raw: impl AsRef<str>) -> Self {
        Self(raw.as_ref().trim().to_lowercase())
    }

    /// Create a group ID from a stored membership record.
    ///
    /// Membership records look like `Rank|granted_by|timestamp|...`; only the
    /// part before the first `|` names the group.
    #[must_use]
    pub fn from_record(record: &str) -> Self {
        Self::new(strip_record_suffix(record))
    }

    /// The normalized identifier.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for GroupId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<String> for GroupId {
    fn from(value: String) -> Self {
        Self::new(value)
    }
}

impl From<&str> for GroupId {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<GroupId> for String {
    fn from(id: GroupId) -> Self {
        id.0
    }
}

/// A named group (rank) of permissions with ordered parents.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Group {
    /// Group identifier.
    pub id: GroupId,
    /// Human-readable name.
    pub display_name: String,
    /// Chat prefix shown for members whose primary group this is.
    pub prefix: String,
    /// Ordering weight; the highest-weight group is a profile's primary group.
    pub weight: i32,
    /// Optional display color.
    pub color: Option<String>,
    /// Permissions attached directly to this group.
    pub permissions: PermissionSet,
    /// Parent groups, in precedence order.
    pub parents: Vec<GroupId>,
}

impl Group {
    /// Create an empty group whose display name is its identifier.
    #[must_use]
    pub fn new(id: impl Into<GroupId>) -> Self {
        let id = id.into();
        Self {
            display_name: id.to_string(),
            id,
            prefix: String::new(),
            weight: 0,
            color: None,
            permissions: PermissionSet::new(),
            parents: Vec::new(),
        }
    }

    /// Set the weight.
    #[must_use]
    pub fn with_weight(mut self, weight: i32) -> Self {
        self.weight = weight;
        self
    }

    /// Set the chat prefix.
    #[must_use]
    pub fn with_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = prefix.into();
        self
    }

    /// Set the display name.
    #[must_use]
    pub fn with_display_name(mut self, name: impl Into<String>) -> Self {
        self.display_name = name.into();
        self
    }

    /// Add a parent group. Duplicates are ignored.
    #[must_use]
    pub fn with_parent(mut self, parent: impl Into<GroupId>) -> Self {
        let parent = parent.into();
        if !self.parents.contains(&parent) {
            self.parents.push(parent);
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
        Ok(self)
    }
}

/// All loaded groups, keyed by identifier.
#[derive(Debug, Clone, Default)]
pub struct GroupGraph {
    groups: HashMap<GroupId, Group>,
}

impl GroupGraph {
    /// Create an empty graph.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Look up a group (case-insensitive).
    #[must_use]
    pub fn get(&self, id: &GroupId) -> Option<&Group> {
        self.groups.get(id)
    }

    pub(crate) fn get_mut(&mut self, id: &GroupId) -> Option<&mut Group> {
        self.groups.get_mut(id)
    }

    /// Whether the group exists.
    #[must_use]
    pub fn contains(&self, id: &GroupId) -> bool {
        self.groups.contains_key(id)
    }

    /// Insert or replace a group, returning the previous one.
    pub fn insert(&mut self, group: Group) -> Option<Group> {
        self.groups.insert(group.id.clone(), group)
    }

    /// Remove a group, returning it.
    pub fn remove(&mut self, id: &GroupId) -> Option<Group> {
        self.groups.remove(id)
    }

    /// Number of groups.
    #[must_use]
    pub fn len(&self) -> usize {
        self.groups.len()
    }

    /// Whether no groups are loaded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    /// Iterate over all groups in unspecified order.
    pub fn iter(&self) -> impl Iterator<Item = &Group> {
        self.groups.values()
    }

    /// Groups sorted by identifier.
    #[must_use]
    pub fn sorted(&self) -> Vec<&Group> {
        let mut groups: Vec<&Group> = self.groups.values().collect();
        groups.sort_by(|a, b| a.id.cmp(&b.id));
        groups
    }

    /// `id` plus every group that inherits from it, directly or transitively.
    ///
    /// Profiles joined to any of these groups see a change to `id`.
    #[must_use]
    pub fn dependents(&self, id: &GroupId) -> HashSet<GroupId> {
        let mut children: HashMap<&GroupId, Vec<&GroupId>> = HashMap::new();
        for group in self.groups.values() {
            for parent in &group.parents {
                children.entry(parent).or_default().push(&group.id);
            }
        }

        let mut seen = HashSet::from([id.clone()]);
        let mut queue = VecDeque::from([id]);
        while let Some(current) = queue.pop_front() {
            for child in children.get(current).into_iter().flatten() {
                if seen.insert((*child).clone()) {
                    queue.push_back(*child);
                }
            }
        }
        seen
    }

    /// Look for a cycle among `within`, considering only edges between
    /// members of `within`.
    ///
    /// Uses Kahn's algorithm twice. Walking from the most derived groups
    /// towards their parents leaves the cycle members and every ancestor of
    /// a cycle stuck; walking the stuck set from its roots back down then
    /// peels the ancestors off. Returns the remaining groups sorted (groups
    /// on a cycle, plus any group sitting on a path between two cycles), or
    /// `None` if the subgraph is acyclic.
    #[must_use]
    pub fn find_cycle<'a, I>(&self, within: I) -> Option<Vec<String>>
    where
        I: IntoIterator<Item = &'a GroupId>,
    {
        let members: HashSet<&GroupId> = within.into_iter().collect();
        let stuck = self.stuck_after_peeling(&members);
        if stuck.is_empty() {
            return None;
        }

        // Second pass over the stuck subgraph: a group with no stuck parent
        // cannot be on a cycle.
        let mut children: HashMap<&GroupId, Vec<&GroupId>> = HashMap::new();
        let mut parent_count: HashMap<&GroupId, usize> = HashMap::new();
        for id in &stuck {
            let parents = self.distinct_parents(id, &stuck);
            parent_count.insert(*id, parents.len());
            for parent in parents {
                children.entry(parent).or_default().push(*id);
            }
        }

        let mut queue: VecDeque<&GroupId> = parent_count
            .iter()
            .filter(|(_, count)| **count == 0)
            .map(|(id, _)| *id)
            .collect();
        while let Some(id) = queue.pop_front() {
            for child in children.get(id).into_iter().flatten() {
                if let Some(count) = parent_count.get_mut(*child) {
                    *count = count.saturating_sub(1);
                    if *count == 0 {
                        queue.push_back(*child);
                    }
                }
            }
        }

        let mut cycle: Vec<String> = parent_count
            .into_iter()
            .filter(|(_, count)| *count > 0)
            .map(|(id, _)| id.to_string())
            .collect();
        cycle.sort();
        Some(cycle)
    }

    /// Groups whose child count never drops to zero when the most derived
    /// groups are removed first.
    fn stuck_after_peeling<'a>(&'a self, members: &HashSet<&'a GroupId>) -> HashSet<&'a GroupId> {
        let mut in_degree: HashMap<&GroupId, usize> = members.iter().map(|id| (*id, 0)).collect();

        for id in members {
            for parent in self.distinct_parents(id, members) {
                if let Some(degree) = in_degree.get_mut(parent) {
                    *degree = degree.saturating_add(1);
                }
            }
        }

        let mut queue: VecDeque<&GroupId> = in_degree
            .iter()
            .filter(|(_, degree)| **degree == 0)
            .map(|(id, _)| *id)
            .collect();

        while let Some(id) = queue.pop_front() {
            for parent in self.distinct_parents(id, members) {
                if let Some(degree) = in_degree.get_mut(parent) {
                    *degree = degree.saturating_sub(1);
                    if *degree == 0 {
                        queue.push_back(parent);
                    }
                }
            }
        }

        in_degree
            .into_iter()
            .filter(|(_, degree)| *degree > 0)
            .map(|(id, _)| id)
            .collect()
    }

    fn distinct_parents<'a>(
        &'a self,
        id: &GroupId,
        members: &HashSet<&GroupId>,
    ) -> Vec<&'a GroupId> {
        let mut parents: Vec<&GroupId> = Vec::new();
        if let Some(group) = self.groups.get(id) {
            for parent in &group.parents {
                if members.contains(parent) && !parents.contains(&parent) {
                    parents.push(parent);
                }
            }
        }
        parents
    }

    /// Check the whole graph: every parent must exist and there must be no
    /// cycle. Returns every problem found.
    #[must_use]
    pub fn validate(&self) -> Vec<PermissionError> {
        let mut problems = Vec::new();
        for group in self.sorted() {
            for parent in &group.parents {
                if !self.contains(parent) {
                    problems.push(PermissionError::UnknownGroup {
                        group_id: parent.to_string(),
                    });
                }
            }
        }
        if let Some(groups) = self.find_cycle(self.groups.keys()) {
            problems.push(PermissionError::CyclicInheritance { groups });
        }
        problems
    }
}

impl FromIterator<Group> for GroupGraph {
    fn from_iter<T: IntoIterator<Item = Group>>(iter: T) -> Self {
        let mut graph = Self::new();
        for group in iter {
            graph.insert(group);
        }
        graph
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn graph(edges: &[(&str, &[&str])]) -> GroupGraph {
        edges
            .iter()
            .map(|(id, parents)| {
                parents
                    .iter()
                    .fold(Group::new(*id), |group, parent| group.with_parent(*parent))
            })
            .collect()
    }

    #[test]
    fn test_group_id_is_case_insensitive() {
        assert_eq!(GroupId::new("  Admin "), GroupId::new("admin"));
        assert_eq!(GroupId::from_record("VIP|Twizzy|1712000000|null|").as_str(), "vip");
    }

    #[test]
    fn test_graph_lookup_is_case_insensitive() {
        let graph: GroupGraph = [Group::new("Default")].into_iter().collect();
        assert!(graph.contains(&GroupId::new("DEFAULT")));
        assert_eq!(graph.get(&"default".into()).unwrap().display_name, "default");
    }

    #[test]
    fn test_with_parent_ignores_duplicates() {
        let group = Group::new("mod").with_parent("default").with_parent("Default");
        assert_eq!(group.parents, vec![GroupId::new("default")]);
    }

    #[test]
    fn test_find_cycle_acyclic_diamond() {
        let g = graph(&[
            ("admin", &["mod", "builder"]),
            ("mod", &["default"]),
            ("builder", &["default"]),
            ("default", &[]),
        ]);
        let ids: Vec<GroupId> = g.iter().map(|group| group.id.clone()).collect();
        assert!(g.find_cycle(&ids).is_none());
    }

    #[test]
    fn test_find_cycle_two_groups() {
        let g = graph(&[("x", &["y"]), ("y", &["x"]), ("z", &[])]);
        let ids: Vec<GroupId> = g.iter().map(|group| group.id.clone()).collect();
        assert_eq!(g.find_cycle(&ids), Some(vec!["x".to_string(), "y".to_string()]));
    }

    #[test]
    fn test_find_cycle_self_parent() {
        let g = graph(&[("loop", &["loop"])]);
        assert_eq!(
            g.find_cycle([&GroupId::new("loop")]),
            Some(vec!["loop".to_string()])
        );
    }

    #[test]
    fn test_find_cycle_leaves_out_ancestors_and_descendants() {
        let g = graph(&[
            ("admin", &["x"]),
            ("x", &["y"]),
            ("y", &["x", "default"]),
            ("default", &["root"]),
            ("root", &[]),
        ]);
        let ids: Vec<GroupId> = g.iter().map(|group| group.id.clone()).collect();
        assert_eq!(g.find_cycle(&ids), Some(vec!["x".to_string(), "y".to_string()]));
    }

    #[test]
    fn test_with_permissions_merges_into_own_set() {
        let group = Group::new("mod")
            .with_permissions(["kick", "chat.*"])
            .unwrap()
            .with_permissions(["-kick"])
            .unwrap();
        assert_eq!(group.permissions.to_records(), vec!["chat.*", "-kick"]);
    }

    #[test]
    fn test_find_cycle_only_considers_members() {
        let g = graph(&[("x", &["y"]), ("y", &["x"]), ("solo", &["x"])]);
        assert!(g.find_cycle([&GroupId::new("solo")]).is_none());
    }

    #[test]
    fn test_dependents_follow_reverse_edges() {
        let g = graph(&[
            ("admin", &["mod"]),
            ("mod", &["default"]),
            ("builder", &["default"]),
            ("default", &[]),
            ("guest", &[]),
        ]);
        let deps = g.dependents(&GroupId::new("mod"));
        assert_eq!(
            deps,
            HashSet::from([GroupId::new("mod"), GroupId::new("admin")])
        );
        assert_eq!(g.dependents(&GroupId::new("default")).len(), 4);
    }

    #[test]
    fn test_validate_reports_missing_parents_and_cycles() {
        let g = graph(&[("x", &["y"]), ("y", &["x", "ghost"])]);
        let problems = g.validate();
        assert_eq!(problems.len(), 2);
        assert!(problems
            .iter()
            .any(|p| matches!(p, PermissionError::UnknownGroup { group_id } if group_id == "ghost")));
        assert!(problems
            .iter()
            .any(|p| matches!(p, PermissionError::CyclicInheritance { .. })));
    }
}
