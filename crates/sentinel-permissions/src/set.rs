//! Permission sets - the nodes attached to one profile or one group.

use serde::{Deserialize, Serialize};

use crate::error::PermissionResult;
use crate::node::PermissionNode;

/// Insertion-ordered collection of granted and denied nodes.
///
/// No two entries share a shape (segments + wildcard flag). Inserting a node
/// whose shape is already present replaces the old entry and moves it to the
/// most recent position, so `a.b` followed by `-a.b` leaves only `-a.b`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "Vec<PermissionNode>", into = "Vec<PermissionNode>")]
pub struct PermissionSet {
    /// Oldest first.
    nodes: Vec<PermissionNode>,
}

impl PermissionSet {
    /// Create an empty set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a list of stored records into a set.
    ///
    /// # Errors
    ///
    /// Returns the first [`InvalidPermissionFormat`](crate::PermissionError::InvalidPermissionFormat)
    /// encountered.
    pub fn from_records<I, S>(records: I) -> PermissionResult<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut set = Self::new();
        for record in records {
            set.insert(PermissionNode::from_record(record.as_ref())?);
        }
        Ok(set)
    }

    /// Canonical strings for every entry, oldest first.
    #[must_use]
    pub fn to_records(&self) -> Vec<String> {
        self.nodes.iter().map(ToString::to_string).collect()
    }

    /// Insert a node, returning the entry it replaced, if any.
    pub fn insert(&mut self, node: PermissionNode) -> Option<PermissionNode> {
        let replaced = self.take_shape(&node);
        self.nodes.push(node);
        replaced
    }

    /// Remove the entry with the same shape as `node`, ignoring negation.
    pub fn remove(&mut self, node: &PermissionNode) -> Option<PermissionNode> {
        self.take_shape(node)
    }

    fn take_shape(&mut self, node: &PermissionNode) -> Option<PermissionNode> {
        let index = self.nodes.iter().position(|n| n.same_shape(node))?;
        Some(self.nodes.remove(index))
    }

    /// The entry with the same shape as `node`, if any.
    #[must_use]
    pub fn get(&self, node: &PermissionNode) -> Option<&PermissionNode> {
        self.nodes.iter().find(|n| n.same_shape(node))
    }

    /// Whether the exact node (including negation) is present.
    #[must_use]
    pub fn contains(&self, node: &PermissionNode) -> bool {
        self.nodes.contains(node)
    }

    /// Number of entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Whether the set is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Entries in insertion order, oldest first.
    pub fn iter(&self) -> impl DoubleEndedIterator<Item = &PermissionNode> + ExactSizeIterator {
        self.nodes.iter()
    }

    /// Entries newest first, which is the order they take in an effective set.
    pub fn iter_newest_first(&self) -> impl Iterator<Item = &PermissionNode> {
        self.nodes.iter().rev()
    }

    /// Find the most specific entry covering `queried`.
    ///
    /// Ties on specificity go to the most recently inserted entry. `None`
    /// means "no opinion", not deny.
    #[must_use]
    pub fn find_best_match(&self, queried: &PermissionNode) -> Option<&PermissionNode> {
        self.nodes
            .iter()
            .enumerate()
            .filter(|(_, node)| node.matches(queried))
            .max_by_key(|(index, node)| (node.specificity(), *index))
            .map(|(_, node)| node)
    }
}

impl From<Vec<PermissionNode>> for PermissionSet {
    fn from(nodes: Vec<PermissionNode>) -> Self {
        nodes.into_iter().collect()
    }
}

impl From<PermissionSet> for Vec<PermissionNode> {
    fn from(set: PermissionSet) -> Self {
        set.nodes
    }
}

impl FromIterator<PermissionNode> for PermissionSet {
    fn from_iter<T: IntoIterator<Item = PermissionNode>>(iter: T) -> Self {
        let mut set = Self::new();
        for node in iter {
            set.insert(node);
        }
        set
    }
}

impl IntoIterator for PermissionSet {
    type Item = PermissionNode;
    type IntoIter = std::vec::IntoIter<PermissionNode>;

    fn into_iter(self) -> Self::IntoIter {
        self.nodes.into_iter()
    }
}

impl<'a> IntoIterator for &'a PermissionSet {
    type Item = &'a PermissionNode;
    type IntoIter = std::slice::Iter<'a, PermissionNode>;

    fn into_iter(self) -> Self::IntoIter {
        self.nodes.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::PermissionError;

    fn node(raw: &str) -> PermissionNode {
        PermissionNode::parse(raw).unwrap()
    }

    fn set(raws: &[&str]) -> PermissionSet {
        PermissionSet::from_records(raws).unwrap()
    }

    #[test]
    fn test_insert_collapses_same_shape() {
        let mut perms = set(&["a.b", "c"]);
        let replaced = perms.insert(node("-a.b"));
        assert_eq!(replaced, Some(node("a.b")));
        assert_eq!(perms.len(), 2);
        assert_eq!(perms.to_records(), vec!["c", "-a.b"]);
    }

    #[test]
    fn test_wildcard_and_exact_are_distinct_shapes() {
        let perms = set(&["a.b", "a.b.*"]);
        assert_eq!(perms.len(), 2);
    }

    #[test]
    fn test_remove_ignores_negation() {
        let mut perms = set(&["-fly", "move"]);
        assert_eq!(perms.remove(&node("fly")), Some(node("-fly")));
        assert!(perms.remove(&node("fly")).is_none());
        assert_eq!(perms.to_records(), vec!["move"]);
    }

    #[test]
    fn test_find_best_match_prefers_specific() {
        let perms = set(&["a.b", "a.*"]);
        assert_eq!(perms.find_best_match(&node("a.b")), Some(&node("a.b")));
        assert_eq!(perms.find_best_match(&node("a.c")), Some(&node("a.*")));

        let reversed = set(&["a.*", "a.b"]);
        assert_eq!(reversed.find_best_match(&node("a.b")), Some(&node("a.b")));
    }

    #[test]
    fn test_find_best_match_no_opinion() {
        let perms = set(&["chat.*"]);
        assert!(perms.find_best_match(&node("fly")).is_none());
        assert!(PermissionSet::new().find_best_match(&node("fly")).is_none());
    }

    #[test]
    fn test_superuser_is_overridden_by_anything() {
        let perms = set(&["-admin.*", "*"]);
        assert_eq!(
            perms.find_best_match(&node("admin.shutdown")),
            Some(&node("-admin.*"))
        );
        assert_eq!(perms.find_best_match(&node("fly")), Some(&node("*")));
    }

    #[test]
    fn test_from_records_rejects_invalid() {
        let err = PermissionSet::from_records(["ok", "a..b"]).unwrap_err();
        assert!(matches!(err, PermissionError::InvalidPermissionFormat { .. }));
    }

    #[test]
    fn test_newest_first_order() {
        let perms = set(&["one", "two", "three"]);
        let order: Vec<String> = perms.iter_newest_first().map(ToString::to_string).collect();
        assert_eq!(order, vec!["three", "two", "one"]);
    }

    #[test]
    fn test_owned_iteration_keeps_insertion_order() {
        let owned: Vec<PermissionNode> = set(&["b", "-a.*"]).into_iter().collect();
        assert_eq!(owned, vec![node("b"), node("-a.*")]);

        let mut merged = set(&["a.*", "c"]);
        for n in set(&["-a.*"]) {
            merged.insert(n);
        }
        assert_eq!(merged.to_records(), vec!["c", "-a.*"]);
    }

    #[test]
    fn test_deserialize_collapses_duplicates() {
        let perms: PermissionSet = serde_json::from_str(r#"["a.b", "x", "-A.B"]"#).unwrap();
        assert_eq!(perms.to_records(), vec!["x", "-a.b"]);
    }
}
