//! Node matching and specificity.
//!
//! Both functions are pure and ignore negation; whether a match grants or
//! denies is decided by the evaluator.

use crate::node::PermissionNode;

/// Whether `granted` covers `queried`.
///
/// `granted`'s segments must be a prefix of `queried`'s segments, and then:
/// - an exact grant must have the same number of segments as the query and
///   the query must not itself be a wildcard;
/// - a wildcard grant covers any query with at least as many segments.
///
/// The superuser node (`*`) has no segments, so it covers every query.
#[must_use]
pub fn matches(granted: &PermissionNode, queried: &PermissionNode) -> bool {
    let granted_segments = granted.segments();
    let queried_segments = queried.segments();

    if granted_segments.len() > queried_segments.len() {
        return false;
    }
    if !queried_segments.starts_with(granted_segments) {
        return false;
    }

    if granted.is_wildcard() {
        true
    } else {
        !queried.is_wildcard() && granted_segments.len() == queried_segments.len()
    }
}

/// Specificity of a granted node; higher wins.
///
/// Longer nodes are more specific, and a wildcard is strictly less specific
/// than an exact node over the same segments: wildcards score `2n`, exact
/// nodes `2n + 1`. The superuser node scores `0`.
#[must_use]
pub fn specificity(node: &PermissionNode) -> usize {
    let base = node.segments().len().saturating_mul(2);
    if node.is_wildcard() {
        base
    } else {
        base.saturating_add(1)
    }
}
