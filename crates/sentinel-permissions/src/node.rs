//! Permission nodes - parsed dotted permission strings.
//!
//! A node is parsed once from its raw form and never mutated afterwards:
//!
//! - `world.build` is an exact node with two segments.
//! - `world.*` is a wildcard covering `world` and everything below it.
//! - `-world.build` is a negated (denying) node.
//! - `*` is the superuser node; it covers every query.
//!
//! Segments are lower-cased, so comparison is case-insensitive.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::{PermissionError, PermissionResult};
use crate::matcher;

/// Separator between segments.
const SEGMENT_SEPARATOR: char = '.';
/// Wildcard marker, valid only as the final segment.
const WILDCARD: &str = "*";
/// Leading negation marker.
const NEGATION: char = '-';
/// Separator between a stored node and its metadata suffix.
const RECORD_SEPARATOR: char = '|';

/// An immutable, parsed permission node.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct PermissionNode {
    segments: Vec<String>,
    wildcard: bool,
    negated: bool,
}

impl PermissionNode {
    /// Parse a raw permission string.
    ///
    /// # Errors
    ///
    /// Returns [`PermissionError::InvalidPermissionFormat`] if the string is
    /// empty, has an empty segment, places `*` anywhere but the final
    /// segment, or contains whitespace inside a segment.
    pub fn parse(raw: &str) -> PermissionResult<Self> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(PermissionError::invalid(raw, "permission is empty"));
        }

        let (negated, rest) = match trimmed.strip_prefix(NEGATION) {
            Some(rest) => (true, rest),
            None => (false, trimmed),
        };
        if rest.is_empty() {
            return Err(PermissionError::invalid(
                raw,
                "negation marker without a node",
            ));
        }

        let (wildcard, body) = if rest == WILDCARD {
            (true, "")
        } else if let Some(body) = rest.strip_suffix(".*") {
            if body.is_empty() {
                return Err(PermissionError::invalid(raw, "empty segment"));
            }
            (true, body)
        } else {
            (false, rest)
        };

        let mut segments = Vec::new();
        if !body.is_empty() {
            for segment in body.split(SEGMENT_SEPARATOR) {
                if segment.is_empty() {
                    return Err(PermissionError::invalid(raw, "empty segment"));
                }
                if segment.contains(WILDCARD) {
                    return Err(PermissionError::invalid(
                        raw,
                        "wildcard is only allowed as the final segment",
                    ));
                }
                if segment.chars().any(char::is_whitespace) {
                    return Err(PermissionError::invalid(
                        raw,
                        "whitespace inside a segment",
                    ));
                }
                segments.push(segment.to_lowercase());
            }
        }

        Ok(Self {
            segments,
            wildcard,
            negated,
        })
    }

    /// Parse a stored permission record.
    ///
    /// Stored records may carry metadata after a `|` (for example
    /// `chat.color|admin|1712000000`); only the part before the first `|`
    /// is the node.
    ///
    /// # Errors
    ///
    /// Same as [`PermissionNode::parse`].
    pub fn from_record(record: &str) -> PermissionResult<Self> {
        Self::parse(strip_record_suffix(record))
    }

    /// The superuser node (`*`).
    #[must_use]
    pub fn superuser() -> Self {
        Self {
            segments: Vec::new(),
            wildcard: true,
            negated: false,
        }
    }

    /// Lower-cased segments, without the wildcard marker.
    #[must_use]
    pub fn segments(&self) -> &[String] {
        &self.segments
    }

    /// Whether the node ends in a wildcard.
    #[must_use]
    pub fn is_wildcard(&self) -> bool {
        self.wildcard
    }

    /// Whether the node denies rather than grants.
    #[must_use]
    pub fn is_negated(&self) -> bool {
        self.negated
    }

    /// Whether this is the bare `*` node (negated or not).
    #[must_use]
    pub fn is_superuser(&self) -> bool {
        self.wildcard && self.segments.is_empty()
    }

    /// How precisely this node targets a query. See [`matcher::specificity`].
    #[must_use]
    pub fn specificity(&self) -> usize {
        matcher::specificity(self)
    }

    /// Whether this node covers `queried`. See [`matcher::matches`].
    #[must_use]
    pub fn matches(&self, queried: &Self) -> bool {
        matcher::matches(self, queried)
    }

    /// Whether two nodes have the same segments and wildcard flag,
    /// ignoring negation.
    #[must_use]
    pub fn same_shape(&self, other: &Self) -> bool {
        self.wildcard == other.wildcard && self.segments == other.segments
    }
}

/// Drop the `|metadata` suffix from a stored record.
pub(crate) fn strip_record_suffix(record: &str) -> &str {
    record
        .split_once(RECORD_SEPARATOR)
        .map_or(record, |(head, _)| head)
}

impl fmt::Display for PermissionNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.negated {
            write!(f, "{NEGATION}")?;
        }
        if self.segments.is_empty() {
            return write!(f, "{WILDCARD}");
        }
        write!(f, "{}", self.segments.join("."))?;
        if self.wildcard {
            write!(f, ".{WILDCARD}")?;
        }
        Ok(())
    }
}

impl FromStr for PermissionNode {
    type Err = PermissionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for PermissionNode {
    type Error = PermissionError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<PermissionNode> for String {
    fn from(node: PermissionNode) -> Self {
        node.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_exact() {
        let node = PermissionNode::parse("World.Build").unwrap();
        assert_eq!(node.segments(), ["world", "build"]);
        assert!(!node.is_wildcard());
        assert!(!node.is_negated());
        assert_eq!(node.to_string(), "world.build");
    }

    #[test]
    fn test_parse_wildcard_and_negation() {
        let node = PermissionNode::parse("-chat.*").unwrap();
        assert_eq!(node.segments(), ["chat"]);
        assert!(node.is_wildcard());
        assert!(node.is_negated());
        assert_eq!(node.to_string(), "-chat.*");
    }

    #[test]
    fn test_parse_superuser() {
        let node = PermissionNode::parse("*").unwrap();
        assert!(node.is_superuser());
        assert_eq!(node, PermissionNode::superuser());
        assert_eq!(node.to_string(), "*");

        let denied = PermissionNode::parse("-*").unwrap();
        assert!(denied.is_superuser());
        assert!(denied.is_negated());
        assert_eq!(denied.to_string(), "-*");
    }

    #[test]
    fn test_parse_trims_whitespace() {
        let node = PermissionNode::parse("  admin.shutdown \n").unwrap();
        assert_eq!(node.to_string(), "admin.shutdown");
    }

    #[test]
    fn test_parse_rejects_malformed() {
        for raw in [
            "", "   ", "-", "a..b", ".a", "a.", ".*", "a.*.b", "a*", "*.a", "a b", "-.*",
        ] {
            assert!(
                matches!(
                    PermissionNode::parse(raw),
                    Err(PermissionError::InvalidPermissionFormat { .. })
                ),
                "expected {raw:?} to be rejected"
            );
        }
    }

    #[test]
    fn test_from_record_strips_metadata() {
        let node = PermissionNode::from_record("command.fix|Twizzy|1712000000|null|").unwrap();
        assert_eq!(node.to_string(), "command.fix");

        let plain = PermissionNode::from_record("command.fix").unwrap();
        assert_eq!(node, plain);

        assert!(PermissionNode::from_record("|orphaned").is_err());
    }

    #[test]
    fn test_same_shape_ignores_negation() {
        let grant = PermissionNode::parse("a.b").unwrap();
        let deny = PermissionNode::parse("-a.b").unwrap();
        let wildcard = PermissionNode::parse("a.b.*").unwrap();
        assert!(grant.same_shape(&deny));
        assert!(!grant.same_shape(&wildcard));
        assert_ne!(grant, deny);
    }

    #[test]
    fn test_serde_uses_canonical_string() {
        let node = PermissionNode::parse("-Region.*").unwrap();
        let json = serde_json::to_string(&node).unwrap();
        assert_eq!(json, "\"-region.*\"");

        let back: PermissionNode = serde_json::from_str(&json).unwrap();
        assert_eq!(back, node);

        assert!(serde_json::from_str::<PermissionNode>("\"a..b\"").is_err());
    }
}
