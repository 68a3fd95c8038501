//! Persisted forms of profiles and groups.
//!
//! Records keep permissions and memberships as raw strings so that whatever
//! a backend stored (including `|` metadata suffixes) survives a load/save
//! cycle up to normalization.

use serde::{Deserialize, Serialize};

use crate::error::PermissionResult;
use crate::group::{Group, GroupId};
use crate::profile::{Profile, ProfileId};
use crate::set::PermissionSet;

/// Stored form of a [`Profile`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProfileRecord {
    /// Profile identifier.
    pub id: ProfileId,
    /// Optional display name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Raw permission records.
    #[serde(default)]
    pub permissions: Vec<String>,
    /// Raw group membership records.
    #[serde(default, alias = "ranks")]
    pub groups: Vec<String>,
}

/// Stored form of a [`Group`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupRecord {
    /// Group identifier.
    pub id: String,
    /// Display name; defaults to the identifier.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Chat prefix.
    #[serde(default)]
    pub prefix: String,
    /// Ordering weight.
    #[serde(default)]
    pub weight: i32,
    /// Display color.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
    /// Raw permission records.
    #[serde(default)]
    pub permissions: Vec<String>,
    /// Parent group identifiers, in precedence order.
    #[serde(default, alias = "parents")]
    pub inherits: Vec<String>,
}

impl Profile {
    /// Build a profile from its stored record.
    ///
    /// # Errors
    ///
    /// Returns [`InvalidPermissionFormat`](crate::PermissionError::InvalidPermissionFormat)
    /// if any stored permission fails to parse.
    pub fn from_record(record: &ProfileRecord) -> PermissionResult<Self> {
        let mut profile = Self::new(record.id);
        profile.name.clone_from(&record.name);
        profile.permissions = PermissionSet::from_records(&record.permissions)?;
        for raw in &record.groups {
            let group = GroupId::from_record(raw);
            if !group.as_str().is_empty() && !profile.groups.contains(&group) {
                profile.groups.push(group);
            }
        }
        Ok(profile)
    }

    /// The stored record for this profile.
    #[must_use]
    pub fn to_record(&self) -> ProfileRecord {
        ProfileRecord {
            id: self.id,
            name: self.name.clone(),
            permissions: self.permissions.to_records(),
            groups: self.groups.iter().map(ToString::to_string).collect(),
        }
    }
}

impl Group {
    /// Build a group from its stored record.
    ///
    /// # Errors
    ///
    /// Returns [`InvalidPermissionFormat`](crate::PermissionError::InvalidPermissionFormat)
    /// if any stored permission fails to parse.
    pub fn from_record(record: &GroupRecord) -> PermissionResult<Self> {
        let mut group = Self::new(record.id.as_str()).with_weight(record.weight);
        if let Some(name) = &record.name {
            group.display_name.clone_from(name);
        }
        group.prefix.clone_from(&record.prefix);
        group.color.clone_from(&record.color);
        group.permissions = PermissionSet::from_records(&record.permissions)?;
        for parent in &record.inherits {
            let parent = GroupId::from_record(parent);
            if !parent.as_str().is_empty() && !group.parents.contains(&parent) {
                group.parents.push(parent);
            }
        }
        Ok(group)
    }

    /// The stored record for this group.
    #[must_use]
    pub fn to_record(&self) -> GroupRecord {
        GroupRecord {
            id: self.id.to_string(),
            name: Some(self.display_name.clone()),
            prefix: self.prefix.clone(),
            weight: self.weight,
            color: self.color.clone(),
            permissions: self.permissions.to_records(),
            inherits: self.parents.iter().map(ToString::to_string).collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_profile_record_strips_metadata() {
        let record = ProfileRecord {
            id: ProfileId::new(),
            name: Some("Steve".into()),
            permissions: vec!["command.fix|Twizzy|1712000000|null|".into(), "-fly".into()],
            groups: vec!["VIP|Twizzy|1712000000".into(), "vip".into(), String::new()],
        };
        let profile = Profile::from_record(&record).unwrap();
        assert_eq!(profile.permissions.to_records(), vec!["command.fix", "-fly"]);
        assert_eq!(profile.groups, vec![GroupId::new("vip")]);

        let stored = profile.to_record();
        assert_eq!(stored.permissions, vec!["command.fix", "-fly"]);
        assert_eq!(stored.groups, vec!["vip"]);
    }

    #[test]
    fn test_group_record_defaults() {
        let record: GroupRecord = toml::from_str(
            r#"
            id = "Mod"
            weight = 50
            permissions = ["kick", "mute.*"]
            parents = ["default"]
            "#,
        )
        .unwrap();
        let group = Group::from_record(&record).unwrap();
        assert_eq!(group.id.as_str(), "mod");
        assert_eq!(group.display_name, "mod");
        assert_eq!(group.weight, 50);
        assert_eq!(group.parents, vec![GroupId::new("default")]);
        assert_eq!(group.permissions.len(), 2);
    }

    #[test]
    fn test_group_record_rejects_bad_permission() {
        let record = GroupRecord {
            id: "broken".into(),
            name: None,
            prefix: String::new(),
            weight: 0,
            color: None,
            permissions: vec!["a.*.b".into()],
            inherits: Vec::new(),
        };
        assert!(Group::from_record(&record).is_err());
    }
}
