//! Permission documents: groups and profiles in a single TOML or JSON file.
//!
//! ```toml
//! [[groups]]
//! id = "default"
//! permissions = ["build", "move"]
//!
//! [[groups]]
//! id = "mod"
//! weight = 50
//! inherits = ["default"]
//! permissions = ["kick"]
//!
//! [[profiles]]
//! id = "0f8fad5b-d9cb-469f-a165-70867728950e"
//! name = "steve"
//! permissions = ["-build", "chat.*"]
//! groups = ["default"]
//! ```

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::backend::MemoryBackend;
use crate::error::{PermissionError, PermissionResult};
use crate::group::{Group, GroupGraph};
use crate::profile::{Profile, ProfileId};
use crate::record::{GroupRecord, ProfileRecord};

/// A serialized set of group and profile records.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PermissionDocument {
    /// Group records.
    #[serde(default)]
    pub groups: Vec<GroupRecord>,
    /// Profile records.
    #[serde(default)]
    pub profiles: Vec<ProfileRecord>,
}

impl PermissionDocument {
    /// Parse a TOML document.
    ///
    /// # Errors
    ///
    /// Returns a storage error describing the parse failure.
    pub fn from_toml_str(content: &str) -> PermissionResult<Self> {
        toml::from_str(content).map_err(|e| PermissionError::Storage(format!("invalid TOML document: {e}")))
    }

    /// Parse a JSON document.
    ///
    /// # Errors
    ///
    /// Returns a storage error describing the parse failure.
    pub fn from_json_str(content: &str) -> PermissionResult<Self> {
        serde_json::from_str(content)
            .map_err(|e| PermissionError::Storage(format!("invalid JSON document: {e}")))
    }

    /// Read a document from disk. Files ending in `.json` are parsed as
    /// JSON, everything else as TOML.
    ///
    /// # Errors
    ///
    /// Returns a storage error if the file cannot be read or parsed.
    pub fn load(path: impl AsRef<Path>) -> PermissionResult<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .map_err(|e| PermissionError::Storage(format!("failed to read {}: {e}", path.display())))?;

        let is_json = path
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));
        let document = if is_json {
            Self::from_json_str(&content)?
        } else {
            Self::from_toml_str(&content)?
        };

        tracing::debug!(
            path = %path.display(),
            groups = document.groups.len(),
            profiles = document.profiles.len(),
            "Loaded permission document"
        );
        Ok(document)
    }

    /// Serialize as pretty TOML.
    ///
    /// # Errors
    ///
    /// Returns a storage error if serialization fails.
    pub fn to_toml_string(&self) -> PermissionResult<String> {
        toml::to_string_pretty(self).map_err(|e| PermissionError::Storage(e.to_string()))
    }

    /// Parse every group record.
    ///
    /// # Errors
    ///
    /// Returns the first [`InvalidPermissionFormat`](PermissionError::InvalidPermissionFormat).
    pub fn parse_groups(&self) -> PermissionResult<Vec<Group>> {
        self.groups.iter().map(Group::from_record).collect()
    }

    /// Parse every group record into a graph.
    ///
    /// # Errors
    ///
    /// Same as [`PermissionDocument::parse_groups`].
    pub fn group_graph(&self) -> PermissionResult<GroupGraph> {
        Ok(self.parse_groups()?.into_iter().collect())
    }

    /// Parse every profile record.
    ///
    /// # Errors
    ///
    /// Returns the first [`InvalidPermissionFormat`](PermissionError::InvalidPermissionFormat).
    pub fn parse_profiles(&self) -> PermissionResult<Vec<Profile>> {
        self.profiles.iter().map(Profile::from_record).collect()
    }

    /// Find a profile record by UUID or, failing that, by name
    /// (case-insensitive).
    #[must_use]
    pub fn find_profile(&self, key: &str) -> Option<&ProfileRecord> {
        if let Ok(id) = key.parse::<ProfileId>() {
            return self.profiles.iter().find(|p| p.id == id);
        }
        self.profiles.iter().find(|p| {
            p.name
                .as_deref()
                .is_some_and(|name| name.eq_ignore_ascii_case(key.trim()))
        })
    }

    /// Move the records into an in-memory backend.
    #[must_use]
    pub fn into_backend(self) -> MemoryBackend {
        MemoryBackend::with_records(self.groups, self.profiles)
    }
}
