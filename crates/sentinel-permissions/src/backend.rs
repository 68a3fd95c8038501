//! Storage backend boundary.
//!
//! The core never performs I/O itself. A [`PermissionBackend`] owns the
//! persisted records; [`PermissionService`](crate::PermissionService) loads
//! them into a store and writes changes back.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::RwLock;

use crate::error::{PermissionError, PermissionResult};
use crate::profile::ProfileId;
use crate::record::{GroupRecord, ProfileRecord};

// ---------------------------------------------------------------------------
// Trait
// ---------------------------------------------------------------------------

/// Persistent storage for profile and group records.
#[async_trait]
pub trait PermissionBackend: Send + Sync {
    /// Load one profile record.
    ///
    /// Returns `None` if the backend has no record for the profile.
    async fn load_profile(&self, profile_id: &ProfileId) -> PermissionResult<Option<ProfileRecord>>;

    /// Load every group record.
    async fn load_groups(&self) -> PermissionResult<Vec<GroupRecord>>;

    /// Store a profile record, overwriting any existing one.
    async fn save_profile(&self, record: &ProfileRecord) -> PermissionResult<()>;

    /// Store a group record, overwriting any existing one.
    async fn save_group(&self, record: &GroupRecord) -> PermissionResult<()>;

    /// Delete a group record.
    ///
    /// Returns `true` if the record existed.
    async fn delete_group(&self, group_id: &str) -> PermissionResult<bool>;
}

// ---------------------------------------------------------------------------
// In-memory implementation
// ---------------------------------------------------------------------------

/// In-memory backend for tests, fixtures and document-backed tooling.
#[derive(Debug, Default)]
pub struct MemoryBackend {
    profiles: RwLock<HashMap<ProfileId, ProfileRecord>>,
    groups: RwLock<HashMap<String, GroupRecord>>,
}

impl MemoryBackend {
    /// Create an empty backend.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a backend pre-populated with records.
    #[must_use]
    pub fn with_records(
        groups: impl IntoIterator<Item = GroupRecord>,
        profiles: impl IntoIterator<Item = ProfileRecord>,
    ) -> Self {
        Self {
            profiles: RwLock::new(profiles.into_iter().map(|p| (p.id, p)).collect()),
            groups: RwLock::new(
                groups
                    .into_iter()
                    .map(|g| (g.id.to_lowercase(), g))
                    .collect(),
            ),
        }
    }

    /// Number of stored profile records.
    #[must_use]
    pub fn profile_count(&self) -> usize {
        self.profiles.read().map(|p| p.len()).unwrap_or(0)
    }

    /// Every stored profile record, for export.
    ///
    /// # Errors
    ///
    /// Returns a storage error if the lock is poisoned.
    pub fn profile_records(&self) -> PermissionResult<Vec<ProfileRecord>> {
        let profiles = self
            .profiles
            .read()
            .map_err(|e| PermissionError::Storage(e.to_string()))?;
        Ok(profiles.values().cloned().collect())
    }
}

#[async_trait]
impl PermissionBackend for MemoryBackend {
    async fn load_profile(&self, profile_id: &ProfileId) -> PermissionResult<Option<ProfileRecord>> {
        let profiles = self
            .profiles
            .read()
            .map_err(|e| PermissionError::Storage(e.to_string()))?;
        Ok(profiles.get(profile_id).cloned())
    }

    async fn load_groups(&self) -> PermissionResult<Vec<GroupRecord>> {
        let groups = self
            .groups
            .read()
            .map_err(|e| PermissionError::Storage(e.to_string()))?;
        let mut records: Vec<GroupRecord> = groups.values().cloned().collect();
        records.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(records)
    }

    async fn save_profile(&self, record: &ProfileRecord) -> PermissionResult<()> {
        let mut profiles = self
            .profiles
            .write()
            .map_err(|e| PermissionError::Storage(e.to_string()))?;
        profiles.insert(record.id, record.clone());
        Ok(())
    }

    async fn save_group(&self, record: &GroupRecord) -> PermissionResult<()> {
        let mut groups = self
            .groups
            .write()
            .map_err(|e| PermissionError::Storage(e.to_string()))?;
        groups.insert(record.id.to_lowercase(), record.clone());
        Ok(())
    }

    async fn delete_group(&self, group_id: &str) -> PermissionResult<bool> {
        let mut groups = self
            .groups
            .write()
            .map_err(|e| PermissionError::Storage(e.to_string()))?;
        Ok(groups.remove(&group_id.to_lowercase()).is_some())
    }
}
