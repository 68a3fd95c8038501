//! Backend-aware permission service.
//!
//! [`PermissionService`] composes a [`PermissionBackend`] with a
//! [`PermissionStore`]. Checks are answered from the store without touching
//! the backend; mutations are persisted first and published only once the
//! backend accepted them.

use dashmap::DashMap;
use std::sync::Arc;
use tokio::sync::Mutex;

use crate::backend::PermissionBackend;
use crate::error::{PermissionError, PermissionResult};
use crate::evaluator::Decision;
use crate::gate::CommandGate;
use crate::group::{Group, GroupId};
use crate::node::PermissionNode;
use crate::profile::{Profile, ProfileId, ProfileMutation};
use crate::resolver::EffectiveSet;
use crate::settings::PermissionSettings;
use crate::store::PermissionStore;

/// Loads, evaluates and persists permissions through a backend.
pub struct PermissionService {
    store: Arc<PermissionStore>,
    backend: Arc<dyn PermissionBackend>,
    profile_writes: DashMap<ProfileId, Arc<Mutex<()>>>,
    group_writes: Mutex<()>,
}

impl PermissionService {
    /// Create a service with a fresh store.
    #[must_use]
    pub fn new(backend: Arc<dyn PermissionBackend>, settings: PermissionSettings) -> Self {
        Self::with_store(backend, Arc::new(PermissionStore::new(settings)))
    }

    /// Create a service around an existing store.
    #[must_use]
    pub fn with_store(backend: Arc<dyn PermissionBackend>, store: Arc<PermissionStore>) -> Self {
        Self {
            store,
            backend,
            profile_writes: DashMap::new(),
            group_writes: Mutex::new(()),
        }
    }

    /// The underlying store.
    #[must_use]
    pub fn store(&self) -> &Arc<PermissionStore> {
        &self.store
    }

    /// A command gate over this service's store.
    #[must_use]
    pub fn gate(&self) -> CommandGate {
        CommandGate::new(Arc::clone(&self.store))
    }

    fn profile_lock(&self, profile_id: ProfileId) -> Arc<Mutex<()>> {
        Arc::clone(self.profile_writes.entry(profile_id).or_default().value())
    }

    /// Drop the write lock of a profile that is not loaded, unless another
    /// task still holds it.
    fn release_lock(&self, profile_id: &ProfileId) {
        self.profile_writes.remove_if(profile_id, |_, lock| {
            Arc::strong_count(lock) == 1 && !self.store.is_loaded(profile_id)
        });
    }

    // -- Loading --

    /// Load every group from the backend, replacing the current graph.
    ///
    /// # Errors
    ///
    /// Returns backend errors and the first unparsable group permission.
    pub async fn load_groups(&self) -> PermissionResult<usize> {
        let records = self.backend.load_groups().await?;
        let groups = records
            .iter()
            .map(Group::from_record)
            .collect::<PermissionResult<Vec<_>>>()?;
        self.store.load_groups(groups)
    }

    /// Load a profile from the backend.
    ///
    /// # Errors
    ///
    /// Returns [`PermissionError::UnknownProfile`] if the backend has no
    /// record, backend errors, and unparsable stored permissions.
    pub async fn load_profile(&self, profile_id: &ProfileId) -> PermissionResult<Arc<Profile>> {
        let lock = self.profile_lock(*profile_id);
        let result = {
            let _guard = lock.lock().await;
            self.load_profile_locked(profile_id).await
        };
        drop(lock);
        if result.is_err() {
            self.release_lock(profile_id);
        }
        result
    }

    async fn load_profile_locked(&self, profile_id: &ProfileId) -> PermissionResult<Arc<Profile>> {
        let record = self
            .backend
            .load_profile(profile_id)
            .await?
            .ok_or_else(|| PermissionError::UnknownProfile {
                profile_id: profile_id.to_string(),
            })?;
        let profile = Profile::from_record(&record)?;
        self.store.load_profile(profile)
    }

    /// Unload a profile. Returns whether it was loaded.
    pub fn unload_profile(&self, profile_id: &ProfileId) -> bool {
        self.profile_writes.remove(profile_id);
        self.store.unload_profile(profile_id).is_some()
    }

    // -- Evaluation --

    /// See [`PermissionStore::has_effective_permission`].
    #[must_use]
    pub fn has_effective_permission(&self, profile_id: &ProfileId, permission: &str) -> bool {
        self.store.has_effective_permission(profile_id, permission)
    }

    /// See [`PermissionStore::check`].
    ///
    /// # Errors
    ///
    /// Same as [`PermissionStore::check`].
    pub fn check(&self, profile_id: &ProfileId, permission: &str) -> PermissionResult<Decision> {
        self.store.check(profile_id, permission)
    }

    /// See [`PermissionStore::effective_permissions`].
    ///
    /// # Errors
    ///
    /// Same as [`PermissionStore::effective_permissions`].
    pub fn effective_permissions(&self, profile_id: &ProfileId) -> PermissionResult<Arc<EffectiveSet>> {
        self.store.effective_permissions(profile_id)
    }

    // -- Profile mutations --

    /// Grant a node and persist the profile.
    ///
    /// # Errors
    ///
    /// Same as [`PermissionService::apply`].
    pub async fn grant(&self, profile_id: &ProfileId, permission: &str) -> PermissionResult<Arc<Profile>> {
        self.apply(profile_id, vec![ProfileMutation::Grant(permission.to_owned())])
            .await
    }

    /// Revoke a node and persist the profile.
    ///
    /// # Errors
    ///
    /// Same as [`PermissionService::apply`].
    pub async fn revoke(&self, profile_id: &ProfileId, permission: &str) -> PermissionResult<Arc<Profile>> {
        self.apply(profile_id, vec![ProfileMutation::Revoke(permission.to_owned())])
            .await
    }

    /// Join a group and persist the profile.
    ///
    /// # Errors
    ///
    /// Same as [`PermissionService::apply`].
    pub async fn join_group(&self, profile_id: &ProfileId, group: &GroupId) -> PermissionResult<Arc<Profile>> {
        self.apply(profile_id, vec![ProfileMutation::JoinGroup(group.clone())])
            .await
    }

    /// Leave a group and persist the profile.
    ///
    /// # Errors
    ///
    /// Same as [`PermissionService::apply`].
    pub async fn leave_group(&self, profile_id: &ProfileId, group: &GroupId) -> PermissionResult<Arc<Profile>> {
        self.apply(profile_id, vec![ProfileMutation::LeaveGroup(group.clone())])
            .await
    }

    /// Apply mutations atomically: stage, persist, then publish.
    ///
    /// If the backend rejects the write nothing is published.
    ///
    /// # Errors
    ///
    /// Returns mutation errors from [`PermissionStore::stage`], backend
    /// errors, and [`PermissionError::ConcurrentModification`] if the profile
    /// was changed directly on the store while the write was in flight.
    pub async fn apply(
        &self,
        profile_id: &ProfileId,
        mutations: Vec<ProfileMutation>,
    ) -> PermissionResult<Arc<Profile>> {
        if !self.store.is_loaded(profile_id) {
            return Err(PermissionError::UnknownProfile {
                profile_id: profile_id.to_string(),
            });
        }

        let lock = self.profile_lock(*profile_id);
        let result = {
            let _guard = lock.lock().await;
            self.apply_locked(profile_id, &mutations).await
        };
        drop(lock);
        if result.is_err() {
            self.release_lock(profile_id);
        }
        result
    }

    async fn apply_locked(
        &self,
        profile_id: &ProfileId,
        mutations: &[ProfileMutation],
    ) -> PermissionResult<Arc<Profile>> {
        let staged = self.store.stage(profile_id, mutations)?;
        if !staged.is_changed() {
            return self
                .store
                .profile(profile_id)
                .ok_or_else(|| PermissionError::UnknownProfile {
                    profile_id: profile_id.to_string(),
                });
        }

        if let Err(e) = self.backend.save_profile(&staged.profile().to_record()).await {
            tracing::error!(
                profile_id = %profile_id,
                error = %e,
                "Failed to persist profile change, not publishing"
            );
            return Err(e);
        }
        self.store.commit(staged)
    }

    // -- Group mutations --

    /// Create a group and persist it.
    ///
    /// # Errors
    ///
    /// Returns [`PermissionError::DuplicateGroup`], validation errors from
    /// [`PermissionStore::validate_group`], and backend errors.
    pub async fn create_group(&self, group: Group) -> PermissionResult<()> {
        let _guard = self.group_writes.lock().await;
        if self.store.group(&group.id).is_some() {
            return Err(PermissionError::DuplicateGroup {
                group_id: group.id.to_string(),
            });
        }
        self.store.validate_group(&group)?;
        self.backend.save_group(&group.to_record()).await?;
        self.store.create_group(group)
    }

    /// Grant a node to a group and persist it. Returns whether it changed.
    ///
    /// # Errors
    ///
    /// Returns [`PermissionError::UnknownGroup`],
    /// [`PermissionError::InvalidPermissionFormat`] and backend errors.
    pub async fn grant_group(&self, group_id: &GroupId, permission: &str) -> PermissionResult<bool> {
        let node = PermissionNode::parse(permission)?;
        self.update_group(group_id, |group| {
            if group.permissions.contains(&node) {
                return false;
            }
            group.permissions.insert(node);
            true
        })
        .await
    }

    /// Revoke a node from a group and persist it. Returns whether it changed.
    ///
    /// # Errors
    ///
    /// Returns [`PermissionError::UnknownGroup`],
    /// [`PermissionError::InvalidPermissionFormat`] and backend errors.
    pub async fn revoke_group(&self, group_id: &GroupId, permission: &str) -> PermissionResult<bool> {
        let node = PermissionNode::parse(permission)?;
        self.update_group(group_id, |group| group.permissions.remove(&node).is_some())
            .await
    }

    /// Replace a group's parents and persist it.
    ///
    /// # Errors
    ///
    /// Returns [`PermissionError::UnknownGroup`],
    /// [`PermissionError::CyclicInheritance`] and backend errors.
    pub async fn set_group_parents(&self, group_id: &GroupId, parents: Vec<GroupId>) -> PermissionResult<()> {
        self.update_group(group_id, |group| {
            group.parents.clear();
            for parent in parents {
                if !group.parents.contains(&parent) {
                    group.parents.push(parent);
                }
            }
            true
        })
        .await
        .map(|_| ())
    }

    /// Delete a group from the backend and the store.
    ///
    /// Groups that listed it as a parent are re-saved without it.
    ///
    /// # Errors
    ///
    /// Returns [`PermissionError::UnknownGroup`] and backend errors.
    pub async fn delete_group(&self, group_id: &GroupId) -> PermissionResult<Group> {
        let _guard = self.group_writes.lock().await;
        if self.store.group(group_id).is_none() {
            return Err(PermissionError::UnknownGroup {
                group_id: group_id.to_string(),
            });
        }

        let children: Vec<Group> = self
            .store
            .groups()
            .into_iter()
            .filter(|group| group.parents.contains(group_id))
            .collect();

        self.backend.delete_group(group_id.as_str()).await?;
        let removed = self.store.delete_group(group_id)?;

        for mut child in children {
            child.parents.retain(|parent| parent != group_id);
            self.backend.save_group(&child.to_record()).await?;
        }
        Ok(removed)
    }

    async fn update_group(
        &self,
        group_id: &GroupId,
        change: impl FnOnce(&mut Group) -> bool,
    ) -> PermissionResult<bool> {
        let _guard = self.group_writes.lock().await;
        let mut group = self
            .store
            .group(group_id)
            .ok_or_else(|| PermissionError::UnknownGroup {
                group_id: group_id.to_string(),
            })?;
        if !change(&mut group) {
            return Ok(false);
        }

        self.store.validate_group(&group)?;
        self.backend.save_group(&group.to_record()).await?;
        self.store.upsert_group(group)?;
        Ok(true)
    }
}

impl std::fmt::Debug for PermissionService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PermissionService")
            .field("store", &self.store)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
#[path = "service_tests.rs"]
mod tests;
