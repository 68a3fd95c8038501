//! Live permission state.
//!
//! Profiles are published as immutable `Arc<Profile>` snapshots, one slot
//! per profile. Writers to a profile serialize on that slot's writer lock and
//! publish a complete new snapshot, so readers see either the old or the new
//! state of a batch and never a partial one.
//!
//! Lock order is: profile writer lock, then the group graph lock, then a
//! slot's snapshot lock. Readers hold the graph read lock across lookup,
//! compute and cache insert; group writers invalidate affected profiles
//! before releasing the graph write lock. Profile changes need no graph
//! lock to publish because every snapshot carries a new revision and the
//! cache only serves entries stamped with the current one.

use dashmap::DashMap;
use std::collections::HashSet;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, RwLock, RwLockReadGuard, RwLockWriteGuard};

use crate::cache::CacheStats;
use crate::error::{PermissionError, PermissionResult};
use crate::evaluator::{Decision, PermissionEvaluator};
use crate::group::{Group, GroupGraph, GroupId};
use crate::node::PermissionNode;
use crate::profile::{Profile, ProfileId, ProfileMutation};
use crate::resolver::EffectiveSet;
use crate::settings::PermissionSettings;

fn storage_error(e: impl std::fmt::Display) -> PermissionError {
    PermissionError::Storage(e.to_string())
}

/// One loaded profile.
#[derive(Debug)]
struct ProfileSlot {
    current: RwLock<Arc<Profile>>,
    writer: Mutex<()>,
}

impl ProfileSlot {
    fn new(profile: Arc<Profile>) -> Self {
        Self {
            current: RwLock::new(profile),
            writer: Mutex::new(()),
        }
    }

    fn snapshot(&self) -> Arc<Profile> {
        let current = self.current.read().unwrap_or_else(|e| {
            tracing::warn!("Profile slot read lock poisoned, recovering");
            e.into_inner()
        });
        Arc::clone(&current)
    }

    fn lock_writer(&self) -> PermissionResult<MutexGuard<'_, ()>> {
        self.writer.lock().map_err(storage_error)
    }

    fn publish(&self, profile: Arc<Profile>) -> PermissionResult<()> {
        let mut current = self.current.write().map_err(storage_error)?;
        *current = profile;
        Ok(())
    }
}

/// A profile change computed against a known snapshot but not yet published.
///
/// Produced by [`PermissionStore::stage`] and published with
/// [`PermissionStore::commit`], which fails if another writer published in
/// between.
#[derive(Debug, Clone)]
pub struct StagedProfile {
    profile: Profile,
    base_revision: u64,
    changed: bool,
}

impl StagedProfile {
    /// The profile as it will look once committed.
    #[must_use]
    pub fn profile(&self) -> &Profile {
        &self.profile
    }

    /// Revision of the snapshot the change was computed from.
    #[must_use]
    pub fn base_revision(&self) -> u64 {
        self.base_revision
    }

    /// Whether committing would change anything.
    #[must_use]
    pub fn is_changed(&self) -> bool {
        self.changed
    }
}

/// Loaded profiles, the group graph, and the evaluator that answers checks
/// against them.
pub struct PermissionStore {
    profiles: DashMap<ProfileId, Arc<ProfileSlot>>,
    groups: RwLock<GroupGraph>,
    evaluator: PermissionEvaluator,
    revisions: AtomicU64,
}

impl PermissionStore {
    /// Create an empty store.
    #[must_use]
    pub fn new(settings: PermissionSettings) -> Self {
        Self {
            profiles: DashMap::new(),
            groups: RwLock::new(GroupGraph::new()),
            evaluator: PermissionEvaluator::new(settings),
            revisions: AtomicU64::new(0),
        }
    }

    /// Settings in effect.
    #[must_use]
    pub fn settings(&self) -> &PermissionSettings {
        self.evaluator.settings()
    }

    fn next_revision(&self) -> u64 {
        self.revisions.fetch_add(1, Ordering::SeqCst).saturating_add(1)
    }

    fn read_groups(&self) -> RwLockReadGuard<'_, GroupGraph> {
        self.groups.read().unwrap_or_else(|e| {
            tracing::warn!("Group graph read lock poisoned, recovering");
            e.into_inner()
        })
    }

    fn write_groups(&self) -> PermissionResult<RwLockWriteGuard<'_, GroupGraph>> {
        self.groups.write().map_err(storage_error)
    }

    fn slot(&self, profile_id: &ProfileId) -> PermissionResult<Arc<ProfileSlot>> {
        self.profiles
            .get(profile_id)
            .map(|slot| Arc::clone(slot.value()))
            .ok_or_else(|| PermissionError::UnknownProfile {
                profile_id: profile_id.to_string(),
            })
    }

    // -- Evaluation --

    /// Whether the loaded profile holds `permission`.
    ///
    /// Never fails: an unknown profile, a malformed query and a broken
    /// inheritance graph all deny.
    #[must_use]
    pub fn has_effective_permission(&self, profile_id: &ProfileId, permission: &str) -> bool {
        let Ok(slot) = self.slot(profile_id) else {
            tracing::debug!(profile_id = %profile_id, permission, "Profile not loaded, denying");
            return false;
        };
        let groups = self.read_groups();
        let profile = slot.snapshot();
        self.evaluator
            .has_effective_permission(&profile, &groups, permission)
    }

    /// Evaluate `permission` and report which entry decided.
    ///
    /// # Errors
    ///
    /// Returns [`PermissionError::UnknownProfile`] if the profile is not
    /// loaded, [`PermissionError::InvalidPermissionFormat`] for a bad query,
    /// and any resolution failure.
    pub fn check(&self, profile_id: &ProfileId, permission: &str) -> PermissionResult<Decision> {
        let slot = self.slot(profile_id)?;
        let groups = self.read_groups();
        let profile = slot.snapshot();
        self.evaluator.check(&profile, &groups, permission)
    }

    /// The profile's effective set in precedence order.
    ///
    /// # Errors
    ///
    /// Returns [`PermissionError::UnknownProfile`] if the profile is not
    /// loaded, and any resolution failure.
    pub fn effective_permissions(&self, profile_id: &ProfileId) -> PermissionResult<Arc<EffectiveSet>> {
        let slot = self.slot(profile_id)?;
        let groups = self.read_groups();
        let profile = slot.snapshot();
        self.evaluator.effective_set(&profile, &groups)
    }

    /// The profile's highest-weight group, if it belongs to any loaded group.
    #[must_use]
    pub fn primary_group(&self, profile_id: &ProfileId) -> Option<Group> {
        let slot = self.slot(profile_id).ok()?;
        let groups = self.read_groups();
        slot.snapshot().primary_group(&groups).cloned()
    }

    /// Drop every cached decision and effective set.
    pub fn clear_cache(&self) {
        self.evaluator.cache().clear();
        tracing::debug!("Permission cache cleared");
    }

    /// Cache counters.
    #[must_use]
    pub fn cache_stats(&self) -> CacheStats {
        self.evaluator.cache().stats()
    }

    // -- Profiles --

    /// Load (or replace) a profile snapshot, assigning it a fresh revision.
    ///
    /// # Errors
    ///
    /// Returns a storage error if the profile's lock is poisoned.
    pub fn load_profile(&self, mut profile: Profile) -> PermissionResult<Arc<Profile>> {
        let profile_id = profile.id;
        profile.revision = self.next_revision();
        let snapshot = Arc::new(profile);

        let slot = Arc::clone(
            self.profiles
                .entry(profile_id)
                .or_insert_with(|| Arc::new(ProfileSlot::new(Arc::clone(&snapshot))))
                .value(),
        );
        {
            let _writer = slot.lock_writer()?;
            slot.publish(Arc::clone(&snapshot))?;
        }
        self.evaluator.cache().invalidate_profile(&profile_id);

        tracing::info!(
            profile_id = %profile_id,
            permissions = snapshot.permissions.len(),
            groups = snapshot.groups.len(),
            "Loaded profile"
        );
        Ok(snapshot)
    }

    /// Unload a profile and everything cached for it.
    pub fn unload_profile(&self, profile_id: &ProfileId) -> Option<Arc<Profile>> {
        let (_, slot) = self.profiles.remove(profile_id)?;
        self.evaluator.cache().invalidate_profile(profile_id);
        tracing::info!(profile_id = %profile_id, "Unloaded profile");
        Some(slot.snapshot())
    }

    /// The current snapshot of a loaded profile.
    #[must_use]
    pub fn profile(&self, profile_id: &ProfileId) -> Option<Arc<Profile>> {
        self.slot(profile_id).ok().map(|slot| slot.snapshot())
    }

    /// Whether a profile is loaded.
    #[must_use]
    pub fn is_loaded(&self, profile_id: &ProfileId) -> bool {
        self.profiles.contains_key(profile_id)
    }

    /// IDs of all loaded profiles.
    #[must_use]
    pub fn profile_ids(&self) -> Vec<ProfileId> {
        self.profiles.iter().map(|entry| *entry.key()).collect()
    }

    // -- Profile mutations --

    /// Grant a node (a `-` prefix grants a denial).
    ///
    /// # Errors
    ///
    /// Returns [`PermissionError::UnknownProfile`] or
    /// [`PermissionError::InvalidPermissionFormat`].
    pub fn grant(&self, profile_id: &ProfileId, permission: &str) -> PermissionResult<Arc<Profile>> {
        self.apply(profile_id, &[ProfileMutation::Grant(permission.to_owned())])
    }

    /// Remove the node with the same shape as `permission`.
    ///
    /// # Errors
    ///
    /// Returns [`PermissionError::UnknownProfile`] or
    /// [`PermissionError::InvalidPermissionFormat`].
    pub fn revoke(&self, profile_id: &ProfileId, permission: &str) -> PermissionResult<Arc<Profile>> {
        self.apply(profile_id, &[ProfileMutation::Revoke(permission.to_owned())])
    }

    /// Join a group.
    ///
    /// # Errors
    ///
    /// Returns [`PermissionError::UnknownProfile`] or
    /// [`PermissionError::UnknownGroup`].
    pub fn join_group(&self, profile_id: &ProfileId, group: &GroupId) -> PermissionResult<Arc<Profile>> {
        self.apply(profile_id, &[ProfileMutation::JoinGroup(group.clone())])
    }

    /// Leave a group.
    ///
    /// # Errors
    ///
    /// Returns [`PermissionError::UnknownProfile`].
    pub fn leave_group(&self, profile_id: &ProfileId, group: &GroupId) -> PermissionResult<Arc<Profile>> {
        self.apply(profile_id, &[ProfileMutation::LeaveGroup(group.clone())])
    }

    /// Apply mutations as one change: either all of them are published in a
    /// single new snapshot or none are.
    ///
    /// # Errors
    ///
    /// Returns the first mutation's error; nothing is published in that case.
    pub fn apply(&self, profile_id: &ProfileId, mutations: &[ProfileMutation]) -> PermissionResult<Arc<Profile>> {
        let slot = self.slot(profile_id)?;
        let _writer = slot.lock_writer()?;
        let staged = self.build(&slot.snapshot(), mutations)?;
        self.publish(&slot, staged)
    }

    /// Compute the result of `mutations` without publishing it.
    ///
    /// # Errors
    ///
    /// Same as [`PermissionStore::apply`].
    pub fn stage(&self, profile_id: &ProfileId, mutations: &[ProfileMutation]) -> PermissionResult<StagedProfile> {
        let slot = self.slot(profile_id)?;
        let _writer = slot.lock_writer()?;
        self.build(&slot.snapshot(), mutations)
    }

    /// Publish a staged change.
    ///
    /// # Errors
    ///
    /// Returns [`PermissionError::ConcurrentModification`] if the profile was
    /// published since the change was staged, and
    /// [`PermissionError::UnknownProfile`] if it was unloaded.
    pub fn commit(&self, staged: StagedProfile) -> PermissionResult<Arc<Profile>> {
        let slot = self.slot(&staged.profile.id)?;
        let _writer = slot.lock_writer()?;
        if slot.snapshot().revision != staged.base_revision {
            return Err(PermissionError::ConcurrentModification {
                profile_id: staged.profile.id.to_string(),
            });
        }
        self.publish(&slot, staged)
    }

    fn build(&self, current: &Profile, mutations: &[ProfileMutation]) -> PermissionResult<StagedProfile> {
        let groups = self.read_groups();
        let mut profile = current.clone();
        let mut changed = false;
        for mutation in mutations {
            if profile.apply(mutation, &groups)? {
                changed = true;
            }
        }
        Ok(StagedProfile {
            profile,
            base_revision: current.revision,
            changed,
        })
    }

    /// Caller holds the slot's writer lock.
    fn publish(&self, slot: &ProfileSlot, staged: StagedProfile) -> PermissionResult<Arc<Profile>> {
        if !staged.changed {
            return Ok(slot.snapshot());
        }
        let mut profile = staged.profile;
        profile.revision = self.next_revision();
        let profile_id = profile.id;
        let snapshot = Arc::new(profile);

        slot.publish(Arc::clone(&snapshot))?;
        self.evaluator.cache().invalidate_profile(&profile_id);

        tracing::info!(
            profile_id = %profile_id,
            revision = snapshot.revision,
            "Published profile change"
        );
        Ok(snapshot)
    }

    // -- Groups --

    /// Replace the whole group graph and drop every cached entry.
    ///
    /// Problems in the new graph (missing parents, cycles) are logged rather
    /// than rejected; they surface again as denies when a profile hits them.
    ///
    /// # Errors
    ///
    /// Returns a storage error if the graph lock is poisoned.
    pub fn load_groups(&self, groups: impl IntoIterator<Item = Group>) -> PermissionResult<usize> {
        let graph: GroupGraph = groups.into_iter().collect();
        for problem in graph.validate() {
            tracing::warn!(error = %problem, "Loaded group graph has a problem");
        }
        let count = graph.len();

        let mut current = self.write_groups()?;
        *current = graph;
        self.evaluator.cache().clear();
        drop(current);

        tracing::info!(groups = count, "Loaded groups");
        Ok(count)
    }

    /// A copy of one group.
    #[must_use]
    pub fn group(&self, group_id: &GroupId) -> Option<Group> {
        self.read_groups().get(group_id).cloned()
    }

    /// Copies of all groups, sorted by identifier.
    #[must_use]
    pub fn groups(&self) -> Vec<Group> {
        self.read_groups().sorted().into_iter().cloned().collect()
    }

    /// A copy of the whole graph.
    #[must_use]
    pub fn group_graph(&self) -> GroupGraph {
        self.read_groups().clone()
    }

    /// Check that `group` could be stored: its parents exist and none of them
    /// inherits from it.
    ///
    /// # Errors
    ///
    /// Returns [`PermissionError::UnknownGroup`] or
    /// [`PermissionError::CyclicInheritance`].
    pub fn validate_group(&self, group: &Group) -> PermissionResult<()> {
        check_parents(&self.read_groups(), &group.id, &group.parents)
    }

    /// Add a new group.
    ///
    /// # Errors
    ///
    /// Returns [`PermissionError::DuplicateGroup`] if it exists, or any
    /// [`PermissionStore::validate_group`] error.
    pub fn create_group(&self, group: Group) -> PermissionResult<()> {
        let group_id = group.id.clone();
        self.mutate_group(&group_id, |graph| {
            if graph.contains(&group.id) {
                return Err(PermissionError::DuplicateGroup {
                    group_id: group.id.to_string(),
                });
            }
            check_parents(graph, &group.id, &group.parents)?;
            graph.insert(group);
            Ok(())
        })?;
        tracing::info!(group_id = %group_id, "Created group");
        Ok(())
    }

    /// Insert or replace a group.
    ///
    /// # Errors
    ///
    /// Any [`PermissionStore::validate_group`] error.
    pub fn upsert_group(&self, group: Group) -> PermissionResult<()> {
        let group_id = group.id.clone();
        self.mutate_group(&group_id, |graph| {
            check_parents(graph, &group.id, &group.parents)?;
            graph.insert(group);
            Ok(())
        })?;
        tracing::info!(group_id = %group_id, "Stored group");
        Ok(())
    }

    /// Grant a node to a group.
    ///
    /// # Errors
    ///
    /// Returns [`PermissionError::UnknownGroup`] or
    /// [`PermissionError::InvalidPermissionFormat`].
    pub fn grant_group(&self, group_id: &GroupId, permission: &str) -> PermissionResult<bool> {
        let node = PermissionNode::parse(permission)?;
        self.mutate_group(group_id, |graph| {
            let group = existing_mut(graph, group_id)?;
            if group.permissions.contains(&node) {
                return Ok(false);
            }
            group.permissions.insert(node);
            Ok(true)
        })
    }

    /// Remove a node from a group.
    ///
    /// # Errors
    ///
    /// Returns [`PermissionError::UnknownGroup`] or
    /// [`PermissionError::InvalidPermissionFormat`].
    pub fn revoke_group(&self, group_id: &GroupId, permission: &str) -> PermissionResult<bool> {
        let node = PermissionNode::parse(permission)?;
        self.mutate_group(group_id, |graph| {
            let group = existing_mut(graph, group_id)?;
            Ok(group.permissions.remove(&node).is_some())
        })
    }

    /// Replace a group's parents.
    ///
    /// # Errors
    ///
    /// Returns [`PermissionError::UnknownGroup`] for the group or a parent,
    /// or [`PermissionError::CyclicInheritance`] if the change would close a
    /// cycle.
    pub fn set_group_parents(&self, group_id: &GroupId, parents: Vec<GroupId>) -> PermissionResult<()> {
        let mut distinct: Vec<GroupId> = Vec::with_capacity(parents.len());
        for parent in parents {
            if !distinct.contains(&parent) {
                distinct.push(parent);
            }
        }
        self.mutate_group(group_id, |graph| {
            existing_mut(graph, group_id)?;
            check_parents(graph, group_id, &distinct)?;
            if let Some(group) = graph.get_mut(group_id) {
                group.parents = distinct;
            }
            Ok(())
        })
    }

    /// Delete a group and drop it from other groups' parents.
    ///
    /// Profile memberships naming the group are left in place and follow the
    /// missing group policy until the profile leaves it.
    ///
    /// # Errors
    ///
    /// Returns [`PermissionError::UnknownGroup`].
    pub fn delete_group(&self, group_id: &GroupId) -> PermissionResult<Group> {
        let removed = self.mutate_group(group_id, |graph| {
            let removed = graph.remove(group_id).ok_or_else(|| PermissionError::UnknownGroup {
                group_id: group_id.to_string(),
            })?;
            let children: Vec<GroupId> = graph
                .iter()
                .filter(|group| group.parents.contains(group_id))
                .map(|group| group.id.clone())
                .collect();
            for child in &children {
                if let Some(group) = graph.get_mut(child) {
                    group.parents.retain(|parent| parent != group_id);
                }
            }
            Ok(removed)
        })?;
        tracing::info!(group_id = %group_id, "Deleted group");
        Ok(removed)
    }

    /// Run a group change under the graph write lock and invalidate every
    /// profile whose inheritance chain includes the group.
    fn mutate_group<R>(
        &self,
        group_id: &GroupId,
        f: impl FnOnce(&mut GroupGraph) -> PermissionResult<R>,
    ) -> PermissionResult<R> {
        let mut graph = self.write_groups()?;
        let affected_groups = graph.dependents(group_id);
        let result = f(&mut graph)?;

        let affected: Vec<ProfileId> = self
            .profiles
            .iter()
            .filter(|entry| {
                entry
                    .value()
                    .snapshot()
                    .groups
                    .iter()
                    .any(|group| affected_groups.contains(group))
            })
            .map(|entry| *entry.key())
            .collect();
        self.evaluator.cache().invalidate_profiles(&affected);
        drop(graph);

        tracing::debug!(
            group_id = %group_id,
            profiles = affected.len(),
            "Group changed, invalidated member profiles"
        );
        Ok(result)
    }
}

fn existing_mut<'a>(graph: &'a mut GroupGraph, group_id: &GroupId) -> PermissionResult<&'a mut Group> {
    graph.get_mut(group_id).ok_or_else(|| PermissionError::UnknownGroup {
        group_id: group_id.to_string(),
    })
}

/// Parents must exist, and none may already inherit from `group_id`
/// (or be `group_id` itself), which would close a cycle.
fn check_parents(graph: &GroupGraph, group_id: &GroupId, parents: &[GroupId]) -> PermissionResult<()> {
    for parent in parents {
        if !graph.contains(parent) {
            return Err(PermissionError::UnknownGroup {
                group_id: parent.to_string(),
            });
        }
    }

    let dependents: HashSet<GroupId> = graph.dependents(group_id);
    let mut cyclic: Vec<String> = parents
        .iter()
        .filter(|parent| dependents.contains(*parent))
        .map(ToString::to_string)
        .collect();
    if cyclic.is_empty() {
        return Ok(());
    }
    if !cyclic.iter().any(|id| id == group_id.as_str()) {
        cyclic.push(group_id.to_string());
    }
    cyclic.sort();
    Err(PermissionError::CyclicInheritance { groups: cyclic })
}

impl Default for PermissionStore {
    fn default() -> Self {
        Self::new(PermissionSettings::default())
    }
}

impl std::fmt::Debug for PermissionStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let group_count = self.groups.read().map(|g| g.len()).unwrap_or(0);

        f.debug_struct("PermissionStore")
            .field("profiles", &self.profiles.len())
            .field("groups", &group_count)
            .field("settings", self.settings())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
#[path = "store_tests.rs"]
mod tests;
