//! Shared helpers for integration tests.

#![allow(dead_code)]

use std::sync::Arc;

use sentinel_permissions::{
    Group, GroupId, PermissionSettings, PermissionStore, Profile, ProfileId,
};

/// Build a group from string slices.
pub fn group(id: &str, perms: &[&str], parents: &[&str]) -> Group {
    let mut group = Group::new(id).with_permissions(perms).unwrap();
    for parent in parents {
        group = group.with_parent(*parent);
    }
    group
}

/// A store with the given groups and settings.
pub fn store_with(groups: Vec<Group>, settings: PermissionSettings) -> Arc<PermissionStore> {
    let store = Arc::new(PermissionStore::new(settings));
    store.load_groups(groups).unwrap();
    store
}

/// A store with the given groups and default settings.
pub fn store(groups: Vec<Group>) -> Arc<PermissionStore> {
    store_with(groups, PermissionSettings::default())
}

/// Load a fresh profile with its own nodes and memberships.
pub fn profile(store: &PermissionStore, perms: &[&str], groups: &[&str]) -> ProfileId {
    let mut profile = Profile::new(ProfileId::new()).with_permissions(perms).unwrap();
    for group in groups {
        profile = profile.with_group(GroupId::new(group));
    }
    let id = profile.id;
    store.load_profile(profile).unwrap();
    id
}
