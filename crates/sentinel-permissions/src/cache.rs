//! Per-profile decision cache.
//!
//! Entries are stamped with the revision of the profile snapshot they were
//! computed from. A lookup only hits when the revision matches, and an insert
//! carrying an older revision than what is already cached is dropped, so a
//! reader racing a writer can never resurrect a stale answer.

use dashmap::DashMap;
use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use crate::profile::ProfileId;
use crate::resolver::EffectiveSet;
use crate::settings::CacheSettings;

#[derive(Debug, Default)]
struct CachedProfile {
    revision: u64,
    effective: Option<Arc<EffectiveSet>>,
    decisions: HashMap<String, bool>,
}

impl CachedProfile {
    fn at(revision: u64) -> Self {
        Self {
            revision,
            ..Self::default()
        }
    }
}

/// Cache hit/miss counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    /// Lookups answered from the cache.
    pub hits: u64,
    /// Lookups that had to compute.
    pub misses: u64,
    /// Profiles with cached state.
    pub profiles: usize,
}

/// Memoizes decisions and effective sets per profile.
#[derive(Debug)]
pub struct DecisionCache {
    entries: DashMap<ProfileId, CachedProfile>,
    enabled: bool,
    max_decisions: usize,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl Default for DecisionCache {
    fn default() -> Self {
        Self::new(&CacheSettings::default())
    }
}

impl DecisionCache {
    /// Create a cache from settings.
    #[must_use]
    pub fn new(settings: &CacheSettings) -> Self {
        Self {
            entries: DashMap::new(),
            enabled: settings.enabled,
            max_decisions: settings.max_decisions_per_profile,
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
        }
    }

    /// Whether caching is enabled.
    #[must_use]
    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Cached decision for `permission` at `revision`.
    #[must_use]
    pub fn decision(&self, profile_id: &ProfileId, revision: u64, permission: &str) -> Option<bool> {
        if !self.enabled {
            return None;
        }
        let hit = self
            .entries
            .get(profile_id)
            .filter(|cached| cached.revision == revision)
            .and_then(|cached| cached.decisions.get(permission).copied());
        self.record(hit.is_some());
        hit
    }

    /// Cached effective set at `revision`.
    #[must_use]
    pub fn effective(&self, profile_id: &ProfileId, revision: u64) -> Option<Arc<EffectiveSet>> {
        if !self.enabled {
            return None;
        }
        let hit = self
            .entries
            .get(profile_id)
            .filter(|cached| cached.revision == revision)
            .and_then(|cached| cached.effective.clone());
        self.record(hit.is_some());
        hit
    }

    /// Cache a decision computed from the snapshot at `revision`.
    pub fn store_decision(&self, profile_id: ProfileId, revision: u64, permission: &str, allowed: bool) {
        let max_decisions = self.max_decisions;
        self.with_current(profile_id, revision, |cached| {
            if cached.decisions.len() >= max_decisions {
                tracing::debug!(
                    profile_id = %profile_id,
                    cap = max_decisions,
                    "Decision cache full for profile, clearing"
                );
                cached.decisions.clear();
            }
            cached.decisions.insert(permission.to_owned(), allowed);
        });
    }

    /// Cache an effective set computed from the snapshot at `revision`.
    pub fn store_effective(&self, profile_id: ProfileId, revision: u64, effective: Arc<EffectiveSet>) {
        self.with_current(profile_id, revision, |cached| {
            cached.effective = Some(effective);
        });
    }

    fn with_current(&self, profile_id: ProfileId, revision: u64, f: impl FnOnce(&mut CachedProfile)) {
        if !self.enabled || self.max_decisions == 0 {
            return;
        }
        let mut cached = self
            .entries
            .entry(profile_id)
            .or_insert_with(|| CachedProfile::at(revision));
        if cached.revision > revision {
            return;
        }
        if cached.revision < revision {
            *cached = CachedProfile::at(revision);
        }
        f(&mut cached);
    }

    /// Drop everything cached for a profile.
    pub fn invalidate_profile(&self, profile_id: &ProfileId) {
        if self.entries.remove(profile_id).is_some() {
            tracing::debug!(profile_id = %profile_id, "Invalidated cached decisions");
        }
    }

    /// Drop everything cached for several profiles.
    pub fn invalidate_profiles<'a>(&self, profile_ids: impl IntoIterator<Item = &'a ProfileId>) {
        for profile_id in profile_ids {
            self.invalidate_profile(profile_id);
        }
    }

    /// Drop everything.
    pub fn clear(&self) {
        self.entries.clear();
    }

    /// Current counters.
    #[must_use]
    pub fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            profiles: self.entries.len(),
        }
    }

    fn record(&self, hit: bool) {
        let counter = if hit { &self.hits } else { &self.misses };
        counter.fetch_add(1, Ordering::Relaxed);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decision_hit_requires_matching_revision() {
        let cache = DecisionCache::default();
        let id = ProfileId::new();
        cache.store_decision(id, 3, "fly", true);

        assert_eq!(cache.decision(&id, 3, "fly"), Some(true));
        assert_eq!(cache.decision(&id, 4, "fly"), None);
        assert_eq!(cache.decision(&id, 3, "build"), None);
    }

    #[test]
    fn test_stale_insert_is_dropped() {
        let cache = DecisionCache::default();
        let id = ProfileId::new();
        cache.store_decision(id, 5, "fly", true);
        cache.store_decision(id, 4, "fly", false);
        assert_eq!(cache.decision(&id, 5, "fly"), Some(true));
        assert_eq!(cache.decision(&id, 4, "fly"), None);
    }

    #[test]
    fn test_newer_revision_replaces_entry() {
        let cache = DecisionCache::default();
        let id = ProfileId::new();
        cache.store_decision(id, 1, "fly", false);
        cache.store_effective(id, 1, Arc::new(EffectiveSet::default()));
        cache.store_decision(id, 2, "build", true);

        assert_eq!(cache.decision(&id, 2, "fly"), None);
        assert!(cache.effective(&id, 2).is_none());
        assert_eq!(cache.decision(&id, 2, "build"), Some(true));
    }

    #[test]
    fn test_invalidate_only_touches_one_profile() {
        let cache = DecisionCache::default();
        let a = ProfileId::new();
        let b = ProfileId::new();
        cache.store_decision(a, 1, "fly", true);
        cache.store_decision(b, 1, "fly", true);

        cache.invalidate_profile(&a);
        assert_eq!(cache.decision(&a, 1, "fly"), None);
        assert_eq!(cache.decision(&b, 1, "fly"), Some(true));

        cache.clear();
        assert_eq!(cache.stats().profiles, 0);
    }

    #[test]
    fn test_cap_clears_profile_decisions() {
        let cache = DecisionCache::new(&CacheSettings {
            enabled: true,
            max_decisions_per_profile: 2,
        });
        let id = ProfileId::new();
        cache.store_decision(id, 1, "a", true);
        cache.store_decision(id, 1, "b", true);
        cache.store_decision(id, 1, "c", true);

        assert_eq!(cache.decision(&id, 1, "a"), None);
        assert_eq!(cache.decision(&id, 1, "c"), Some(true));
    }

    #[test]
    fn test_disabled_cache_stores_nothing() {
        let cache = DecisionCache::new(&CacheSettings {
            enabled: false,
            max_decisions_per_profile: 16,
        });
        let id = ProfileId::new();
        cache.store_decision(id, 1, "fly", true);
        assert_eq!(cache.decision(&id, 1, "fly"), None);
        assert_eq!(cache.stats(), CacheStats::default());
    }

    #[test]
    fn test_stats_count_hits_and_misses() {
        let cache = DecisionCache::default();
        let id = ProfileId::new();
        assert_eq!(cache.decision(&id, 1, "fly"), None);
        cache.store_decision(id, 1, "fly", true);
        assert_eq!(cache.decision(&id, 1, "fly"), Some(true));

        let stats = cache.stats();
        assert_eq!(stats.hits, 1);
        assert_eq!(stats.misses, 1);
        assert_eq!(stats.profiles, 1);
    }
}
