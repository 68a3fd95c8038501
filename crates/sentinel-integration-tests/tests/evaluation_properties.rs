//! End-to-end evaluation behavior through the public store API.

mod common;

use common::{group, profile, store, store_with};
use sentinel_permissions::{GrantSource, GroupId, PermissionSettings, PrecedenceMode, ProfileId};

#[test]
fn test_exact_grants_are_honored() {
    let store = store(vec![]);
    let id = profile(&store, &["home.set"], &[]);
    assert!(store.has_effective_permission(&id, "home.set"));
    assert!(store.has_effective_permission(&id, "  HOME.Set "));
    assert!(!store.has_effective_permission(&id, "home"));
    assert!(!store.has_effective_permission(&id, "home.set.other"));
}

#[test]
fn test_wildcard_covers_children_and_itself() {
    let store = store(vec![]);
    let id = profile(&store, &["a.b.*"], &[]);
    assert!(store.has_effective_permission(&id, "a.b.c"));
    assert!(store.has_effective_permission(&id, "a.b.c.d"));
    assert!(store.has_effective_permission(&id, "a.b"));
    assert!(!store.has_effective_permission(&id, "a.x"));
    assert!(!store.has_effective_permission(&id, "a"));
}

#[test]
fn test_own_negation_beats_inherited_wildcard() {
    let store = store(vec![group("default", &["a.*"], &[])]);
    let id = profile(&store, &["-a.b"], &["default"]);
    assert!(!store.has_effective_permission(&id, "a.b"));
    assert!(store.has_effective_permission(&id, "a.c"));
}

#[test]
fn test_overlapping_grants_in_either_order() {
    let store = store(vec![]);
    let first = profile(&store, &["a.*", "a.b"], &[]);
    let second = profile(&store, &["a.b", "a.*"], &[]);
    for id in [first, second] {
        assert!(store.has_effective_permission(&id, "a.b"));
        assert!(store.has_effective_permission(&id, "a.c"));
    }
}

#[test]
fn test_no_match_denies() {
    let store = store(vec![]);
    let id = profile(&store, &[], &[]);
    assert!(!store.has_effective_permission(&id, "anything"));
    assert!(!store.has_effective_permission(&ProfileId::new(), "anything"));
    assert!(!store.has_effective_permission(&id, ""));
    assert!(!store.has_effective_permission(&id, "a..b"));
    assert!(!store.has_effective_permission(&id, "-anything"));
}

#[test]
fn test_reference_scenario() {
    let store = store(vec![group("default", &["build", "move"], &[])]);
    let id = profile(&store, &["-build", "chat.*"], &["default"]);

    assert!(!store.has_effective_permission(&id, "build"));
    assert!(store.has_effective_permission(&id, "chat.say"));
    assert!(store.has_effective_permission(&id, "move"));
    assert!(!store.has_effective_permission(&id, "fly"));
}

#[test]
fn test_superuser_is_least_specific() {
    let store = store(vec![group("admin", &["*"], &[])]);
    let id = profile(&store, &["-server.stop"], &["admin"]);
    assert!(store.has_effective_permission(&id, "anything.at.all"));
    assert!(store.has_effective_permission(&id, "server.*"));
    assert!(!store.has_effective_permission(&id, "server.stop"));
}

#[test]
fn test_wildcard_queries_need_wildcard_grants() {
    let store = store(vec![]);
    let id = profile(&store, &["a.b", "x.*"], &[]);
    assert!(!store.has_effective_permission(&id, "a.*"));
    assert!(store.has_effective_permission(&id, "x.*"));
    assert!(store.has_effective_permission(&id, "x.y.*"));
}

#[test]
fn test_more_specific_inherited_grant_wins_by_default() {
    let store = store(vec![group("builder", &["worldedit.wand"], &[])]);
    let id = profile(&store, &["-worldedit.*"], &["builder"]);

    assert!(store.has_effective_permission(&id, "worldedit.wand"));
    assert!(!store.has_effective_permission(&id, "worldedit.brush"));

    let decision = store.check(&id, "worldedit.wand").unwrap();
    let matched = decision.matched.unwrap();
    assert_eq!(matched.node.to_string(), "worldedit.wand");
    assert_eq!(
        matched.source,
        GrantSource::Group {
            id: GroupId::new("builder"),
            depth: 1
        }
    );
}

#[test]
fn test_source_precedence_lets_profile_decide() {
    let settings = PermissionSettings::default().with_precedence(PrecedenceMode::Source);
    let store = store_with(vec![group("builder", &["worldedit.wand"], &[])], settings);
    let id = profile(&store, &["-worldedit.*"], &["builder"]);

    assert!(!store.has_effective_permission(&id, "worldedit.wand"));
    let decision = store.check(&id, "worldedit.wand").unwrap();
    assert_eq!(decision.matched.unwrap().source, GrantSource::Profile);
}

#[test]
fn test_closer_group_wins_specificity_ties() {
    let store = store(vec![
        group("base", &["fly"], &[]),
        group("muted", &["-fly"], &["base"]),
    ]);
    let id = profile(&store, &[], &["muted"]);
    assert!(!store.has_effective_permission(&id, "fly"));
}

#[test]
fn test_decisions_are_deterministic() {
    let store = store(vec![
        group("a", &["x.*", "-x.y"], &[]),
        group("b", &["x.y"], &["a"]),
    ]);
    let id = profile(&store, &[], &["b", "a"]);
    let first: Vec<bool> = ["x.y", "x.z", "x"]
        .iter()
        .map(|p| store.has_effective_permission(&id, p))
        .collect();
    store.clear_cache();
    for _ in 0..3 {
        let again: Vec<bool> = ["x.y", "x.z", "x"]
            .iter()
            .map(|p| store.has_effective_permission(&id, p))
            .collect();
        assert_eq!(again, first);
    }
}
