//! Configuration files driving evaluation settings.

use std::fs;

use sentinel_config::{Config, ConfigError, ConfigLayer};
use sentinel_permissions::{
    CacheSettings, MissingGroupPolicy, PermissionDocument, PermissionError, PermissionSettings,
    PermissionStore, PrecedenceMode, ProfileId,
};

const DOCUMENT: &str = r#"
[[groups]]
id = "default"
permissions = ["chat.*"]

[[profiles]]
id = "0f8fad5b-d9cb-469f-a165-70867728950e"
name = "steve"
permissions = ["-chat.*", "chat.say"]
groups = ["default", "ghost"]
"#;

fn settings_from(config: &Config) -> PermissionSettings {
    PermissionSettings {
        precedence: config.permissions.precedence.parse::<PrecedenceMode>().unwrap(),
        max_inheritance_depth: config.permissions.max_inheritance_depth,
        max_visited_groups: config.permissions.max_visited_groups,
        missing_groups: config
            .permissions
            .missing_groups
            .parse::<MissingGroupPolicy>()
            .unwrap(),
        cache: CacheSettings {
            enabled: config.cache.enabled,
            max_decisions_per_profile: config.cache.max_decisions_per_profile,
        },
    }
}

fn store_from(config: &Config) -> (PermissionStore, ProfileId) {
    let path = config.store.document.as_ref().unwrap();
    let document = PermissionDocument::load(path).unwrap();
    let store = PermissionStore::new(settings_from(config));
    store.load_groups(document.parse_groups().unwrap()).unwrap();
    let profile = document.parse_profiles().unwrap().remove(0);
    let id = profile.id;
    store.load_profile(profile).unwrap();
    (store, id)
}

#[test]
fn test_config_file_points_at_document() {
    let dir = tempfile::tempdir().unwrap();
    let document = dir.path().join("permissions.toml");
    fs::write(&document, DOCUMENT).unwrap();

    let config_path = dir.path().join("sentinel.toml");
    fs::write(
        &config_path,
        format!(
            "[store]\ndocument = {:?}\n\n[cache]\nenabled = false\n",
            document.display().to_string()
        ),
    )
    .unwrap();

    let config = Config::load_file(&config_path).unwrap();
    assert_eq!(config.store.document.as_deref(), Some(document.as_path()));
    assert!(!config.cache.enabled);

    let (store, id) = store_from(&config);
    // Exact beats wildcard regardless of order.
    assert!(store.has_effective_permission(&id, "chat.say"));
    assert!(!store.has_effective_permission(&id, "chat.shout"));
    assert_eq!(store.cache_stats().hits, 0);
}

#[test]
fn test_precedence_and_missing_group_policy_from_config() {
    let dir = tempfile::tempdir().unwrap();
    let document = dir.path().join("permissions.toml");
    fs::write(&document, DOCUMENT).unwrap();

    let config_path = dir.path().join("sentinel.toml");
    fs::write(
        &config_path,
        format!(
            "[permissions]\nprecedence = \"source\"\nmissing_groups = \"deny\"\n\n[store]\ndocument = {:?}\n",
            document.display().to_string()
        ),
    )
    .unwrap();

    let config = Config::load_file(&config_path).unwrap();
    let (store, id) = store_from(&config);

    // The profile references a group that does not exist.
    assert!(!store.has_effective_permission(&id, "chat.say"));
    assert!(matches!(
        store.check(&id, "chat.say"),
        Err(PermissionError::UnknownGroup { .. })
    ));
}

#[test]
fn test_source_precedence_lets_profile_decide() {
    let dir = tempfile::tempdir().unwrap();
    let document = dir.path().join("permissions.toml");
    fs::write(&document, DOCUMENT).unwrap();

    let config_path = dir.path().join("sentinel.toml");
    fs::write(
        &config_path,
        format!(
            "[permissions]\nprecedence = \"source\"\n\n[store]\ndocument = {:?}\n",
            document.display().to_string()
        ),
    )
    .unwrap();

    let config = Config::load_file(&config_path).unwrap();
    let (store, id) = store_from(&config);

    // The profile's own `-chat.*` matches first, so the group grant never
    // gets a say.
    assert!(!store.has_effective_permission(&id, "chat.shout"));
    assert!(store.has_effective_permission(&id, "chat.say"));
}

#[test]
fn test_user_layer_is_recorded() {
    let home = tempfile::tempdir().unwrap();
    let user_dir = home.path().join(".sentinel");
    fs::create_dir_all(&user_dir).unwrap();
    fs::write(
        user_dir.join("config.toml"),
        "[permissions]\nmax_inheritance_depth = 4\n",
    )
    .unwrap();

    let resolved = Config::load_with_home(None, home.path()).unwrap();
    assert_eq!(resolved.config.permissions.max_inheritance_depth, 4);
    assert_eq!(
        resolved.source_of("permissions.max_inheritance_depth"),
        Some(&ConfigLayer::User)
    );
}

#[test]
fn test_invalid_settings_are_rejected_before_evaluation() {
    let dir = tempfile::tempdir().unwrap();
    let config_path = dir.path().join("sentinel.toml");
    fs::write(&config_path, "[permissions]\nprecedence = \"loudest\"\n").unwrap();

    assert!(matches!(
        Config::load_file(&config_path),
        Err(ConfigError::ValidationError { .. })
    ));
}
