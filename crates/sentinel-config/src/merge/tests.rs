use super::*;

fn value(body: &str) -> toml::Value {
    toml::from_str(body).unwrap()
}

fn merged(base: &str, layer_body: &str, layer: &ConfigLayer) -> (toml::Value, FieldSources) {
    let mut base = value(base);
    let mut sources = FieldSources::new();
    merge_layer(&mut base, &value(layer_body), layer, &mut sources);
    (base, sources)
}

#[test]
fn test_scalars_replace_and_siblings_survive() {
    let (config, sources) = merged(
        r#"
        [permissions]
        precedence = "specificity"
        max_inheritance_depth = 16
        "#,
        "[permissions]\nmax_inheritance_depth = 4\n",
        &ConfigLayer::User,
    );

    assert_eq!(config["permissions"]["precedence"].as_str(), Some("specificity"));
    assert_eq!(config["permissions"]["max_inheritance_depth"].as_integer(), Some(4));
    assert_eq!(
        sources.get("permissions.max_inheritance_depth"),
        Some(&ConfigLayer::User)
    );
    assert!(!sources.contains_key("permissions.precedence"));
}

#[test]
fn test_new_tables_are_attributed_leaf_by_leaf() {
    let (config, sources) = merged(
        "[cache]\nenabled = true\n",
        r#"
        [permissions]
        missing_groups = "deny"

        [store]
        document = "perms.toml"
        "#,
        &ConfigLayer::Explicit,
    );

    assert_eq!(config["store"]["document"].as_str(), Some("perms.toml"));
    assert_eq!(sources.get("store.document"), Some(&ConfigLayer::Explicit));
    assert_eq!(
        sources.get("permissions.missing_groups"),
        Some(&ConfigLayer::Explicit)
    );
    assert!(!sources.contains_key("store"));
}

#[test]
fn test_arrays_replace_rather_than_append() {
    let (config, sources) = merged(
        "[logging]\ndirectives = [\"sentinel_permissions=debug\"]\n",
        "[logging]\ndirectives = [\"sentinel_cli=trace\"]\n",
        &ConfigLayer::System,
    );

    let directives = config["logging"]["directives"].as_array().unwrap();
    assert_eq!(directives.len(), 1);
    assert_eq!(directives[0].as_str(), Some("sentinel_cli=trace"));
    assert_eq!(sources.get("logging.directives"), Some(&ConfigLayer::System));
}

#[test]
fn test_table_over_scalar_attributes_every_leaf() {
    let (config, sources) = merged(
        "store = \"perms.toml\"\n",
        "[store]\ndocument = \"perms.json\"\n",
        &ConfigLayer::User,
    );

    assert_eq!(config["store"]["document"].as_str(), Some("perms.json"));
    assert_eq!(sources.get("store.document"), Some(&ConfigLayer::User));
}

#[test]
fn test_attribute_leaves_skips_tables() {
    let mut sources = FieldSources::new();
    attribute_leaves(
        &value("[cache]\nenabled = true\nmax_decisions_per_profile = 8\n"),
        &ConfigLayer::Defaults,
        &mut sources,
    );
    assert_eq!(sources.len(), 2);
    assert_eq!(sources.get("cache.enabled"), Some(&ConfigLayer::Defaults));
}

#[test]
fn test_layer_display() {
    assert_eq!(ConfigLayer::Defaults.to_string(), "defaults");
    assert_eq!(
        ConfigLayer::User.to_string(),
        "user (~/.sentinel/config.toml)"
    );
}
