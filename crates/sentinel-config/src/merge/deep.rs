use super::{ConfigLayer, FieldSources};

/// Fold one layer's TOML tree into the accumulated configuration.
///
/// Tables merge key by key, so `[permissions] max_inheritance_depth = 4` in
/// the user file leaves `permissions.precedence` from lower layers intact.
/// Any other value replaces what it lands on; arrays such as
/// `logging.directives` are not concatenated. Every leaf the layer writes is
/// attributed to `layer` in `sources` under its dotted path.
pub fn merge_layer(
    merged: &mut toml::Value,
    layer_value: &toml::Value,
    layer: &ConfigLayer,
    sources: &mut FieldSources,
) {
    let mut path = Vec::new();
    merge_at(merged, layer_value, &mut path, layer, sources);
}

/// Attribute every leaf of `value` to `layer`.
///
/// Used for the embedded defaults, which seed the merge rather than overlay
/// it.
pub fn attribute_leaves(value: &toml::Value, layer: &ConfigLayer, sources: &mut FieldSources) {
    let mut path = Vec::new();
    attribute(value, &mut path, layer, sources);
}

fn merge_at<'a>(
    target: &mut toml::Value,
    incoming: &'a toml::Value,
    path: &mut Vec<&'a str>,
    layer: &ConfigLayer,
    sources: &mut FieldSources,
) {
    match (target, incoming) {
        (toml::Value::Table(existing), toml::Value::Table(table)) => {
            for (key, value) in table {
                path.push(key);
                if let Some(slot) = existing.get_mut(key) {
                    merge_at(slot, value, path, layer, sources);
                } else {
                    existing.insert(key.clone(), value.clone());
                    attribute(value, path, layer, sources);
                }
                path.pop();
            }
        },
        (target, incoming) => {
            *target = incoming.clone();
            attribute(incoming, path, layer, sources);
        },
    }
}

fn attribute<'a>(
    value: &'a toml::Value,
    path: &mut Vec<&'a str>,
    layer: &ConfigLayer,
    sources: &mut FieldSources,
) {
    if let toml::Value::Table(table) = value {
        for (key, child) in table {
            path.push(key);
            attribute(child, path, layer, sources);
            path.pop();
        }
    } else if !path.is_empty() {
        sources.insert(path.join("."), layer.clone());
    }
}
