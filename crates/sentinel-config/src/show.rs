use std::fmt::Write as _;
use std::str::FromStr;

use crate::error::{ConfigError, ConfigResult};
use crate::merge::{ConfigLayer, FieldSources};
use crate::types::Config;

/// Output format for [`ResolvedConfig::show`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ShowFormat {
    /// TOML, annotated with the layer that set each field.
    #[default]
    Toml,
    /// Pretty-printed JSON.
    Json,
}

impl FromStr for ShowFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "toml" => Ok(Self::Toml),
            "json" => Ok(Self::Json),
            other => Err(format!("unknown format '{other}'; expected toml or json")),
        }
    }
}

/// A fully loaded configuration together with where each value came from.
#[derive(Debug, Clone)]
pub struct ResolvedConfig {
    /// The merged, validated configuration.
    pub config: Config,
    /// Layer that last set each dotted field path.
    pub field_sources: FieldSources,
    /// Config files that were found and merged, in load order.
    pub loaded_files: Vec<String>,
}

impl ResolvedConfig {
    /// Wrap a configuration that did not come from layered loading.
    #[must_use]
    pub fn from_config(config: Config) -> Self {
        Self {
            config,
            field_sources: FieldSources::new(),
            loaded_files: Vec::new(),
        }
    }

    /// The layer that set `field` (e.g. `"cache.enabled"`), if tracked.
    #[must_use]
    pub fn source_of(&self, field: &str) -> Option<&ConfigLayer> {
        self.field_sources.get(field)
    }

    /// Render the configuration.
    ///
    /// The TOML form is prefixed with a comment block listing loaded files
    /// and every field not taken from the defaults.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::SerializeError`] if serialization fails.
    pub fn show(&self, format: ShowFormat) -> ConfigResult<String> {
        match format {
            ShowFormat::Json => serde_json::to_string_pretty(&self.config)
                .map_err(|e| ConfigError::SerializeError(e.to_string())),
            ShowFormat::Toml => {
                let body = toml::to_string_pretty(&self.config)
                    .map_err(|e| ConfigError::SerializeError(e.to_string()))?;
                Ok(format!("{}{body}", self.header()))
            },
        }
    }

    fn header(&self) -> String {
        let mut out = String::new();
        if self.loaded_files.is_empty() {
            out.push_str("# loaded files: none\n");
        } else {
            out.push_str("# loaded files:\n");
            for file in &self.loaded_files {
                let _ = writeln!(out, "#   {file}");
            }
        }

        let mut overridden: Vec<(&String, &ConfigLayer)> = self
            .field_sources
            .iter()
            .filter(|(_, layer)| **layer != ConfigLayer::Defaults)
            .collect();
        overridden.sort_by(|a, b| a.0.cmp(b.0));
        for (field, layer) in overridden {
            let _ = writeln!(out, "# {field} <- {layer}");
        }
        out.push('\n');
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_show_toml_round_trips() {
        let resolved = ResolvedConfig::from_config(Config::default());
        let rendered = resolved.show(ShowFormat::Toml).unwrap();
        assert!(rendered.starts_with("# loaded files: none"));
        let parsed: Config = toml::from_str(&rendered).unwrap();
        assert_eq!(parsed, Config::default());
    }

    #[test]
    fn test_show_lists_overridden_fields() {
        let mut resolved = ResolvedConfig::from_config(Config::default());
        resolved.loaded_files.push("/tmp/sentinel.toml".to_owned());
        resolved
            .field_sources
            .insert("cache.enabled".to_owned(), ConfigLayer::Environment);
        resolved
            .field_sources
            .insert("logging.level".to_owned(), ConfigLayer::Defaults);

        let rendered = resolved.show(ShowFormat::Toml).unwrap();
        assert!(rendered.contains("#   /tmp/sentinel.toml"));
        assert!(rendered.contains("# cache.enabled <- environment variable"));
        assert!(!rendered.contains("# logging.level"));
        assert_eq!(
            resolved.source_of("cache.enabled"),
            Some(&ConfigLayer::Environment)
        );
    }

    #[test]
    fn test_show_json() {
        let resolved = ResolvedConfig::from_config(Config::default());
        let rendered = resolved.show(ShowFormat::Json).unwrap();
        let value: serde_json::Value = serde_json::from_str(&rendered).unwrap();
        assert_eq!(value["permissions"]["precedence"], "specificity");
        assert_eq!(value["cache"]["max_decisions_per_profile"], 1024);
    }

    #[test]
    fn test_show_format_from_str() {
        assert_eq!("JSON".parse::<ShowFormat>().unwrap(), ShowFormat::Json);
        assert!("yaml".parse::<ShowFormat>().is_err());
    }
}
