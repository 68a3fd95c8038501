use thiserror::Error;

/// Errors raised while loading or validating configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A config file exists but could not be read.
    #[error("failed to read config file {path}: {source}")]
    ReadError {
        /// File that failed.
        path: String,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// A config file (or the merged tree) is not valid TOML for [`Config`](crate::Config).
    #[error("failed to parse config {path}: {source}")]
    ParseError {
        /// File or pseudo-path (`<embedded defaults>`, `<merged config>`).
        path: String,
        /// Underlying TOML error.
        #[source]
        source: toml::de::Error,
    },

    /// A value parsed but is out of range or inconsistent.
    #[error("invalid config value for {field}: {message}")]
    ValidationError {
        /// Dotted field path, e.g. `permissions.max_inheritance_depth`.
        field: String,
        /// What is wrong with it.
        message: String,
    },

    /// The user's home directory could not be determined.
    #[error("could not determine home directory")]
    NoHomeDir,

    /// The resolved configuration could not be rendered.
    #[error("failed to serialize config: {0}")]
    SerializeError(String),
}

/// Result type for configuration operations.
pub type ConfigResult<T> = Result<T, ConfigError>;
