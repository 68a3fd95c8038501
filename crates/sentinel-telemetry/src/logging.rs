//! Logging configuration and setup.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{
    EnvFilter, Layer, Registry,
    fmt::{self, MakeWriter},
    layer::SubscriberExt,
    util::SubscriberInitExt,
};

use crate::error::{TelemetryError, TelemetryResult};

/// Target that permission diagnostics (cycles, depth overflows) log to.
pub const DIAGNOSTICS_DIRECTIVE_TARGET: &str = "sentinel::diagnostics";

type BoxedLayer = Box<dyn Layer<Registry> + Send + Sync + 'static>;

/// File rotation strategy.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FileRotation {
    /// Rotate daily.
    #[default]
    Daily,
    /// Rotate hourly.
    Hourly,
    /// Never rotate.
    Never,
}

impl From<FileRotation> for Rotation {
    fn from(rotation: FileRotation) -> Self {
        match rotation {
            FileRotation::Daily => Rotation::DAILY,
            FileRotation::Hourly => Rotation::HOURLY,
            FileRotation::Never => Rotation::NEVER,
        }
    }
}

impl std::str::FromStr for FileRotation {
    type Err = TelemetryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "daily" => Ok(Self::Daily),
            "hourly" => Ok(Self::Hourly),
            "never" => Ok(Self::Never),
            other => Err(TelemetryError::ConfigError(format!(
                "unknown file rotation '{other}'"
            ))),
        }
    }
}

/// Log format options.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Human-readable multi-line format.
    Pretty,
    /// Compact single-line format (default).
    #[default]
    Compact,
    /// JSON format for structured logging.
    Json,
    /// Full single-line format with all fields.
    Full,
}

impl std::str::FromStr for LogFormat {
    type Err = TelemetryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "pretty" => Ok(Self::Pretty),
            "compact" => Ok(Self::Compact),
            "json" => Ok(Self::Json),
            "full" => Ok(Self::Full),
            other => Err(TelemetryError::ConfigError(format!(
                "unknown log format '{other}'"
            ))),
        }
    }
}

/// Log output target.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogTarget {
    /// Log to stdout.
    Stdout,
    /// Log to stderr. Keeps stdout free for command output.
    #[default]
    Stderr,
    /// Log to rotating files in this directory.
    File(PathBuf),
}

/// File logging configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileLogConfig {
    /// File name prefix (e.g., "sentinel" produces "sentinel.2026-01-15").
    #[serde(default = "default_file_prefix")]
    pub prefix: String,
    /// Rotation strategy.
    #[serde(default)]
    pub rotation: FileRotation,
}

fn default_file_prefix() -> String {
    "sentinel".to_string()
}

impl Default for FileLogConfig {
    fn default() -> Self {
        Self {
            prefix: default_file_prefix(),
            rotation: FileRotation::default(),
        }
    }
}

/// Logging configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[allow(clippy::struct_excessive_bools)]
pub struct LogConfig {
    /// Log level filter (e.g., "info", "debug", "trace").
    #[serde(default = "default_level")]
    pub level: String,
    /// Log format.
    #[serde(default)]
    pub format: LogFormat,
    /// Log target.
    #[serde(default)]
    pub target: LogTarget,
    /// File logging configuration (used when target is File).
    #[serde(default)]
    pub file: FileLogConfig,
    /// Whether to include timestamps.
    #[serde(default = "default_true")]
    pub timestamps: bool,
    /// Whether to include file/line info.
    #[serde(default)]
    pub file_info: bool,
    /// Whether to include thread IDs.
    #[serde(default)]
    pub thread_ids: bool,
    /// Whether to use ANSI colors.
    #[serde(default = "default_true")]
    pub ansi: bool,
    /// Whether inheritance diagnostics are emitted regardless of `level`.
    #[serde(default = "default_true")]
    pub diagnostics: bool,
    /// Directive overrides (e.g., `sentinel_permissions=debug`).
    #[serde(default)]
    pub directives: Vec<String>,
}

fn default_level() -> String {
    "warn".to_string()
}

fn default_true() -> bool {
    true
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: default_level(),
            format: LogFormat::default(),
            target: LogTarget::default(),
            file: FileLogConfig::default(),
            timestamps: true,
            file_info: false,
            thread_ids: false,
            ansi: true,
            diagnostics: true,
            directives: Vec::new(),
        }
    }
}

impl LogConfig {
    /// Create a new log config with the specified level.
    #[must_use]
    pub fn new(level: impl Into<String>) -> Self {
        Self {
            level: level.into(),
            ..Default::default()
        }
    }

    /// Map a `-v` count to a level: none is `warn`, then `info`, `debug`
    /// and `trace`.
    #[must_use]
    pub fn from_verbosity(verbose: u8) -> Self {
        let level = match verbose {
            0 => "warn",
            1 => "info",
            2 => "debug",
            _ => "trace",
        };
        Self::new(level)
    }

    /// Set the log level.
    #[must_use]
    pub fn with_level(mut self, level: impl Into<String>) -> Self {
        self.level = level.into();
        self
    }

    /// Set the log format.
    #[must_use]
    pub fn with_format(mut self, format: LogFormat) -> Self {
        self.format = format;
        self
    }

    /// Set the log target.
    #[must_use]
    pub fn with_target(mut self, target: LogTarget) -> Self {
        self.target = target;
        self
    }

    /// Log to rotating files under `directory`.
    #[must_use]
    pub fn with_file_logging(
        mut self,
        directory: impl Into<PathBuf>,
        prefix: impl Into<String>,
        rotation: FileRotation,
    ) -> Self {
        self.target = LogTarget::File(directory.into());
        self.file.prefix = prefix.into();
        self.file.rotation = rotation;
        // Disable ANSI colors for file output
        self.ansi = false;
        self
    }

    /// Add a directive override.
    #[must_use]
    pub fn with_directive(mut self, directive: impl Into<String>) -> Self {
        self.directives.push(directive.into());
        self
    }

    /// Add several directive overrides.
    #[must_use]
    pub fn with_directives<I, S>(mut self, directives: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.directives.extend(directives.into_iter().map(Into::into));
        self
    }

    /// Silence inheritance diagnostics.
    #[must_use]
    pub fn without_diagnostics(mut self) -> Self {
        self.diagnostics = false;
        self
    }

    /// Disable timestamps.
    #[must_use]
    pub fn without_timestamps(mut self) -> Self {
        self.timestamps = false;
        self
    }

    /// Enable file/line info.
    #[must_use]
    pub fn with_file_info(mut self) -> Self {
        self.file_info = true;
        self
    }

    /// Disable ANSI colors.
    #[must_use]
    pub fn without_ansi(mut self) -> Self {
        self.ansi = false;
        self
    }

    /// Build the env filter from config.
    ///
    /// Diagnostics are pinned to `error` (or `off`) before user directives,
    /// so a directive naming the target still wins.
    fn build_filter(&self) -> TelemetryResult<EnvFilter> {
        let mut filter = EnvFilter::try_new(&self.level)
            .map_err(|e| TelemetryError::ConfigError(e.to_string()))?;

        let diagnostics = if self.diagnostics { "error" } else { "off" };
        let pinned = format!("{DIAGNOSTICS_DIRECTIVE_TARGET}={diagnostics}");

        let directives =
            std::iter::once(pinned.as_str()).chain(self.directives.iter().map(String::as_str));
        for directive in directives {
            filter = filter.add_directive(directive.parse().map_err(
                |e: tracing_subscriber::filter::ParseError| {
                    TelemetryError::ConfigError(format!("directive '{directive}': {e}"))
                },
            )?);
        }

        Ok(filter)
    }

    fn fmt_layer<W>(&self, writer: W) -> BoxedLayer
    where
        W: for<'a> MakeWriter<'a> + Send + Sync + 'static,
    {
        let base = fmt::layer()
            .with_writer(writer)
            .with_ansi(self.ansi)
            .with_file(self.file_info)
            .with_line_number(self.file_info)
            .with_thread_ids(self.thread_ids);

        match (self.format, self.timestamps) {
            (LogFormat::Json, true) => base.json().boxed(),
            (LogFormat::Json, false) => base.json().without_time().boxed(),
            (LogFormat::Pretty, true) => base.pretty().boxed(),
            (LogFormat::Pretty, false) => base.pretty().without_time().boxed(),
            (LogFormat::Compact, true) => base.compact().boxed(),
            (LogFormat::Compact, false) => base.compact().without_time().boxed(),
            (LogFormat::Full, true) => base.boxed(),
            (LogFormat::Full, false) => base.without_time().boxed(),
        }
    }
}

/// Set up logging with the given configuration.
///
/// # Errors
///
/// Returns an error if the configuration is invalid, the log directory
/// cannot be created, or a global subscriber is already installed.
pub fn setup_logging(config: &LogConfig) -> TelemetryResult<()> {
    let filter = config.build_filter()?;

    let layer = match &config.target {
        LogTarget::Stdout => config.fmt_layer(std::io::stdout),
        LogTarget::Stderr => config.fmt_layer(std::io::stderr),
        LogTarget::File(dir) => {
            std::fs::create_dir_all(dir).map_err(|e| {
                TelemetryError::ConfigError(format!("failed to create log directory: {e}"))
            })?;
            let appender =
                RollingFileAppender::new(config.file.rotation.into(), dir, &config.file.prefix);
            config.fmt_layer(appender)
        },
    };

    tracing_subscriber::registry()
        .with(layer.with_filter(filter))
        .try_init()
        .map_err(|e| TelemetryError::InitError(e.to_string()))
}

/// Set up default logging (warn level, stderr, compact format).
///
/// # Errors
///
/// Returns an error if logging cannot be initialized.
pub fn setup_default_logging() -> TelemetryResult<()> {
    setup_logging(&LogConfig::default())
}
