//! Sentinel CLI - inspect and test permission documents.
//!
//! Loads a permission document (TOML or JSON) into an in-memory store and
//! answers questions about it: whether a profile holds a permission, what
//! its effective set is, and whether the document is consistent.

#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]
#![deny(clippy::unwrap_used)]
#![cfg_attr(test, allow(clippy::unwrap_used))]

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context as _, Result};
use clap::{ArgAction, Parser, Subcommand};

mod commands;
pub mod config_bridge;
mod formatter;
mod theme;

use commands::{CliContext, check, config, effective, groups, validate};
use formatter::OutputFormat;
use theme::Theme;

/// Sentinel - hierarchical permission checks
#[derive(Parser)]
#[command(name = "sentinel")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Enable verbose output (repeat for more)
    #[arg(short, long, global = true, action = ArgAction::Count)]
    verbose: u8,

    /// Output format
    #[arg(long, global = true, value_enum, default_value_t = OutputFormat::Pretty)]
    format: OutputFormat,

    /// Path to a configuration file, merged over system and user config
    #[arg(short, long, global = true, env = "SENTINEL_CONFIG")]
    config: Option<PathBuf>,

    /// Permission document to read (overrides `store.document`)
    #[arg(short, long, global = true)]
    document: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Check whether a profile holds a permission (exit code 1 on deny)
    #[command(alias = "explain")]
    Check {
        /// Profile UUID or name
        profile: String,
        /// Permission to check, e.g. `chat.say`
        permission: String,
    },

    /// Print a profile's effective permissions in precedence order
    Effective {
        /// Profile UUID or name
        profile: String,
    },

    /// List groups by weight
    Groups,

    /// Check every node, parent reference and the inheritance graph
    Validate,

    /// View configuration
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },
}

#[derive(Subcommand)]
enum ConfigCommands {
    /// Print the resolved configuration
    Show,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    match run(cli).await {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::from(1),
        Err(e) => {
            eprintln!("{}", Theme::error(&format!("{e:#}")));
            ExitCode::from(2)
        },
    }
}

/// Run the selected command. `Ok(false)` means a deny or an invalid document.
async fn run(cli: Cli) -> Result<bool> {
    let resolved = sentinel_config::Config::load(cli.config.as_deref())
        .context("failed to load configuration")?;

    // Set up logging from config, with -v overriding the level.
    let mut log_config = config_bridge::to_log_config(&resolved.config);
    if cli.verbose > 0 {
        log_config.level = sentinel_telemetry::LogConfig::from_verbosity(cli.verbose).level;
    }
    if let Err(e) = sentinel_telemetry::setup_logging(&log_config) {
        eprintln!("Failed to initialize logging: {e}");
    }
    tracing::debug!(files = ?resolved.loaded_files, "Configuration loaded");

    let ctx = CliContext {
        resolved,
        document: cli.document,
        format: cli.format,
    };

    match cli.command {
        Commands::Check {
            profile,
            permission,
        } => check::run_check(&ctx, &profile, &permission).await,
        Commands::Effective { profile } => {
            effective::run_effective(&ctx, &profile).await?;
            Ok(true)
        },
        Commands::Groups => {
            groups::list_groups(&ctx).await?;
            Ok(true)
        },
        Commands::Validate => validate::run_validate(&ctx),
        Commands::Config {
            command: ConfigCommands::Show,
        } => {
            config::show_config(&ctx.resolved, ctx.format)?;
            Ok(true)
        },
    }
}
