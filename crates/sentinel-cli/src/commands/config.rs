//! `sentinel config show`.

use anyhow::{Context as _, Result};
use sentinel_config::{ResolvedConfig, ShowFormat};

use crate::formatter::OutputFormat;

/// Print the resolved configuration: annotated TOML, or JSON with `--format json`.
pub(crate) fn show_config(resolved: &ResolvedConfig, format: OutputFormat) -> Result<()> {
    let show = match format {
        OutputFormat::Pretty => ShowFormat::Toml,
        OutputFormat::Json => ShowFormat::Json,
    };
    let rendered = resolved
        .show(show)
        .context("failed to render configuration")?;
    println!("{rendered}");
    Ok(())
}
