//! `sentinel effective <profile>`.

use anyhow::Result;
use colored::Colorize;
use serde_json::json;

use super::{CliContext, load_profile};
use crate::formatter::print_json;
use crate::theme::Theme;

/// Print a profile's effective set in precedence order.
pub(crate) async fn run_effective(ctx: &CliContext, profile: &str) -> Result<()> {
    let document = ctx.load_document()?;
    let service = ctx.open_service(document.clone()).await?;
    let profile_id = load_profile(&service, &document, profile).await?;

    let effective = service.effective_permissions(&profile_id)?;
    let primary = service.store().primary_group(&profile_id);

    if ctx.format.is_json() {
        return print_json(&json!({
            "profile": profile_id,
            "primary_group": primary.as_ref().map(|g| g.id.as_str()),
            "prefix": primary.as_ref().map(|g| g.prefix.as_str()),
            "entries": &*effective,
        }));
    }

    println!("\n{}", Theme::header(&format!("Effective permissions for {profile}")));
    if let Some(group) = &primary {
        let prefix = if group.prefix.is_empty() {
            String::new()
        } else {
            format!(" {}", group.prefix.dimmed())
        };
        println!("{}", Theme::kv("primary", &format!("{}{prefix}", group.display_name)));
    }
    println!("{}", Theme::separator());

    if effective.is_empty() {
        println!("{}", Theme::info("No permissions"));
    }
    for (rank, entry) in effective.iter().enumerate() {
        println!(
            "{:>4}  {:<32} {}",
            rank.saturating_add(1).to_string().dimmed(),
            Theme::node(&entry.node.to_string()),
            Theme::source(&entry.source)
        );
    }
    println!();
    Ok(())
}
