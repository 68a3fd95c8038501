//! `sentinel groups`.

use anyhow::Result;
use colored::Colorize;
use sentinel_permissions::GroupId;
use serde_json::json;

use super::CliContext;
use crate::formatter::print_json;
use crate::theme::Theme;

/// List groups by weight, heaviest first.
pub(crate) async fn list_groups(ctx: &CliContext) -> Result<()> {
    let document = ctx.load_document()?;
    let service = ctx.open_service(document).await?;

    let mut groups = service.store().groups();
    groups.sort_by(|a, b| b.weight.cmp(&a.weight).then_with(|| a.id.cmp(&b.id)));

    if ctx.format.is_json() {
        let rows: Vec<_> = groups
            .iter()
            .map(|g| {
                json!({
                    "id": g.id.as_str(),
                    "name": g.display_name,
                    "weight": g.weight,
                    "prefix": g.prefix,
                    "inherits": g.parents.iter().map(GroupId::as_str).collect::<Vec<_>>(),
                    "permissions": g.permissions.to_records(),
                })
            })
            .collect();
        return print_json(&rows);
    }

    if groups.is_empty() {
        println!("{}", Theme::info("No groups defined"));
        return Ok(());
    }

    println!("\n{}", Theme::header("Groups"));
    println!(
        "{:>6} {:<16} {:>6} {}",
        "WEIGHT".dimmed(),
        "GROUP".dimmed(),
        "NODES".dimmed(),
        "INHERITS".dimmed()
    );
    println!("{}", Theme::separator());
    for group in &groups {
        let parents: Vec<&str> = group.parents.iter().map(GroupId::as_str).collect();
        println!(
            "{:>6} {:<16} {:>6} {}",
            group.weight,
            group.id.as_str().bold(),
            group.permissions.len(),
            Theme::dimmed(&parents.join(", "))
        );
    }
    println!();
    Ok(())
}
