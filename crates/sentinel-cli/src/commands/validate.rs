//! `sentinel validate`.

use std::collections::HashSet;

use anyhow::Result;
use sentinel_permissions::{
    Group, GroupGraph, MissingGroupPolicy, PermissionDocument, PermissionSettings, Profile,
};
use serde::Serialize;

use super::CliContext;
use crate::formatter::print_json;
use crate::theme::Theme;

/// Problems found in a permission document.
#[derive(Debug, Default, Serialize)]
pub(crate) struct ValidationReport {
    pub(crate) groups: usize,
    pub(crate) profiles: usize,
    pub(crate) errors: Vec<String>,
    pub(crate) warnings: Vec<String>,
}

impl ValidationReport {
    pub(crate) fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }
}

/// Check every record in a document.
///
/// Errors: unparsable nodes, duplicate group ids, unknown parents and
/// inheritance cycles. Memberships in unknown groups are warnings unless
/// the missing-group policy is `deny`.
pub(crate) fn validate_document(
    document: &PermissionDocument,
    settings: &PermissionSettings,
) -> ValidationReport {
    let mut report = ValidationReport {
        groups: document.groups.len(),
        profiles: document.profiles.len(),
        ..ValidationReport::default()
    };

    let mut seen = HashSet::new();
    let mut graph = GroupGraph::new();
    for record in &document.groups {
        match Group::from_record(record) {
            Ok(group) => {
                if !seen.insert(group.id.clone()) {
                    report.errors.push(format!("group '{}' is defined more than once", group.id));
                }
                graph.insert(group);
            },
            Err(e) => report.errors.push(format!("group '{}': {e}", record.id)),
        }
    }
    report
        .errors
        .extend(graph.validate().into_iter().map(|e| e.to_string()));

    for record in &document.profiles {
        let label = record.name.clone().unwrap_or_else(|| record.id.to_string());
        let profile = match Profile::from_record(record) {
            Ok(profile) => profile,
            Err(e) => {
                report.errors.push(format!("profile '{label}': {e}"));
                continue;
            },
        };
        for group in profile.groups.iter().filter(|g| !graph.contains(g)) {
            let message = format!("profile '{label}' belongs to unknown group '{group}'");
            match settings.missing_groups {
                MissingGroupPolicy::Skip => report.warnings.push(message),
                MissingGroupPolicy::Deny => report.errors.push(message),
            }
        }
    }

    report
}

/// Validate the configured document. Returns whether it is valid.
pub(crate) fn run_validate(ctx: &CliContext) -> Result<bool> {
    let document = ctx.load_document()?;
    let report = validate_document(&document, &ctx.settings());

    if ctx.format.is_json() {
        print_json(&serde_json::json!({
            "document": ctx.document_path()?.display().to_string(),
            "valid": report.is_valid(),
            "report": &report,
        }))?;
        return Ok(report.is_valid());
    }

    for warning in &report.warnings {
        println!("{}", Theme::warning(warning));
    }
    for error in &report.errors {
        println!("{}", Theme::error(error));
    }
    let summary = format!("{} groups, {} profiles", report.groups, report.profiles);
    if report.is_valid() {
        println!("{}", Theme::success(&format!("Document is valid ({summary})")));
    } else {
        println!(
            "{}",
            Theme::error(&format!("{} problem(s) found ({summary})", report.errors.len()))
        );
    }
    Ok(report.is_valid())
}
