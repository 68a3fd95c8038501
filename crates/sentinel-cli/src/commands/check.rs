//! `sentinel check <profile> <permission>`.

use anyhow::Result;
use sentinel_permissions::{Decision, PermissionError};
use serde_json::json;

use super::{CliContext, load_profile};
use crate::formatter::print_json;
use crate::theme::Theme;

/// Evaluate one permission. Returns whether it was allowed.
///
/// Malformed queries and broken inheritance are reported as a deny with a
/// reason rather than as command failures.
pub(crate) async fn run_check(ctx: &CliContext, profile: &str, permission: &str) -> Result<bool> {
    let document = ctx.load_document()?;
    let service = ctx.open_service(document.clone()).await?;
    let profile_id = load_profile(&service, &document, profile).await?;

    let (decision, reason) = match service.check(&profile_id, permission) {
        Ok(decision) => (Some(decision), None),
        Err(e @ PermissionError::InvalidPermissionFormat { .. }) => (None, Some(e.to_string())),
        Err(e) if e.is_inheritance_fault() => (None, Some(e.to_string())),
        Err(e) => return Err(e.into()),
    };
    let allowed = decision.as_ref().is_some_and(|d| d.allowed);

    if ctx.format.is_json() {
        print_json(&json!({
            "profile": profile_id,
            "permission": permission,
            "allowed": allowed,
            "matched": decision.as_ref().and_then(|d| d.matched.as_ref()),
            "reason": reason,
        }))?;
    } else {
        print_pretty(permission, decision.as_ref(), reason.as_deref());
    }
    Ok(allowed)
}

fn print_pretty(permission: &str, decision: Option<&Decision>, reason: Option<&str>) {
    match (decision, reason) {
        (Some(decision), _) => {
            println!("{} {}", Theme::verdict(decision.allowed), decision.permission);
            match &decision.matched {
                Some(entry) => {
                    println!("{}", Theme::kv("matched", &Theme::node(&entry.node.to_string())));
                    println!("{}", Theme::kv("source", &Theme::source(&entry.source)));
                },
                None => println!("{}", Theme::dimmed("  no matching node")),
            }
        },
        (None, reason) => {
            println!("{} {permission}", Theme::verdict(false));
            println!("{}", Theme::kv("reason", reason.unwrap_or("unknown")));
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::formatter::OutputFormat;
    use sentinel_config::{Config, ResolvedConfig};
    use std::io::Write;

    const DOCUMENT: &str = r#"
        [[groups]]
        id = "default"
        permissions = ["build", "move"]

        [[groups]]
        id = "loop"
        inherits = ["loop"]

        [[profiles]]
        id = "0f8fad5b-d9cb-469f-a165-70867728950e"
        name = "steve"
        permissions = ["-build", "chat.*"]
        groups = ["default"]

        [[profiles]]
        id = "7c9e6679-7425-40de-944b-e07fc1f90ae7"
        name = "alex"
        groups = ["loop"]
    "#;

    fn context_for(file: &tempfile::NamedTempFile) -> CliContext {
        CliContext {
            resolved: ResolvedConfig::from_config(Config::default()),
            document: Some(file.path().to_path_buf()),
            format: OutputFormat::Json,
        }
    }

    fn document_file() -> tempfile::NamedTempFile {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        file.write_all(DOCUMENT.as_bytes()).unwrap();
        file
    }

    #[tokio::test]
    async fn test_check_reports_allow_and_deny() {
        let file = document_file();
        let ctx = context_for(&file);
        assert!(run_check(&ctx, "steve", "move").await.unwrap());
        assert!(run_check(&ctx, "steve", "chat.say").await.unwrap());
        assert!(!run_check(&ctx, "steve", "build").await.unwrap());
    }

    #[tokio::test]
    async fn test_faults_deny_instead_of_failing() {
        let file = document_file();
        let ctx = context_for(&file);
        assert!(!run_check(&ctx, "steve", "a..b").await.unwrap());
        assert!(!run_check(&ctx, "alex", "move").await.unwrap());
    }

    #[tokio::test]
    async fn test_unknown_profile_is_an_error() {
        let file = document_file();
        let ctx = context_for(&file);
        assert!(run_check(&ctx, "herobrine", "move").await.is_err());
    }
}
