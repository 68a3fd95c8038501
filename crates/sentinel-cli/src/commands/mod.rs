//! Subcommand implementations and the state they share.

pub(crate) mod check;
pub(crate) mod config;
pub(crate) mod effective;
pub(crate) mod groups;
pub(crate) mod validate;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context as _, Result};
use sentinel_config::ResolvedConfig;
use sentinel_permissions::{PermissionDocument, PermissionService, PermissionSettings, ProfileId};

use crate::config_bridge;
use crate::formatter::OutputFormat;

/// Everything a subcommand needs from the command line and configuration.
pub(crate) struct CliContext {
    /// Loaded configuration.
    pub(crate) resolved: ResolvedConfig,
    /// `--document` override.
    pub(crate) document: Option<PathBuf>,
    /// `--format`.
    pub(crate) format: OutputFormat,
}

impl CliContext {
    /// Settings derived from the loaded configuration.
    pub(crate) fn settings(&self) -> PermissionSettings {
        config_bridge::to_permission_settings(&self.resolved.config)
    }

    /// The permission document to read: `--document`, else `store.document`.
    pub(crate) fn document_path(&self) -> Result<&Path> {
        self.document
            .as_deref()
            .or(self.resolved.config.store.document.as_deref())
            .context("no permission document; pass --document or set store.document")
    }

    /// Read and parse the permission document.
    pub(crate) fn load_document(&self) -> Result<PermissionDocument> {
        let path = self.document_path()?;
        PermissionDocument::load(path)
            .with_context(|| format!("failed to load permission document {}", path.display()))
    }

    /// Build a service over the document with every group loaded.
    pub(crate) async fn open_service(&self, document: PermissionDocument) -> Result<PermissionService> {
        let service = PermissionService::new(Arc::new(document.into_backend()), self.settings());
        let count = service
            .load_groups()
            .await
            .context("failed to load groups")?;
        tracing::debug!(groups = count, "Loaded groups");
        Ok(service)
    }
}

/// Resolve `key` (UUID or name) against the document and load that profile.
pub(crate) async fn load_profile(
    service: &PermissionService,
    document: &PermissionDocument,
    key: &str,
) -> Result<ProfileId> {
    let record = document
        .find_profile(key)
        .with_context(|| format!("no profile named or identified by '{key}'"))?;
    let id = record.id;
    service
        .load_profile(&id)
        .await
        .with_context(|| format!("failed to load profile {key}"))?;
    Ok(id)
}
