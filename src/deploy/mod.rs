/// Deployment layer
///
/// Thin adapter between the edit plans and the remote engine: fetch the
/// document, back it up, apply one plan, push, activate. The plans
/// themselves are pure and separately testable.

// Embedded script payload renderers
pub mod payload;

// The edit plans (resilience rollout, persistence rewire, refresh, probe)
pub mod rollout;

pub use rollout::{
    apply_persistence_rewire, apply_resilience_rollout, install_sandbox_probe,
    refresh_send_payload,
};

use crate::engine::{write_backup, EngineClient};
use crate::graph::GraphDocument;
use anyhow::Result;
use std::path::PathBuf;

/// Fetch → backup → edit → push → activate
pub struct Deployer {
    client: EngineClient,
    workflow_id: String,
    /// Backups land here before any edit; None disables them
    backup_dir: Option<PathBuf>,
}

impl Deployer {
    pub fn new(
        client: EngineClient,
        workflow_id: impl Into<String>,
        backup_dir: Option<PathBuf>,
    ) -> Self {
        Self {
            client,
            workflow_id: workflow_id.into(),
            backup_dir,
        }
    }

    /// Run one edit plan end to end and return the engine's updated document
    pub async fn run_edit<F>(&self, edit: F) -> Result<GraphDocument>
    where
        F: FnOnce(&mut GraphDocument) -> Result<()>,
    {
        let mut document = self.client.fetch_workflow(&self.workflow_id).await?;

        if let Some(dir) = &self.backup_dir {
            let path = write_backup(&document, dir)?;
            tracing::info!("💾 Backup written to {}", path.display());
        }

        edit(&mut document)?;

        let updated = self
            .client
            .update_workflow(&self.workflow_id, &document)
            .await?;
        self.client.activate_workflow(&self.workflow_id).await?;

        tracing::info!(
            "🎉 Deployment complete: {} ({} nodes)",
            updated.name,
            updated.nodes.len()
        );
        Ok(updated)
    }

    /// Fetch the current document and back it up, nothing else
    pub async fn backup_only(&self, dir: &std::path::Path) -> Result<PathBuf> {
        let document = self.client.fetch_workflow(&self.workflow_id).await?;
        let path = write_backup(&document, dir)?;
        tracing::info!("💾 Backup written to {}", path.display());
        Ok(path)
    }
}
