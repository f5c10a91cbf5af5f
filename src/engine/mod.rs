/// Remote engine REST client
///
/// Thin client over the engine's workflow API: fetch, full-document update,
/// and activation. The update body is restricted to the fields the PUT
/// accepts, and every push is structurally validated first.

use crate::config::EngineConfig;
use crate::graph::{validate, GraphDocument};
use anyhow::{bail, Context, Result};
use std::path::{Path, PathBuf};

/// Header the engine authenticates API calls with
const API_KEY_HEADER: &str = "X-N8N-API-KEY";

#[derive(Debug, Clone)]
pub struct EngineClient {
    http: reqwest::Client,
    base_url: String,
    api_key: String,
}

impl EngineClient {
    pub fn new(config: &EngineConfig) -> Result<Self> {
        Ok(Self {
            http: reqwest::Client::builder().build()?,
            base_url: config.api_url.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone(),
        })
    }

    /// GET /workflows/{id}
    pub async fn fetch_workflow(&self, id: &str) -> Result<GraphDocument> {
        let url = format!("{}/workflows/{}", self.base_url, id);
        tracing::info!("📥 Fetching workflow {}", id);

        let response = self
            .http
            .get(&url)
            .header(API_KEY_HEADER, &self.api_key)
            .send()
            .await
            .with_context(|| format!("GET {} failed", url))?;

        let status = response.status();
        if !status.is_success() {
            bail!("Failed to fetch workflow {}: HTTP {}", id, status.as_u16());
        }

        let document: GraphDocument = response
            .json()
            .await
            .context("Engine returned an unparseable workflow document")?;

        tracing::info!(
            "   Got: {} ({} nodes)",
            document.name,
            document.nodes.len()
        );
        Ok(document)
    }

    /// PUT /workflows/{id} — full-document replace
    pub async fn update_workflow(&self, id: &str, document: &GraphDocument) -> Result<GraphDocument> {
        validate(document)?;

        let url = format!("{}/workflows/{}", self.base_url, id);
        let payload = document.to_update_payload();
        tracing::info!(
            "📤 Pushing workflow {} ({} nodes, {} connection sources)",
            id,
            payload.nodes.len(),
            payload.connections.len()
        );

        let response = self
            .http
            .put(&url)
            .header(API_KEY_HEADER, &self.api_key)
            .json(&payload)
            .send()
            .await
            .with_context(|| format!("PUT {} failed", url))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            bail!(
                "Failed to update workflow {}: HTTP {} - {}",
                id,
                status.as_u16(),
                body.chars().take(1000).collect::<String>()
            );
        }

        let updated: GraphDocument = response
            .json()
            .await
            .context("Engine returned an unparseable updated document")?;
        tracing::info!(
            "   Updated: {} ({} nodes)",
            updated.name,
            updated.nodes.len()
        );
        Ok(updated)
    }

    /// POST /workflows/{id}/activate
    pub async fn activate_workflow(&self, id: &str) -> Result<()> {
        let url = format!("{}/workflows/{}/activate", self.base_url, id);
        tracing::info!("⚡ Activating workflow {}", id);

        let response = self
            .http
            .post(&url)
            .header(API_KEY_HEADER, &self.api_key)
            .send()
            .await
            .with_context(|| format!("POST {} failed", url))?;

        let status = response.status();
        if !status.is_success() {
            bail!("Failed to activate workflow {}: HTTP {}", id, status.as_u16());
        }

        tracing::info!("   Workflow activated");
        Ok(())
    }
}

/// Write the document to a timestamped local JSON file, pretty-printed
///
/// Runs before edits land so a bad push can always be rolled back by
/// re-pushing the backup.
pub fn write_backup(document: &GraphDocument, dir: &Path) -> Result<PathBuf> {
    std::fs::create_dir_all(dir)
        .with_context(|| format!("Failed to create backup directory {}", dir.display()))?;

    let stamp = chrono::Utc::now().format("%Y%m%dT%H%M%SZ");
    let slug: String = document
        .name
        .chars()
        .map(|c| if c.is_alphanumeric() { c } else { '-' })
        .collect();
    let path = dir.join(format!("{}-{}.json", slug, stamp));

    let json = serde_json::to_string_pretty(document)?;
    std::fs::write(&path, json)
        .with_context(|| format!("Failed to write backup {}", path.display()))?;

    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn backup_round_trips_the_full_document() {
        let document: GraphDocument = serde_json::from_value(json!({
            "id": "wf-1",
            "name": "chat faq bot",
            "active": true,
            "nodes": [],
            "connections": {}
        }))
        .unwrap();

        let dir = tempfile::tempdir().unwrap();
        let path = write_backup(&document, dir.path()).unwrap();

        let name = path.file_name().unwrap().to_string_lossy().to_string();
        assert!(name.starts_with("chat-faq-bot-"), "got {}", name);
        assert!(name.ends_with(".json"));

        let restored: GraphDocument =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(restored.name, "chat faq bot");
        assert_eq!(restored.extra["active"], true);
    }
}
