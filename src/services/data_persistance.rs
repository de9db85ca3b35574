use std::path::{Path, PathBuf};

use anyhow::Context;
use async_trait::async_trait;

use crate::domain::{company::PortfolioResult, link};

/// Receives the whole in-progress result after every recorded company.
#[async_trait]
pub trait SnapshotSink: Send + Sync {
    async fn persist_snapshot(&self, result: &PortfolioResult) -> anyhow::Result<()>;
}

/// Writes the result as pretty JSON. Each write replaces the previous file.
pub struct JsonSnapshotWriter {
    path: PathBuf,
}

impl JsonSnapshotWriter {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        JsonSnapshotWriter { path: path.into() }
    }

    /// `portfolio_snapshot.json` becomes `portfolio_snapshot-acme.json` for
    /// a listing on `acme.vc`.
    pub fn for_listing(base_path: &str, listing_url: &str) -> Self {
        let base = Path::new(base_path);
        let label = link::parse_web_url(listing_url)
            .and_then(|url| link::registrable_label(&url))
            .unwrap_or_else(|| "listing".to_string());
        let stem = base
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or("portfolio_snapshot");
        let extension = base.extension().and_then(|s| s.to_str()).unwrap_or("json");

        JsonSnapshotWriter::new(base.with_file_name(format!("{}-{}.{}", stem, label, extension)))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl SnapshotSink for JsonSnapshotWriter {
    async fn persist_snapshot(&self, result: &PortfolioResult) -> anyhow::Result<()> {
        let body = serde_json::to_vec_pretty(result)?;
        let tmp_path = self.path.with_extension("json.tmp");

        tokio::fs::write(&tmp_path, body)
            .await
            .with_context(|| format!("Failed to write {}", tmp_path.display()))?;
        tokio::fs::rename(&tmp_path, &self.path)
            .await
            .with_context(|| format!("Failed to move snapshot to {}", self.path.display()))?;

        log::debug!(
            "Snapshot with {} companies written to {}",
            result.len(),
            self.path.display()
        );
        Ok(())
    }
}
