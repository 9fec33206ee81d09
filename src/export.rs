use std::io;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{info, warn};

use crate::error::StoreError;
use crate::model::CampaignId;
use crate::store::CampaignStore;

/// CSV exports the server offers per campaign.
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum CsvKind {
    Replies,
    /// Email to recipient token map.
    Recipients,
}

impl CsvKind {
    pub fn resource(&self) -> &'static str {
        match self {
            CsvKind::Replies => "replies.csv",
            CsvKind::Recipients => "recipients.csv",
        }
    }

    pub fn file_name(&self, id: &CampaignId) -> String {
        let id = sanitize(id.as_str());
        match self {
            CsvKind::Replies => format!("campaign_{id}_replies.csv"),
            CsvKind::Recipients => format!("campaign_{id}_email_token_map.csv"),
        }
    }

    pub fn failure_message(&self) -> &'static str {
        match self {
            CsvKind::Replies => "Failed to download replies",
            CsvKind::Recipients => "Failed to download recipient map",
        }
    }
}

fn sanitize(id: &str) -> String {
    id.chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '-' || c == '_' { c } else { '_' })
        .collect()
}

/// Download `kind` for the selected campaign into `dir`.
///
/// The body is staged in a `.part` file and renamed into place, so a failed
/// download never leaves a truncated CSV behind. Returns the final path.
pub async fn export_csv(
    store: &CampaignStore,
    kind: CsvKind,
    dir: &Path,
) -> Result<PathBuf, StoreError> {
    let id = store
        .selection()
        .id()
        .cloned()
        .ok_or(StoreError::NoSelection)?;

    let contents = store
        .api()
        .download_csv(&id, kind)
        .await
        .map_err(|source| {
            warn!(err = ?source, campaign_id = %id, resource = kind.resource(), "csv download failed");
            StoreError::Export { kind, source }
        })?;

    fs::create_dir_all(dir).await?;
    let path = dir.join(kind.file_name(&id));
    let staging = path.with_extension("csv.part");
    if let Err(err) = write_staged(&staging, &path, &contents).await {
        let _ = fs::remove_file(&staging).await;
        return Err(err.into());
    }

    info!(campaign_id = %id, path = %path.display(), bytes = contents.len(), "csv exported");
    Ok(path)
}

async fn write_staged(staging: &Path, path: &Path, contents: &[u8]) -> io::Result<()> {
    fs::write(staging, contents).await?;
    fs::rename(staging, path).await
}
