//! CSV downloads, saved under a deterministic file name.

use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use tracing::info;

use crate::accessors::payouts;
use crate::errors::Result;
use crate::http::ApiClient;

/// `payout-batch-<id>-<YYYY-MM-DD>.csv`. Characters outside
/// `[A-Za-z0-9_-]` in the id become `_`.
pub fn export_file_name(batch_id: &str, date: NaiveDate) -> String {
    let id: String = batch_id
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '-' || c == '_' { c } else { '_' })
        .collect();
    format!("payout-batch-{id}-{}.csv", date.format("%Y-%m-%d"))
}

/// Download a batch export and write it to `dir`. Returns the file path.
pub async fn export_batch_csv(api: &ApiClient, batch_id: &str, dir: &Path, date: NaiveDate) -> Result<PathBuf> {
    let bytes = payouts::export_batch(api, batch_id).await?;
    tokio::fs::create_dir_all(dir).await?;
    let path = dir.join(export_file_name(batch_id, date));
    tokio::fs::write(&path, &bytes).await?;
    info!("Exported batch {batch_id} ({} bytes) to {}", bytes.len(), path.display());
    Ok(path)
}
