//! Model download.

use crate::client::TextTo3dApi;
use crate::error::GenerationError;
use crate::task::{ModelFormat, TaskSnapshot};
use rootcause::prelude::Report;
use std::path::Path;
use tracing::{info, instrument};

/// Downloads the `format` model of a finished task and writes it to `dest`.
///
/// The bytes are written exactly as fetched. Returns the number of bytes written.
///
/// # Errors
///
/// Returns `MissingModelUrl` if the snapshot has no URL for `format`, the
/// client's error if the fetch fails, or `WriteFailed` if `dest` cannot be written.
#[instrument(skip(api, snapshot), fields(task_id = %snapshot.id, dest = %dest.display()))]
pub async fn download_model<A: TextTo3dApi + ?Sized>(
    api: &A,
    snapshot: &TaskSnapshot,
    format: ModelFormat,
    dest: &Path,
) -> Result<u64, Report<GenerationError>> {
    let url = snapshot
        .model_url(format)
        .ok_or_else(|| GenerationError::MissingModelUrl {
            task_id: snapshot.id.clone(),
            format,
        })?;

    let bytes = api.download(url).await?;
    tokio::fs::write(dest, &bytes)
        .await
        .map_err(|e| GenerationError::WriteFailed {
            path: dest.display().to_string(),
            reason: e.to_string(),
        })?;

    info!(bytes = bytes.len(), "model written");
    Ok(bytes.len() as u64)
}
