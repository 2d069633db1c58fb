//! Uploaded inputs: contents already received by the transport, either in
//! memory or spooled to a local file.

use async_trait::async_trait;
use std::path::{Path, PathBuf};

use super::traits::InputSource;
use super::types::{UploadData, UploadedInput};
use crate::error::MergeError;

#[async_trait]
impl InputSource for UploadedInput {
    fn kind(&self) -> &'static str {
        "upload"
    }

    async fn materialize(&self, destination: &Path) -> Result<PathBuf, MergeError> {
        let save_error =
            |e: std::io::Error| MergeError::io(format!("saving upload to {}", destination.display()), e);

        let bytes = match &self.data {
            UploadData::Memory(data) => {
                tokio::fs::write(destination, data).await.map_err(save_error)?;
                data.len() as u64
            }
            UploadData::File(spooled) => move_spooled(spooled, destination)
                .await
                .map_err(save_error)?,
        };

        tracing::debug!(
            path = %destination.display(),
            bytes,
            "Saved uploaded video"
        );
        Ok(destination.to_path_buf())
    }
}

/// Moves a spooled upload into place. The spool may live on another
/// filesystem, in which case the file is copied and the original removed.
async fn move_spooled(source: &Path, destination: &Path) -> std::io::Result<u64> {
    if tokio::fs::rename(source, destination).await.is_ok() {
        return Ok(tokio::fs::metadata(destination).await?.len());
    }

    let bytes = tokio::fs::copy(source, destination).await?;
    if let Err(e) = tokio::fs::remove_file(source).await {
        tracing::debug!(path = %source.display(), error = %e, "Could not remove spooled upload");
    }
    Ok(bytes)
}
