//! Trait definitions for input acquisition.

use async_trait::async_trait;
use std::path::{Path, PathBuf};

use crate::error::MergeError;

/// Something that can be written into a workspace as a local file.
#[async_trait]
pub trait InputSource: Send + Sync {
    /// Short label used in logs ("upload", "remote").
    fn kind(&self) -> &'static str;

    /// Writes the input to `destination` and returns the path written.
    async fn materialize(&self, destination: &Path) -> Result<PathBuf, MergeError>;
}
