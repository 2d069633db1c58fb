//! Per-merge scratch directories.
//!
//! A [`Workspace`] is created at the start of a merge and removed when the
//! merge ends, whatever the outcome. Callers should `release()` it explicitly
//! so removal happens asynchronously; a workspace that is dropped without
//! being released is removed synchronously from `Drop`.

use std::path::{Path, PathBuf};
use uuid::Uuid;

use crate::error::MergeError;

/// Prefix of every workspace directory name.
pub const WORKSPACE_PREFIX: &str = "reelsplice-";

/// An exclusively owned scratch directory.
#[derive(Debug)]
pub struct Workspace {
    path: PathBuf,
    released: bool,
}

impl Workspace {
    /// Creates a fresh, uniquely named directory under `root`.
    ///
    /// The leaf directory is created with `create_dir`, so an existing
    /// directory with the same name is an error rather than a shared workspace.
    pub async fn acquire(root: &Path) -> Result<Self, MergeError> {
        tokio::fs::create_dir_all(root)
            .await
            .map_err(|e| MergeError::io(format!("creating temp root {}", root.display()), e))?;

        let path = root.join(format!("{}{}", WORKSPACE_PREFIX, Uuid::new_v4()));
        tokio::fs::create_dir(&path)
            .await
            .map_err(|e| MergeError::io(format!("creating workspace {}", path.display()), e))?;

        // Canonicalize so manifest entries and reported paths are absolute.
        let path = tokio::fs::canonicalize(&path).await.unwrap_or(path);

        tracing::debug!(workspace = %path.display(), "Workspace acquired");
        Ok(Self {
            path,
            released: false,
        })
    }

    /// Absolute path of the workspace directory.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Path of a file inside the workspace.
    pub fn join(&self, file_name: impl AsRef<Path>) -> PathBuf {
        self.path.join(file_name)
    }

    /// Recursively removes the workspace.
    ///
    /// Failures are logged and swallowed so they never mask the outcome of
    /// the merge that used the workspace.
    pub async fn release(mut self) {
        self.released = true;
        match tokio::fs::remove_dir_all(&self.path).await {
            Ok(()) => {
                tracing::debug!(workspace = %self.path.display(), "Workspace released");
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => {
                tracing::warn!(
                    workspace = %self.path.display(),
                    error = %e,
                    "Failed to delete workspace"
                );
            }
        }
    }
}

impl Drop for Workspace {
    fn drop(&mut self) {
        if self.released {
            return;
        }
        if let Err(e) = std::fs::remove_dir_all(&self.path) {
            if e.kind() != std::io::ErrorKind::NotFound {
                tracing::warn!(
                    workspace = %self.path.display(),
                    error = %e,
                    "Failed to delete workspace on drop"
                );
            }
        }
    }
}
