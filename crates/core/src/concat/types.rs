//! Types for the concat module.

use serde::Serialize;
use std::path::{Path, PathBuf};

/// Name of the manifest file written into the workspace.
pub const MANIFEST_FILE_NAME: &str = "filelist.txt";

/// One concatenation: ordered inputs inside a workspace and where to write
/// the result.
#[derive(Debug, Clone)]
pub struct ConcatJob {
    /// Run identifier, assigned by the job runner.
    pub run_id: u64,
    /// Workspace the job reads from and writes to.
    pub workspace_dir: PathBuf,
    /// Input files, in the order they must appear in the output.
    pub inputs: Vec<PathBuf>,
    /// Output file path (inside the workspace).
    pub output_path: PathBuf,
}

impl ConcatJob {
    /// Creates a job whose output is `output_file_name` inside `workspace_dir`.
    pub fn new(workspace_dir: &Path, inputs: Vec<PathBuf>, output_file_name: &str) -> Self {
        Self {
            run_id: 0,
            workspace_dir: workspace_dir.to_path_buf(),
            inputs,
            output_path: workspace_dir.join(output_file_name),
        }
    }

    /// Where the manifest for this job is written.
    pub fn manifest_path(&self) -> PathBuf {
        self.workspace_dir.join(MANIFEST_FILE_NAME)
    }
}

/// Result of a successful concatenation.
#[derive(Debug, Clone, Serialize)]
pub struct ConcatResult {
    pub output_path: PathBuf,
    pub output_size_bytes: u64,
    /// Wall-clock time spent in the encoder, in milliseconds.
    pub duration_ms: u64,
}
