//! Merge service: the end-to-end path from request inputs to a merged file.
//!
//! Each merge runs in its own workspace, which is removed on every exit
//! path. A semaphore caps the number of merges running at once, and a
//! process-wide cancellation token aborts waiting and running merges on
//! shutdown.

use std::future::Future;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use serde::Serialize;
use tokio::sync::Semaphore;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::concat::{ConcatJob, Concatenator, MANIFEST_FILE_NAME};
use crate::config::MergeConfig;
use crate::error::MergeError;
use crate::input::{
    acquire_inputs, check_remote_urls, InputDescriptor, InputSet, RemoteFetcher,
    DEFAULT_MEDIA_EXTENSION,
};
use crate::job::{EventHandle, JobRunner};
use crate::metrics::MERGES_IN_PROGRESS;
use crate::workspace::Workspace;

/// What a successful merge reports back to the caller.
#[derive(Debug, Clone, Serialize)]
pub struct MergeOutput {
    pub run_id: u64,
    pub output_path: PathBuf,
    pub output_size_bytes: u64,
    pub duration_ms: u64,
    /// Whether `output_path` outlives the merge. When false the path points
    /// into the workspace, which is gone by the time the caller sees it.
    pub persisted: bool,
}

/// Keeps the in-progress gauge accurate however the merge ends.
struct InProgress;

impl InProgress {
    fn enter() -> Self {
        MERGES_IN_PROGRESS.inc();
        Self
    }
}

impl Drop for InProgress {
    fn drop(&mut self) {
        MERGES_IN_PROGRESS.dec();
    }
}

pub struct MergeService {
    config: MergeConfig,
    fetcher: Arc<RemoteFetcher>,
    runner: JobRunner<dyn Concatenator>,
    permits: Semaphore,
    cancel: CancellationToken,
}

impl MergeService {
    pub fn new(
        config: MergeConfig,
        concatenator: Arc<dyn Concatenator>,
        fetcher: Arc<RemoteFetcher>,
    ) -> Self {
        let permits = Semaphore::new(config.max_concurrent.max(1));
        Self {
            config,
            fetcher,
            runner: JobRunner::new(concatenator),
            permits,
            cancel: CancellationToken::new(),
        }
    }

    /// Sets the event handle for job lifecycle events.
    pub fn with_events(mut self, events: EventHandle) -> Self {
        self.runner = self.runner.with_events(events);
        self
    }

    /// Uses `token` to abort merges, typically one cancelled on shutdown.
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = token;
        self
    }

    pub fn concatenator(&self) -> &dyn Concatenator {
        self.runner.concatenator()
    }

    /// Number of merges that could start right now without waiting.
    pub fn available_permits(&self) -> usize {
        self.permits.available_permits()
    }

    /// Merges `inputs` and hands the result to `consume` before the
    /// workspace is torn down.
    ///
    /// The output file only exists for the duration of `consume`; whatever
    /// it needs to keep must be copied or moved out.
    pub async fn merge_with<T, F, Fut>(
        &self,
        inputs: Vec<InputDescriptor>,
        consume: F,
    ) -> Result<T, MergeError>
    where
        F: FnOnce(MergeOutput) -> Fut,
        Fut: Future<Output = Result<T, MergeError>>,
    {
        let set = InputSet::new(inputs)?;
        check_remote_urls(&set, &self.fetcher)?;

        let _permit = tokio::select! {
            permit = self.permits.acquire() => permit.map_err(|_| MergeError::Cancelled)?,
            _ = self.cancel.cancelled() => return Err(MergeError::Cancelled),
        };
        let _in_progress = InProgress::enter();

        let workspace = Workspace::acquire(&self.config.temp_root).await?;
        let result = self.run_in(&workspace, set, consume).await;
        workspace.release().await;

        if let Err(ref e) = result {
            tracing::warn!(error = %e, kind = e.kind().as_str(), "Merge failed");
        }
        result
    }

    async fn run_in<T, F, Fut>(
        &self,
        workspace: &Workspace,
        set: InputSet,
        consume: F,
    ) -> Result<T, MergeError>
    where
        F: FnOnce(MergeOutput) -> Fut,
        Fut: Future<Output = Result<T, MergeError>>,
    {
        let reserved = [self.config.output_file_name.as_str(), MANIFEST_FILE_NAME];
        let inputs = tokio::select! {
            inputs = acquire_inputs(set, workspace, &self.fetcher, &reserved) => inputs?,
            _ = self.cancel.cancelled() => return Err(MergeError::Cancelled),
        };

        let job = ConcatJob::new(workspace.path(), inputs, &self.config.output_file_name);
        let report = self.runner.run(job, &self.cancel).await?;

        consume(MergeOutput {
            run_id: report.run_id,
            output_path: report.result.output_path,
            output_size_bytes: report.result.output_size_bytes,
            duration_ms: report.result.duration_ms,
            persisted: false,
        })
        .await
    }

    /// Merges `inputs`, moving the result into `merge.output_dir` when one
    /// is configured.
    ///
    /// Without an output directory the reported path points into the
    /// workspace and no longer exists once this returns.
    pub async fn merge(&self, inputs: Vec<InputDescriptor>) -> Result<MergeOutput, MergeError> {
        let output_dir = self.config.output_dir.clone();
        self.merge_with(inputs, |output| async move {
            match output_dir {
                Some(dir) => persist_output(output, &dir).await,
                None => Ok(output),
            }
        })
        .await
    }
}

/// Moves the merged file to `<dir>/<run_id>-<uuid>.<ext>`.
async fn persist_output(mut output: MergeOutput, dir: &Path) -> Result<MergeOutput, MergeError> {
    tokio::fs::create_dir_all(dir)
        .await
        .map_err(|e| MergeError::io(format!("creating output dir {}", dir.display()), e))?;

    let extension = output
        .output_path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or(DEFAULT_MEDIA_EXTENSION)
        .to_string();
    let destination = dir.join(format!(
        "{}-{}.{}",
        output.run_id,
        Uuid::new_v4(),
        extension
    ));

    // Rename fails across filesystems; the copy's source goes with the workspace.
    if let Err(e) = tokio::fs::rename(&output.output_path, &destination).await {
        tracing::debug!(error = %e, "Rename failed, copying output instead");
        tokio::fs::copy(&output.output_path, &destination)
            .await
            .map_err(|e| MergeError::io(format!("copying output to {}", destination.display()), e))?;
    }

    tracing::info!(
        run_id = output.run_id,
        path = %destination.display(),
        "Merged video persisted"
    );
    output.output_path = destination;
    output.persisted = true;
    Ok(output)
}
