//! Mock concatenator for testing.

use async_trait::async_trait;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::RwLock;
use tokio_util::sync::CancellationToken;

use crate::concat::{ConcatJob, ConcatResult, Concatenator, Manifest};
use crate::error::MergeError;

/// Mock implementation of the [`Concatenator`] trait.
///
/// Writes the manifest like the real implementation, then produces the
/// output by appending the input files byte for byte. Provides:
/// - recorded jobs for assertions
/// - a one-shot injected failure
/// - a simulated encoding delay that honours cancellation
///
/// # Example
///
/// ```rust,ignore
/// use reelsplice_core::testing::MockConcatenator;
///
/// let concatenator = MockConcatenator::new();
/// concatenator.set_delay(Duration::from_millis(50)).await;
///
/// let result = concatenator.concat(&job, &cancel).await?;
///
/// let jobs = concatenator.recorded_jobs().await;
/// assert_eq!(jobs.len(), 1);
/// ```
#[derive(Debug, Default)]
pub struct MockConcatenator {
    jobs: Arc<RwLock<Vec<ConcatJob>>>,
    next_error: Arc<RwLock<Option<MergeError>>>,
    delay: Arc<RwLock<Duration>>,
}

impl MockConcatenator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Get all jobs submitted so far.
    pub async fn recorded_jobs(&self) -> Vec<ConcatJob> {
        self.jobs.read().await.clone()
    }

    pub async fn job_count(&self) -> usize {
        self.jobs.read().await.len()
    }

    /// Configure the next job to fail with the given error.
    pub async fn set_next_error(&self, error: MergeError) {
        *self.next_error.write().await = Some(error);
    }

    /// Set the simulated encoding time.
    pub async fn set_delay(&self, delay: Duration) {
        *self.delay.write().await = delay;
    }
}

#[async_trait]
impl Concatenator for MockConcatenator {
    fn name(&self) -> &str {
        "mock"
    }

    async fn concat(
        &self,
        job: &ConcatJob,
        cancel: &CancellationToken,
    ) -> Result<ConcatResult, MergeError> {
        let start = Instant::now();
        self.jobs.write().await.push(job.clone());

        if let Some(err) = self.next_error.write().await.take() {
            return Err(err);
        }

        let delay = *self.delay.read().await;
        if !delay.is_zero() {
            tokio::select! {
                _ = tokio::time::sleep(delay) => {}
                _ = cancel.cancelled() => return Err(MergeError::Cancelled),
            }
        }

        Manifest::new(job.inputs.clone())
            .write_to(&job.manifest_path())
            .await?;

        let mut output = Vec::new();
        for input in &job.inputs {
            let bytes = tokio::fs::read(input)
                .await
                .map_err(|e| MergeError::io(format!("reading {}", input.display()), e))?;
            output.extend_from_slice(&bytes);
        }
        tokio::fs::write(&job.output_path, &output)
            .await
            .map_err(|e| MergeError::io(format!("writing {}", job.output_path.display()), e))?;

        Ok(ConcatResult {
            output_path: job.output_path.clone(),
            output_size_bytes: output.len() as u64,
            duration_ms: start.elapsed().as_millis() as u64,
        })
    }

    async fn validate(&self) -> Result<(), MergeError> {
        Ok(())
    }
}
