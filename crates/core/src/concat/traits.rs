//! Trait definitions for the concat module.

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use super::types::{ConcatJob, ConcatResult};
use crate::error::MergeError;

/// Joins the inputs of a [`ConcatJob`] into a single output file.
#[async_trait]
pub trait Concatenator: Send + Sync {
    /// Returns the name of this concatenator implementation.
    fn name(&self) -> &str;

    /// Runs the job to completion, or until `cancel` fires.
    ///
    /// Implementations must not leave a running child process behind when
    /// they return, whatever the outcome.
    async fn concat(
        &self,
        job: &ConcatJob,
        cancel: &CancellationToken,
    ) -> Result<ConcatResult, MergeError>;

    /// Validates that the concatenator is properly configured and ready.
    async fn validate(&self) -> Result<(), MergeError>;
}
