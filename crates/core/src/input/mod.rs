//! Input acquisition: turning request descriptors into files in a workspace.
//!
//! Two variants are supported:
//! - uploads, already received by the transport (in memory or spooled to disk)
//! - remote URLs, downloaded by a [`RemoteFetcher`] with scheme/host
//!   allowlists and size/time limits
//!
//! The number of inputs is validated by [`InputSet::new`] before anything
//! touches the disk, and acquisition returns paths in request order.

mod remote;
mod traits;
mod types;
mod upload;

pub use remote::{RemoteFetcher, RemoteSource};
pub use traits::InputSource;
pub use types::{
    sanitize_file_name, InputDescriptor, InputSet, RemoteInput, UploadData, UploadedInput,
    DEFAULT_MEDIA_EXTENSION, REQUIRED_INPUTS,
};

use futures::future::try_join_all;
use std::path::PathBuf;
use std::sync::Arc;

use crate::error::MergeError;
use crate::workspace::Workspace;

/// Checks every remote URL in the set against the fetcher's allowlist.
pub fn check_remote_urls(set: &InputSet, fetcher: &RemoteFetcher) -> Result<(), MergeError> {
    for input in set.iter() {
        if let InputDescriptor::Remote(remote) = input {
            fetcher.check_url(&remote.url)?;
        }
    }
    Ok(())
}

/// Materializes every input of `set` into `workspace`, concurrently.
///
/// The returned paths are in the same order as the inputs. The first
/// failure aborts the acquisition; files already written stay in the
/// workspace and are removed with it.
pub async fn acquire_inputs(
    set: InputSet,
    workspace: &Workspace,
    fetcher: &Arc<RemoteFetcher>,
    reserved_names: &[&str],
) -> Result<Vec<PathBuf>, MergeError> {
    let names = set.plan_file_names(reserved_names);

    let sources: Vec<Box<dyn InputSource>> = set
        .into_inner()
        .into_iter()
        .map(|input| -> Box<dyn InputSource> {
            match input {
                InputDescriptor::Upload(upload) => Box::new(upload),
                InputDescriptor::Remote(remote) => {
                    Box::new(RemoteSource::new(remote.url, Arc::clone(fetcher)))
                }
            }
        })
        .collect();

    let tasks = sources.iter().zip(names.iter()).map(|(source, name)| {
        let destination = workspace.join(name);
        async move {
            tracing::debug!(kind = source.kind(), path = %destination.display(), "Acquiring input");
            source.materialize(&destination).await
        }
    });

    try_join_all(tasks).await
}
