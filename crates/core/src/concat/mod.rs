//! Concat module: joins ordered clips into one file with ffmpeg.
//!
//! The caller hands over an explicit, ordered list of input paths. A
//! manifest for ffmpeg's concat demuxer is written into the workspace and
//! ffmpeg is run with stream copy (no re-encoding), under a deadline and a
//! cancellation token.
//!
//! # Example
//!
//! ```ignore
//! use reelsplice_core::concat::{Concatenator, ConcatJob, FfmpegConcatenator};
//! use tokio_util::sync::CancellationToken;
//!
//! let concatenator = FfmpegConcatenator::with_defaults();
//! concatenator.validate().await?;
//!
//! let job = ConcatJob::new(workspace.path(), vec![a, b, c], "merged_video.mp4");
//! let result = concatenator.concat(&job, &CancellationToken::new()).await?;
//! println!("{} bytes in {} ms", result.output_size_bytes, result.duration_ms);
//! ```

mod ffmpeg;
mod manifest;
mod traits;
mod types;

pub use ffmpeg::FfmpegConcatenator;
pub use manifest::{manifest_line, Manifest};
pub use traits::Concatenator;
pub use types::{ConcatJob, ConcatResult, MANIFEST_FILE_NAME};
