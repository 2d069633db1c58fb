pub mod concat;
pub mod config;
pub mod error;
pub mod input;
pub mod job;
pub mod metrics;
pub mod service;
pub mod testing;
pub mod workspace;

pub use concat::{ConcatJob, ConcatResult, Concatenator, FfmpegConcatenator};
pub use config::{
    load_config, load_config_from_str, load_config_or_default, validate_config, Config,
    ConfigError, LogFormat, MergeConfig, SanitizedConfig,
};
pub use error::{ErrorKind, MergeError};
pub use input::{
    InputDescriptor, RemoteFetcher, RemoteInput, UploadData, UploadedInput, REQUIRED_INPUTS,
};
pub use job::{create_event_system, EventHandle, JobEvent, JobEventEnvelope, JobOutcome, RecentEvents};
pub use service::{MergeOutput, MergeService};
pub use workspace::Workspace;
