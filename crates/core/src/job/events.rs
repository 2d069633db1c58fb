use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::error::{ErrorKind, MergeError};

/// How a merge job ended.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum JobOutcome {
    Succeeded {
        output_path: PathBuf,
        output_size_bytes: u64,
    },
    Failed {
        kind: ErrorKind,
        reason: String,
    },
}

impl JobOutcome {
    pub fn failed(error: &MergeError) -> Self {
        Self::Failed {
            kind: error.kind(),
            reason: error.to_string(),
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Self::Succeeded { .. })
    }

    /// Label used for metrics ("succeeded" or the error kind).
    pub fn label(&self) -> &'static str {
        match self {
            Self::Succeeded { .. } => "succeeded",
            Self::Failed { kind, .. } => kind.as_str(),
        }
    }
}

/// Merge job lifecycle events
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum JobEvent {
    Started {
        run_id: u64,
        workspace: PathBuf,
        input_count: usize,
    },
    Completed {
        run_id: u64,
        outcome: JobOutcome,
        duration_ms: u64,
    },
}

impl JobEvent {
    pub fn run_id(&self) -> u64 {
        match self {
            Self::Started { run_id, .. } | Self::Completed { run_id, .. } => *run_id,
        }
    }

    pub fn event_type(&self) -> &'static str {
        match self {
            Self::Started { .. } => "started",
            Self::Completed { .. } => "completed",
        }
    }
}
