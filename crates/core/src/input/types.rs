//! Input descriptors and the validated input set.

use bytes::Bytes;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::PathBuf;
use uuid::Uuid;

use crate::error::MergeError;

/// Number of clips a merge accepts.
pub const REQUIRED_INPUTS: usize = 3;

/// Extension given to inputs whose name is not known up front.
pub const DEFAULT_MEDIA_EXTENSION: &str = "mp4";

/// Where the contents of an upload currently live.
#[derive(Debug, Clone)]
pub enum UploadData {
    Memory(Bytes),
    /// A local file written by the transport while receiving the upload.
    /// It is moved into the workspace when the input is materialized.
    File(PathBuf),
}

/// A clip that was uploaded by the caller.
#[derive(Debug, Clone)]
pub struct UploadedInput {
    /// Original file name as sent by the client, if any.
    pub file_name: Option<String>,
    pub data: UploadData,
}

impl UploadedInput {
    pub fn new(file_name: Option<String>, data: impl Into<Bytes>) -> Self {
        Self {
            file_name,
            data: UploadData::Memory(data.into()),
        }
    }

    /// An upload already spooled to `path`.
    pub fn from_file(file_name: Option<String>, path: impl Into<PathBuf>) -> Self {
        Self {
            file_name,
            data: UploadData::File(path.into()),
        }
    }
}

/// A clip that has to be downloaded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteInput {
    pub url: String,
}

impl RemoteInput {
    pub fn new(url: impl Into<String>) -> Self {
        Self { url: url.into() }
    }
}

/// One entry of a merge request.
#[derive(Debug, Clone)]
pub enum InputDescriptor {
    Upload(UploadedInput),
    Remote(RemoteInput),
}

impl From<UploadedInput> for InputDescriptor {
    fn from(input: UploadedInput) -> Self {
        Self::Upload(input)
    }
}

impl From<RemoteInput> for InputDescriptor {
    fn from(input: RemoteInput) -> Self {
        Self::Remote(input)
    }
}

/// An ordered set of exactly [`REQUIRED_INPUTS`] descriptors.
#[derive(Debug, Clone)]
pub struct InputSet {
    inputs: Vec<InputDescriptor>,
}

impl InputSet {
    /// Validates the cardinality of a request. No I/O happens here.
    pub fn new(inputs: Vec<InputDescriptor>) -> Result<Self, MergeError> {
        if inputs.len() != REQUIRED_INPUTS {
            return Err(MergeError::validation(format!(
                "expected exactly {} videos, got {}",
                REQUIRED_INPUTS,
                inputs.len()
            )));
        }
        Ok(Self { inputs })
    }

    pub fn len(&self) -> usize {
        self.inputs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inputs.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &InputDescriptor> {
        self.inputs.iter()
    }

    pub fn into_inner(self) -> Vec<InputDescriptor> {
        self.inputs
    }

    /// Assigns a destination file name to every input, in order.
    ///
    /// Uploads keep their original name (final path component only).
    /// Names that are unusable, clash with `reserved` or with an earlier
    /// input get a position prefix, or a generated name as last resort.
    /// Remote inputs always get a generated `<uuid>.mp4` name.
    pub fn plan_file_names(&self, reserved: &[&str]) -> Vec<String> {
        let mut taken: HashSet<String> = reserved.iter().map(|s| s.to_string()).collect();
        let mut names = Vec::with_capacity(self.inputs.len());

        for (idx, input) in self.inputs.iter().enumerate() {
            let candidate = match input {
                InputDescriptor::Upload(upload) => {
                    upload.file_name.as_deref().and_then(sanitize_file_name)
                }
                InputDescriptor::Remote(_) => None,
            };

            let name = match candidate {
                Some(name) if !taken.contains(&name) => name,
                Some(name) => {
                    let prefixed = format!("{}-{}", idx + 1, name);
                    if taken.contains(&prefixed) {
                        generated_file_name()
                    } else {
                        prefixed
                    }
                }
                None => generated_file_name(),
            };

            taken.insert(name.clone());
            names.push(name);
        }

        names
    }
}

/// Reduces a client-supplied file name to a safe, single path component.
pub fn sanitize_file_name(raw: &str) -> Option<String> {
    let last = raw
        .rsplit(['/', '\\'])
        .next()
        .unwrap_or_default()
        .trim();

    let cleaned: String = last.chars().filter(|c| !c.is_control()).collect();
    let cleaned = cleaned.trim_start_matches('.');

    if cleaned.is_empty() {
        None
    } else {
        Some(cleaned.to_string())
    }
}

fn generated_file_name() -> String {
    format!("{}.{}", Uuid::new_v4(), DEFAULT_MEDIA_EXTENSION)
}
