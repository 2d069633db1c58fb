//! Merge endpoints: uploaded videos and remote URLs.

use axum::{
    extract::{
        multipart::{Field, MultipartError},
        Multipart, State,
    },
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tempfile::TempPath;
use tokio::io::AsyncWriteExt;
use reelsplice_core::{
    InputDescriptor, MergeError, MergeOutput, RemoteInput, UploadedInput, REQUIRED_INPUTS,
};

use crate::metrics::UPLOAD_BYTES_TOTAL;
use crate::state::AppState;

/// Multipart field carrying one video. Repeated once per input.
pub const VIDEO_FIELD: &str = "videos";

// ============================================================================
// Request/Response Types
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct RemoteMergeRequest {
    pub urls: Vec<String>,
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub kind: String,
}

type ApiError = (StatusCode, Json<ErrorResponse>);

impl ErrorResponse {
    fn from_merge_error(e: &MergeError) -> ApiError {
        let status = match e {
            MergeError::Validation { .. } => StatusCode::BAD_REQUEST,
            MergeError::Fetch { .. } => StatusCode::BAD_GATEWAY,
            MergeError::Timeout { .. } => StatusCode::GATEWAY_TIMEOUT,
            MergeError::Cancelled => StatusCode::SERVICE_UNAVAILABLE,
            MergeError::Io { .. }
            | MergeError::EncoderNotFound { .. }
            | MergeError::Processing { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        };
        (
            status,
            Json(ErrorResponse {
                error: e.to_string(),
                kind: e.kind().as_str().to_string(),
            }),
        )
    }

    fn from_multipart_error(e: MultipartError) -> ApiError {
        (
            e.status(),
            Json(ErrorResponse {
                error: format!("Failed to read upload: {}", e.body_text()),
                kind: "validation".to_string(),
            }),
        )
    }
}

// ============================================================================
// Handlers
// ============================================================================

/// POST /api/v1/merge
///
/// Merge three uploaded videos, sent as repeated `videos` multipart fields
/// in playback order. Other fields are ignored.
///
/// Each video is streamed to a spool file as it arrives; a request carrying
/// more than three videos is rejected at the fourth without reading it.
pub async fn merge_upload(
    State(state): State<Arc<AppState>>,
    mut multipart: Multipart,
) -> Result<Json<MergeOutput>, ApiError> {
    let mut inputs = Vec::new();
    // Spool files are deleted when these guards drop, unless the merge
    // already moved them into its workspace.
    let mut spooled: Vec<TempPath> = Vec::new();

    while let Some(mut field) = multipart
        .next_field()
        .await
        .map_err(ErrorResponse::from_multipart_error)?
    {
        if field.name() != Some(VIDEO_FIELD) {
            continue;
        }
        if inputs.len() == REQUIRED_INPUTS {
            return Err(ErrorResponse::from_merge_error(&MergeError::validation(
                format!(
                    "expected exactly {} videos, got {} or more",
                    REQUIRED_INPUTS,
                    REQUIRED_INPUTS + 1
                ),
            )));
        }

        let file_name = field.file_name().map(|s| s.to_string());
        let path = spool_field(&mut field).await?;
        inputs.push(InputDescriptor::from(UploadedInput::from_file(
            file_name,
            path.to_path_buf(),
        )));
        spooled.push(path);
    }

    tracing::debug!(count = inputs.len(), "Received uploaded videos");
    let result = run_merge(&state, inputs).await;
    drop(spooled);
    result
}

/// Streams one multipart field into a fresh temporary file.
async fn spool_field(field: &mut Field<'_>) -> Result<TempPath, ApiError> {
    let spool_error = |e: std::io::Error| {
        ErrorResponse::from_merge_error(&MergeError::io("spooling upload", e))
    };

    let (file, path) = tempfile::Builder::new()
        .prefix("reelsplice-upload-")
        .tempfile()
        .map_err(spool_error)?
        .into_parts();
    let mut file = tokio::fs::File::from_std(file);

    while let Some(chunk) = field
        .chunk()
        .await
        .map_err(ErrorResponse::from_multipart_error)?
    {
        UPLOAD_BYTES_TOTAL.inc_by(chunk.len() as u64);
        file.write_all(&chunk).await.map_err(spool_error)?;
    }
    file.flush().await.map_err(spool_error)?;

    Ok(path)
}

/// POST /api/v1/merge/remote
///
/// Merge three videos fetched from the given URLs, in order.
pub async fn merge_remote(
    State(state): State<Arc<AppState>>,
    Json(request): Json<RemoteMergeRequest>,
) -> Result<Json<MergeOutput>, ApiError> {
    let inputs = request
        .urls
        .into_iter()
        .map(|url| InputDescriptor::from(RemoteInput::new(url)))
        .collect();
    run_merge(&state, inputs).await
}

async fn run_merge(
    state: &AppState,
    inputs: Vec<InputDescriptor>,
) -> Result<Json<MergeOutput>, ApiError> {
    match state.merger().merge(inputs).await {
        Ok(output) => {
            tracing::info!(
                run_id = output.run_id,
                path = %output.output_path.display(),
                bytes = output.output_size_bytes,
                "Merge request completed"
            );
            Ok(Json(output))
        }
        Err(e) => Err(ErrorResponse::from_merge_error(&e)),
    }
}
