use axum::{
    extract::State,
    http::header,
    response::IntoResponse,
    Json,
};
use serde::Serialize;
use std::sync::Arc;
use reelsplice_core::{JobEventEnvelope, SanitizedConfig};

use crate::metrics::{collect_dynamic_metrics, encode_metrics};
use crate::state::AppState;

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub encoder: String,
    pub available_merge_slots: usize,
}

pub async fn health(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    let merger = state.merger();
    Json(HealthResponse {
        status: "ok".to_string(),
        encoder: merger.concatenator().name().to_string(),
        available_merge_slots: merger.available_permits(),
    })
}

pub async fn get_config(State(state): State<Arc<AppState>>) -> Json<SanitizedConfig> {
    Json(state.sanitized_config())
}

/// GET /api/v1/events
///
/// Most recent merge job events, oldest first.
pub async fn recent_events(State(state): State<Arc<AppState>>) -> Json<Vec<JobEventEnvelope>> {
    Json(state.recent_events().snapshot().await)
}

/// GET /metrics
pub async fn get_metrics(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    collect_dynamic_metrics(&state);
    (
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        encode_metrics(),
    )
}
