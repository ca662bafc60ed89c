//! Status and health check handlers.

use std::sync::Arc;

use axum::{extract::State, http::StatusCode, Json};
use serde::Serialize;

use crate::api::handlers::{engine_error, ApiError};
use crate::api::ApiState;

/// Health response.
#[derive(Serialize)]
pub struct HealthResponse {
    /// Service status.
    pub status: String,

    /// Crate version.
    pub version: String,

    /// Blob backend in use (`s3` or `memory`).
    pub blob_backend: String,

    pub total_submissions: usize,

    /// Submissions awaiting approval.
    pub pending_submissions: usize,

    pub approved_submissions: usize,

    pub rated_submissions: usize,
}

/// Health check endpoint.
pub async fn health(
    State(state): State<Arc<ApiState>>,
) -> Result<Json<HealthResponse>, ApiError> {
    let engine = state.engine.read().await;

    let counts = engine.submission_counts().await.map_err(|e| {
        let (_, message) = engine_error(e);
        (StatusCode::SERVICE_UNAVAILABLE, message)
    })?;

    Ok(Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        blob_backend: engine.blob_backend().to_string(),
        total_submissions: counts.total,
        pending_submissions: counts.pending,
        approved_submissions: counts.approved,
        rated_submissions: counts.rated,
    }))
}
