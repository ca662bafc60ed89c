//! Leaderboard handler.

use std::sync::Arc;

use axum::{
    extract::{Query, State},
    Json,
};
use serde::{Deserialize, Serialize};

use crate::api::extract::CurrentUser;
use crate::api::handlers::{engine_error, ApiError};
use crate::api::ApiState;
use crate::engine::LeaderboardEntry;
use crate::model::SubmissionType;

#[derive(Deserialize)]
pub struct LeaderboardQuery {
    #[serde(rename = "type")]
    pub kind: SubmissionType,
}

#[derive(Serialize)]
pub struct LeaderboardResponse {
    pub entries: Vec<LeaderboardEntry>,
}

/// Authors ranked by stars for one submission type.
pub async fn leaderboard(
    State(state): State<Arc<ApiState>>,
    CurrentUser(_user): CurrentUser,
    Query(query): Query<LeaderboardQuery>,
) -> Result<Json<LeaderboardResponse>, ApiError> {
    let engine = state.engine.read().await;
    let entries = engine.leaderboard(query.kind).await.map_err(engine_error)?;

    Ok(Json(LeaderboardResponse { entries }))
}
