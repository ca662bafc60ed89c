//! Poet profile handler.

use std::sync::Arc;

use axum::{
    extract::{Path, State},
    Json,
};
use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use crate::api::extract::CurrentUser;
use crate::api::handlers::{engine_error, parse_id, ApiError};
use crate::api::ApiState;
use crate::model::PoetProfile;

/// Public view of a profile. `email` is only shown to its owner and admins.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PoetResponse {
    pub user_id: Uuid,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    pub country: String,
    pub points: u32,
    pub poems_count: u32,
    pub bio: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl PoetResponse {
    fn new(profile: PoetProfile, show_email: bool) -> Self {
        Self {
            user_id: profile.user_id,
            name: profile.name,
            email: show_email.then_some(profile.email),
            country: profile.country,
            points: profile.points,
            poems_count: profile.poems_count,
            bio: profile.bio,
            created_at: profile.created_at,
            updated_at: profile.updated_at,
        }
    }
}

pub async fn get_poet(
    State(state): State<Arc<ApiState>>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<String>,
) -> Result<Json<PoetResponse>, ApiError> {
    let user_id = parse_id(&id, "poet")?;

    let engine = state.engine.read().await;
    let profile = engine.poet_profile(user_id).await.map_err(engine_error)?;

    let show_email = user.id == user_id || user.is_admin();
    Ok(Json(PoetResponse::new(profile, show_email)))
}
