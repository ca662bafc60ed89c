//! Opening verse handlers.

use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    Json,
};
use serde::Deserialize;

use crate::api::extract::AdminUser;
use crate::api::handlers::{engine_error, parse_id, ApiError, MessageResponse};
use crate::api::ApiState;
use crate::engine::{NewVerse, VerseFilter, VersePatch};
use crate::model::Verse;

#[derive(Deserialize)]
pub struct VerseQuery {
    pub day: Option<i64>,
    pub language: Option<String>,
}

/// Public verse listing.
pub async fn list_verses(
    State(state): State<Arc<ApiState>>,
    Query(query): Query<VerseQuery>,
) -> Result<Json<Vec<Verse>>, ApiError> {
    let filter = VerseFilter {
        day: query.day,
        language: query.language,
    };

    let engine = state.engine.read().await;
    let verses = engine.list_verses(&filter).await.map_err(engine_error)?;

    Ok(Json(verses))
}

pub async fn create_verse(
    State(state): State<Arc<ApiState>>,
    AdminUser(_admin): AdminUser,
    Json(verse): Json<NewVerse>,
) -> Result<Json<Verse>, ApiError> {
    let mut engine = state.engine.write().await;
    let verse = engine.create_verse(verse).await.map_err(engine_error)?;

    Ok(Json(verse))
}

pub async fn update_verse(
    State(state): State<Arc<ApiState>>,
    AdminUser(_admin): AdminUser,
    Path(id): Path<String>,
    Json(patch): Json<VersePatch>,
) -> Result<Json<Verse>, ApiError> {
    let id = parse_id(&id, "verse")?;

    let mut engine = state.engine.write().await;
    let verse = engine.update_verse(id, patch).await.map_err(engine_error)?;

    Ok(Json(verse))
}

pub async fn delete_verse(
    State(state): State<Arc<ApiState>>,
    AdminUser(_admin): AdminUser,
    Path(id): Path<String>,
) -> Result<Json<MessageResponse>, ApiError> {
    let id = parse_id(&id, "verse")?;

    let mut engine = state.engine.write().await;
    engine.delete_verse(id).await.map_err(engine_error)?;

    Ok(Json(MessageResponse::new("Verse deleted successfully")))
}
