//! Submission handlers.

use std::sync::Arc;

use axum::{
    extract::{multipart::MultipartError, Multipart, Path, Query, State},
    http::StatusCode,
    Json,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::api::extract::{AdminUser, CurrentUser};
use crate::api::handlers::{engine_error, parse_id, ApiError};
use crate::api::ApiState;
use crate::engine::{
    PageRequest, SubmissionDraft, SubmissionFilter, UploadedFile, DEFAULT_BEST_LIMIT,
};
use crate::model::{ArazStatus, Submission, SubmissionType};

/// Acknowledgement for a new submission.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitResponse {
    pub message: String,
    pub poem_id: Uuid,
}

/// Acknowledgement for a moderation action, with the updated poem.
#[derive(Serialize)]
pub struct PoemActionResponse {
    pub message: String,
    pub poem: Submission,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PoemListResponse {
    pub poems: Vec<Submission>,
    pub total: usize,
    pub page: u32,
    pub per_page: u32,
}

#[derive(Serialize)]
pub struct FeaturedResponse {
    pub poem: Option<Submission>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DownloadResponse {
    pub url: String,
    pub expires_at: DateTime<Utc>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListQuery {
    #[serde(rename = "type")]
    pub kind: Option<SubmissionType>,
    pub language: Option<String>,
    pub status: Option<ArazStatus>,
    pub approved: Option<bool>,
    pub featured: Option<bool>,
    pub author_id: Option<Uuid>,
    pub page: Option<u32>,
    pub per_page: Option<u32>,
}

#[derive(Deserialize)]
pub struct BestQuery {
    pub limit: Option<usize>,
}

#[derive(Deserialize)]
pub struct ApproveRequest {
    pub approved: bool,
}

#[derive(Deserialize)]
pub struct RateRequest {
    pub rating: f64,
}

#[derive(Deserialize)]
pub struct StatusRequest {
    pub status: ArazStatus,
}

#[derive(Deserialize)]
pub struct FeatureRequest {
    pub featured: bool,
}

fn multipart_error(err: MultipartError) -> ApiError {
    (err.status(), err.body_text())
}

fn submitted(submission: &Submission) -> Json<SubmitResponse> {
    Json(SubmitResponse {
        message: "Nazm submitted successfully".to_string(),
        poem_id: submission.id,
    })
}

fn acted(message: impl Into<String>, poem: Submission) -> Json<PoemActionResponse> {
    Json(PoemActionResponse {
        message: message.into(),
        poem,
    })
}

/// Submit a poem typed into the form.
pub async fn submit_manual(
    State(state): State<Arc<ApiState>>,
    CurrentUser(user): CurrentUser,
    Json(draft): Json<SubmissionDraft>,
) -> Result<Json<SubmitResponse>, ApiError> {
    let mut engine = state.engine.write().await;
    let submission = engine
        .create_submission(&user, draft, None)
        .await
        .map_err(engine_error)?;

    Ok(submitted(&submission))
}

/// Submit a document or recording.
///
/// Multipart fields: `file` (the upload) and `poem_json` (the draft as JSON).
pub async fn submit_upload(
    State(state): State<Arc<ApiState>>,
    CurrentUser(user): CurrentUser,
    mut multipart: Multipart,
) -> Result<Json<SubmitResponse>, ApiError> {
    let mut file = None;
    let mut draft_json = None;

    while let Some(field) = multipart.next_field().await.map_err(multipart_error)? {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "file" => {
                let file_name = field.file_name().unwrap_or_default().to_string();
                let bytes = field.bytes().await.map_err(multipart_error)?;
                file = Some(UploadedFile { file_name, bytes });
            }
            "poem_json" => {
                draft_json = Some(field.text().await.map_err(multipart_error)?);
            }
            _ => {}
        }
    }

    let draft_json = draft_json
        .ok_or_else(|| (StatusCode::BAD_REQUEST, "Missing poem_json field".to_string()))?;
    let draft: SubmissionDraft = serde_json::from_str(&draft_json)
        .map_err(|e| (StatusCode::BAD_REQUEST, format!("Invalid poem JSON: {e}")))?;
    let file = file.ok_or_else(|| (StatusCode::BAD_REQUEST, "Missing file field".to_string()))?;

    let mut engine = state.engine.write().await;
    let submission = engine
        .create_submission(&user, draft, Some(file))
        .await
        .map_err(engine_error)?;

    Ok(submitted(&submission))
}

/// List submissions.
///
/// Non-admins only ever see their own; the `status` and `approved` filters
/// are honoured for admins only.
pub async fn list_poems(
    State(state): State<Arc<ApiState>>,
    CurrentUser(user): CurrentUser,
    Query(query): Query<ListQuery>,
) -> Result<Json<PoemListResponse>, ApiError> {
    let page = PageRequest::new(query.page, query.per_page).map_err(engine_error)?;

    let mut filter = SubmissionFilter {
        kind: query.kind,
        language: query.language,
        status: None,
        approved: None,
        featured: query.featured,
        author_id: query.author_id,
    };

    if user.is_admin() {
        filter.status = query.status;
        filter.approved = query.approved;
    } else {
        if filter.author_id.is_some_and(|id| id != user.id) {
            return Err((
                StatusCode::FORBIDDEN,
                "Cannot list another author's poems".to_string(),
            ));
        }
        filter.author_id = Some(user.id);
    }

    let engine = state.engine.read().await;
    let result = engine
        .list_submissions(&filter, page)
        .await
        .map_err(engine_error)?;

    Ok(Json(PoemListResponse {
        poems: result.items,
        total: result.total,
        page: result.page,
        per_page: result.per_page,
    }))
}

/// Top-rated approved poems.
pub async fn best_poems(
    State(state): State<Arc<ApiState>>,
    CurrentUser(_user): CurrentUser,
    Query(query): Query<BestQuery>,
) -> Result<Json<PoemListResponse>, ApiError> {
    let limit = query.limit.unwrap_or(DEFAULT_BEST_LIMIT);

    let engine = state.engine.read().await;
    let poems = engine.best_submissions(limit).await.map_err(engine_error)?;

    Ok(Json(PoemListResponse {
        total: poems.len(),
        page: 1,
        per_page: poems.len() as u32,
        poems,
    }))
}

pub async fn featured_poem(
    State(state): State<Arc<ApiState>>,
    CurrentUser(_user): CurrentUser,
) -> Result<Json<FeaturedResponse>, ApiError> {
    let engine = state.engine.read().await;
    let poem = engine.featured_submission().await.map_err(engine_error)?;

    Ok(Json(FeaturedResponse { poem }))
}

pub async fn get_poem(
    State(state): State<Arc<ApiState>>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<String>,
) -> Result<Json<Submission>, ApiError> {
    let id = parse_id(&id, "poem")?;

    let engine = state.engine.read().await;
    let poem = engine.get_submission(id).await.map_err(engine_error)?;

    if !poem.is_visible_to(&user) {
        return Err((StatusCode::FORBIDDEN, "Access denied".to_string()));
    }

    Ok(Json(poem))
}

pub async fn download_poem(
    State(state): State<Arc<ApiState>>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<String>,
) -> Result<Json<DownloadResponse>, ApiError> {
    let id = parse_id(&id, "poem")?;

    let engine = state.engine.read().await;
    let poem = engine.get_submission(id).await.map_err(engine_error)?;
    if !poem.is_visible_to(&user) {
        return Err((StatusCode::FORBIDDEN, "Access denied".to_string()));
    }

    let link = engine.download(id).await.map_err(engine_error)?;

    Ok(Json(DownloadResponse {
        url: link.url,
        expires_at: link.expires_at,
    }))
}

pub async fn approve_poem(
    State(state): State<Arc<ApiState>>,
    AdminUser(_admin): AdminUser,
    Path(id): Path<String>,
    Json(request): Json<ApproveRequest>,
) -> Result<Json<PoemActionResponse>, ApiError> {
    let id = parse_id(&id, "poem")?;

    let mut engine = state.engine.write().await;
    let poem = engine
        .approve(id, request.approved)
        .await
        .map_err(engine_error)?;

    Ok(acted("Poem approval updated successfully", poem))
}

pub async fn rate_poem(
    State(state): State<Arc<ApiState>>,
    AdminUser(_admin): AdminUser,
    Path(id): Path<String>,
    Json(request): Json<RateRequest>,
) -> Result<Json<PoemActionResponse>, ApiError> {
    let id = parse_id(&id, "poem")?;

    let mut engine = state.engine.write().await;
    let poem = engine.rate(id, request.rating).await.map_err(engine_error)?;

    Ok(acted("Poem rated successfully", poem))
}

pub async fn set_poem_status(
    State(state): State<Arc<ApiState>>,
    AdminUser(_admin): AdminUser,
    Path(id): Path<String>,
    Json(request): Json<StatusRequest>,
) -> Result<Json<PoemActionResponse>, ApiError> {
    let id = parse_id(&id, "poem")?;

    let mut engine = state.engine.write().await;
    let poem = engine
        .set_status(id, request.status)
        .await
        .map_err(engine_error)?;

    Ok(acted("Poem status updated successfully", poem))
}

/// Attach araz. Multipart fields: `araz_content` (text), `araz_file` (document).
pub async fn add_araz(
    State(state): State<Arc<ApiState>>,
    AdminUser(_admin): AdminUser,
    Path(id): Path<String>,
    mut multipart: Multipart,
) -> Result<Json<PoemActionResponse>, ApiError> {
    let id = parse_id(&id, "poem")?;

    let mut content = None;
    let mut file = None;

    while let Some(field) = multipart.next_field().await.map_err(multipart_error)? {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "araz_content" => {
                content = Some(field.text().await.map_err(multipart_error)?);
            }
            "araz_file" => {
                let file_name = field.file_name().unwrap_or_default().to_string();
                let bytes = field.bytes().await.map_err(multipart_error)?;
                // Browsers send an empty part when no file was picked.
                if !file_name.is_empty() || !bytes.is_empty() {
                    file = Some(UploadedFile { file_name, bytes });
                }
            }
            _ => {}
        }
    }

    let mut engine = state.engine.write().await;
    let poem = engine
        .add_araz(id, content, file)
        .await
        .map_err(engine_error)?;

    Ok(acted("Araz added successfully", poem))
}

pub async fn feature_poem(
    State(state): State<Arc<ApiState>>,
    AdminUser(_admin): AdminUser,
    Path(id): Path<String>,
    Json(request): Json<FeatureRequest>,
) -> Result<Json<PoemActionResponse>, ApiError> {
    let id = parse_id(&id, "poem")?;

    let mut engine = state.engine.write().await;
    let poem = engine
        .feature(id, request.featured)
        .await
        .map_err(engine_error)?;

    let message = if request.featured {
        "Poem featured successfully"
    } else {
        "Poem unfeatured successfully"
    };

    Ok(acted(message, poem))
}
