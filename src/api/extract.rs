//! Extractors for the authenticated caller.

use std::sync::Arc;

use axum::extract::FromRequestParts;
use axum::http::header::AUTHORIZATION;
use axum::http::request::Parts;
use axum::http::{HeaderMap, StatusCode};
use tracing::debug;

use crate::api::handlers::{engine_error, ApiError};
use crate::api::ApiState;
use crate::model::User;

/// The user named by a valid bearer token.
///
/// The account is re-read on every request, so a token for a user that no
/// longer exists is rejected even before it expires.
pub struct CurrentUser(pub User);

/// A [`CurrentUser`] with the admin role.
pub struct AdminUser(pub User);

fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    let value = headers.get(AUTHORIZATION)?.to_str().ok()?;
    let (scheme, token) = value.split_once(' ')?;

    if scheme.eq_ignore_ascii_case("bearer") && !token.trim().is_empty() {
        Some(token.trim())
    } else {
        None
    }
}

fn unauthorized(message: &str) -> ApiError {
    (StatusCode::UNAUTHORIZED, message.to_string())
}

#[axum::async_trait]
impl FromRequestParts<Arc<ApiState>> for CurrentUser {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<ApiState>,
    ) -> Result<Self, Self::Rejection> {
        let token = bearer_token(&parts.headers)
            .ok_or_else(|| unauthorized("Missing bearer token"))?;

        let claims = state.tokens.verify(token).map_err(|e| {
            debug!(error = %e, "Rejected bearer token");
            unauthorized("Could not validate credentials")
        })?;
        let user_id = claims
            .user_id()
            .map_err(|_| unauthorized("Could not validate credentials"))?;

        let engine = state.engine.read().await;
        let user = engine
            .user(user_id)
            .await
            .map_err(engine_error)?
            .ok_or_else(|| unauthorized("Could not validate credentials"))?;

        Ok(CurrentUser(user))
    }
}

#[axum::async_trait]
impl FromRequestParts<Arc<ApiState>> for AdminUser {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<ApiState>,
    ) -> Result<Self, Self::Rejection> {
        let CurrentUser(user) = CurrentUser::from_request_parts(parts, state).await?;

        if !user.is_admin() {
            return Err((StatusCode::FORBIDDEN, "Admin access required".to_string()));
        }

        Ok(AdminUser(user))
    }
}
