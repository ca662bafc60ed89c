//! Registration, login and the current account.

use std::sync::Arc;

use axum::{extract::State, Json};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::api::extract::CurrentUser;
use crate::api::handlers::{engine_error, ApiError};
use crate::api::ApiState;
use crate::engine::{EngineError, NewAccount};
use crate::model::{Role, User};

/// Account as shown to clients.
#[derive(Serialize)]
pub struct UserResponse {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub role: Role,
}

impl From<&User> for UserResponse {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            name: user.name.clone(),
            email: user.email.clone(),
            role: user.role,
        }
    }
}

/// Token response, OAuth2 style.
#[derive(Serialize)]
pub struct TokenResponse {
    pub access_token: String,
    pub token_type: &'static str,
    pub user: UserResponse,
}

#[derive(Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

fn token_response(state: &ApiState, user: &User) -> Result<Json<TokenResponse>, ApiError> {
    let access_token = state
        .tokens
        .issue(user)
        .map_err(|e| engine_error(EngineError::Auth(e)))?;

    Ok(Json(TokenResponse {
        access_token,
        token_type: "bearer",
        user: UserResponse::from(user),
    }))
}

/// Create an account and log it in.
pub async fn register(
    State(state): State<Arc<ApiState>>,
    Json(account): Json<NewAccount>,
) -> Result<Json<TokenResponse>, ApiError> {
    let user = {
        let mut engine = state.engine.write().await;
        engine.register(account).await.map_err(engine_error)?
    };

    token_response(&state, &user)
}

pub async fn login(
    State(state): State<Arc<ApiState>>,
    Json(request): Json<LoginRequest>,
) -> Result<Json<TokenResponse>, ApiError> {
    let user = {
        let engine = state.engine.read().await;
        engine
            .authenticate(&request.email, &request.password)
            .await
            .map_err(engine_error)?
    };

    token_response(&state, &user)
}

pub async fn me(CurrentUser(user): CurrentUser) -> Json<UserResponse> {
    Json(UserResponse::from(&user))
}
