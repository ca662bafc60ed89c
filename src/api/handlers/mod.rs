//! API request handlers.

pub mod auth;
pub mod leaderboard;
pub mod poems;
pub mod poets;
pub mod status;
pub mod verses;

use axum::http::StatusCode;
use serde::Serialize;
use tracing::error;
use uuid::Uuid;

use crate::engine::EngineError;

/// Error half of every handler result.
pub type ApiError = (StatusCode, String);

/// Plain acknowledgement body.
#[derive(Serialize)]
pub struct MessageResponse {
    pub message: String,
}

impl MessageResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// Map an engine error onto a status code and client-facing message.
pub fn engine_error(err: EngineError) -> ApiError {
    let status = match &err {
        EngineError::Validation(_) | EngineError::InvalidSubmissionState(_) => {
            StatusCode::BAD_REQUEST
        }
        EngineError::SubmissionNotFound(_)
        | EngineError::VerseNotFound(_)
        | EngineError::UserNotFound(_) => StatusCode::NOT_FOUND,
        EngineError::EmailInUse(_) => StatusCode::CONFLICT,
        EngineError::InvalidCredentials => StatusCode::UNAUTHORIZED,
        EngineError::Storage(_) | EngineError::Blob(_) | EngineError::Auth(_) => {
            error!(error = %err, "Request failed");
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Internal server error".to_string(),
            );
        }
    };

    (status, err.to_string())
}

/// Parse a path id.
pub fn parse_id(raw: &str, what: &str) -> Result<Uuid, ApiError> {
    Uuid::parse_str(raw).map_err(|_| (StatusCode::BAD_REQUEST, format!("Invalid {what} ID")))
}
