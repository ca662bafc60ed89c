//! REST API for the Nazm service.
//!
//! Provides HTTP endpoints for:
//! - Registration, login and the current account
//! - Poem submission (inline or multipart upload) and moderation
//! - Opening verse management
//! - Leaderboard and poet profiles

pub mod extract;
pub mod handlers;

use std::sync::Arc;

use axum::{
    extract::DefaultBodyLimit,
    routing::{get, patch, post, put},
    Router,
};
use tokio::sync::RwLock;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::auth::TokenIssuer;
use crate::engine::NazmEngine;

/// Request body cap: the largest upload (10 MiB recording) plus multipart framing.
pub const MAX_BODY_BYTES: usize = 12 * 1024 * 1024;

/// Shared state for API handlers.
pub struct ApiState {
    /// The submission engine. Mutations take the write lock.
    pub engine: Arc<RwLock<NazmEngine>>,

    /// Issues and verifies bearer tokens.
    pub tokens: TokenIssuer,
}

impl ApiState {
    pub fn new(engine: NazmEngine, tokens: TokenIssuer) -> Self {
        Self {
            engine: Arc::new(RwLock::new(engine)),
            tokens,
        }
    }
}

/// Build the API router with all routes.
pub fn router(state: Arc<ApiState>) -> Router {
    // Browser clients are served from a separate origin.
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        // Status/health
        .route("/api/v1/status", get(handlers::status::health))
        // Accounts
        .route("/api/v1/auth/register", post(handlers::auth::register))
        .route("/api/v1/auth/login", post(handlers::auth::login))
        .route("/api/v1/auth/me", get(handlers::auth::me))
        // Submissions
        .route("/api/v1/poems", get(handlers::poems::list_poems))
        .route("/api/v1/poems/manual", post(handlers::poems::submit_manual))
        .route("/api/v1/poems/upload", post(handlers::poems::submit_upload))
        .route("/api/v1/poems/best", get(handlers::poems::best_poems))
        .route("/api/v1/poems/featured", get(handlers::poems::featured_poem))
        .route("/api/v1/poems/:id", get(handlers::poems::get_poem))
        .route("/api/v1/poems/:id/download", get(handlers::poems::download_poem))
        .route("/api/v1/poems/:id/approve", put(handlers::poems::approve_poem))
        .route("/api/v1/poems/:id/rate", put(handlers::poems::rate_poem))
        .route("/api/v1/poems/:id/status", put(handlers::poems::set_poem_status))
        .route("/api/v1/poems/:id/araz", post(handlers::poems::add_araz))
        .route("/api/v1/poems/:id/feature", patch(handlers::poems::feature_poem))
        // Opening verses
        .route(
            "/api/v1/verses",
            get(handlers::verses::list_verses).post(handlers::verses::create_verse),
        )
        .route(
            "/api/v1/verses/:id",
            patch(handlers::verses::update_verse).delete(handlers::verses::delete_verse),
        )
        // Rankings and profiles
        .route("/api/v1/leaderboard", get(handlers::leaderboard::leaderboard))
        .route("/api/v1/poets/:id", get(handlers::poets::get_poet))
        // Middleware
        .layer(DefaultBodyLimit::max(MAX_BODY_BYTES))
        .layer(cors)
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(|request: &axum::http::Request<_>| {
                    tracing::info_span!(
                        "request",
                        method = %request.method(),
                        uri = %request.uri(),
                    )
                })
                // Only log responses that are not 2xx
                .on_request(())
                .on_response(|response: &axum::http::Response<_>, latency: std::time::Duration, _span: &tracing::Span| {
                    let status = response.status();
                    if !status.is_success() {
                        tracing::warn!(
                            status = %status,
                            latency_ms = latency.as_millis(),
                            "request failed"
                        );
                    }
                })
        )
        .with_state(state)
}

/// Start the API server.
pub async fn serve(state: Arc<ApiState>, bind_addr: &str) -> anyhow::Result<()> {
    let app = router(state);
    let listener = tokio::net::TcpListener::bind(bind_addr).await?;

    tracing::info!("Nazm API listening on {}", bind_addr);

    axum::serve(listener, app).await?;

    Ok(())
}
