//! Nazm - poetry submission and moderation service.
//!
//! Poets register, submit poems as text, documents or audio recordings, and
//! administrators approve, rate, annotate ("araz") and feature them. Ratings
//! turn into author points, and a leaderboard ranks authors per submission
//! type.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                          HTTP API (axum)                        │
//! │  auth, poems, verses, leaderboard, poets                        │
//! └───────────────────────────────┬─────────────────────────────────┘
//!                                 │ Arc<RwLock<NazmEngine>>
//! ┌───────────────────────────────┴─────────────────────────────────┐
//! │                          ENGINE                                 │
//! │  submission lifecycle, accounts, verses, leaderboard            │
//! └───────────────┬─────────────────────────────────┬───────────────┘
//!                 │ transactions                    │ put/delete/presign
//! ┌───────────────┴───────────────┐ ┌───────────────┴───────────────┐
//! │  DOCUMENT STORE (SQLite)      │ │  BLOB STORE (S3 / memory)     │
//! └───────────────────────────────┘ └───────────────────────────────┘
//! ```

// === Core Modules ===

/// Stored documents.
pub mod model;

/// Embedded document store.
pub mod store;

/// Blob storage backends.
pub mod blob;

/// Password hashing and bearer tokens.
pub mod auth;

/// Submission lifecycle engine.
pub mod engine;

/// REST API.
pub mod api;

// === Re-exports ===

pub use engine::{EngineConfig, EngineError, NazmEngine};
pub use model::{ArazStatus, Rating, Submission, SubmissionMethod, SubmissionType};
