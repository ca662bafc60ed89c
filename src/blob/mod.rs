//! Blob storage for uploaded poems, recordings and araz files.
//!
//! The engine only talks to the [`BlobStore`] trait. Two backends ship with
//! the crate:
//! - [`S3BlobStore`]: AWS S3 bucket, used in deployments
//! - [`MemoryBlobStore`]: process-local map, used by tests and local runs

pub mod memory;
pub mod s3;

use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use thiserror::Error;

pub use memory::MemoryBlobStore;
pub use s3::S3BlobStore;

/// Errors from a blob backend.
#[derive(Error, Debug)]
pub enum BlobError {
    #[error("Blob not found: {0}")]
    NotFound(String),

    #[error("Blob {op} failed for {path}: {message}")]
    Backend {
        op: &'static str,
        path: String,
        message: String,
    },

    #[error("Invalid presign expiry: {0}")]
    InvalidExpiry(String),
}

pub type Result<T> = std::result::Result<T, BlobError>;

/// Object storage operations the service relies on.
#[async_trait]
pub trait BlobStore: Send + Sync {
    /// Store `bytes` at `path`, replacing anything already there.
    async fn put(&self, path: &str, bytes: Bytes, content_type: &str) -> Result<()>;

    /// Copy an existing object to a new path.
    async fn copy(&self, src: &str, dst: &str) -> Result<()>;

    /// Remove an object. Removing a missing object is not an error.
    async fn delete(&self, path: &str) -> Result<()>;

    /// Time-limited retrieval URL for an object.
    async fn presign(&self, path: &str, ttl: Duration) -> Result<String>;

    /// Short backend name for logs and the status endpoint.
    fn backend(&self) -> &'static str;
}
