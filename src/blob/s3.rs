//! AWS S3 blob backend.

use std::time::Duration;

use async_trait::async_trait;
use aws_config::BehaviorVersion;
use aws_sdk_s3::error::DisplayErrorContext;
use aws_sdk_s3::presigning::PresigningConfig;
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::Client;
use bytes::Bytes;
use tracing::{debug, error, info};

use super::{BlobError, BlobStore, Result};

/// Blob store backed by a single S3 bucket.
pub struct S3BlobStore {
    client: Client,
    bucket: String,
}

impl S3BlobStore {
    /// Build a client from the ambient AWS configuration
    /// (`AWS_ACCESS_KEY_ID`, `AWS_SECRET_ACCESS_KEY`, `AWS_REGION`, profiles...).
    pub async fn new(bucket: String) -> Self {
        let config = aws_config::defaults(BehaviorVersion::latest()).load().await;
        let client = Client::new(&config);

        info!(bucket = %bucket, "S3 blob store initialized");

        Self { client, bucket }
    }

    fn backend_error<E>(op: &'static str, path: &str, err: E) -> BlobError
    where
        E: std::error::Error,
    {
        let message = DisplayErrorContext(&err).to_string();
        error!(op, path = %path, error = %message, "S3 request failed");
        BlobError::Backend {
            op,
            path: path.to_string(),
            message,
        }
    }
}

#[async_trait]
impl BlobStore for S3BlobStore {
    async fn put(&self, path: &str, bytes: Bytes, content_type: &str) -> Result<()> {
        debug!(bucket = %self.bucket, path = %path, size = bytes.len(), "Writing object");

        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(path)
            .body(ByteStream::from(bytes))
            .content_type(content_type)
            .send()
            .await
            .map_err(|e| Self::backend_error("put", path, e))?;

        Ok(())
    }

    async fn copy(&self, src: &str, dst: &str) -> Result<()> {
        debug!(bucket = %self.bucket, src = %src, dst = %dst, "Copying object");

        self.client
            .copy_object()
            .bucket(&self.bucket)
            .copy_source(format!("{}/{}", self.bucket, src))
            .key(dst)
            .send()
            .await
            .map_err(|e| Self::backend_error("copy", src, e))?;

        Ok(())
    }

    async fn delete(&self, path: &str) -> Result<()> {
        debug!(bucket = %self.bucket, path = %path, "Deleting object");

        self.client
            .delete_object()
            .bucket(&self.bucket)
            .key(path)
            .send()
            .await
            .map_err(|e| Self::backend_error("delete", path, e))?;

        Ok(())
    }

    async fn presign(&self, path: &str, ttl: Duration) -> Result<String> {
        let config =
            PresigningConfig::expires_in(ttl).map_err(|e| BlobError::InvalidExpiry(e.to_string()))?;

        let request = self
            .client
            .get_object()
            .bucket(&self.bucket)
            .key(path)
            .presigned(config)
            .await
            .map_err(|e| Self::backend_error("presign", path, e))?;

        Ok(request.uri().to_string())
    }

    fn backend(&self) -> &'static str {
        "s3"
    }
}
