//! In-process blob backend.

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use tokio::sync::RwLock;

use super::{BlobError, BlobStore, Result};

#[derive(Debug, Clone)]
struct StoredBlob {
    bytes: Bytes,
    content_type: String,
}

/// Blob store that keeps objects in memory. Contents vanish with the process.
#[derive(Default)]
pub struct MemoryBlobStore {
    objects: RwLock<HashMap<String, StoredBlob>>,
}

impl MemoryBlobStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bytes and content type stored at `path`.
    pub async fn get(&self, path: &str) -> Option<(Bytes, String)> {
        self.objects
            .read()
            .await
            .get(path)
            .map(|blob| (blob.bytes.clone(), blob.content_type.clone()))
    }

    pub async fn contains(&self, path: &str) -> bool {
        self.objects.read().await.contains_key(path)
    }

    /// All stored paths, sorted.
    pub async fn paths(&self) -> Vec<String> {
        let mut paths: Vec<String> = self.objects.read().await.keys().cloned().collect();
        paths.sort();
        paths
    }
}

#[async_trait]
impl BlobStore for MemoryBlobStore {
    async fn put(&self, path: &str, bytes: Bytes, content_type: &str) -> Result<()> {
        self.objects.write().await.insert(
            path.to_string(),
            StoredBlob {
                bytes,
                content_type: content_type.to_string(),
            },
        );
        Ok(())
    }

    async fn copy(&self, src: &str, dst: &str) -> Result<()> {
        let mut objects = self.objects.write().await;
        let blob = objects
            .get(src)
            .cloned()
            .ok_or_else(|| BlobError::NotFound(src.to_string()))?;
        objects.insert(dst.to_string(), blob);
        Ok(())
    }

    async fn delete(&self, path: &str) -> Result<()> {
        self.objects.write().await.remove(path);
        Ok(())
    }

    async fn presign(&self, path: &str, ttl: Duration) -> Result<String> {
        if !self.contains(path).await {
            return Err(BlobError::NotFound(path.to_string()));
        }

        let ttl = chrono::Duration::from_std(ttl)
            .map_err(|e| BlobError::InvalidExpiry(e.to_string()))?;
        let expires = chrono::Utc::now() + ttl;

        Ok(format!("memory://{}?expires={}", path, expires.timestamp()))
    }

    fn backend(&self) -> &'static str {
        "memory"
    }
}
