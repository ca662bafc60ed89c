//! Engine configuration.

use std::path::PathBuf;
use std::time::Duration;

/// Default lifetime of download links (7 days, the S3 maximum).
pub const DEFAULT_PRESIGN_TTL: Duration = Duration::from_secs(7 * 24 * 60 * 60);

/// Configuration for a [`NazmEngine`](super::NazmEngine).
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Directory holding the document database.
    pub data_dir: PathBuf,

    /// Lifetime of presigned download links.
    pub presign_ttl: Duration,
}

impl EngineConfig {
    pub fn new(data_dir: PathBuf) -> Self {
        Self {
            data_dir,
            presign_ttl: DEFAULT_PRESIGN_TTL,
        }
    }

    /// Path of the SQLite database inside the data directory.
    pub fn database_path(&self) -> PathBuf {
        self.data_dir.join("nazm.db")
    }

    pub fn with_presign_ttl(mut self, ttl: Duration) -> Self {
        self.presign_ttl = ttl;
        self
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        let data_dir = directories::ProjectDirs::from("org", "nazm", "nazm")
            .map(|d| d.data_dir().to_path_buf())
            .unwrap_or_else(|| PathBuf::from(".nazm"));

        Self::new(data_dir)
    }
}
