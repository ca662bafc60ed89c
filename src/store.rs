//! Embedded document store.
//!
//! Every record the service keeps (users, poet profiles, submissions, verses,
//! the featured slot) is a typed [`Document`] serialized as JSON into a single
//! SQLite table keyed by `(kind, id)`. Insertion order is preserved through a
//! monotonically increasing row sequence, so listings come back oldest first.
//!
//! Multi-document changes go through [`DocumentTxn`], which wraps a SQLite
//! transaction: either every write in it lands or none does.

use std::path::Path;

use serde::de::DeserializeOwned;
use serde::Serialize;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions};
use sqlx::{Sqlite, SqliteConnection, SqlitePool, Transaction};
use thiserror::Error;
use tracing::debug;

/// Errors raised by the document store.
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Serialization error for {kind}/{id}: {source}")]
    Serialization {
        kind: &'static str,
        id: String,
        #[source]
        source: serde_json::Error,
    },
}

pub type Result<T> = std::result::Result<T, StoreError>;

/// A value that can be stored in the [`DocumentStore`].
pub trait Document: Serialize + DeserializeOwned + Send + Sync {
    /// Collection name, used as the `kind` column.
    const TYPE_PREFIX: &'static str;

    /// Identifier unique within the collection.
    fn document_id(&self) -> String;
}

const SCHEMA: &str = "CREATE TABLE IF NOT EXISTS documents (
    seq  INTEGER PRIMARY KEY AUTOINCREMENT,
    kind TEXT NOT NULL,
    id   TEXT NOT NULL,
    body TEXT NOT NULL,
    UNIQUE (kind, id)
)";

/// Handle to the document database.
#[derive(Clone)]
pub struct DocumentStore {
    pool: SqlitePool,
}

impl DocumentStore {
    /// Open (or create) the database file at `path`.
    pub async fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(sqlx::Error::Io)?;
        }

        let options = SqliteConnectOptions::new()
            .filename(path)
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal);

        let pool = SqlitePoolOptions::new()
            .max_connections(4)
            .connect_with(options)
            .await?;

        sqlx::query(SCHEMA).execute(&pool).await?;

        debug!(path = %path.display(), "Document store opened");

        Ok(Self { pool })
    }

    /// Start a transaction.
    pub async fn begin(&self) -> Result<DocumentTxn> {
        Ok(DocumentTxn {
            tx: self.pool.begin().await?,
        })
    }

    /// Get a document by id.
    pub async fn get<D: Document>(&self, id: &str) -> Result<Option<D>> {
        let mut conn = self.pool.acquire().await?;
        fetch(&mut conn, id).await
    }

    /// List every document of a kind, oldest first.
    pub async fn list<D: Document>(&self) -> Result<Vec<D>> {
        let mut conn = self.pool.acquire().await?;
        fetch_all(&mut conn).await
    }

    /// Insert or replace a single document.
    pub async fn put<D: Document>(&self, doc: &D) -> Result<()> {
        let mut conn = self.pool.acquire().await?;
        upsert(&mut conn, doc).await
    }

    /// Delete a document. Returns whether anything was removed.
    pub async fn delete<D: Document>(&self, id: &str) -> Result<bool> {
        let mut conn = self.pool.acquire().await?;
        remove::<D>(&mut conn, id).await
    }
}

/// An open transaction over the document store.
///
/// Dropping it without calling [`DocumentTxn::commit`] rolls back.
pub struct DocumentTxn {
    tx: Transaction<'static, Sqlite>,
}

impl DocumentTxn {
    pub async fn get<D: Document>(&mut self, id: &str) -> Result<Option<D>> {
        fetch(&mut self.tx, id).await
    }

    pub async fn list<D: Document>(&mut self) -> Result<Vec<D>> {
        fetch_all(&mut self.tx).await
    }

    pub async fn put<D: Document>(&mut self, doc: &D) -> Result<()> {
        upsert(&mut self.tx, doc).await
    }

    pub async fn delete<D: Document>(&mut self, id: &str) -> Result<bool> {
        remove::<D>(&mut self.tx, id).await
    }

    pub async fn commit(self) -> Result<()> {
        self.tx.commit().await?;
        Ok(())
    }
}

async fn fetch<D: Document>(conn: &mut SqliteConnection, id: &str) -> Result<Option<D>> {
    let body: Option<String> =
        sqlx::query_scalar("SELECT body FROM documents WHERE kind = ?1 AND id = ?2")
            .bind(D::TYPE_PREFIX)
            .bind(id)
            .fetch_optional(conn)
            .await?;

    body.map(|body| decode::<D>(id, &body)).transpose()
}

async fn fetch_all<D: Document>(conn: &mut SqliteConnection) -> Result<Vec<D>> {
    let rows: Vec<(String, String)> =
        sqlx::query_as("SELECT id, body FROM documents WHERE kind = ?1 ORDER BY seq")
            .bind(D::TYPE_PREFIX)
            .fetch_all(conn)
            .await?;

    rows.iter().map(|(id, body)| decode::<D>(id, body)).collect()
}

async fn upsert<D: Document>(conn: &mut SqliteConnection, doc: &D) -> Result<()> {
    let id = doc.document_id();
    let body = serde_json::to_string(doc).map_err(|source| StoreError::Serialization {
        kind: D::TYPE_PREFIX,
        id: id.clone(),
        source,
    })?;

    sqlx::query(
        "INSERT INTO documents (kind, id, body) VALUES (?1, ?2, ?3)
         ON CONFLICT (kind, id) DO UPDATE SET body = excluded.body",
    )
    .bind(D::TYPE_PREFIX)
    .bind(&id)
    .bind(body)
    .execute(conn)
    .await?;

    Ok(())
}

async fn remove<D: Document>(conn: &mut SqliteConnection, id: &str) -> Result<bool> {
    let result = sqlx::query("DELETE FROM documents WHERE kind = ?1 AND id = ?2")
        .bind(D::TYPE_PREFIX)
        .bind(id)
        .execute(conn)
        .await?;

    Ok(result.rows_affected() > 0)
}

fn decode<D: Document>(id: &str, body: &str) -> Result<D> {
    serde_json::from_str(body).map_err(|source| StoreError::Serialization {
        kind: D::TYPE_PREFIX,
        id: id.to_string(),
        source,
    })
}
