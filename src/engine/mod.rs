//! The Nazm engine: submission lifecycle over the document and blob stores.
//!
//! The engine owns every state change:
//! - accounts and poet profiles ([`accounts`])
//! - submissions, their moderation, rating, araz and featuring (this module)
//! - the opening verse catalog ([`verses`])
//! - leaderboard aggregation ([`leaderboard`])
//!
//! Changes that touch more than one document run in a single store
//! transaction, and the profile aggregates (`points`, `poemsCount`) are
//! recomputed from the author's submissions inside it. Re-running an
//! approval or a rating therefore never double-counts.
//!
//! Blob writes cannot join a transaction. Uploads are stored before the
//! record that references them; if the record write fails the blob is
//! removed again, and blobs detached by a committed change are removed
//! after the commit. Both removals are best-effort.

pub mod accounts;
pub mod config;
pub mod leaderboard;
pub mod upload;
pub mod verses;

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Deserialize;
use thiserror::Error;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::auth::AuthError;
use crate::blob::{BlobError, BlobStore};
use crate::model::{
    ArazStatus, Author, DayOutOfRange, FeaturedSlot, InvalidRating, NotApproved, PoetProfile,
    Rating, Submission, SubmissionMethod, SubmissionType, UnknownLanguage, User, Verse,
};
use crate::store::{DocumentStore, DocumentTxn, StoreError};

pub use accounts::{AdminSeed, NewAccount};
pub use config::EngineConfig;
pub use leaderboard::{AuthorTotals, LeaderboardEntry};
pub use upload::{UploadKind, UploadRejected, UploadedFile};
pub use verses::{NewVerse, VerseFilter, VersePatch};

/// Default and maximum page size for submission listings.
pub const DEFAULT_PER_PAGE: u32 = 20;
pub const MAX_PER_PAGE: u32 = 100;

/// Default and maximum size of the best-submissions list.
pub const DEFAULT_BEST_LIMIT: usize = 3;
pub const MAX_BEST_LIMIT: usize = 50;

/// Errors that can occur in engine operations.
#[derive(Error, Debug)]
pub enum EngineError {
    #[error("Storage error: {0}")]
    Storage(#[from] StoreError),

    #[error("Blob storage error: {0}")]
    Blob(#[from] BlobError),

    #[error("Auth error: {0}")]
    Auth(#[from] AuthError),

    #[error("Submission not found: {0}")]
    SubmissionNotFound(Uuid),

    #[error("Verse not found: {0}")]
    VerseNotFound(Uuid),

    #[error("User not found: {0}")]
    UserNotFound(Uuid),

    #[error("{0}")]
    Validation(String),

    #[error("{0}")]
    InvalidSubmissionState(String),

    #[error("Email already registered: {0}")]
    EmailInUse(String),

    #[error("Invalid email or password")]
    InvalidCredentials,
}

pub type Result<T> = std::result::Result<T, EngineError>;

impl From<NotApproved> for EngineError {
    fn from(err: NotApproved) -> Self {
        Self::InvalidSubmissionState(err.to_string())
    }
}

impl From<InvalidRating> for EngineError {
    fn from(err: InvalidRating) -> Self {
        Self::Validation(err.to_string())
    }
}

impl From<UploadRejected> for EngineError {
    fn from(err: UploadRejected) -> Self {
        Self::Validation(err.to_string())
    }
}

impl From<UnknownLanguage> for EngineError {
    fn from(err: UnknownLanguage) -> Self {
        Self::Validation(err.to_string())
    }
}

impl From<DayOutOfRange> for EngineError {
    fn from(err: DayOutOfRange) -> Self {
        Self::Validation(err.to_string())
    }
}

/// Fields a client supplies for a new submission.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmissionDraft {
    #[serde(rename = "type")]
    pub kind: SubmissionType,
    pub submission_method: SubmissionMethod,
    pub language: String,
    #[serde(default)]
    pub content: Option<String>,
    /// Id of the opening verse this poem answers.
    #[serde(default)]
    pub inspired_by: Option<String>,
}

/// Listing filter. All present fields must match.
#[derive(Debug, Clone, Default)]
pub struct SubmissionFilter {
    pub kind: Option<SubmissionType>,
    pub language: Option<String>,
    pub status: Option<ArazStatus>,
    pub approved: Option<bool>,
    pub featured: Option<bool>,
    pub author_id: Option<Uuid>,
}

impl SubmissionFilter {
    pub fn matches(&self, submission: &Submission) -> bool {
        self.kind.map_or(true, |k| submission.kind == k)
            && self
                .language
                .as_deref()
                .map_or(true, |l| submission.language == l)
            && self.status.map_or(true, |s| submission.status == s)
            && self.approved.map_or(true, |a| submission.approved == a)
            && self.featured.map_or(true, |f| submission.featured == f)
            && self
                .author_id
                .map_or(true, |id| submission.author.user_id == id)
    }
}

/// Requested page of a listing, 1-based.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    pub page: u32,
    pub per_page: u32,
}

impl Default for PageRequest {
    fn default() -> Self {
        Self {
            page: 1,
            per_page: DEFAULT_PER_PAGE,
        }
    }
}

impl PageRequest {
    pub fn new(page: Option<u32>, per_page: Option<u32>) -> Result<Self> {
        let page = page.unwrap_or(1);
        let per_page = per_page.unwrap_or(DEFAULT_PER_PAGE);

        if page == 0 {
            return Err(EngineError::Validation("page must be at least 1".into()));
        }
        if !(1..=MAX_PER_PAGE).contains(&per_page) {
            return Err(EngineError::Validation(format!(
                "perPage must be between 1 and {MAX_PER_PAGE}"
            )));
        }

        Ok(Self { page, per_page })
    }

    fn offset(&self) -> usize {
        (self.page as usize - 1) * self.per_page as usize
    }
}

/// One page of submissions plus the total match count.
#[derive(Debug, Clone)]
pub struct SubmissionPage {
    pub items: Vec<Submission>,
    pub total: usize,
    pub page: u32,
    pub per_page: u32,
}

/// Time-limited URL for a submission's primary artifact.
#[derive(Debug, Clone)]
pub struct DownloadLink {
    pub url: String,
    pub expires_at: DateTime<Utc>,
}

/// Submission counts for the status endpoint.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SubmissionCounts {
    pub total: usize,
    pub pending: usize,
    pub approved: usize,
    pub rated: usize,
}

/// The submission and review engine.
pub struct NazmEngine {
    store: DocumentStore,
    blobs: Arc<dyn BlobStore>,
    config: EngineConfig,
}

impl NazmEngine {
    /// Open the document store under the configured data directory.
    pub async fn open(config: EngineConfig, blobs: Arc<dyn BlobStore>) -> Result<Self> {
        let store = DocumentStore::open(&config.database_path()).await?;

        info!(
            data_dir = %config.data_dir.display(),
            blob_backend = blobs.backend(),
            "Nazm engine initialized"
        );

        Ok(Self {
            store,
            blobs,
            config,
        })
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn blob_backend(&self) -> &'static str {
        self.blobs.backend()
    }

    /// Create a submission for `author`.
    ///
    /// Manual submissions carry inline `content`; upload and recording
    /// submissions carry exactly one file, which is stored at
    /// `poems/{id}/{name}` before the record is written.
    pub async fn create_submission(
        &mut self,
        author: &User,
        draft: SubmissionDraft,
        file: Option<UploadedFile>,
    ) -> Result<Submission> {
        let language = draft.language.trim();
        if language.is_empty() {
            return Err(EngineError::Validation("Language is required".into()));
        }

        let inspired_by = match draft.inspired_by.as_deref().map(str::trim) {
            Some(raw) if !raw.is_empty() => Some(self.resolve_verse(raw).await?),
            _ => None,
        };

        let now = Utc::now();
        let id = Uuid::new_v4();
        let mut submission = Submission::new(
            id,
            draft.kind,
            draft.submission_method,
            language.to_string(),
            Author {
                user_id: author.id,
                name: author.name.clone(),
            },
            now,
        );
        submission.inspired_by = inspired_by;

        let stored = match (UploadKind::for_method(draft.submission_method), file) {
            (None, Some(_)) => {
                return Err(EngineError::Validation(
                    "Manual submissions take inline content, not a file".into(),
                ));
            }
            (None, None) => {
                let content = draft
                    .content
                    .filter(|c| !c.trim().is_empty())
                    .ok_or_else(|| {
                        EngineError::Validation("Content is required for manual submissions".into())
                    })?;
                submission.content = Some(content);
                None
            }
            (Some(_), None) => {
                return Err(EngineError::Validation(format!(
                    "A file is required for {} submissions",
                    draft.submission_method
                )));
            }
            (Some(kind), Some(file)) => {
                let checked = kind.check(&file)?;
                let path = format!("poems/{}/{}", id, checked.file_name);
                self.blobs
                    .put(&path, file.bytes, checked.content_type)
                    .await?;
                submission.attach_artifact(path.clone());
                Some(path)
            }
        };

        if let Err(e) = self.store.put(&submission).await {
            if let Some(path) = stored {
                self.discard_blob(&path).await;
            }
            return Err(e.into());
        }

        info!(
            submission_id = %id,
            author_id = %author.id,
            kind = %submission.kind,
            method = %submission.submission_method,
            "Submission created"
        );

        Ok(submission)
    }

    pub async fn get_submission(&self, id: Uuid) -> Result<Submission> {
        self.store
            .get::<Submission>(&id.to_string())
            .await?
            .ok_or(EngineError::SubmissionNotFound(id))
    }

    /// Matching submissions in creation order.
    pub async fn list_submissions(
        &self,
        filter: &SubmissionFilter,
        page: PageRequest,
    ) -> Result<SubmissionPage> {
        let matching: Vec<Submission> = self
            .store
            .list::<Submission>()
            .await?
            .into_iter()
            .filter(|s| filter.matches(s))
            .collect();

        let total = matching.len();
        let items = matching
            .into_iter()
            .skip(page.offset())
            .take(page.per_page as usize)
            .collect();

        Ok(SubmissionPage {
            items,
            total,
            page: page.page,
            per_page: page.per_page,
        })
    }

    /// Approve or withdraw approval.
    ///
    /// Withdrawal clears rating, araz and the featured slot. Either way the
    /// author's profile totals are recomputed in the same transaction.
    pub async fn approve(&mut self, id: Uuid, approved: bool) -> Result<Submission> {
        let now = Utc::now();
        let mut txn = self.store.begin().await?;
        let mut submission = load_submission(&mut txn, id).await?;

        let mut detached = None;
        if approved {
            if !submission.approve(now) {
                debug!(submission_id = %id, "Submission already approved");
            }
        } else {
            detached = submission.unapprove(now);
            release_featured_slot(&mut txn, id, now).await?;
        }

        txn.put(&submission).await?;
        refresh_profile(&mut txn, submission.author.user_id, now).await?;
        txn.commit().await?;

        if let Some(path) = detached {
            self.discard_blob(&path).await;
        }

        info!(submission_id = %id, approved, "Submission moderated");

        Ok(submission)
    }

    /// Set or replace the rating of an approved submission.
    pub async fn rate(&mut self, id: Uuid, stars: f64) -> Result<Submission> {
        let rating = Rating::new(stars)?;
        let now = Utc::now();

        let mut txn = self.store.begin().await?;
        let mut submission = load_submission(&mut txn, id).await?;
        let previous = submission.rate(rating, now)?;

        txn.put(&submission).await?;
        let profile = refresh_profile(&mut txn, submission.author.user_id, now).await?;
        txn.commit().await?;

        info!(
            submission_id = %id,
            rating = %rating,
            previous = ?previous.map(|r| r.stars()),
            author_points = ?profile.map(|p| p.points),
            "Submission rated"
        );

        Ok(submission)
    }

    /// Overwrite the araz status.
    pub async fn set_status(&mut self, id: Uuid, status: ArazStatus) -> Result<Submission> {
        let mut submission = self.get_submission(id).await?;
        submission.set_status(status, Utc::now());
        self.store.put(&submission).await?;

        info!(submission_id = %id, status = %status, "Submission status set");

        Ok(submission)
    }

    /// Attach araz text and/or an araz file to an approved submission.
    pub async fn add_araz(
        &mut self,
        id: Uuid,
        content: Option<String>,
        file: Option<UploadedFile>,
    ) -> Result<Submission> {
        let content = content.filter(|c| !c.trim().is_empty());
        if content.is_none() && file.is_none() {
            return Err(EngineError::Validation(
                "Araz content or file required".into(),
            ));
        }

        let mut submission = self.get_submission(id).await?;
        if !submission.approved {
            return Err(NotApproved("add araz").into());
        }

        let stored = match file {
            Some(file) => {
                let checked = UploadKind::Text.check(&file)?;
                let path = format!("poems/{}/araz/{}", id, checked.file_name);
                self.blobs
                    .put(&path, file.bytes, checked.content_type)
                    .await?;
                Some(path)
            }
            None => None,
        };

        let cleanup = ArazCleanup::new(submission.araz_file_name.as_deref(), stored.as_deref());

        submission.add_araz(content, stored, Utc::now())?;

        if let Err(e) = self.store.put(&submission).await {
            if let Some(path) = cleanup.on_failure {
                self.discard_blob(&path).await;
            }
            return Err(e.into());
        }

        if let Some(old) = cleanup.on_success {
            self.discard_blob(&old).await;
        }

        info!(
            submission_id = %id,
            has_content = submission.araz_content.is_some(),
            has_file = submission.araz_file_name.is_some(),
            "Araz added"
        );

        Ok(submission)
    }

    /// Feature or unfeature an approved submission.
    ///
    /// At most one submission is featured: featuring moves the slot and
    /// unfeatures the previous holder in the same transaction.
    pub async fn feature(&mut self, id: Uuid, featured: bool) -> Result<Submission> {
        let now = Utc::now();
        let mut txn = self.store.begin().await?;
        let mut submission = load_submission(&mut txn, id).await?;

        if featured {
            submission.feature(now)?;

            let mut slot = txn
                .get::<FeaturedSlot>(FeaturedSlot::ID)
                .await?
                .unwrap_or_default();
            let previous = slot.submission_id;

            if let Some(prev_id) = previous.filter(|p| *p != id) {
                if let Some(mut prev) = txn.get::<Submission>(&prev_id.to_string()).await? {
                    prev.unfeature(now);
                    txn.put(&prev).await?;
                }
                debug!(previous = %prev_id, "Previous featured submission cleared");
            }

            slot.assign(id, now);
            txn.put(&slot).await?;
        } else {
            if !submission.approved {
                return Err(NotApproved("unfeature").into());
            }
            submission.unfeature(now);
            release_featured_slot(&mut txn, id, now).await?;
        }

        txn.put(&submission).await?;
        txn.commit().await?;

        info!(submission_id = %id, featured, "Featured flag updated");

        Ok(submission)
    }

    /// The featured submission, if any.
    pub async fn featured_submission(&self) -> Result<Option<Submission>> {
        let slot = self
            .store
            .get::<FeaturedSlot>(FeaturedSlot::ID)
            .await?
            .unwrap_or_default();

        match slot.submission_id {
            Some(id) => Ok(self.store.get::<Submission>(&id.to_string()).await?),
            None => Ok(None),
        }
    }

    /// Highest-rated approved submissions; ties keep creation order.
    pub async fn best_submissions(&self, limit: usize) -> Result<Vec<Submission>> {
        let limit = limit.clamp(1, MAX_BEST_LIMIT);

        let mut rated: Vec<Submission> = self
            .store
            .list::<Submission>()
            .await?
            .into_iter()
            .filter(|s| s.approved && s.rating.is_some())
            .collect();
        rated.sort_by(|a, b| b.rating.cmp(&a.rating));
        rated.truncate(limit);

        Ok(rated)
    }

    /// Presigned URL for the submission's primary artifact.
    pub async fn download(&self, id: Uuid) -> Result<DownloadLink> {
        let submission = self.get_submission(id).await?;
        let path = submission
            .primary_artifact()
            .ok_or(EngineError::Validation("No file available for download".into()))?;

        let ttl = self.config.presign_ttl;
        let url = self.blobs.presign(path, ttl).await?;
        let expires_at = Utc::now()
            + chrono::Duration::from_std(ttl)
                .map_err(|e| BlobError::InvalidExpiry(e.to_string()))?;

        debug!(submission_id = %id, path = %path, "Download link issued");

        Ok(DownloadLink { url, expires_at })
    }

    /// Leaderboard for one submission type.
    pub async fn leaderboard(&self, kind: SubmissionType) -> Result<Vec<LeaderboardEntry>> {
        let submissions = self.store.list::<Submission>().await?;
        Ok(leaderboard::rank(kind, &submissions))
    }

    pub async fn submission_counts(&self) -> Result<SubmissionCounts> {
        let submissions = self.store.list::<Submission>().await?;

        Ok(submissions
            .iter()
            .fold(SubmissionCounts::default(), |mut counts, s| {
                counts.total += 1;
                if s.approved {
                    counts.approved += 1;
                } else {
                    counts.pending += 1;
                }
                if s.rating.is_some() {
                    counts.rated += 1;
                }
                counts
            }))
    }

    async fn resolve_verse(&self, raw: &str) -> Result<Uuid> {
        let id = Uuid::parse_str(raw)
            .map_err(|_| EngineError::Validation(format!("inspiredBy is not a verse id: {raw}")))?;

        match self.store.get::<Verse>(&id.to_string()).await? {
            Some(_) => Ok(id),
            None => Err(EngineError::Validation(format!("Invalid inspiredBy verse: {id}"))),
        }
    }

    /// Remove a blob, logging instead of failing.
    async fn discard_blob(&self, path: &str) {
        if let Err(e) = self.blobs.delete(path).await {
            warn!(path = %path, error = %e, "Failed to remove orphaned blob");
        }
    }
}

async fn load_submission(txn: &mut DocumentTxn, id: Uuid) -> Result<Submission> {
    txn.get::<Submission>(&id.to_string())
        .await?
        .ok_or(EngineError::SubmissionNotFound(id))
}

/// Blobs orphaned by an araz file change.
#[derive(Debug, PartialEq, Eq)]
struct ArazCleanup {
    /// New blob to drop if the record write fails. `None` when it reused the
    /// current key, since the put already replaced the only copy.
    on_failure: Option<String>,
    /// Previous blob to drop once the record points elsewhere.
    on_success: Option<String>,
}

impl ArazCleanup {
    fn new(previous: Option<&str>, stored: Option<&str>) -> Self {
        let Some(stored) = stored.filter(|s| previous != Some(*s)) else {
            return Self {
                on_failure: None,
                on_success: None,
            };
        };

        Self {
            on_failure: Some(stored.to_string()),
            on_success: previous.map(str::to_string),
        }
    }
}

/// Empty the featured slot if it points at `id`.
async fn release_featured_slot(txn: &mut DocumentTxn, id: Uuid, now: DateTime<Utc>) -> Result<()> {
    if let Some(mut slot) = txn.get::<FeaturedSlot>(FeaturedSlot::ID).await? {
        if slot.swap(Some(id), None, now) {
            txn.put(&slot).await?;
        }
    }
    Ok(())
}

/// Recompute an author's profile totals from their submissions.
async fn refresh_profile(
    txn: &mut DocumentTxn,
    user_id: Uuid,
    now: DateTime<Utc>,
) -> Result<Option<PoetProfile>> {
    let Some(mut profile) = txn.get::<PoetProfile>(&user_id.to_string()).await? else {
        warn!(user_id = %user_id, "No poet profile for submission author");
        return Ok(None);
    };

    let submissions = txn.list::<Submission>().await?;
    let totals =
        AuthorTotals::tally(submissions.iter().filter(|s| s.author.user_id == user_id));

    profile.points = totals.points;
    profile.poems_count = totals.poems_count;
    profile.updated_at = now;
    txn.put(&profile).await?;

    Ok(Some(profile))
}
