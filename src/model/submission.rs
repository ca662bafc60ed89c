//! Submission document and its lifecycle transitions.
//!
//! A submission moves through two independent axes:
//! - `approved`: the moderation decision, gate for rating, araz and featuring
//! - `status`: araz (review annotation) progress, also overridable by admins
//!
//! The transition methods here enforce the per-document invariants; the
//! engine layers the cross-document effects (profile totals, the featured
//! slot) on top.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::model::account::{Role, User};
use crate::store::Document;

/// Category of a submission, fixed at creation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SubmissionType {
    /// A single poem.
    Individual,
    /// A full nazm.
    Full,
}

impl SubmissionType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Individual => "individual",
            Self::Full => "full",
        }
    }
}

impl fmt::Display for SubmissionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How the poem reached us, fixed at creation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SubmissionMethod {
    /// Inline text.
    Manual,
    /// Uploaded text document.
    Upload,
    /// Uploaded audio recording.
    Recording,
}

impl SubmissionMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Manual => "manual",
            Self::Upload => "upload",
            Self::Recording => "recording",
        }
    }

    /// Whether this method carries a file instead of inline content.
    pub fn is_file_based(&self) -> bool {
        !matches!(self, Self::Manual)
    }
}

impl fmt::Display for SubmissionMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Review annotation progress.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ArazStatus {
    #[default]
    #[serde(rename = "araz_pending")]
    Pending,
    #[serde(rename = "araz_done")]
    Done,
}

impl ArazStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "araz_pending",
            Self::Done => "araz_done",
        }
    }
}

impl fmt::Display for ArazStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Rating value outside [0.5, 5.0] or off the 0.5 grid.
#[derive(Debug, Clone, Copy, PartialEq, Error)]
#[error("Rating must be between 0.5 and 5.0 in 0.5 increments, got {0}")]
pub struct InvalidRating(pub f64);

/// Star rating, stored as a count of half stars (1..=10).
///
/// Serialized as the star value (`2.5`), so the wire format stays numeric.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "f64", into = "f64")]
pub struct Rating(u8);

impl Rating {
    pub const MIN_STARS: f64 = 0.5;
    pub const MAX_STARS: f64 = 5.0;

    /// Points credited to the author per half star (`rating * 20`).
    const POINTS_PER_HALF_STAR: u32 = 10;

    pub fn new(stars: f64) -> Result<Self, InvalidRating> {
        if !stars.is_finite() || !(Self::MIN_STARS..=Self::MAX_STARS).contains(&stars) {
            return Err(InvalidRating(stars));
        }

        let doubled = stars * 2.0;
        if (doubled - doubled.round()).abs() > 1e-9 {
            return Err(InvalidRating(stars));
        }

        Ok(Self(doubled.round() as u8))
    }

    pub fn stars(self) -> f64 {
        f64::from(self.0) / 2.0
    }

    pub fn half_stars(self) -> u8 {
        self.0
    }

    /// Points this rating contributes to the author's profile.
    pub fn points(self) -> u32 {
        u32::from(self.0) * Self::POINTS_PER_HALF_STAR
    }
}

impl TryFrom<f64> for Rating {
    type Error = InvalidRating;

    fn try_from(value: f64) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<Rating> for f64 {
    fn from(rating: Rating) -> Self {
        rating.stars()
    }
}

impl fmt::Display for Rating {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.1}", self.stars())
    }
}

/// Snapshot of the submitter, taken at creation and never refreshed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Author {
    pub user_id: Uuid,
    pub name: String,
}

/// A transition that the submission's current state does not allow.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Submission must be approved to {0}")]
pub struct NotApproved(pub &'static str);

/// A poem submission.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Submission {
    pub id: Uuid,

    #[serde(rename = "type")]
    pub kind: SubmissionType,

    /// Inline text, manual submissions only.
    pub content: Option<String>,

    pub language: String,

    pub submission_method: SubmissionMethod,

    pub author: Author,

    pub status: ArazStatus,

    pub approved: bool,

    pub rating: Option<Rating>,

    /// Blob path of an uploaded text document.
    pub file_name: Option<String>,

    /// Blob path of an uploaded recording.
    pub audio_file_name: Option<String>,

    pub araz_content: Option<String>,

    pub araz_file_name: Option<String>,

    /// Opening verse this poem answers.
    pub inspired_by: Option<Uuid>,

    pub featured: bool,

    pub featured_date: Option<DateTime<Utc>>,

    pub created_at: DateTime<Utc>,

    pub updated_at: DateTime<Utc>,
}

impl Submission {
    /// A fresh, unapproved submission.
    pub fn new(
        id: Uuid,
        kind: SubmissionType,
        method: SubmissionMethod,
        language: String,
        author: Author,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            kind,
            content: None,
            language,
            submission_method: method,
            author,
            status: ArazStatus::Pending,
            approved: false,
            rating: None,
            file_name: None,
            audio_file_name: None,
            araz_content: None,
            araz_file_name: None,
            inspired_by: None,
            featured: false,
            featured_date: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Attach the primary artifact in the slot matching the submission method.
    pub fn attach_artifact(&mut self, path: String) {
        match self.submission_method {
            SubmissionMethod::Recording => self.audio_file_name = Some(path),
            _ => self.file_name = Some(path),
        }
    }

    /// Mark as approved. Returns `true` on a false→true edge.
    pub fn approve(&mut self, now: DateTime<Utc>) -> bool {
        let edge = !self.approved;
        self.approved = true;
        self.status = ArazStatus::Done;
        self.updated_at = now;
        edge
    }

    /// Withdraw approval.
    ///
    /// Everything that may only exist on an approved submission goes with it:
    /// rating, araz and the featured flag. Returns the araz file path that was
    /// detached, if any, so the caller can remove the blob.
    pub fn unapprove(&mut self, now: DateTime<Utc>) -> Option<String> {
        self.approved = false;
        self.status = ArazStatus::Pending;
        self.rating = None;
        self.araz_content = None;
        self.featured = false;
        self.featured_date = None;
        self.updated_at = now;
        self.araz_file_name.take()
    }

    /// Set or replace the rating. Returns the rating it replaced.
    pub fn rate(&mut self, rating: Rating, now: DateTime<Utc>) -> Result<Option<Rating>, NotApproved> {
        if !self.approved {
            return Err(NotApproved("rate"));
        }
        self.updated_at = now;
        Ok(self.rating.replace(rating))
    }

    pub fn set_status(&mut self, status: ArazStatus, now: DateTime<Utc>) {
        self.status = status;
        self.updated_at = now;
    }

    /// Attach review annotation. Either part may be absent, not both.
    pub fn add_araz(
        &mut self,
        content: Option<String>,
        file_path: Option<String>,
        now: DateTime<Utc>,
    ) -> Result<(), NotApproved> {
        if !self.approved {
            return Err(NotApproved("add araz"));
        }
        if let Some(content) = content {
            self.araz_content = Some(content);
        }
        if let Some(path) = file_path {
            self.araz_file_name = Some(path);
        }
        self.updated_at = now;
        Ok(())
    }

    pub fn feature(&mut self, now: DateTime<Utc>) -> Result<(), NotApproved> {
        if !self.approved {
            return Err(NotApproved("feature"));
        }
        self.featured = true;
        self.featured_date = Some(now);
        self.updated_at = now;
        Ok(())
    }

    pub fn unfeature(&mut self, now: DateTime<Utc>) {
        self.featured = false;
        self.featured_date = None;
        self.updated_at = now;
    }

    /// First stored artifact: document, then recording, then araz file.
    pub fn primary_artifact(&self) -> Option<&str> {
        self.file_name
            .as_deref()
            .or(self.audio_file_name.as_deref())
            .or(self.araz_file_name.as_deref())
    }

    /// Only the author and admins may read a submission directly.
    pub fn is_visible_to(&self, user: &User) -> bool {
        user.role == Role::Admin || self.author.user_id == user.id
    }
}

impl Document for Submission {
    const TYPE_PREFIX: &'static str = "submission";

    fn document_id(&self) -> String {
        self.id.to_string()
    }
}

/// Singleton pointer to the featured submission.
///
/// The slot, not the per-submission flag, decides who is featured; the flag
/// is rewritten alongside it in the same transaction.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FeaturedSlot {
    pub submission_id: Option<Uuid>,

    /// Bumped on every change.
    pub version: u64,

    pub updated_at: Option<DateTime<Utc>>,
}

impl FeaturedSlot {
    pub const ID: &'static str = "current";

    /// Point the slot at `id`.
    pub fn assign(&mut self, id: Uuid, now: DateTime<Utc>) {
        self.submission_id = Some(id);
        self.version += 1;
        self.updated_at = Some(now);
    }

    /// Point the slot at `next` if it still points at `expected`.
    ///
    /// Returns `false` and leaves the slot untouched when it moved.
    pub fn swap(&mut self, expected: Option<Uuid>, next: Option<Uuid>, now: DateTime<Utc>) -> bool {
        if self.submission_id != expected {
            return false;
        }
        self.submission_id = next;
        self.version += 1;
        self.updated_at = Some(now);
        true
    }
}

impl Document for FeaturedSlot {
    const TYPE_PREFIX: &'static str = "featured";

    fn document_id(&self) -> String {
        Self::ID.to_string()
    }
}
