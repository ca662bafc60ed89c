//! Accounts and poet profiles.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::store::Document;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    #[default]
    User,
    Admin,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Admin => "admin",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A registered account.
///
/// Stored with its password hash; API responses use their own shape and
/// never carry the hash.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: Uuid,
    pub name: String,
    /// Trimmed and lowercased.
    pub email: String,
    pub password_hash: String,
    pub role: Role,
    pub created_at: DateTime<Utc>,
}

impl User {
    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }
}

impl Document for User {
    const TYPE_PREFIX: &'static str = "user";

    fn document_id(&self) -> String {
        self.id.to_string()
    }
}

/// Per-author aggregate, keyed by the owning user's id.
///
/// `points` and `poems_count` are derived from the author's submissions and
/// rewritten by the engine whenever an approval or rating changes.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PoetProfile {
    pub user_id: Uuid,
    pub name: String,
    pub email: String,
    pub country: String,
    pub points: u32,
    pub poems_count: u32,
    pub bio: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl PoetProfile {
    /// Empty profile for a newly created account.
    pub fn for_user(user: &User, country: String, now: DateTime<Utc>) -> Self {
        Self {
            user_id: user.id,
            name: user.name.clone(),
            email: user.email.clone(),
            country,
            points: 0,
            poems_count: 0,
            bio: String::new(),
            created_at: now,
            updated_at: now,
        }
    }
}

impl Document for PoetProfile {
    const TYPE_PREFIX: &'static str = "poet";

    fn document_id(&self) -> String {
        self.user_id.to_string()
    }
}
