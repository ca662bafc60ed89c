//! Opening verses: daily inspiration texts that submissions may cite.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::store::Document;

/// First and last day an opening verse may be assigned to.
pub const FIRST_DAY: i64 = 1;
pub const LAST_DAY: i64 = 10;

/// Languages the verse catalog accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum VerseLanguage {
    English,
    Arabic,
    Urdu,
    #[serde(rename = "Lisan al-Dawah")]
    LisanAlDawah,
    French,
}

impl VerseLanguage {
    pub const ALL: [VerseLanguage; 5] = [
        Self::English,
        Self::Arabic,
        Self::Urdu,
        Self::LisanAlDawah,
        Self::French,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::English => "English",
            Self::Arabic => "Arabic",
            Self::Urdu => "Urdu",
            Self::LisanAlDawah => "Lisan al-Dawah",
            Self::French => "French",
        }
    }
}

impl fmt::Display for VerseLanguage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Language must be one of English, Arabic, Urdu, Lisan al-Dawah, French; got {0:?}")]
pub struct UnknownLanguage(pub String);

impl FromStr for VerseLanguage {
    type Err = UnknownLanguage;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|lang| lang.as_str() == s)
            .ok_or_else(|| UnknownLanguage(s.to_string()))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("Day must be between 1 and 10, got {0}")]
pub struct DayOutOfRange(pub i64);

/// Validate a day number and narrow it.
pub fn parse_day(day: i64) -> Result<u8, DayOutOfRange> {
    if (FIRST_DAY..=LAST_DAY).contains(&day) {
        Ok(day as u8)
    } else {
        Err(DayOutOfRange(day))
    }
}

/// An opening verse.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Verse {
    pub id: Uuid,
    pub content: String,
    pub day: u8,
    pub language: VerseLanguage,
    pub author: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Document for Verse {
    const TYPE_PREFIX: &'static str = "verse";

    fn document_id(&self) -> String {
        self.id.to_string()
    }
}
