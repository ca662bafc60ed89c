//! Opening verse catalog.

use chrono::Utc;
use serde::Deserialize;
use tracing::info;
use uuid::Uuid;

use super::{EngineError, NazmEngine, Result};
use crate::model::{parse_day, Verse, VerseLanguage};

/// Fields for a new verse.
#[derive(Debug, Clone, Deserialize)]
pub struct NewVerse {
    pub content: String,
    pub day: i64,
    pub language: String,
    #[serde(default)]
    pub author: Option<String>,
}

/// Partial update. Absent fields are left as they are.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct VersePatch {
    pub content: Option<String>,
    pub day: Option<i64>,
    pub language: Option<String>,
    pub author: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct VerseFilter {
    pub day: Option<i64>,
    pub language: Option<String>,
}

fn verse_content(content: String) -> Result<String> {
    if content.trim().is_empty() {
        return Err(EngineError::Validation("Verse content is required".into()));
    }
    Ok(content)
}

fn verse_author(author: Option<String>) -> Option<String> {
    author
        .map(|a| a.trim().to_string())
        .filter(|a| !a.is_empty())
}

impl NazmEngine {
    /// Verses in creation order.
    pub async fn list_verses(&self, filter: &VerseFilter) -> Result<Vec<Verse>> {
        Ok(self
            .store
            .list::<Verse>()
            .await?
            .into_iter()
            .filter(|v| filter.day.map_or(true, |d| i64::from(v.day) == d))
            .filter(|v| {
                filter
                    .language
                    .as_deref()
                    .map_or(true, |l| v.language.as_str() == l)
            })
            .collect())
    }

    pub async fn get_verse(&self, id: Uuid) -> Result<Verse> {
        self.store
            .get::<Verse>(&id.to_string())
            .await?
            .ok_or(EngineError::VerseNotFound(id))
    }

    pub async fn create_verse(&mut self, verse: NewVerse) -> Result<Verse> {
        let now = Utc::now();
        let verse = Verse {
            id: Uuid::new_v4(),
            content: verse_content(verse.content)?,
            day: parse_day(verse.day)?,
            language: verse.language.parse::<VerseLanguage>()?,
            author: verse_author(verse.author),
            created_at: now,
            updated_at: now,
        };

        self.store.put(&verse).await?;

        info!(verse_id = %verse.id, day = verse.day, language = %verse.language, "Verse created");

        Ok(verse)
    }

    pub async fn update_verse(&mut self, id: Uuid, patch: VersePatch) -> Result<Verse> {
        let mut verse = self.get_verse(id).await?;

        if let Some(content) = patch.content {
            verse.content = verse_content(content)?;
        }
        if let Some(day) = patch.day {
            verse.day = parse_day(day)?;
        }
        if let Some(language) = patch.language {
            verse.language = language.parse::<VerseLanguage>()?;
        }
        if patch.author.is_some() {
            verse.author = verse_author(patch.author);
        }
        verse.updated_at = Utc::now();

        self.store.put(&verse).await?;

        info!(verse_id = %id, "Verse updated");

        Ok(verse)
    }

    pub async fn delete_verse(&mut self, id: Uuid) -> Result<()> {
        if !self.store.delete::<Verse>(&id.to_string()).await? {
            return Err(EngineError::VerseNotFound(id));
        }

        info!(verse_id = %id, "Verse deleted");

        Ok(())
    }
}
