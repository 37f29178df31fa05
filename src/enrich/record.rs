use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use super::genre::Classification;
use super::style::StyleMetrics;
use crate::parser::ExtractedRecord;

/// A fully enriched story, the unit the store persists.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnrichedRecord {
    pub url: String,
    pub title: String,
    pub author: String,
    pub publication_date: Option<NaiveDate>,
    pub tags: Vec<String>,
    #[serde(rename = "content")]
    pub body: String,
    pub genre_primary: String,
    pub genre_secondary: Vec<String>,
    pub tropes: Vec<String>,
    pub writing_style: StyleMetrics,
    /// Owned by the store; only filled when reading a row back.
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: DateTime<Utc>,
}

pub fn assemble(
    extracted: ExtractedRecord,
    classification: Classification,
    style: StyleMetrics,
) -> EnrichedRecord {
    assemble_at(extracted, classification, style, Utc::now())
}

pub fn assemble_at(
    extracted: ExtractedRecord,
    classification: Classification,
    style: StyleMetrics,
    now: DateTime<Utc>,
) -> EnrichedRecord {
    EnrichedRecord {
        url: extracted.url,
        title: extracted.title,
        author: extracted.author,
        publication_date: extracted.publication_date,
        tags: extracted.tags,
        body: extracted.body,
        genre_primary: classification.genre_primary,
        genre_secondary: classification.genre_secondary,
        tropes: classification.tropes,
        writing_style: style,
        created_at: None,
        updated_at: now,
    }
}
