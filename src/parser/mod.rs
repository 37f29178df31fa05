pub mod extract;
pub mod normalize;
pub mod rules;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

pub use extract::Extractor;

/// Author value used whenever no strategy produces a plausible name.
pub const UNKNOWN_AUTHOR: &str = "Unknown";

/// One crawled page, exactly as the crawler hands it over.
#[derive(Debug, Clone, Deserialize)]
pub struct RawDocument {
    pub url: String,
    pub html: String,
    #[serde(default)]
    pub metadata: Option<DocumentMeta>,
}

/// Optional hints the crawler may have collected alongside the page body.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct DocumentMeta {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub author: Option<String>,
    #[serde(default)]
    pub published: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExtractedRecord {
    pub url: String,
    pub title: String,
    pub author: String,
    pub publication_date: Option<NaiveDate>,
    pub tags: Vec<String>,
    pub body: String,
}

/// Two-step pipeline: raw HTML → structured fields → normalized body.
///
/// Returns `None` only for documents without a source URL, which cannot be
/// keyed in the store.
pub fn process_document(extractor: &Extractor, doc: &RawDocument) -> Option<ExtractedRecord> {
    if doc.url.trim().is_empty() {
        return None;
    }
    Some(extractor.extract(&doc.html, doc.url.trim(), doc.metadata.as_ref()))
}
