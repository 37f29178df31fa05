use anyhow::Result;
use indicatif::{ProgressBar, ProgressStyle};
use rayon::prelude::*;
use rusqlite::Connection;
use tracing::{info, warn};

use crate::db;
use crate::enrich::{analyze, assemble, classify, EnrichedRecord, Taxonomy};
use crate::jsonl::StoredStory;
use crate::parser::rules::ExtractRules;
use crate::parser::{process_document, ExtractedRecord, Extractor, RawDocument};
use crate::settings::Settings;

/// Extraction plus enrichment, shared read-only across worker threads.
pub struct Enricher {
    extractor: Extractor,
    taxonomy: Taxonomy,
}

impl Enricher {
    pub fn new(extractor: Extractor, taxonomy: Taxonomy) -> Self {
        Self {
            extractor,
            taxonomy,
        }
    }

    pub fn from_settings(settings: &Settings) -> Result<Self> {
        let rules = ExtractRules::load(settings.rules_path.as_deref())?;
        let taxonomy = Taxonomy::load(settings.taxonomy_path.as_deref())?;
        Ok(Self::new(Extractor::new(&rules)?, taxonomy))
    }

    pub fn enrich_document(&self, doc: &RawDocument) -> Option<EnrichedRecord> {
        process_document(&self.extractor, doc).map(|rec| self.enrich_extracted(rec))
    }

    /// Re-enrich an earlier export. Content that still carries markup is
    /// normalized first.
    pub fn enrich_stored(&self, story: &StoredStory) -> Option<EnrichedRecord> {
        let mut rec = story.clone().into_extracted()?;
        if looks_like_markup(&rec.body) {
            rec.body = self.extractor.normalizer().normalize(&rec.body, &rec.author);
        }
        Some(self.enrich_extracted(rec))
    }

    pub fn enrich_extracted(&self, rec: ExtractedRecord) -> EnrichedRecord {
        let (classification, style) = rayon::join(
            || classify(&self.taxonomy, &rec.title, &rec.body, &rec.tags),
            || analyze(&rec.body),
        );
        assemble(rec, classification, style)
    }
}

fn looks_like_markup(text: &str) -> bool {
    let lower = text.to_lowercase();
    ["<p", "<div", "<br", "</"].iter().any(|tag| lower.contains(tag))
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct RunStats {
    pub documents: usize,
    pub skipped: usize,
    pub inserted: usize,
    pub updated: usize,
    pub failed: usize,
}

impl RunStats {
    pub fn print(&self) {
        println!(
            "Processed {} documents: {} inserted, {} updated, {} failed, {} skipped.",
            self.documents, self.inserted, self.updated, self.failed, self.skipped,
        );
    }
}

/// Enrich `items` in parallel chunks and upsert each chunk from this thread.
///
/// Items for which `enrich` yields `None` are counted as skipped. A chunk whose
/// transaction cannot commit counts every record in it as failed.
pub fn run_batches<T, F>(conn: &Connection, items: &[T], batch_size: usize, enrich: F) -> Result<RunStats>
where
    T: Sync,
    F: Fn(&T) -> Option<EnrichedRecord> + Sync,
{
    let pb = ProgressBar::new(items.len() as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({per_sec})")?
            .progress_chars("#>-"),
    );

    let mut stats = RunStats::default();
    for chunk in items.chunks(batch_size.max(1)) {
        let records: Vec<EnrichedRecord> = chunk.par_iter().filter_map(|item| enrich(item)).collect();
        stats.documents += chunk.len();
        stats.skipped += chunk.len() - records.len();

        match db::save_stories(conn, &records) {
            Ok(counts) => {
                stats.inserted += counts.inserted;
                stats.updated += counts.updated;
                stats.failed += counts.failed;
            }
            Err(e) => {
                warn!(error = %e, records = records.len(), "Batch commit failed");
                stats.failed += records.len();
            }
        }
        pb.inc(chunk.len() as u64);
    }

    pb.finish_and_clear();
    info!(?stats, "Run finished");
    Ok(stats)
}
