use std::path::Path;
use std::time::Duration;

use chrono::{DateTime, NaiveDate, SecondsFormat, Utc};
use rusqlite::{Connection, OptionalExtension};
use tracing::{debug, warn};

use crate::enrich::EnrichedRecord;
use crate::error::{Result, StoreError};

const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

pub fn connect(path: &Path) -> Result<Connection> {
    if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
        std::fs::create_dir_all(dir)?;
    }
    let conn = Connection::open(path)?;
    conn.busy_timeout(BUSY_TIMEOUT)?;
    conn.execute_batch("PRAGMA journal_mode=WAL;")?;
    Ok(conn)
}

pub fn init_schema(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS stories (
            url              TEXT PRIMARY KEY,
            title            TEXT NOT NULL,
            author           TEXT NOT NULL,
            publication_date TEXT,
            tags             TEXT NOT NULL DEFAULT '[]',
            content          TEXT NOT NULL,
            genre_primary    TEXT NOT NULL,
            genre_secondary  TEXT NOT NULL DEFAULT '[]',
            tropes           TEXT NOT NULL DEFAULT '[]',
            writing_style    TEXT NOT NULL,
            word_count       INTEGER NOT NULL DEFAULT 0,
            revision         INTEGER NOT NULL DEFAULT 1,
            created_at       TEXT NOT NULL,
            updated_at       TEXT NOT NULL
        );
        CREATE INDEX IF NOT EXISTS idx_stories_genre ON stories(genre_primary);
        CREATE INDEX IF NOT EXISTS idx_stories_words ON stories(word_count);
        CREATE INDEX IF NOT EXISTS idx_stories_author ON stories(author);
        ",
    )?;
    Ok(())
}

// ── Writes ──

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpsertOutcome {
    Inserted,
    Updated,
}

/// Create or fully replace the row for `rec.url` in one statement.
///
/// `created_at` is written only when the URL is new; every other column,
/// `updated_at` included, comes from `rec`.
pub fn upsert_story(conn: &Connection, rec: &EnrichedRecord) -> Result<UpsertOutcome> {
    let mut stmt = conn.prepare_cached(
        "INSERT INTO stories
         (url, title, author, publication_date, tags, content, genre_primary,
          genre_secondary, tropes, writing_style, word_count, updated_at, created_at)
         VALUES (?1,?2,?3,?4,?5,?6,?7,?8,?9,?10,?11,?12,?12)
         ON CONFLICT(url) DO UPDATE SET
            title            = excluded.title,
            author           = excluded.author,
            publication_date = excluded.publication_date,
            tags             = excluded.tags,
            content          = excluded.content,
            genre_primary    = excluded.genre_primary,
            genre_secondary  = excluded.genre_secondary,
            tropes           = excluded.tropes,
            writing_style    = excluded.writing_style,
            word_count       = excluded.word_count,
            updated_at       = excluded.updated_at,
            revision         = stories.revision + 1
         RETURNING revision",
    )?;
    let revision: i64 = stmt.query_row(
        rusqlite::params![
            rec.url,
            rec.title,
            rec.author,
            rec.publication_date.map(|d| d.to_string()),
            serde_json::to_string(&rec.tags)?,
            rec.body,
            rec.genre_primary,
            serde_json::to_string(&rec.genre_secondary)?,
            serde_json::to_string(&rec.tropes)?,
            serde_json::to_string(&rec.writing_style)?,
            rec.writing_style.word_count,
            format_timestamp(&rec.updated_at),
        ],
        |row| row.get(0),
    )?;
    Ok(if revision == 1 {
        UpsertOutcome::Inserted
    } else {
        UpsertOutcome::Updated
    })
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct SaveCounts {
    pub inserted: usize,
    pub updated: usize,
    pub failed: usize,
}

/// Upsert a batch in one transaction. A failing record is logged and counted;
/// the rest of the batch still lands. If SQLite rolled the whole transaction
/// back (I/O error, full disk), the batch stops there and the error is returned,
/// since nothing written so far will be committed.
pub fn save_stories(conn: &Connection, records: &[EnrichedRecord]) -> Result<SaveCounts> {
    let tx = conn.unchecked_transaction()?;
    let mut counts = SaveCounts::default();
    for rec in records {
        match upsert_story(&tx, rec) {
            Ok(UpsertOutcome::Inserted) => counts.inserted += 1,
            Ok(UpsertOutcome::Updated) => counts.updated += 1,
            Err(e) if tx.is_autocommit() => {
                warn!(url = %rec.url, error = %e, "Transaction rolled back, abandoning batch");
                return Err(e);
            }
            Err(e) => {
                warn!(url = %rec.url, error = %e, "Failed to save story");
                counts.failed += 1;
            }
        }
    }
    tx.commit()?;
    debug!(?counts, "Saved batch");
    Ok(counts)
}

// ── Reads ──

const STORY_COLUMNS: &str = "url, title, author, publication_date, tags, content, genre_primary,
     genre_secondary, tropes, writing_style, created_at, updated_at";

struct StoryRow {
    url: String,
    title: String,
    author: String,
    publication_date: Option<String>,
    tags: String,
    content: String,
    genre_primary: String,
    genre_secondary: String,
    tropes: String,
    writing_style: String,
    created_at: String,
    updated_at: String,
}

impl StoryRow {
    fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
        Ok(StoryRow {
            url: row.get(0)?,
            title: row.get(1)?,
            author: row.get(2)?,
            publication_date: row.get(3)?,
            tags: row.get(4)?,
            content: row.get(5)?,
            genre_primary: row.get(6)?,
            genre_secondary: row.get(7)?,
            tropes: row.get(8)?,
            writing_style: row.get(9)?,
            created_at: row.get(10)?,
            updated_at: row.get(11)?,
        })
    }
}

impl TryFrom<StoryRow> for EnrichedRecord {
    type Error = StoreError;

    fn try_from(r: StoryRow) -> Result<Self> {
        let publication_date = match r.publication_date {
            Some(d) => Some(
                NaiveDate::parse_from_str(&d, "%Y-%m-%d").map_err(|_| StoreError::Timestamp(d))?,
            ),
            None => None,
        };
        Ok(EnrichedRecord {
            url: r.url,
            title: r.title,
            author: r.author,
            publication_date,
            tags: serde_json::from_str(&r.tags)?,
            body: r.content,
            genre_primary: r.genre_primary,
            genre_secondary: serde_json::from_str(&r.genre_secondary)?,
            tropes: serde_json::from_str(&r.tropes)?,
            writing_style: serde_json::from_str(&r.writing_style)?,
            created_at: Some(parse_timestamp(r.created_at)?),
            updated_at: parse_timestamp(r.updated_at)?,
        })
    }
}

pub fn get_story(conn: &Connection, url: &str) -> Result<Option<EnrichedRecord>> {
    let sql = format!("SELECT {} FROM stories WHERE url = ?1", STORY_COLUMNS);
    let row = conn
        .query_row(&sql, [url], StoryRow::from_row)
        .optional()?;
    row.map(EnrichedRecord::try_from).transpose()
}

/// Read-side filters shared by listing and export.
#[derive(Debug, Default, Clone)]
pub struct StoryFilter {
    pub genre: Option<String>,
    pub trope: Option<String>,
    pub min_words: Option<usize>,
    pub max_words: Option<usize>,
    pub limit: Option<usize>,
}

impl StoryFilter {
    fn to_sql(&self) -> (String, Vec<Box<dyn rusqlite::types::ToSql>>) {
        let mut conditions = Vec::new();
        let mut params: Vec<Box<dyn rusqlite::types::ToSql>> = Vec::new();

        if let Some(g) = &self.genre {
            conditions.push(format!("genre_primary = ?{}", params.len() + 1));
            params.push(Box::new(g.clone()));
        }
        if let Some(t) = &self.trope {
            conditions.push(format!(
                "EXISTS (SELECT 1 FROM json_each(stories.tropes) WHERE json_each.value = ?{})",
                params.len() + 1
            ));
            params.push(Box::new(t.clone()));
        }
        if let Some(n) = self.min_words {
            conditions.push(format!("word_count >= ?{}", params.len() + 1));
            params.push(Box::new(n));
        }
        if let Some(n) = self.max_words {
            conditions.push(format!("word_count <= ?{}", params.len() + 1));
            params.push(Box::new(n));
        }

        let mut clause = if conditions.is_empty() {
            String::new()
        } else {
            format!(" WHERE {}", conditions.join(" AND "))
        };
        clause.push_str(" ORDER BY updated_at DESC, url");
        if let Some(n) = self.limit {
            clause.push_str(&format!(" LIMIT {}", n));
        }
        (clause, params)
    }
}

pub fn fetch_stories(conn: &Connection, filter: &StoryFilter) -> Result<Vec<EnrichedRecord>> {
    let (clause, params) = filter.to_sql();
    let sql = format!("SELECT {} FROM stories{}", STORY_COLUMNS, clause);
    let mut stmt = conn.prepare(&sql)?;
    let param_refs: Vec<&dyn rusqlite::types::ToSql> = params.iter().map(|p| p.as_ref()).collect();
    let rows = stmt
        .query_map(param_refs.as_slice(), StoryRow::from_row)?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    rows.into_iter().map(EnrichedRecord::try_from).collect()
}

// ── Overview ──

pub struct OverviewRow {
    pub url: String,
    pub title: String,
    pub author: String,
    pub genre_primary: String,
    pub word_count: usize,
    pub tropes: Vec<String>,
}

pub fn fetch_overview(conn: &Connection, filter: &StoryFilter) -> Result<Vec<OverviewRow>> {
    let (clause, params) = filter.to_sql();
    let sql = format!(
        "SELECT url, title, author, genre_primary, word_count, tropes FROM stories{}",
        clause
    );
    let mut stmt = conn.prepare(&sql)?;
    let param_refs: Vec<&dyn rusqlite::types::ToSql> = params.iter().map(|p| p.as_ref()).collect();
    let rows = stmt
        .query_map(param_refs.as_slice(), |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, String>(2)?,
                row.get::<_, String>(3)?,
                row.get::<_, usize>(4)?,
                row.get::<_, String>(5)?,
            ))
        })?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    rows.into_iter()
        .map(|(url, title, author, genre_primary, word_count, tropes)| {
            Ok(OverviewRow {
                url,
                title,
                author,
                genre_primary,
                word_count,
                tropes: serde_json::from_str(&tropes)?,
            })
        })
        .collect()
}

// ── Stats ──

pub struct Stats {
    pub total: usize,
    pub known_authors: usize,
    pub dated: usize,
    pub total_words: usize,
    pub last_updated: Option<String>,
}

pub fn get_stats(conn: &Connection) -> Result<Stats> {
    let total: usize = conn.query_row("SELECT COUNT(*) FROM stories", [], |r| r.get(0))?;
    let known_authors: usize = conn.query_row(
        "SELECT COUNT(DISTINCT author) FROM stories WHERE author != ?1",
        [crate::parser::UNKNOWN_AUTHOR],
        |r| r.get(0),
    )?;
    let dated: usize = conn.query_row(
        "SELECT COUNT(*) FROM stories WHERE publication_date IS NOT NULL",
        [],
        |r| r.get(0),
    )?;
    let total_words: usize =
        conn.query_row("SELECT COALESCE(SUM(word_count), 0) FROM stories", [], |r| r.get(0))?;
    let last_updated: Option<String> =
        conn.query_row("SELECT MAX(updated_at) FROM stories", [], |r| r.get(0))?;
    Ok(Stats {
        total,
        known_authors,
        dated,
        total_words,
        last_updated,
    })
}

pub fn genre_distribution(conn: &Connection) -> Result<Vec<(String, usize)>> {
    let mut stmt = conn.prepare(
        "SELECT genre_primary, COUNT(*) AS n
         FROM stories
         GROUP BY genre_primary
         ORDER BY n DESC, genre_primary",
    )?;
    let rows = stmt
        .query_map([], |row| Ok((row.get(0)?, row.get(1)?)))?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(rows)
}

pub fn trope_distribution(conn: &Connection) -> Result<Vec<(String, usize)>> {
    let mut stmt = conn.prepare(
        "SELECT t.value, COUNT(*) AS n
         FROM stories, json_each(stories.tropes) AS t
         GROUP BY t.value
         ORDER BY n DESC, t.value",
    )?;
    let rows = stmt
        .query_map([], |row| Ok((row.get(0)?, row.get(1)?)))?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(rows)
}

// ── Timestamps ──

fn format_timestamp(ts: &DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn parse_timestamp(raw: String) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(&raw)
        .map(|t| t.with_timezone(&Utc))
        .map_err(|_| StoreError::Timestamp(raw))
}
