use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::parser::extract::date::parse_fuzzy_date;
use crate::parser::extract::tags::dedup_ordered;
use crate::parser::extract::title::title_from_url;
use crate::parser::{ExtractedRecord, UNKNOWN_AUTHOR};

/// Read one JSON value per line. Blank lines are ignored; lines that fail to
/// parse are logged and counted, never fatal.
pub fn read_jsonl<T: DeserializeOwned>(path: &Path, limit: Option<usize>) -> Result<(Vec<T>, usize)> {
    let file = File::open(path).with_context(|| format!("Failed to open {:?}", path))?;
    let mut items = Vec::new();
    let mut malformed = 0;

    for (i, line) in BufReader::new(file).lines().enumerate() {
        if limit.is_some_and(|n| items.len() >= n) {
            break;
        }
        let line = line.with_context(|| format!("Failed to read {:?}", path))?;
        if line.trim().is_empty() {
            continue;
        }
        match serde_json::from_str(&line) {
            Ok(item) => items.push(item),
            Err(e) => {
                warn!(line = i + 1, error = %e, "Skipping malformed line");
                malformed += 1;
            }
        }
    }
    Ok((items, malformed))
}

pub fn write_jsonl<T: Serialize>(path: &Path, items: &[T]) -> Result<usize> {
    if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
        std::fs::create_dir_all(dir).with_context(|| format!("Failed to create {:?}", dir))?;
    }
    let file = File::create(path).with_context(|| format!("Failed to create {:?}", path))?;
    let mut out = BufWriter::new(file);
    for item in items {
        serde_json::to_writer(&mut out, item)?;
        out.write_all(b"\n")?;
    }
    out.flush()?;
    Ok(items.len())
}

/// `path` itself, or every `*.jsonl` file directly inside it when it is a
/// directory, sorted by name.
pub fn input_files(path: &Path) -> Result<Vec<PathBuf>> {
    if !path.is_dir() {
        return Ok(vec![path.to_path_buf()]);
    }
    let mut files = Vec::new();
    for entry in std::fs::read_dir(path).with_context(|| format!("Failed to list {:?}", path))? {
        let file = entry?.path();
        if file.is_file() && file.extension().is_some_and(|ext| ext == "jsonl") {
            files.push(file);
        }
    }
    files.sort();
    Ok(files)
}

/// Copy `file` into `dir` under the same name before it is consumed.
pub fn backup(file: &Path, dir: &Path) -> Result<PathBuf> {
    std::fs::create_dir_all(dir).with_context(|| format!("Failed to create {:?}", dir))?;
    let name = file
        .file_name()
        .with_context(|| format!("No file name in {:?}", file))?;
    let target = dir.join(name);
    std::fs::copy(file, &target).with_context(|| format!("Failed to back up {:?}", file))?;
    Ok(target)
}

pub fn default_export_path(dir: &Path, now: DateTime<Utc>) -> PathBuf {
    dir.join(format!("stories_{}.jsonl", now.format("%Y%m%d_%H%M%S")))
}

/// A story extracted by an earlier run, as found in old JSONL exports.
#[derive(Debug, Clone, Deserialize)]
pub struct StoredStory {
    pub url: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub author: String,
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub publication_date: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
}

impl StoredStory {
    /// Fill gaps the way extraction would. `None` when there is no URL to key on.
    pub fn into_extracted(self) -> Option<ExtractedRecord> {
        let url = self.url.trim().to_string();
        if url.is_empty() {
            return None;
        }
        let title = match self.title.trim() {
            "" => title_from_url(&url),
            t => t.to_string(),
        };
        let author = match self.author.trim() {
            "" => UNKNOWN_AUTHOR.to_string(),
            a => a.to_string(),
        };
        Some(ExtractedRecord {
            title,
            author,
            publication_date: self.publication_date.as_deref().and_then(parse_fuzzy_date),
            tags: dedup_ordered(self.tags),
            body: self.content,
            url,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, TimeZone};

    fn temp_path(name: &str) -> PathBuf {
        std::env::temp_dir().join(format!("story_harvest_{}_{}.jsonl", name, std::process::id()))
    }

    #[test]
    fn malformed_lines_are_counted_and_skipped() {
        let path = temp_path("malformed");
        std::fs::write(
            &path,
            "{\"url\":\"a\"}\nnot json\n\n{\"url\":\"b\",\"title\":\"B\"}\n{\"title\":\"no url\"}\n",
        )
        .unwrap();
        let (items, malformed) = read_jsonl::<StoredStory>(&path, None).unwrap();
        std::fs::remove_file(&path).ok();
        assert_eq!(items.len(), 2);
        assert_eq!(malformed, 2);
        assert_eq!(items[1].title, "B");
    }

    #[test]
    fn limit_stops_reading() {
        let path = temp_path("limit");
        std::fs::write(&path, "{\"url\":\"a\"}\n{\"url\":\"b\"}\n{\"url\":\"c\"}\n").unwrap();
        let (items, _) = read_jsonl::<StoredStory>(&path, Some(2)).unwrap();
        std::fs::remove_file(&path).ok();
        assert_eq!(items.len(), 2);
    }

    #[test]
    fn write_then_read_back() {
        let path = temp_path("write");
        let rows = vec![serde_json::json!({"url": "a"}), serde_json::json!({"url": "b"})];
        assert_eq!(write_jsonl(&path, &rows).unwrap(), 2);
        let (items, malformed) = read_jsonl::<serde_json::Value>(&path, None).unwrap();
        std::fs::remove_file(&path).ok();
        assert_eq!(items, rows);
        assert_eq!(malformed, 0);
    }

    #[test]
    fn stored_story_gaps_are_filled() {
        let story: StoredStory = serde_json::from_str(
            r#"{"url":" https://x.org/wiki/Candle_Cove ","content":"Text.","publication_date":"2011-03-04","tags":["A","A"," B "]}"#,
        )
        .unwrap();
        let rec = story.into_extracted().unwrap();
        assert_eq!(rec.url, "https://x.org/wiki/Candle_Cove");
        assert_eq!(rec.title, "Candle Cove");
        assert_eq!(rec.author, UNKNOWN_AUTHOR);
        assert_eq!(rec.publication_date, NaiveDate::from_ymd_opt(2011, 3, 4));
        assert_eq!(rec.tags, vec!["A", "B"]);

        let blank: StoredStory = serde_json::from_str(r#"{"url":""}"#).unwrap();
        assert!(blank.into_extracted().is_none());
    }

    #[test]
    fn directory_input_lists_jsonl_files_and_backs_them_up() {
        let dir = std::env::temp_dir().join(format!("story_harvest_inputs_{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(dir.join("b.jsonl"), "{\"url\":\"b\"}\n").unwrap();
        std::fs::write(dir.join("a.jsonl"), "{\"url\":\"a\"}\n").unwrap();
        std::fs::write(dir.join("notes.txt"), "skip me").unwrap();

        let files = input_files(&dir).unwrap();
        assert_eq!(files, vec![dir.join("a.jsonl"), dir.join("b.jsonl")]);
        assert_eq!(input_files(&dir.join("a.jsonl")).unwrap(), vec![dir.join("a.jsonl")]);

        let saved = backup(&files[0], &dir.join("backup")).unwrap();
        assert_eq!(std::fs::read_to_string(&saved).unwrap(), "{\"url\":\"a\"}\n");
        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn export_name_is_timestamped() {
        let now = Utc.with_ymd_and_hms(2024, 5, 1, 13, 2, 3).unwrap();
        assert_eq!(
            default_export_path(Path::new("exports"), now),
            PathBuf::from("exports/stories_20240501_130203.jsonl")
        );
    }
}
