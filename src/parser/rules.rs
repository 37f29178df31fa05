use std::path::Path;

use anyhow::{anyhow, Context, Result};
use scraper::Selector;
use serde::Deserialize;

const BUILTIN_RULES_JSON: &str = include_str!("../../rules/extract.json");

/// Selectors, labels and word lists that drive extraction and cleanup.
///
/// Loaded once at startup. The built-in copy targets Fandom/MediaWiki markup;
/// pointing `rules_path` at another file retargets the extractor without a
/// rebuild.
#[derive(Debug, Clone, Deserialize)]
pub struct ExtractRules {
    pub site_name: String,
    pub title_selectors: Vec<String>,
    pub placeholder_titles: Vec<String>,
    pub content_root: String,
    pub infobox_row: String,
    pub infobox_label: String,
    pub infobox_value: String,
    pub author_labels: Vec<String>,
    pub date_labels: Vec<String>,
    pub date_fallback_selectors: Vec<String>,
    pub tag_selectors: Vec<String>,
    pub author_stoplist: Vec<String>,
    pub lead_paragraphs: usize,
    pub lead_min_chars: usize,
    pub tail_chars: usize,
    pub remove_selectors: Vec<String>,
    pub skip_classes: Vec<String>,
    pub min_fragment_chars: usize,
    pub boilerplate_phrases: Vec<String>,
}

impl ExtractRules {
    pub fn builtin() -> Result<Self> {
        serde_json::from_str(BUILTIN_RULES_JSON).context("Failed to parse built-in extract rules")
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read extract rules {:?}", path))?;
        serde_json::from_str(&raw).with_context(|| format!("Invalid extract rules in {:?}", path))
    }

    pub fn load(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(p) => Self::from_file(p),
            None => Self::builtin(),
        }
    }
}

pub(crate) fn selector(css: &str) -> Result<Selector> {
    Selector::parse(css).map_err(|e| anyhow!("invalid selector {:?}: {:?}", css, e))
}

pub(crate) fn selectors(list: &[String]) -> Result<Vec<Selector>> {
    list.iter().map(|css| selector(css)).collect()
}

pub(crate) fn lowercase_all(list: &[String]) -> Vec<String> {
    list.iter()
        .map(|s| s.trim().to_lowercase())
        .filter(|s| !s.is_empty())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtin_rules_parse_and_compile() {
        let rules = ExtractRules::builtin().unwrap();
        assert_eq!(rules.title_selectors.len(), 5);
        assert!(selectors(&rules.title_selectors).is_ok());
        assert!(selectors(&rules.tag_selectors).is_ok());
        assert!(selectors(&rules.remove_selectors).is_ok());
        assert!(selector(&rules.content_root).is_ok());
    }

    #[test]
    fn bad_selector_is_reported() {
        let err = selector("h1[").unwrap_err();
        assert!(err.to_string().contains("h1["));
    }

    #[test]
    fn lowercase_all_drops_blanks() {
        let out = lowercase_all(&["  Author ".into(), "".into(), "WRITER".into()]);
        assert_eq!(out, vec!["author".to_string(), "writer".to_string()]);
    }

    #[test]
    fn missing_rules_file_is_an_error() {
        let err = ExtractRules::load(Some(Path::new("no/such/rules.json"))).unwrap_err();
        assert!(err.to_string().contains("rules.json"));
    }
}
