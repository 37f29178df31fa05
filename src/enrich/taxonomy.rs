use std::path::Path;

use anyhow::{Context, Result};
use serde::Deserialize;

const BUILTIN_TAXONOMY_JSON: &str = include_str!("../../rules/taxonomy.json");

/// One labelled keyword list. Keywords match as lowercase substrings.
#[derive(Debug, Clone, Deserialize)]
pub struct Category {
    pub label: String,
    pub keywords: Vec<String>,
}

/// Keyword tables for genres, secondary tags and tropes.
///
/// Arrays, not maps: declaration order breaks primary-genre ties and fixes
/// the order of emitted tag and trope lists.
#[derive(Debug, Clone, Deserialize)]
pub struct Taxonomy {
    pub genres: Vec<Category>,
    pub secondary_tags: Vec<Category>,
    pub tropes: Vec<Category>,
}

impl Taxonomy {
    pub fn builtin() -> Result<Self> {
        Self::from_json(BUILTIN_TAXONOMY_JSON).context("Failed to parse built-in taxonomy")
    }

    pub fn from_json(raw: &str) -> Result<Self> {
        let mut taxonomy: Taxonomy = serde_json::from_str(raw)?;
        for category in taxonomy
            .genres
            .iter_mut()
            .chain(taxonomy.secondary_tags.iter_mut())
            .chain(taxonomy.tropes.iter_mut())
        {
            category.keywords = category
                .keywords
                .iter()
                .map(|k| k.to_lowercase())
                .filter(|k| !k.trim().is_empty())
                .collect();
        }
        Ok(taxonomy)
    }

    pub fn load(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(p) => {
                let raw = std::fs::read_to_string(p)
                    .with_context(|| format!("Failed to read taxonomy {:?}", p))?;
                Self::from_json(&raw).with_context(|| format!("Invalid taxonomy in {:?}", p))
            }
            None => Self::builtin(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtin_tables_keep_declaration_order() {
        let t = Taxonomy::builtin().unwrap();
        let genres: Vec<&str> = t.genres.iter().map(|g| g.label.as_str()).collect();
        assert_eq!(
            genres,
            vec!["Supernatural", "Psychological", "Creature", "Crime", "Sci-Fi", "Urban Legend"]
        );
        assert!(!t.secondary_tags.is_empty());
        assert!(!t.tropes.is_empty());
    }

    #[test]
    fn keywords_are_lowercased_and_blank_ones_dropped() {
        let t = Taxonomy::from_json(
            r#"{"genres":[{"label":"G","keywords":["Ghost"," ",""]}],"secondary_tags":[],"tropes":[]}"#,
        )
        .unwrap();
        assert_eq!(t.genres[0].keywords, vec!["ghost"]);
    }

    #[test]
    fn missing_table_is_an_error() {
        assert!(Taxonomy::from_json(r#"{"genres":[]}"#).is_err());
        assert!(Taxonomy::load(Some(Path::new("no/such/taxonomy.json"))).is_err());
    }
}
