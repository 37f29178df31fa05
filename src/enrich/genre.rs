use serde::{Deserialize, Serialize};

use super::taxonomy::{Category, Taxonomy};

pub const UNCATEGORIZED: &str = "Uncategorized";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Classification {
    pub genre_primary: String,
    pub genre_secondary: Vec<String>,
    pub tropes: Vec<String>,
}

/// Keyword classification of one story.
///
/// Each keyword counts at most once per category. The primary genre is the
/// highest-scoring one, earliest declared on a tie; secondary tags and tropes
/// are every category with at least one hit. Tropes look at the body only.
pub fn classify(taxonomy: &Taxonomy, title: &str, body: &str, tags: &[String]) -> Classification {
    let haystack = format!("{} {} {}", title, body, tags.join(" ")).to_lowercase();

    let mut best: Option<(&Category, usize)> = None;
    for genre in &taxonomy.genres {
        let score = score(genre, &haystack);
        if score > 0 && best.map_or(true, |(_, top)| score > top) {
            best = Some((genre, score));
        }
    }

    let body_lower = body.to_lowercase();
    Classification {
        genre_primary: best
            .map(|(g, _)| g.label.clone())
            .unwrap_or_else(|| UNCATEGORIZED.to_string()),
        genre_secondary: hits(&taxonomy.secondary_tags, &haystack),
        tropes: hits(&taxonomy.tropes, &body_lower),
    }
}

fn score(category: &Category, haystack: &str) -> usize {
    category
        .keywords
        .iter()
        .filter(|k| haystack.contains(k.as_str()))
        .count()
}

fn hits(categories: &[Category], haystack: &str) -> Vec<String> {
    categories
        .iter()
        .filter(|c| c.keywords.iter().any(|k| haystack.contains(k.as_str())))
        .map(|c| c.label.clone())
        .collect()
}
