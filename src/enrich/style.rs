use std::collections::{HashMap, HashSet};
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

static SENTENCE_END_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[.!?]+").unwrap());

const DIALOGUE_MARKERS: &[&str] = &["\"", "'", "said", "asked", "replied", "whispered", "shouted"];
const TOP_WORDS: usize = 10;
const COMPLEX_WORD_CHARS: usize = 6;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WordCount {
    pub word: String,
    pub count: usize,
}

/// Surface statistics of a story body. All zero for empty text.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StyleMetrics {
    pub word_count: usize,
    pub sentence_count: usize,
    pub avg_sentence_length: f64,
    pub avg_word_length: f64,
    pub vocabulary_richness: f64,
    pub readability_score: f64,
    pub complexity_ratio: f64,
    pub dialogue_ratio: f64,
    pub top_words: Vec<WordCount>,
    pub unique_word_count: usize,
}

pub fn analyze(body: &str) -> StyleMetrics {
    let words: Vec<&str> = body.split_whitespace().collect();
    let sentence_count = SENTENCE_END_RE
        .split(body)
        .filter(|s| !s.trim().is_empty())
        .count();
    if words.is_empty() || sentence_count == 0 {
        return StyleMetrics::default();
    }

    let word_count = words.len();
    let n = word_count as f64;
    let lowered: Vec<String> = words.iter().map(|w| w.to_lowercase()).collect();

    let avg_sentence_length = n / sentence_count as f64;
    let avg_word_length = words.iter().map(|w| w.chars().count()).sum::<usize>() as f64 / n;
    let unique: HashSet<&str> = lowered.iter().map(String::as_str).collect();
    let complex = words
        .iter()
        .filter(|w| w.chars().count() > COMPLEX_WORD_CHARS)
        .count();
    let dialogue = lowered
        .iter()
        .filter(|w| DIALOGUE_MARKERS.contains(&w.as_str()))
        .count();

    StyleMetrics {
        word_count,
        sentence_count,
        avg_sentence_length: round(avg_sentence_length, 2),
        avg_word_length: round(avg_word_length, 2),
        vocabulary_richness: round(unique.len() as f64 / n, 3),
        readability_score: round(readability(avg_sentence_length, avg_word_length), 2),
        complexity_ratio: round(complex as f64 / n, 3),
        dialogue_ratio: round(dialogue as f64 / n, 3),
        top_words: top_words(&lowered),
        unique_word_count: unique.len(),
    }
}

/// Simplified Flesch reading ease, clamped to 0..=100.
fn readability(avg_sentence_length: f64, avg_word_length: f64) -> f64 {
    (206.835 - 1.015 * avg_sentence_length - 84.6 * avg_word_length).clamp(0.0, 100.0)
}

/// Most frequent tokens; equal counts keep first-seen order.
fn top_words(lowered: &[String]) -> Vec<WordCount> {
    let mut counts: HashMap<&str, (usize, usize)> = HashMap::new();
    for (i, w) in lowered.iter().enumerate() {
        counts.entry(w.as_str()).or_insert((0, i)).0 += 1;
    }
    let mut ranked: Vec<(&str, usize, usize)> =
        counts.into_iter().map(|(w, (c, first))| (w, c, first)).collect();
    ranked.sort_by(|a, b| b.1.cmp(&a.1).then(a.2.cmp(&b.2)));
    ranked
        .into_iter()
        .take(TOP_WORDS)
        .map(|(word, count, _)| WordCount {
            word: word.to_string(),
            count,
        })
        .collect()
}

fn round(value: f64, places: i32) -> f64 {
    let factor = 10f64.powi(places);
    (value * factor).round() / factor
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_text_gives_zero_metrics() {
        assert_eq!(analyze(""), StyleMetrics::default());
        assert_eq!(analyze("   \n\t "), StyleMetrics::default());
        assert_eq!(analyze("... !!! ???"), StyleMetrics::default());
        let m = analyze("");
        assert_eq!(m.word_count, 0);
        assert_eq!(m.readability_score, 0.0);
        assert!(m.top_words.is_empty());
    }

    #[test]
    fn basic_counts() {
        let m = analyze("The dog ran. The dog stopped! Why?");
        assert_eq!(m.word_count, 7);
        assert_eq!(m.sentence_count, 3);
        assert_eq!(m.avg_sentence_length, 2.33);
        assert_eq!(m.unique_word_count, 5);
        assert_eq!(m.complexity_ratio, round(1.0 / 7.0, 3));
        assert_eq!(m.top_words[0], WordCount { word: "the".into(), count: 2 });
        assert_eq!(m.top_words[1], WordCount { word: "dog".into(), count: 2 });
        assert_eq!(m.top_words[2].word, "ran.");
    }

    #[test]
    fn dialogue_markers_are_whole_tokens() {
        let m = analyze("She whispered softly. He Said nothing. Unsaid words.");
        assert_eq!(m.word_count, 8);
        assert_eq!(m.dialogue_ratio, 0.25);
    }

    #[test]
    fn ratios_stay_in_range() {
        let samples = [
            "a",
            "Incomprehensibilities notwithstanding, antidisestablishmentarianism persisted.",
            "Run. Run. Run. Run.",
            "\" ' said asked replied whispered shouted.",
        ];
        for text in samples {
            let m = analyze(text);
            for r in [m.vocabulary_richness, m.complexity_ratio, m.dialogue_ratio] {
                assert!((0.0..=1.0).contains(&r), "{text}: {r}");
            }
            assert!((0.0..=100.0).contains(&m.readability_score), "{text}");
            assert!(m.top_words.len() <= TOP_WORDS);
        }
    }

    #[test]
    fn top_words_capped_at_ten() {
        let text = (0..30).map(|i| format!("w{}", i)).collect::<Vec<_>>().join(" ") + ".";
        let m = analyze(&text);
        assert_eq!(m.top_words.len(), TOP_WORDS);
        assert_eq!(m.top_words[0].word, "w0");
    }
}
