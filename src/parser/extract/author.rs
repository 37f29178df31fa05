use std::sync::LazyLock;

use regex::Regex;

use super::{first_match, Extractor, Page, Strategy};
use crate::parser::normalize::collapse_whitespace;
use crate::parser::UNKNOWN_AUTHOR;

// Capitalised words or single-letter initials, at most five, on one line. A
// period only ever follows an initial, so "Hale. The rain" stops at "Hale".
const NAME: &str = r"(?-i:((?:\p{Lu}\.[ \t]*)*\p{Lu}[\p{L}\-']+(?:[ \t]+(?:\p{Lu}\.|\p{Lu}[\p{L}\-']*)){0,4}))";

static LEAD_RES: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    [
        format!(r"(?i)\bby[ \t]+{NAME}"),
        format!(r"(?i)\bwritten by[ \t]+{NAME}"),
        format!(r"(?i)\bauthor:[ \t]*{NAME}"),
        format!(r"(?i)\bstory by[ \t]+{NAME}"),
    ]
    .iter()
    .map(|p| Regex::new(p).unwrap())
    .collect()
});

static TAIL_RES: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    [
        format!(r"(?i)\bwritten by[ \t]+{NAME}"),
        format!(r"(?i)\bby[ \t]+{NAME}\s*$"),
        format!(r"(?i)\bauthor:[ \t]*{NAME}"),
        format!(r"(?i)\bstory by[ \t]+{NAME}"),
    ]
    .iter()
    .map(|p| Regex::new(p).unwrap())
    .collect()
});

static SUFFIX_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\s+(writes?|wrote|author|story).*$").unwrap());

const STRATEGIES: &[Strategy<String>] = &[from_infobox, from_lead, from_tail, from_metadata];

pub(crate) fn resolve(page: &Page<'_>) -> String {
    first_match(page, STRATEGIES).unwrap_or_else(|| UNKNOWN_AUTHOR.to_string())
}

fn from_infobox(page: &Page<'_>) -> Option<String> {
    page.infobox_values(&page.ex.author_labels)
        .into_iter()
        .find(|name| loosely_plausible(page.ex, name))
}

fn from_lead(page: &Page<'_>) -> Option<String> {
    let lead = page.lead_text();
    if lead.trim().chars().count() <= page.ex.lead_min_chars {
        return None;
    }
    search(page.ex, &LEAD_RES, &lead)
}

fn from_tail(page: &Page<'_>) -> Option<String> {
    search(page.ex, &TAIL_RES, &page.tail_text())
}

fn from_metadata(page: &Page<'_>) -> Option<String> {
    let author = collapse_whitespace(page.meta?.author.as_deref()?);
    loosely_plausible(page.ex, &author).then_some(author)
}

/// First pattern (in order) whose capture survives cleanup and validation.
fn search(ex: &Extractor, patterns: &[Regex], text: &str) -> Option<String> {
    patterns.iter().find_map(|re| {
        let caps = re.captures(text)?;
        let name = clean_candidate(caps.get(1)?.as_str());
        strictly_plausible(ex, &name).then_some(name)
    })
}

fn clean_candidate(raw: &str) -> String {
    let trimmed = SUFFIX_RE.replace(raw.trim(), "");
    collapse_whitespace(&trimmed)
        .trim_end_matches(['.', ' '])
        .to_string()
}

/// Infobox and crawler values: anything not too short and not a category word.
fn loosely_plausible(ex: &Extractor, name: &str) -> bool {
    name.chars().count() > 2 && !stoplisted(ex, name)
}

/// Free-text captures: letters, spaces, hyphens and periods only.
fn strictly_plausible(ex: &Extractor, name: &str) -> bool {
    let len = name.chars().count();
    (3..50).contains(&len)
        && name
            .chars()
            .all(|c| c.is_alphabetic() || matches!(c, ' ' | '-' | '.'))
        && !stoplisted(ex, name)
}

/// Whole-word match, so "Stagg" survives a stoplisted "tag".
fn stoplisted(ex: &Extractor, name: &str) -> bool {
    let lower = name.to_lowercase();
    let words: Vec<&str> = lower
        .split(|c: char| !c.is_alphanumeric())
        .filter(|w| !w.is_empty())
        .collect();
    ex.stoplist.iter().any(|stop| words.contains(&stop.as_str()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::rules::ExtractRules;
    use crate::parser::DocumentMeta;

    fn extractor() -> Extractor {
        Extractor::new(&ExtractRules::builtin().unwrap()).unwrap()
    }

    fn filler() -> String {
        "The rain kept falling on the roof of the old house while I waited. ".repeat(4)
    }

    fn infobox(label: &str, value: &str) -> String {
        format!(
            r#"<aside class="portable-infobox"><div class="pi-item pi-data">
                <h3 class="pi-data-label">{label}</h3>
                <div class="pi-data-value">{value}</div>
            </div></aside>"#
        )
    }

    #[test]
    fn infobox_author_wins() {
        let html = format!(
            r#"<div class="mw-parser-output">{}<p>Story by Somebody Else</p><p>{}</p></div>"#,
            infobox("Author", "Nightfall_99"),
            filler()
        );
        let rec = extractor().extract(&html, "https://x.org/wiki/A", None);
        assert_eq!(rec.author, "Nightfall_99");
    }

    #[test]
    fn stoplisted_infobox_value_is_skipped() {
        let html = format!(
            r#"<div class="mw-parser-output">{}<p>Story by Marcus Hale</p><p>{}</p></div>"#,
            infobox("Writer", "Mental Illness"),
            filler()
        );
        let rec = extractor().extract(&html, "https://x.org/wiki/A", None);
        assert_eq!(rec.author, "Marcus Hale");
    }

    #[test]
    fn short_lead_is_not_searched() {
        let short = r#"<div class="mw-parser-output"><p>Told by Marcus Hale to me.</p><p>It was dark.</p></div>"#;
        let rec = extractor().extract(short, "https://x.org/wiki/A", None);
        assert_eq!(rec.author, UNKNOWN_AUTHOR);

        let long = format!(
            r#"<div class="mw-parser-output"><p>Told by Marcus Hale</p><p>{}</p></div>"#,
            filler()
        );
        let rec = extractor().extract(&long, "https://x.org/wiki/A", None);
        assert_eq!(rec.author, "Marcus Hale");
    }

    #[test]
    fn byline_does_not_match_inside_words() {
        let html = format!(
            r#"<div class="mw-parser-output"><p>{} The lake nearby was silent.</p></div>"#,
            filler()
        );
        let rec = extractor().extract(&html, "https://x.org/wiki/A", None);
        assert_eq!(rec.author, UNKNOWN_AUTHOR);
    }

    #[test]
    fn tail_credit_is_found() {
        let html = r#"<div class="mw-parser-output">
            <p>The wind howled all night.</p>
            <p>Written by Jane Doe.</p>
        </div>"#;
        let rec = extractor().extract(html, "https://x.org/wiki/A", None);
        assert_eq!(rec.author, "Jane Doe");
    }

    #[test]
    fn metadata_author_is_last_resort() {
        let meta = DocumentMeta {
            author: Some("  Ada   Merrow ".into()),
            ..Default::default()
        };
        let rec = extractor().extract("<p>Nothing here.</p>", "https://x.org/wiki/A", Some(&meta));
        assert_eq!(rec.author, "Ada Merrow");

        let meta = DocumentMeta {
            author: Some("Archive".into()),
            ..Default::default()
        };
        let rec = extractor().extract("<p>Nothing here.</p>", "https://x.org/wiki/A", Some(&meta));
        assert_eq!(rec.author, UNKNOWN_AUTHOR);
    }

    #[test]
    fn inline_byline_stops_at_sentence_end() {
        let html = format!(
            r#"<div class="mw-parser-output">
                <p>This story was written by Marcus Hale. The rain kept falling all night.</p>
                <p>{}</p>
                <p>Written by Marcus Hale</p>
            </div>"#,
            filler()
        );
        let rec = extractor().extract(&html, "https://x.org/wiki/A", None);
        assert_eq!(rec.author, "Marcus Hale");
        assert!(!rec.body.contains("Written by"));
        assert!(rec.body.ends_with("waited."));
    }

    #[test]
    fn lowercase_phrase_after_by_is_not_a_name() {
        let html = format!(
            r#"<div class="mw-parser-output"><p>I walked by the old mill when I heard a scream. {}</p></div>"#,
            filler()
        );
        let rec = extractor().extract(&html, "https://x.org/wiki/A", None);
        assert_eq!(rec.author, UNKNOWN_AUTHOR);
    }

    #[test]
    fn initials_keep_their_periods() {
        let html = format!(
            r#"<div class="mw-parser-output"><p>A tale by J. R. Hale. It begins in winter.</p><p>{}</p></div>"#,
            filler()
        );
        let rec = extractor().extract(&html, "https://x.org/wiki/A", None);
        assert_eq!(rec.author, "J. R. Hale");
    }

    #[test]
    fn stoplist_matches_whole_words() {
        let ex = extractor();
        assert!(strictly_plausible(&ex, "Dana Stagg"));
        assert!(strictly_plausible(&ex, "Luis Reyes"));
        assert!(loosely_plausible(&ex, "Findlay"));
        assert!(!loosely_plausible(&ex, "Category:Ghosts"));
        assert!(!strictly_plausible(&ex, "Mental Illness"));
    }

    #[test]
    fn candidate_cleanup() {
        assert_eq!(clean_candidate("Marcus Hale wrote this"), "Marcus Hale");
        assert_eq!(clean_candidate(" Jane Doe. "), "Jane Doe");
        assert_eq!(clean_candidate("Jane Doe Story"), "Jane Doe");
    }

    #[test]
    fn strict_validation() {
        let ex = extractor();
        assert!(strictly_plausible(&ex, "J. R. Hale"));
        assert!(strictly_plausible(&ex, "Anne-Marie Holt"));
        assert!(!strictly_plausible(&ex, "Al"));
        assert!(!strictly_plausible(&ex, "O'Brien"));
        assert!(!strictly_plausible(&ex, "the horror crew"));
        assert!(!strictly_plausible(&ex, &"a".repeat(50)));
    }
}
