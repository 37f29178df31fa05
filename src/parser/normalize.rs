use std::sync::LazyLock;

use anyhow::Result;
use regex::Regex;
use scraper::{ElementRef, Html, Selector};

use super::rules::{lowercase_all, selector, selectors, ExtractRules};
use super::UNKNOWN_AUTHOR;

const BLOCK_TAGS: &[&str] = &["p", "ul", "ol", "dl", "blockquote", "pre"];
const CONTAINER_TAGS: &[&str] = &["div", "section", "article", "main", "center"];

static FOOTER_RES: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    [
        r"(?im)Content is available under.*$",
        r"(?im)This page was last edited.*$",
        r"(?im)Categories:.*$",
        r"(?im)Retrieved from.*$",
        r"(?im)Jump to.*$",
    ]
    .iter()
    .map(|p| Regex::new(p).unwrap())
    .collect()
});
static PARAGRAPH_BREAK_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\n\s*\n").unwrap());

/// Turns the main content region of a wiki page into plain paragraphs.
pub struct Normalizer {
    content_root: Selector,
    remove: Vec<Selector>,
    skip_classes: Vec<String>,
    min_fragment_chars: usize,
    boilerplate: Vec<String>,
}

impl Normalizer {
    pub fn new(rules: &ExtractRules) -> Result<Self> {
        Ok(Self {
            content_root: selector(&rules.content_root)?,
            remove: selectors(&rules.remove_selectors)?,
            skip_classes: rules.skip_classes.clone(),
            min_fragment_chars: rules.min_fragment_chars,
            boilerplate: lowercase_all(&rules.boilerplate_phrases),
        })
    }

    /// Normalize an HTML fragment. Uses the content root inside the fragment
    /// when there is one, the whole fragment otherwise.
    pub fn normalize(&self, html: &str, known_author: &str) -> String {
        if html.trim().is_empty() {
            return String::new();
        }
        let fragment = Html::parse_fragment(html);
        let root = fragment
            .select(&self.content_root)
            .next()
            .unwrap_or_else(|| fragment.root_element());
        self.normalize_element(root, known_author)
    }

    pub fn normalize_element(&self, root: ElementRef<'_>, known_author: &str) -> String {
        let kept: Vec<String> = self
            .block_texts(root)
            .into_iter()
            .filter(|t| self.keep_fragment(t))
            .collect();
        let mut text = kept.join("\n\n");

        let author = known_author.trim();
        if !author.is_empty() && author != UNKNOWN_AUTHOR {
            text = strip_attribution(&text, author);
        }
        for re in FOOTER_RES.iter() {
            text = re.replace_all(&text, "").into_owned();
        }
        tidy_paragraphs(&text)
    }

    /// Text of every block-level element under `root`, in document order,
    /// before any boilerplate filtering.
    pub fn block_texts(&self, root: ElementRef<'_>) -> Vec<String> {
        let mut out = Vec::new();
        self.collect_blocks(root, &mut out);
        out.retain(|t| !t.is_empty());
        out
    }

    /// Whitespace-collapsed text of `el`, skipping removed and navigation elements.
    pub fn visible_text(&self, el: ElementRef<'_>) -> String {
        let mut pieces = Vec::new();
        self.push_text(el, &mut pieces);
        collapse_whitespace(&pieces.join(" "))
    }

    fn collect_blocks(&self, el: ElementRef<'_>, out: &mut Vec<String>) {
        for child in el.children().filter_map(ElementRef::wrap) {
            if self.is_excluded(&child) {
                continue;
            }
            let name = child.value().name();
            let whole = BLOCK_TAGS.contains(&name)
                || (CONTAINER_TAGS.contains(&name) && !has_nested_block(&child));
            if whole {
                out.push(self.visible_text(child));
            } else {
                self.collect_blocks(child, out);
            }
        }
    }

    fn push_text<'a>(&self, el: ElementRef<'a>, pieces: &mut Vec<&'a str>) {
        for child in el.children() {
            if let Some(child_el) = ElementRef::wrap(child) {
                if !self.is_excluded(&child_el) {
                    self.push_text(child_el, pieces);
                }
            } else if let Some(text) = child.value().as_text() {
                pieces.push(&**text);
            }
        }
    }

    fn is_excluded(&self, el: &ElementRef<'_>) -> bool {
        self.remove.iter().any(|sel| sel.matches(el))
            || el
                .value()
                .classes()
                .any(|class| self.skip_classes.iter().any(|skip| skip == class))
    }

    fn keep_fragment(&self, text: &str) -> bool {
        if text.chars().count() < self.min_fragment_chars {
            return false;
        }
        let lower = text.to_lowercase();
        !self.boilerplate.iter().any(|phrase| lower.contains(phrase.as_str()))
    }
}

fn has_nested_block(el: &ElementRef<'_>) -> bool {
    el.descendants()
        .skip(1)
        .filter_map(ElementRef::wrap)
        .any(|d| {
            let name = d.value().name();
            BLOCK_TAGS.contains(&name) || CONTAINER_TAGS.contains(&name)
        })
}

/// Drop a "Written by NAME" style credit from the last line of `text`.
fn strip_attribution(text: &str, author: &str) -> String {
    let pattern = format!(
        r"(?i)\s*(?:Written by|by|Author:)\s+{}.*$",
        regex::escape(author)
    );
    match Regex::new(&pattern) {
        Ok(re) => re.replace(text, "").into_owned(),
        Err(_) => text.to_string(),
    }
}

pub(crate) fn collapse_whitespace(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn tidy_paragraphs(text: &str) -> String {
    PARAGRAPH_BREAK_RE
        .split(text)
        .map(collapse_whitespace)
        .filter(|p| !p.is_empty())
        .collect::<Vec<_>>()
        .join("\n\n")
}

// ── Tests ──
