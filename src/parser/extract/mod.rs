pub mod author;
pub mod date;
pub mod tags;
pub mod title;

use anyhow::Result;
use scraper::{ElementRef, Html, Selector};

use super::normalize::Normalizer;
use super::rules::{lowercase_all, selector, selectors, ExtractRules};
use super::{DocumentMeta, ExtractedRecord};

/// A fallback step: yields a value or defers to the next strategy.
pub(crate) type Strategy<T> = fn(&Page<'_>) -> Option<T>;

/// Run `strategies` in order and keep the first value produced.
pub(crate) fn first_match<T>(page: &Page<'_>, strategies: &[Strategy<T>]) -> Option<T> {
    strategies.iter().find_map(|strategy| strategy(page))
}

/// Compiled extraction rules plus the body normalizer.
pub struct Extractor {
    title_selectors: Vec<Selector>,
    placeholder_titles: Vec<String>,
    content_root: Selector,
    paragraph: Selector,
    infobox_row: Selector,
    infobox_label: Selector,
    infobox_value: Selector,
    author_labels: Vec<String>,
    date_labels: Vec<String>,
    date_fallbacks: Vec<Selector>,
    tag_selectors: Vec<Selector>,
    stoplist: Vec<String>,
    lead_paragraphs: usize,
    lead_min_chars: usize,
    tail_chars: usize,
    normalizer: Normalizer,
}

/// Everything a strategy may look at for one document.
pub(crate) struct Page<'a> {
    pub html: &'a Html,
    pub content: ElementRef<'a>,
    pub url: &'a str,
    pub meta: Option<&'a DocumentMeta>,
    pub ex: &'a Extractor,
}

impl Extractor {
    pub fn new(rules: &ExtractRules) -> Result<Self> {
        let mut placeholder_titles = lowercase_all(&rules.placeholder_titles);
        placeholder_titles.extend(lowercase_all(std::slice::from_ref(&rules.site_name)));

        Ok(Self {
            title_selectors: selectors(&rules.title_selectors)?,
            placeholder_titles,
            content_root: selector(&rules.content_root)?,
            paragraph: selector("p")?,
            infobox_row: selector(&rules.infobox_row)?,
            infobox_label: selector(&rules.infobox_label)?,
            infobox_value: selector(&rules.infobox_value)?,
            author_labels: lowercase_all(&rules.author_labels),
            date_labels: lowercase_all(&rules.date_labels),
            date_fallbacks: selectors(&rules.date_fallback_selectors)?,
            tag_selectors: selectors(&rules.tag_selectors)?,
            stoplist: lowercase_all(&rules.author_stoplist),
            lead_paragraphs: rules.lead_paragraphs,
            lead_min_chars: rules.lead_min_chars,
            tail_chars: rules.tail_chars,
            normalizer: Normalizer::new(rules)?,
        })
    }

    /// Build a record from one page. Never fails: every field has a default.
    pub fn extract(&self, raw_html: &str, url: &str, meta: Option<&DocumentMeta>) -> ExtractedRecord {
        let html = Html::parse_document(raw_html);
        let content = html
            .select(&self.content_root)
            .next()
            .unwrap_or_else(|| html.root_element());
        let page = Page {
            html: &html,
            content,
            url,
            meta,
            ex: self,
        };

        let title = title::resolve(&page);
        let author = author::resolve(&page);
        let publication_date = date::resolve(&page);
        let tags = tags::collect(&page);
        let body = self.normalizer.normalize_element(content, &author);

        ExtractedRecord {
            url: url.to_string(),
            title,
            author,
            publication_date,
            tags,
            body,
        }
    }

    pub fn normalizer(&self) -> &Normalizer {
        &self.normalizer
    }
}

impl<'a> Page<'a> {
    /// Values of infobox rows whose label contains one of `labels`, in page order.
    pub fn infobox_values(&self, labels: &[String]) -> Vec<String> {
        let ex = self.ex;
        self.html
            .select(&ex.infobox_row)
            .filter_map(|row| {
                let label = row.select(&ex.infobox_label).next()?;
                let label = ex.normalizer.visible_text(label).to_lowercase();
                if !labels.iter().any(|l| label.contains(l.as_str())) {
                    return None;
                }
                let value = row.select(&ex.infobox_value).next()?;
                let value = ex.normalizer.visible_text(value);
                (!value.is_empty()).then_some(value)
            })
            .collect()
    }

    /// Opening paragraphs of the story, one per line.
    pub fn lead_text(&self) -> String {
        self.content
            .select(&self.ex.paragraph)
            .take(self.ex.lead_paragraphs)
            .map(|p| self.ex.normalizer.visible_text(p))
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// The last `tail_chars` characters of the content region's block text.
    pub fn tail_text(&self) -> String {
        let full = self.ex.normalizer.block_texts(self.content).join("\n");
        let count = full.chars().count();
        let skip = count.saturating_sub(self.ex.tail_chars);
        full.chars().skip(skip).collect()
    }
}

// ── Tests ──
