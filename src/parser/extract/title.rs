use std::sync::LazyLock;

use regex::Regex;

use super::{first_match, Page, Strategy};
use crate::parser::normalize::collapse_whitespace;

static PARENTHETICAL_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\([^)]*\)").unwrap());

const UNTITLED: &str = "Untitled";

const STRATEGIES: &[Strategy<String>] = &[from_headings, from_metadata, from_url];

pub(crate) fn resolve(page: &Page<'_>) -> String {
    first_match(page, STRATEGIES).unwrap_or_else(|| UNTITLED.to_string())
}

fn from_headings(page: &Page<'_>) -> Option<String> {
    let ex = page.ex;
    ex.title_selectors.iter().find_map(|sel| {
        let el = page.html.select(sel).next()?;
        accept(page, ex.normalizer.visible_text(el))
    })
}

fn from_metadata(page: &Page<'_>) -> Option<String> {
    let title = page.meta?.title.as_deref()?;
    accept(page, collapse_whitespace(title))
}

fn from_url(page: &Page<'_>) -> Option<String> {
    let title = title_from_url(page.url);
    (!title.is_empty()).then_some(title)
}

fn accept(page: &Page<'_>, title: String) -> Option<String> {
    if title.chars().count() <= 2 {
        return None;
    }
    let lower = title.to_lowercase();
    if page.ex.placeholder_titles.iter().any(|p| *p == lower) {
        return None;
    }
    Some(title)
}

/// Readable title from the last path segment of a wiki URL.
pub fn title_from_url(url: &str) -> String {
    let path = url.split(['?', '#']).next().unwrap_or_default();
    let segment = path.trim_end_matches('/').rsplit('/').next().unwrap_or_default();
    let spaced = segment.replace('_', " ");
    collapse_whitespace(&PARENTHETICAL_RE.replace_all(&spaced, ""))
}
