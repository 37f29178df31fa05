use std::sync::LazyLock;

use chrono::NaiveDate;
use regex::Regex;

use super::{first_match, Page, Strategy};

const MONTH: &str = r"(january|february|march|april|may|june|july|august|september|october|november|december|jan|feb|mar|apr|jun|jul|aug|sept|sep|oct|nov|dec)\.?";

static ISO_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b(\d{4})-(\d{1,2})-(\d{1,2})(?:\D|$)").unwrap());
static MONTH_DAY_YEAR_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!(r"(?i)\b{MONTH}\s+(\d{{1,2}})(?:st|nd|rd|th)?,?\s+(\d{{4}})\b")).unwrap()
});
static DAY_MONTH_YEAR_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!(r"(?i)\b(\d{{1,2}})(?:st|nd|rd|th)?\s+(?:of\s+)?{MONTH},?\s+(\d{{4}})\b")).unwrap()
});
static SLASH_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b(\d{1,2})/(\d{1,2})/(\d{4})\b").unwrap());
static MONTH_YEAR_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(&format!(r"(?i)\b{MONTH}\s+(\d{{4}})\b")).unwrap());

const STRATEGIES: &[Strategy<NaiveDate>] = &[from_infobox, from_header_meta, from_metadata];

pub(crate) fn resolve(page: &Page<'_>) -> Option<NaiveDate> {
    first_match(page, STRATEGIES)
}

fn from_infobox(page: &Page<'_>) -> Option<NaiveDate> {
    page.infobox_values(&page.ex.date_labels)
        .iter()
        .find_map(|v| parse_fuzzy_date(v))
}

fn from_header_meta(page: &Page<'_>) -> Option<NaiveDate> {
    let ex = page.ex;
    ex.date_fallbacks.iter().find_map(|sel| {
        let el = page.html.select(sel).next()?;
        parse_fuzzy_date(&ex.normalizer.visible_text(el))
    })
}

fn from_metadata(page: &Page<'_>) -> Option<NaiveDate> {
    parse_fuzzy_date(page.meta?.published.as_deref()?)
}

/// Find a calendar date somewhere in free text.
///
/// Accepts ISO dates (including the date part of timestamps), "October 12, 2019",
/// "12 October 2019", US-style "10/12/2019" and "October 2019" (first of the
/// month). Impossible dates such as February 30 yield `None`.
pub fn parse_fuzzy_date(text: &str) -> Option<NaiveDate> {
    if let Some(c) = ISO_RE.captures(text) {
        return ymd(&c[1], &c[2], &c[3]);
    }
    if let Some(c) = MONTH_DAY_YEAR_RE.captures(text) {
        return NaiveDate::from_ymd_opt(c[3].parse().ok()?, month_number(&c[1])?, c[2].parse().ok()?);
    }
    if let Some(c) = DAY_MONTH_YEAR_RE.captures(text) {
        return NaiveDate::from_ymd_opt(c[3].parse().ok()?, month_number(&c[2])?, c[1].parse().ok()?);
    }
    if let Some(c) = SLASH_RE.captures(text) {
        return ymd(&c[3], &c[1], &c[2]);
    }
    if let Some(c) = MONTH_YEAR_RE.captures(text) {
        return NaiveDate::from_ymd_opt(c[2].parse().ok()?, month_number(&c[1])?, 1);
    }
    None
}

fn ymd(y: &str, m: &str, d: &str) -> Option<NaiveDate> {
    NaiveDate::from_ymd_opt(y.parse().ok()?, m.parse().ok()?, d.parse().ok()?)
}

fn month_number(name: &str) -> Option<u32> {
    let prefix: String = name.chars().take(3).collect::<String>().to_lowercase();
    let n = match prefix.as_str() {
        "jan" => 1,
        "feb" => 2,
        "mar" => 3,
        "apr" => 4,
        "may" => 5,
        "jun" => 6,
        "jul" => 7,
        "aug" => 8,
        "sep" => 9,
        "oct" => 10,
        "nov" => 11,
        "dec" => 12,
        _ => return None,
    };
    Some(n)
}
