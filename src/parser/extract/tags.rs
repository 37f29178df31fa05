use std::collections::HashSet;

use super::Page;

/// Category links from the page, then crawler-supplied tags, first occurrence kept.
pub(crate) fn collect(page: &Page<'_>) -> Vec<String> {
    let ex = page.ex;
    let from_page = ex
        .tag_selectors
        .iter()
        .flat_map(|sel| page.html.select(sel))
        .map(|a| ex.normalizer.visible_text(a));
    let from_meta = page
        .meta
        .map(|m| m.tags.clone())
        .unwrap_or_default();

    dedup_ordered(from_page.chain(from_meta))
}

/// Trim, drop blanks and remove case-sensitive duplicates, keeping order.
pub fn dedup_ordered<I>(tags: I) -> Vec<String>
where
    I: IntoIterator<Item = String>,
{
    let mut seen = HashSet::new();
    tags.into_iter()
        .map(|t| t.trim().to_string())
        .filter(|t| !t.is_empty() && seen.insert(t.clone()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::rules::ExtractRules;
    use crate::parser::{DocumentMeta, Extractor};

    #[test]
    fn dedup_keeps_first_occurrence() {
        let tags = ["Ghosts", " Ghosts", "ghosts", "", "  ", "Woods", "Ghosts"]
            .into_iter()
            .map(String::from);
        assert_eq!(dedup_ordered(tags), vec!["Ghosts", "ghosts", "Woods"]);
    }

    #[test]
    fn selectors_then_metadata() {
        let ex = Extractor::new(&ExtractRules::builtin().unwrap()).unwrap();
        let html = r#"<html><body>
            <div class="page-header__categories"><a href="/c/1">Woods</a><a href="/c/2">Ghosts</a></div>
            <div id="articleCategories"><a class="category" href="/c/2">Ghosts</a></div>
            <a rel="tag" href="/t/3"> Pasta </a>
        </body></html>"#;
        let meta = DocumentMeta {
            tags: vec!["Woods".into(), "Crawled".into()],
            ..Default::default()
        };
        let rec = ex.extract(html, "https://x.org/wiki/A", Some(&meta));
        assert_eq!(rec.tags, vec!["Ghosts", "Pasta", "Woods", "Crawled"]);
    }
}
