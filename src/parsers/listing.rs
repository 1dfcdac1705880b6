use std::{fmt, sync::LazyLock};

use regex::Regex;
use scraper::{ElementRef, Html, Selector};

use crate::model::record::{ListingItem, RATING_NOT_AVAILABLE};

/// Seletor CSS de um item renderizado da listagem.
pub const ITEM_SELECTOR: &str = "li.ipc-metadata-list-summary-item";

static IDENTIFIER_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"/title/(tt\d+)/").expect("identifier regex"));
static ORDINAL_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\d+\.\s*").expect("ordinal regex"));
// Aceita "2011", "2011–2014" e "2011–".
static YEAR_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(\d{4})(?:–)?(?:\s*)?(?:\d{4})?").expect("year regex"));

static ITEM: LazyLock<Selector> = LazyLock::new(|| selector(ITEM_SELECTOR));
static ANCHOR: LazyLock<Selector> = LazyLock::new(|| selector("a"));
static HEADING: LazyLock<Selector> = LazyLock::new(|| selector("h3"));
static METADATA: LazyLock<Selector> =
    LazyLock::new(|| selector("span.dli-title-metadata-item"));
static RATING: LazyLock<Selector> =
    LazyLock::new(|| selector("span.ipc-rating-star--rating"));

fn selector(css: &str) -> Selector {
    Selector::parse(css).expect("static selector")
}

/// HTML bruto de um item da listagem, antes da extração.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fragment {
    html: String,
}

impl Fragment {
    pub fn new(html: impl Into<String>) -> Self {
        Fragment { html: html.into() }
    }

    pub fn html(&self) -> &str {
        &self.html
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    MissingIdentifier,
    MissingTitle,
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SkipReason::MissingIdentifier => f.write_str("identifier not found"),
            SkipReason::MissingTitle => f.write_str("title heading not found"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FragmentOutcome {
    Parsed(ListingItem),
    Skipped(SkipReason),
}

/// Divide o HTML da página inteira nos fragmentos renderizados, em ordem.
pub fn split_page(page_source: &str) -> Vec<Fragment> {
    let doc = Html::parse_document(page_source);
    doc.select(&ITEM).map(|el| Fragment::new(el.html())).collect()
}

pub fn parse_fragment(fragment: &Fragment) -> FragmentOutcome {
    let doc = Html::parse_fragment(fragment.html());

    let identifier = match doc
        .select(&ANCHOR)
        .next()
        .and_then(|a| a.value().attr("href"))
        .and_then(extract_identifier)
    {
        Some(id) => id,
        None => return FragmentOutcome::Skipped(SkipReason::MissingIdentifier),
    };

    let title = match doc.select(&HEADING).next() {
        Some(h) => clean_title(&element_text(h)),
        None => return FragmentOutcome::Skipped(SkipReason::MissingTitle),
    };

    let release_year = doc
        .select(&METADATA)
        .next()
        .and_then(|span| extract_year(&element_text(span)));

    let source_rating = doc
        .select(&RATING)
        .next()
        .map(element_text)
        .unwrap_or_else(|| RATING_NOT_AVAILABLE.to_string());

    FragmentOutcome::Parsed(ListingItem {
        identifier,
        title,
        release_year,
        source_rating,
    })
}

pub fn extract_identifier(href: &str) -> Option<String> {
    IDENTIFIER_RE
        .captures(href)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().to_string())
}

/// Remove a numeração do ranking: `"1. Naruto"` vira `"Naruto"`.
pub fn clean_title(raw: &str) -> String {
    ORDINAL_RE.replace(raw.trim(), "").trim().to_string()
}

pub fn extract_year(text: &str) -> Option<String> {
    YEAR_RE
        .captures(text)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().to_string())
}

fn element_text(el: ElementRef<'_>) -> String {
    el.text().collect::<String>().trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item_html(href: Option<&str>, heading: Option<&str>, meta: Option<&str>, rating: Option<&str>) -> Fragment {
        let mut html = String::from(r#"<li class="ipc-metadata-list-summary-item"><div>"#);
        if let Some(h) = href {
            html.push_str(&format!(r#"<a href="{h}" class="ipc-title-link-wrapper">"#));
        }
        if let Some(t) = heading {
            html.push_str(&format!(r#"<h3 class="ipc-title__text">{t}</h3>"#));
        }
        if href.is_some() {
            html.push_str("</a>");
        }
        if let Some(m) = meta {
            html.push_str(&format!(r#"<span class="sc-1 dli-title-metadata-item">{m}</span>"#));
        }
        if let Some(r) = rating {
            html.push_str(&format!(
                r#"<span class="ipc-rating-star--rating">{r}</span>"#
            ));
        }
        html.push_str("</div></li>");
        Fragment::new(html)
    }

    #[test]
    fn clean_title_strips_leading_ordinal() {
        assert_eq!(clean_title("1. Naruto"), "Naruto");
        assert_eq!(clean_title("Naruto"), "Naruto");
        assert_eq!(clean_title("  42.   Cowboy Bebop "), "Cowboy Bebop");
        assert_eq!(clean_title("86 Eighty-Six"), "86 Eighty-Six");
    }

    #[test]
    fn extract_year_handles_ranges() {
        assert_eq!(extract_year("2011–2014").as_deref(), Some("2011"));
        assert_eq!(extract_year("2019–").as_deref(), Some("2019"));
        assert_eq!(extract_year("TV Series 1998").as_deref(), Some("1998"));
        assert_eq!(extract_year("no year here"), None);
    }

    #[test]
    fn parses_complete_fragment() {
        let frag = item_html(
            Some("/title/tt0409591/?ref_=sr_t_1"),
            Some("1. Naruto"),
            Some("2002–2007"),
            Some("8.4"),
        );

        assert_eq!(
            parse_fragment(&frag),
            FragmentOutcome::Parsed(ListingItem {
                identifier: "tt0409591".into(),
                title: "Naruto".into(),
                release_year: Some("2002".into()),
                source_rating: "8.4".into(),
            })
        );
    }

    #[test]
    fn optional_parts_fall_back() {
        let frag = item_html(Some("/title/tt0112159/"), Some("Evangelion"), None, None);

        match parse_fragment(&frag) {
            FragmentOutcome::Parsed(item) => {
                assert_eq!(item.release_year, None);
                assert_eq!(item.source_rating, RATING_NOT_AVAILABLE);
            }
            other => panic!("unexpected outcome: {other:?}"),
        }
    }

    #[test]
    fn missing_link_is_always_skipped() {
        let no_anchor = item_html(None, Some("1. Naruto"), Some("2002"), Some("8.4"));
        assert_eq!(
            parse_fragment(&no_anchor),
            FragmentOutcome::Skipped(SkipReason::MissingIdentifier)
        );

        let wrong_link = item_html(Some("/name/nm0000001/"), Some("Someone"), None, None);
        assert_eq!(
            parse_fragment(&wrong_link),
            FragmentOutcome::Skipped(SkipReason::MissingIdentifier)
        );
    }

    #[test]
    fn missing_heading_is_skipped() {
        let frag = item_html(Some("/title/tt0409591/"), None, Some("2002"), None);
        assert_eq!(
            parse_fragment(&frag),
            FragmentOutcome::Skipped(SkipReason::MissingTitle)
        );
    }

    #[test]
    fn split_page_keeps_render_order() {
        let first = item_html(Some("/title/tt0000001/"), Some("1. First"), None, None);
        let second = item_html(Some("/title/tt0000002/"), Some("2. Second"), None, None);
        let page = format!(
            "<html><body><ul>{}{}</ul><li class=\"other\">x</li></body></html>",
            first.html(),
            second.html()
        );

        let ids: Vec<String> = split_page(&page)
            .iter()
            .filter_map(|f| match parse_fragment(f) {
                FragmentOutcome::Parsed(item) => Some(item.identifier),
                FragmentOutcome::Skipped(_) => None,
            })
            .collect();
        assert_eq!(ids, ["tt0000001", "tt0000002"]);
    }

    #[test]
    fn parsing_is_pure() {
        let frag = item_html(Some("/title/tt0877057/"), Some("3. Death Note"), Some("2006–2007"), Some("8.9"));
        assert_eq!(parse_fragment(&frag), parse_fragment(&frag.clone()));
    }
}
