// src/services/list_parser.rs

//! List page parsing.
//!
//! Turns one listing page into candidate entries using the target's
//! container selector and inline field rules.

use std::sync::LazyLock;

use scraper::{ElementRef, Html, Selector};
use url::Url;

use crate::models::{CandidateEntry, FieldValues, ListRules};
use crate::services::extract::{extract_fallback, extract_field};
use crate::utils::url::resolve;

static ANCHOR: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("a[href]").expect("anchor selector is valid"));

static BASE_HREF: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("base[href]").expect("base selector is valid"));

/// Extract candidate entries from a parsed list page, in page order.
///
/// A container selector that matches nothing yields an empty list.
pub fn parse_list(document: &Html, page_url: &Url, rules: &ListRules) -> Vec<CandidateEntry> {
    let base = document_base(document, page_url);
    let mut entries = Vec::new();

    for row in document.select(&rules.container) {
        if entries.len() >= rules.max_items {
            log::debug!(
                "Item limit {} reached on {}; remaining rows ignored",
                rules.max_items,
                page_url
            );
            break;
        }

        let Some(link) = row_link(row, rules, &base) else {
            log::debug!("Row without a usable detail link skipped on {page_url}");
            continue;
        };

        let fields: FieldValues = rules
            .fields
            .iter()
            .filter_map(|field| {
                extract_field(field, row)
                    .or_else(|| extract_fallback(field, row))
                    .map(|v| (field.name.clone(), v))
            })
            .collect();

        entries.push(CandidateEntry::new(link, fields));
    }

    entries
}

/// URL that relative links on the page resolve against.
pub fn document_base(document: &Html, page_url: &Url) -> Url {
    document
        .select(&BASE_HREF)
        .next()
        .and_then(|el| el.value().attr("href"))
        .and_then(|href| resolve(page_url, href))
        .unwrap_or_else(|| page_url.clone())
}

fn row_link(row: ElementRef<'_>, rules: &ListRules, base: &Url) -> Option<Url> {
    let attr = rules.link_attr.as_str();
    let href = match &rules.link {
        Some(selector) => row.select(selector).find_map(|el| el.value().attr(attr)),
        None if row.value().name() == "a" => row.value().attr(attr),
        None => row.select(&ANCHOR).find_map(|el| el.value().attr(attr)),
    }?;
    resolve(base, href)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::AppError;
    use crate::error::Result;
    use crate::models::{CompiledField, DatePart, Extract, parse_selector};
    use crate::services::extract::load_document;

    fn field(name: &str, selector: &str) -> CompiledField {
        CompiledField {
            name: name.into(),
            selector: parse_selector(selector).unwrap(),
            extract: Extract::Text,
            label: None,
            date: None,
            fallback: Vec::new(),
            default_from: None,
            required: false,
        }
    }

    fn rules(container: &str) -> ListRules {
        let mut date = field("date", "td:nth-child(2)");
        date.date = Some(DatePart::Start);
        ListRules {
            container: parse_selector(container).unwrap(),
            link: None,
            link_attr: "href".into(),
            fields: vec![field("title", "td:first-child a"), date],
            max_items: 100,
        }
    }

    fn page_url() -> Url {
        Url::parse("https://sprout.example.edu/DeepNews.aspx?spid=S1").unwrap()
    }

    fn parse_list_page(content: &str, url: &Url, rules: &ListRules) -> Result<Vec<CandidateEntry>> {
        let document = load_document(content, url.as_str())?;
        Ok(parse_list(&document, url, rules))
    }

    const LIST: &str = r#"
        <html><body><table><tbody>
            <tr><td><a href="DeepNewsDtl.aspx?nid=A1">教學工作坊</a></td><td>2024-05-01</td></tr>
            <tr><td><a href="/DeepNewsDtl.aspx?nid=A2">  期末 講座 </a></td><td>公告</td></tr>
            <tr><td>無連結</td><td>2024-05-03</td></tr>
            <tr><td><a href="javascript:void(0)">壞連結</a></td><td>2024-05-04</td></tr>
        </tbody></table></body></html>
    "#;

    #[test]
    fn test_entries_in_page_order_with_resolved_links() {
        let entries = parse_list_page(LIST, &page_url(), &rules("table tbody tr")).unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(
            entries[0].link.as_str(),
            "https://sprout.example.edu/DeepNewsDtl.aspx?nid=A1"
        );
        assert_eq!(entries[0].field("title"), Some("教學工作坊"));
        assert_eq!(entries[0].field("date"), Some("2024-05-01"));
    }

    #[test]
    fn test_missing_inline_field_is_absent() {
        let entries = parse_list_page(LIST, &page_url(), &rules("table tbody tr")).unwrap();
        assert_eq!(entries[1].field("title"), Some("期末 講座"));
        assert_eq!(entries[1].field("date"), None);
    }

    #[test]
    fn test_zero_matches_is_empty_not_error() {
        let entries = parse_list_page(LIST, &page_url(), &rules("ul.news li")).unwrap();
        assert!(entries.is_empty());
    }

    #[test]
    fn test_non_markup_is_parse_error() {
        let err = parse_list_page("Service Unavailable", &page_url(), &rules("tr")).unwrap_err();
        assert!(matches!(err, AppError::Parse { .. }));
    }

    #[test]
    fn test_max_items_caps_entries() {
        let mut r = rules("table tbody tr");
        r.max_items = 1;
        let entries = parse_list_page(LIST, &page_url(), &r).unwrap();
        assert_eq!(entries.len(), 1);
    }

    #[test]
    fn test_link_selector_and_base_href() {
        let html = r#"
            <html><head><base href="https://cdn.example.edu/news/"></head><body>
                <div class="item"><a class="share" href="https://social.example.com/x">分享</a>
                    <h3><a class="title" href="detail/7">標題</a></h3></div>
            </body></html>
        "#;
        let mut r = rules("div.item");
        r.link = Some(parse_selector("a.title").unwrap());
        r.fields = vec![field("title", "h3")];

        let entries = parse_list_page(html, &page_url(), &r).unwrap();
        assert_eq!(entries[0].link.as_str(), "https://cdn.example.edu/news/detail/7");
        assert_eq!(entries[0].field("title"), Some("標題"));
    }

    #[test]
    fn test_row_fallback_selector() {
        let mut r = rules("table tbody tr");
        r.fields[1].selector = parse_selector("td.date").unwrap();
        r.fields[1].fallback = vec![parse_selector("td:nth-child(2)").unwrap()];
        let entries = parse_list_page(LIST, &page_url(), &r).unwrap();
        assert_eq!(entries[0].field("date"), Some("2024-05-01"));
    }

    #[test]
    fn test_container_that_is_the_link() {
        let html = r#"<ul><a class="row" href="/d/1"><span>甲</span></a></ul>"#;
        let mut r = rules("a.row");
        r.fields = vec![field("title", "span")];
        let entries = parse_list_page(html, &page_url(), &r).unwrap();
        assert_eq!(entries[0].link.as_str(), "https://sprout.example.edu/d/1");
    }
}
