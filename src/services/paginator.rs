// src/services/paginator.rs

//! Pagination controller.
//!
//! A [`Paginator`] walks a target's list pages as a small state machine:
//! it starts at `AtPage(1)` and moves to the next page, `Exhausted` or
//! `LimitReached` after each parsed page. [`collect_entries`] drives it
//! with a [`Fetcher`] and gathers candidate entries in page order.

use std::collections::HashSet;
use std::sync::LazyLock;

use scraper::{Html, Selector};
use url::Url;

use crate::models::{CandidateEntry, Pagination, Target};
use crate::services::extract::load_document;
use crate::services::fetcher::{Fetcher, Pacer};
use crate::services::list_parser::{document_base, parse_list};
use crate::utils::url::{numeric_query_param, resolve, with_query_param, without_fragment};

static ANCHOR: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("a[href]").expect("anchor selector is valid"));

/// Where pagination currently stands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageState {
    /// Page `n` (1-based) is the next one to fetch.
    AtPage(u32),
    /// No further page exists.
    Exhausted,
    /// A further page exists but the page limit was hit.
    LimitReached,
}

pub struct Paginator<'t> {
    target: &'t Target,
    state: PageState,
    current: Url,
    visited: HashSet<String>,
    /// Highest page number linked from any page seen so far
    highest_linked: u32,
}

impl<'t> Paginator<'t> {
    pub fn new(target: &'t Target) -> Self {
        let current = without_fragment(&target.base_url);
        let visited = HashSet::from([current.to_string()]);
        Self {
            target,
            state: PageState::AtPage(1),
            current,
            visited,
            highest_linked: 0,
        }
    }

    pub fn state(&self) -> PageState {
        self.state
    }

    /// URL of the page to fetch while in `AtPage`.
    pub fn current_url(&self) -> &Url {
        &self.current
    }

    /// Move past the current page.
    ///
    /// `document` is the parsed current page, or `None` when it could not
    /// be parsed. Terminal states are sticky.
    pub fn advance(&mut self, document: Option<&Html>) -> PageState {
        let PageState::AtPage(n) = self.state else {
            return self.state;
        };

        self.state = match self.next_url(n, document) {
            None => PageState::Exhausted,
            Some(_) if n >= self.target.max_pages => {
                log::info!(
                    "[{}] Page limit {} reached; later pages left for the next run",
                    self.target.name,
                    self.target.max_pages
                );
                PageState::LimitReached
            }
            Some(next) => {
                self.visited.insert(next.to_string());
                self.current = next;
                PageState::AtPage(n + 1)
            }
        };
        self.state
    }

    fn next_url(&mut self, n: u32, document: Option<&Html>) -> Option<Url> {
        let target = self.target;
        match &target.pagination {
            Pagination::None => None,
            Pagination::NextLink { selector, attr } => {
                let document = document?;
                let base = document_base(document, &self.current);
                let next = document
                    .select(selector)
                    .find_map(|el| el.value().attr(attr))
                    .and_then(|href| resolve(&base, href))
                    .map(|url| without_fragment(&url))?;

                if self.visited.contains(next.as_str()) {
                    log::debug!(
                        "[{}] Next link {} already visited; stopping",
                        target.name,
                        next
                    );
                    return None;
                }
                Some(next)
            }
            Pagination::QueryParam { param, start } => {
                if let Some(document) = document {
                    self.record_page_links(document, param);
                }
                let current_number = start + n - 1;
                (self.highest_linked > current_number).then(|| {
                    with_query_param(
                        &target.base_url,
                        param,
                        &(current_number + 1).to_string(),
                    )
                })
            }
        }
    }

    fn record_page_links(&mut self, document: &Html, param: &str) {
        let base = document_base(document, &self.current);
        let list = &self.target.base_url;
        let highest = document
            .select(&ANCHOR)
            .filter_map(|el| el.value().attr("href"))
            .filter_map(|href| resolve(&base, href))
            .filter(|url| url.host_str() == list.host_str() && url.path() == list.path())
            .filter_map(|url| numeric_query_param(&url, param))
            .max();

        if let Some(highest) = highest {
            self.highest_linked = self.highest_linked.max(highest);
        }
    }
}

/// Everything gathered while paginating one target.
#[derive(Debug)]
pub struct PaginationOutcome {
    pub entries: Vec<CandidateEntry>,
    pub pages_visited: u32,
    pub state: PageState,
    /// Pages that were fetched but could not be parsed
    pub errors: Vec<String>,
    /// Fetch failure that stopped pagination early
    pub aborted: Option<String>,
}

/// Walk every list page of `target`, in order, collecting candidates.
///
/// A fetch failure stops the walk but keeps what was already collected.
pub async fn collect_entries(
    fetcher: &dyn Fetcher,
    target: &Target,
    pacer: &mut Pacer,
) -> PaginationOutcome {
    let mut paginator = Paginator::new(target);
    let mut entries = Vec::new();
    let mut errors = Vec::new();
    let mut aborted = None;
    let mut pages_visited = 0;

    while let PageState::AtPage(n) = paginator.state() {
        let url = paginator.current_url().clone();
        pacer.wait().await;

        let content = match fetcher.fetch(&url, &target.headers).await {
            Ok(content) => content,
            Err(e) => {
                log::warn!("[{}] Page {n} fetch failed: {e}", target.name);
                aborted = Some(e.to_string());
                break;
            }
        };
        pages_visited += 1;

        match load_document(&content, url.as_str()) {
            Ok(document) => {
                let found = parse_list(&document, &url, &target.list);
                log::info!("[{}] Page {n}: {} entries", target.name, found.len());
                entries.extend(found);
                paginator.advance(Some(&document));
            }
            Err(e) => {
                log::warn!("[{}] Page {n} skipped: {e}", target.name);
                errors.push(e.to_string());
                paginator.advance(None);
            }
        }
    }

    PaginationOutcome {
        entries,
        pages_visited,
        state: paginator.state(),
        errors,
        aborted,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Config, KeyStrategy, PaginationRule, TargetConfig};
    use crate::services::fetcher::testing::StaticFetcher;
    use std::path::Path;

    const BASE: &str = "https://sprout.example.edu/DeepNews.aspx?spid=S1";

    fn target(pagination: PaginationRule, max_pages: u32) -> Target {
        let config = Config::default();
        let mut tc: TargetConfig = config.targets[0].clone();
        tc.url = BASE.into();
        tc.pagination = pagination;
        tc.max_pages = max_pages;
        tc.key = KeyStrategy::Link;
        Target::from_config(&tc, &config.crawler, Path::new("data")).unwrap()
    }

    fn query_param() -> PaginationRule {
        PaginationRule::QueryParam {
            param: "pg".into(),
            start: 1,
        }
    }

    fn page_url(n: u32) -> String {
        if n == 1 {
            BASE.to_string()
        } else {
            format!("{BASE}&pg={n}")
        }
    }

    /// List page with `rows` detail links and pager links up to `last`.
    fn list_page(page: u32, rows: u32, last: u32) -> String {
        let rows: String = (0..rows)
            .map(|i| {
                format!(
                    r#"<tr><td><a href="DeepNewsDtl.aspx?nid={page}-{i}">公告 {page}-{i}</a></td><td>2024-05-0{}</td></tr>"#,
                    i + 1
                )
            })
            .collect();
        let pager: String = (1..=last)
            .map(|p| format!(r#"<a href="DeepNews.aspx?spid=S1&pg={p}">{p}</a>"#))
            .collect();
        format!("<html><body><table><tbody>{rows}</tbody></table><div class=\"pager\">{pager}</div></body></html>")
    }

    fn site(pages: u32, rows: u32) -> StaticFetcher {
        (1..=pages).fold(StaticFetcher::new(), |f, n| {
            f.with_page(&page_url(n), list_page(n, rows, pages))
        })
    }

    #[tokio::test]
    async fn test_single_page_without_pagination() {
        let target = target(PaginationRule::None, 10);
        let fetcher = site(3, 2);
        let outcome = collect_entries(&fetcher, &target, &mut Pacer::from_millis(0)).await;

        assert_eq!(outcome.state, PageState::Exhausted);
        assert_eq!(outcome.pages_visited, 1);
        assert_eq!(outcome.entries.len(), 2);
    }

    #[tokio::test]
    async fn test_query_param_walks_all_pages_in_order() {
        let target = target(query_param(), 10);
        let fetcher = site(3, 2);
        let outcome = collect_entries(&fetcher, &target, &mut Pacer::from_millis(0)).await;

        assert_eq!(outcome.state, PageState::Exhausted);
        assert_eq!(outcome.pages_visited, 3);
        assert_eq!(
            fetcher.requested(),
            vec![page_url(1), page_url(2), page_url(3)]
        );
        let titles: Vec<_> = outcome
            .entries
            .iter()
            .map(|e| e.field("title").unwrap().to_string())
            .collect();
        assert_eq!(titles[0], "公告 1-0");
        assert_eq!(titles[5], "公告 3-1");
    }

    #[tokio::test]
    async fn test_limit_reached_when_more_pages_exist() {
        let target = target(query_param(), 2);
        let fetcher = site(5, 1);
        let outcome = collect_entries(&fetcher, &target, &mut Pacer::from_millis(0)).await;

        assert_eq!(outcome.state, PageState::LimitReached);
        assert_eq!(outcome.pages_visited, 2);
        assert_eq!(fetcher.requested().len(), 2);
    }

    #[tokio::test]
    async fn test_fetch_failure_keeps_earlier_pages() {
        let target = target(query_param(), 10);
        let fetcher = site(5, 2).with_failure(&page_url(3), "connection reset");
        let outcome = collect_entries(&fetcher, &target, &mut Pacer::from_millis(0)).await;

        assert_eq!(outcome.state, PageState::AtPage(3));
        assert_eq!(outcome.pages_visited, 2);
        assert_eq!(outcome.entries.len(), 4);
        assert!(outcome.aborted.unwrap().contains("connection reset"));
    }

    #[tokio::test]
    async fn test_unparseable_page_is_skipped_when_later_pages_known() {
        let target = target(query_param(), 10);
        let fetcher = site(3, 1).with_page(&page_url(2), "maintenance");
        let outcome = collect_entries(&fetcher, &target, &mut Pacer::from_millis(0)).await;

        assert_eq!(outcome.state, PageState::Exhausted);
        assert_eq!(outcome.pages_visited, 3);
        assert_eq!(outcome.entries.len(), 2);
        assert_eq!(outcome.errors.len(), 1);
    }

    #[tokio::test]
    async fn test_next_link_cycle_ends_exhausted() {
        let rule = PaginationRule::NextLink {
            selector: "a.next".into(),
            attr: "href".into(),
        };
        let target = target(rule, 10);
        let second = "https://sprout.example.edu/DeepNews.aspx?spid=S1&p=2";
        let page = |nid: u32, next: &str| {
            format!(
                r#"<table><tbody><tr><td><a href="/d?nid={nid}">x</a></td></tr></tbody></table><a class="next" href="{next}#top">下一頁</a>"#
            )
        };
        let fetcher = StaticFetcher::new()
            .with_page(BASE, page(1, second))
            .with_page(second, page(2, BASE));

        let outcome = collect_entries(&fetcher, &target, &mut Pacer::from_millis(0)).await;
        assert_eq!(outcome.state, PageState::Exhausted);
        assert_eq!(outcome.pages_visited, 2);
    }

    #[test]
    fn test_terminal_state_is_sticky() {
        let target = target(PaginationRule::None, 10);
        let mut paginator = Paginator::new(&target);
        assert_eq!(paginator.advance(None), PageState::Exhausted);
        assert_eq!(paginator.advance(None), PageState::Exhausted);
    }
}
