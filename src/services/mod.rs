//! Service layer for the crawler application.
//!
//! This module contains the building blocks of a target crawl:
//! - Page fetching (`Fetcher`, `HttpFetcher`)
//! - List and detail page parsing
//! - Pagination (`Paginator`, `collect_entries`)
//! - robots.txt checks

pub mod detail_parser;
pub mod extract;
pub mod fetcher;
pub mod list_parser;
pub mod paginator;
pub mod robots;

pub use detail_parser::parse_detail;
pub use fetcher::{Fetcher, HttpFetcher, Pacer};
pub use list_parser::parse_list;
pub use paginator::{PageState, PaginationOutcome, Paginator, collect_entries};
pub use robots::check_robots;
