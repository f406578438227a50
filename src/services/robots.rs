// src/services/robots.rs

//! robots.txt courtesy check.

use robotstxt::DefaultMatcher;
use url::Url;

use crate::models::Target;
use crate::services::fetcher::{Fetcher, Pacer};

/// Product token robots.txt groups are matched against.
///
/// `Mozilla/5.0 (compatible; SproutMonitor/1.0)` yields `SproutMonitor`;
/// otherwise the leading product name is used.
pub fn robots_agent(user_agent: &str) -> &str {
    let product = user_agent
        .split_once("compatible;")
        .map(|(_, rest)| rest.trim_start())
        .unwrap_or(user_agent);
    let end = product
        .find(|c: char| !(c.is_ascii_alphanumeric() || c == '_' || c == '-'))
        .unwrap_or(product.len());
    match &product[..end] {
        "" => "*",
        token => token,
    }
}

/// Whether `url` may be fetched by `user_agent` under `robots_body`.
pub fn is_allowed(robots_body: &str, user_agent: &str, url: &Url) -> bool {
    let mut matcher = DefaultMatcher::default();
    matcher.one_agent_allowed_by_robots(robots_body, robots_agent(user_agent), url.as_str())
}

/// Check whether the target's start URL may be crawled.
///
/// Any failure to obtain robots.txt allows crawling.
pub async fn check_robots(fetcher: &dyn Fetcher, target: &Target, pacer: &mut Pacer) -> bool {
    let Ok(robots_url) = target.base_url.join("/robots.txt") else {
        return true;
    };

    pacer.wait().await;
    let content = match fetcher.fetch(&robots_url, &target.headers).await {
        Ok(content) => content,
        Err(e) => {
            log::debug!("[{}] robots.txt unavailable ({e}); proceeding", target.name);
            return true;
        }
    };

    let user_agent = target
        .headers
        .iter()
        .find(|(name, _)| name.eq_ignore_ascii_case("user-agent"))
        .map(|(_, value)| value.as_str())
        .unwrap_or("*");

    is_allowed(&content, user_agent, &target.base_url)
}
