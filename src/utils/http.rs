// src/utils/http.rs

//! HTTP client utilities.

use std::collections::BTreeMap;
use std::time::Duration;

use reqwest::header::{HeaderMap, HeaderName, HeaderValue};

use crate::error::{AppError, Result};
use crate::models::CrawlerConfig;

/// Request headers as configured (name → value).
pub type Headers = BTreeMap<String, String>;

/// Create a configured asynchronous HTTP client.
pub fn create_async_client(config: &CrawlerConfig) -> Result<reqwest::Client> {
    reqwest::Client::builder()
        .user_agent(&config.user_agent)
        .timeout(Duration::from_secs(config.timeout_secs))
        .build()
        .map_err(|e| AppError::config(format!("cannot build HTTP client: {e}")))
}

/// Merge global crawler headers with per-target overrides.
///
/// Header names compare case-insensitively; the target wins.
pub fn merge_headers(config: &CrawlerConfig, overrides: &Headers) -> Headers {
    let mut merged: Headers = Headers::new();
    merged.insert("User-Agent".to_string(), config.user_agent.clone());
    for (name, value) in config.headers.iter().chain(overrides.iter()) {
        merged.retain(|existing, _| !existing.eq_ignore_ascii_case(name));
        merged.insert(name.clone(), value.clone());
    }
    merged
}

/// Convert configured headers into a reqwest header map.
pub fn to_header_map(headers: &Headers) -> Result<HeaderMap> {
    let mut map = HeaderMap::with_capacity(headers.len());
    for (name, value) in headers {
        let header_name = HeaderName::from_bytes(name.as_bytes())
            .map_err(|e| AppError::config(format!("invalid header name '{name}': {e}")))?;
        let header_value = HeaderValue::from_str(value)
            .map_err(|e| AppError::config(format!("invalid value for header '{name}': {e}")))?;
        map.insert(header_name, header_value);
    }
    Ok(map)
}
