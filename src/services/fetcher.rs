// src/services/fetcher.rs

//! Page fetching.
//!
//! The rest of the crate only sees the [`Fetcher`] trait; [`HttpFetcher`]
//! is the reqwest-backed implementation used by the CLI.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use tokio::time::Instant;
use url::Url;

use crate::error::{AppError, Result};
use crate::models::CrawlerConfig;
use crate::utils::http::{Headers, create_async_client, to_header_map};

/// Fetch raw page content by URL.
#[async_trait]
pub trait Fetcher: Send + Sync {
    /// Return the body of `url`, or a network error on timeout, connection
    /// failure or a non-success status.
    async fn fetch(&self, url: &Url, headers: &Headers) -> Result<String>;
}

/// Fetcher backed by a shared reqwest client.
pub struct HttpFetcher {
    client: Client,
}

impl HttpFetcher {
    pub fn new(config: &CrawlerConfig) -> Result<Self> {
        Ok(Self {
            client: create_async_client(config)?,
        })
    }
}

#[async_trait]
impl Fetcher for HttpFetcher {
    async fn fetch(&self, url: &Url, headers: &Headers) -> Result<String> {
        let header_map = to_header_map(headers)?;
        log::debug!("GET {url}");

        let response = self
            .client
            .get(url.clone())
            .headers(header_map)
            .send()
            .await
            .map_err(|e| AppError::network(url.as_str(), e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(AppError::network(url.as_str(), format!("HTTP {status}")));
        }

        response
            .text()
            .await
            .map_err(|e| AppError::network(url.as_str(), e))
    }
}

/// Spaces consecutive requests at least `delay` apart.
#[derive(Debug)]
pub struct Pacer {
    delay: Duration,
    last: Option<Instant>,
}

impl Pacer {
    pub fn new(delay: Duration) -> Self {
        Self { delay, last: None }
    }

    pub fn from_millis(ms: u64) -> Self {
        Self::new(Duration::from_millis(ms))
    }

    /// Wait until the next request may be sent.
    pub async fn wait(&mut self) {
        if let Some(last) = self.last {
            let elapsed = last.elapsed();
            if elapsed < self.delay {
                tokio::time::sleep(self.delay - elapsed).await;
            }
        }
        self.last = Some(Instant::now());
    }
}

#[cfg(test)]
pub(crate) mod testing {
    //! In-memory fetcher for pipeline tests.

    use std::collections::HashMap;
    use std::sync::Mutex;

    use super::*;

    #[derive(Default)]
    pub struct StaticFetcher {
        pages: HashMap<String, std::result::Result<String, String>>,
        requested: Mutex<Vec<String>>,
    }

    impl StaticFetcher {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn with_page(mut self, url: &str, body: impl Into<String>) -> Self {
            self.pages.insert(url.to_string(), Ok(body.into()));
            self
        }

        pub fn with_failure(mut self, url: &str, message: &str) -> Self {
            self.pages.insert(url.to_string(), Err(message.to_string()));
            self
        }

        pub fn requested(&self) -> Vec<String> {
            self.requested.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl Fetcher for StaticFetcher {
        async fn fetch(&self, url: &Url, _headers: &Headers) -> Result<String> {
            self.requested.lock().unwrap().push(url.to_string());
            match self.pages.get(url.as_str()) {
                Some(Ok(body)) => Ok(body.clone()),
                Some(Err(message)) => Err(AppError::network(url.as_str(), message)),
                None => Err(AppError::network(url.as_str(), "HTTP 404 Not Found")),
            }
        }
    }
}
