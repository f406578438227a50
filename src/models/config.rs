//! Application configuration structures.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{AppError, Result};
use crate::models::Target;
use crate::utils::fs::load_toml;
use crate::utils::http::Headers;

/// Root application configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// HTTP and crawling behavior settings
    #[serde(default)]
    pub crawler: CrawlerConfig,

    /// Where stores and run reports live
    #[serde(default)]
    pub storage: StorageConfig,

    /// Monitored listing pages, crawled in order
    #[serde(default)]
    pub targets: Vec<TargetConfig>,
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        load_toml(path.as_ref())
    }

    /// Load and validate a configuration file.
    ///
    /// A missing or malformed file is an error; targets are only ever
    /// taken from the file itself.
    pub fn load_validated(path: impl AsRef<Path>) -> Result<Self> {
        let config = Self::load(&path)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate configuration values, including every target definition.
    pub fn validate(&self) -> Result<()> {
        if self.crawler.user_agent.trim().is_empty() {
            return Err(AppError::config("crawler.user_agent is empty"));
        }
        if self.crawler.timeout_secs == 0 {
            return Err(AppError::config("crawler.timeout_secs must be > 0"));
        }
        if self.storage.report_file.trim().is_empty() {
            return Err(AppError::config("storage.report_file is empty"));
        }
        if self.targets.is_empty() {
            return Err(AppError::config("No targets defined"));
        }

        let mut names = HashSet::new();
        for target in &self.targets {
            if !names.insert(target.name.as_str()) {
                return Err(AppError::config(format!(
                    "duplicate target name '{}'",
                    target.name
                )));
            }
            self.build_target(target)?;
        }
        Ok(())
    }

    /// Build the validated, immutable form of one target.
    pub fn build_target(&self, target: &TargetConfig) -> Result<Target> {
        Target::from_config(target, &self.crawler, &self.storage.data_dir)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            crawler: CrawlerConfig::default(),
            storage: StorageConfig::default(),
            targets: defaults::default_targets(),
        }
    }
}

/// HTTP client and crawling behavior settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CrawlerConfig {
    /// User-Agent header for HTTP requests
    #[serde(default = "defaults::user_agent")]
    pub user_agent: String,

    /// Request timeout in seconds
    #[serde(default = "defaults::timeout")]
    pub timeout_secs: u64,

    /// Delay between consecutive requests in milliseconds
    #[serde(default = "defaults::request_delay")]
    pub request_delay_ms: u64,

    /// Skip targets whose robots.txt disallows the listing URL
    #[serde(default = "defaults::respect_robots")]
    pub respect_robots: bool,

    /// Headers sent with every request
    #[serde(default = "defaults::headers")]
    pub headers: Headers,
}

impl Default for CrawlerConfig {
    fn default() -> Self {
        Self {
            user_agent: defaults::user_agent(),
            timeout_secs: defaults::timeout(),
            request_delay_ms: defaults::request_delay(),
            respect_robots: defaults::respect_robots(),
            headers: defaults::headers(),
        }
    }
}

/// Storage locations.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Directory every target store must live under
    #[serde(default = "defaults::data_dir")]
    pub data_dir: PathBuf,

    /// File name (inside `data_dir`) for the last run report
    #[serde(default = "defaults::report_file")]
    pub report_file: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            data_dir: defaults::data_dir(),
            report_file: defaults::report_file(),
        }
    }
}

/// One monitored listing, as written in the configuration file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TargetConfig {
    /// Display name, unique per configuration
    pub name: String,

    /// First listing page
    pub url: String,

    /// Selector matching one element per listed announcement
    pub container_selector: String,

    /// CSV file, relative to `storage.data_dir`
    pub store: String,

    #[serde(default = "defaults::enabled")]
    pub enabled: bool,

    /// Selector for the detail link inside a row (first `a[href]` if unset)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub link_selector: Option<String>,

    /// Attribute holding the detail link
    #[serde(default = "defaults::link_attr")]
    pub link_attr: String,

    /// Fields captured from each list row
    #[serde(default)]
    pub list_fields: Vec<FieldRule>,

    /// Scope for detail field selectors (whole page if unset or missing)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub detail_container: Option<String>,

    /// Fields captured from the detail page
    #[serde(default)]
    pub detail_fields: Vec<FieldRule>,

    #[serde(default)]
    pub pagination: PaginationRule,

    #[serde(default = "defaults::max_pages")]
    pub max_pages: u32,

    /// Maximum entries taken from a single list page
    #[serde(default = "defaults::max_items")]
    pub max_items: usize,

    #[serde(default)]
    pub key: KeyStrategy,

    /// Records must satisfy every filter to be stored
    #[serde(default)]
    pub filters: Vec<FieldFilter>,

    /// Per-target header overrides
    #[serde(default)]
    pub headers: Headers,
}

/// Declarative extraction rule for a single field.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct FieldRule {
    /// Column name in the store
    pub name: String,

    /// Selector evaluated relative to the row or detail container
    pub selector: String,

    #[serde(default)]
    pub extract: Extract,

    /// Regex the element text must start with; the match is stripped
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,

    /// Normalize the value to one end of a date range
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date: Option<DatePart>,

    /// Selectors tried in order when `selector` yields nothing.
    /// Detail fallbacks search the whole page; the label is stripped if
    /// present but not required.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub fallback: Vec<String>,

    /// List field whose value is used when this field is still empty
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_from: Option<String>,

    /// Records with this field empty are not stored
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub required: bool,
}

/// What to read from a matched element.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Extract {
    /// Whitespace-normalized text content
    #[default]
    Text,
    /// Inner HTML
    Html,
    /// Value of the named attribute
    Attr(String),
}

/// Which end of a date range a field keeps.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum DatePart {
    Start,
    End,
}

/// How the next listing page is found.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum PaginationRule {
    /// Only the first page is read
    #[default]
    None,
    /// Follow a "next" link
    NextLink {
        selector: String,
        #[serde(default = "defaults::link_attr")]
        attr: String,
    },
    /// Page number carried in a query parameter
    QueryParam {
        #[serde(default = "defaults::page_param")]
        param: String,
        #[serde(default = "defaults::first_page")]
        start: u32,
    },
}

/// How a record's unique key is derived.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum KeyStrategy {
    /// Absolute detail URL without fragment
    #[default]
    Link,
    /// Identifier found in the detail URL (falls back to the URL)
    LinkId,
    /// Hash of the named list-page fields
    Fields(Vec<String>),
}

/// Keep only records whose field value is in `allowed`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct FieldFilter {
    pub field: String,
    pub allowed: Vec<String>,
}

impl FieldFilter {
    pub fn accepts(&self, value: Option<&str>) -> bool {
        value.is_some_and(|v| self.allowed.iter().any(|a| a.trim() == v.trim()))
    }
}

mod defaults {
    use std::path::PathBuf;

    use super::{
        DatePart, Extract, FieldFilter, FieldRule, KeyStrategy, PaginationRule, TargetConfig,
    };
    use crate::utils::http::Headers;

    // Crawler defaults
    pub fn user_agent() -> String {
        "Mozilla/5.0 (compatible; SproutMonitor/1.0)".into()
    }
    pub fn timeout() -> u64 {
        10
    }
    pub fn request_delay() -> u64 {
        1000
    }
    pub fn respect_robots() -> bool {
        true
    }
    pub fn headers() -> Headers {
        Headers::from([
            (
                "Accept".to_string(),
                "text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8".to_string(),
            ),
            (
                "Accept-Language".to_string(),
                "zh-TW,zh;q=0.9,en;q=0.8".to_string(),
            ),
        ])
    }

    // Storage defaults
    pub fn data_dir() -> PathBuf {
        PathBuf::from("data")
    }
    pub fn report_file() -> String {
        "last_run.json".into()
    }

    // Target defaults
    pub fn enabled() -> bool {
        true
    }
    pub fn link_attr() -> String {
        "href".into()
    }
    pub fn max_pages() -> u32 {
        10
    }
    pub fn max_items() -> usize {
        100
    }
    pub fn page_param() -> String {
        "pg".into()
    }
    pub fn first_page() -> u32 {
        1
    }

    fn field(name: &str, selector: &str) -> FieldRule {
        FieldRule {
            name: name.to_string(),
            selector: selector.to_string(),
            extract: Extract::Text,
            label: None,
            date: None,
            fallback: Vec::new(),
            default_from: None,
            required: false,
        }
    }

    fn labelled(name: &str, label: &str) -> FieldRule {
        FieldRule {
            label: Some(label.to_string()),
            ..field(name, "p")
        }
    }

    fn dated(name: &str, part: DatePart) -> FieldRule {
        FieldRule {
            date: Some(part),
            fallback: vec!["p#DtlDt".to_string()],
            default_from: Some("list_date".to_string()),
            ..labelled(name, r"時\s*間\s*[：:]|Time\s*:")
        }
    }

    pub fn default_targets() -> Vec<TargetConfig> {
        vec![TargetConfig {
            name: "tku-sprout-events".to_string(),
            url: "https://sprout.tku.edu.tw/DeepNews.aspx?spid=76E2C6DA-A2BA-410D-8BA0-CBFB22C84AEA"
                .to_string(),
            container_selector: "table tbody tr".to_string(),
            store: "tku_sprout_events.csv".to_string(),
            enabled: enabled(),
            link_selector: Some("td:first-child a".to_string()),
            link_attr: link_attr(),
            list_fields: vec![
                FieldRule {
                    required: true,
                    ..field("title", "td:first-child a")
                },
                FieldRule {
                    date: Some(DatePart::Start),
                    ..field("list_date", "td:nth-child(2)")
                },
            ],
            detail_container: Some(r#"div.clsDtlDes, [class*="DtlDes"]"#.to_string()),
            detail_fields: vec![
                labelled("organizer", r"主辦單位\s*[：:]|Organizer\s*:"),
                labelled("location", r"地\s*點\s*[：:]|Location\s*:|Venue\s*:"),
                dated("start_date", DatePart::Start),
                dated("end_date", DatePart::End),
            ],
            pagination: PaginationRule::QueryParam {
                param: page_param(),
                start: first_page(),
            },
            max_pages: max_pages(),
            max_items: max_items(),
            key: KeyStrategy::Link,
            filters: vec![FieldFilter {
                field: "organizer".to_string(),
                allowed: vec!["教師教學發展中心".to_string(), "教發中心".to_string()],
            }],
            headers: Headers::new(),
        }]
    }
}
