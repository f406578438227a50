//! Validated, immutable target definitions.
//!
//! A [`Target`] is built once from a [`TargetConfig`] at startup. All
//! selectors and label patterns are compiled here, so a malformed entry
//! fails before any request is sent.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use regex::Regex;
use scraper::Selector;
use url::Url;

use crate::error::{AppError, Result};
use crate::models::{
    CrawlerConfig, DatePart, Extract, FieldFilter, FieldRule, FieldValues, KeyStrategy,
    PaginationRule, Schema, TargetConfig,
};
use crate::utils::fs::resolve_within;
use crate::utils::http::{Headers, merge_headers, to_header_map};

/// A field rule with its selector and label compiled.
#[derive(Debug, Clone)]
pub struct CompiledField {
    pub name: String,
    pub selector: Selector,
    pub extract: Extract,
    pub label: Option<Regex>,
    pub date: Option<DatePart>,
    pub fallback: Vec<Selector>,
    pub default_from: Option<String>,
    pub required: bool,
}

impl CompiledField {
    fn compile(rule: &FieldRule) -> Result<Self> {
        if rule.name.trim().is_empty() {
            return Err(AppError::config("field rule has an empty name"));
        }
        let label = rule
            .label
            .as_deref()
            .map(|pattern| {
                Regex::new(&format!("^(?:{pattern})")).map_err(|e| {
                    AppError::config(format!("invalid label for field '{}': {e}", rule.name))
                })
            })
            .transpose()?;

        Ok(Self {
            name: rule.name.clone(),
            selector: parse_selector(&rule.selector)?,
            extract: rule.extract.clone(),
            label,
            date: rule.date,
            fallback: rule
                .fallback
                .iter()
                .map(|selector| parse_selector(selector))
                .collect::<Result<_>>()?,
            default_from: rule.default_from.clone(),
            required: rule.required,
        })
    }
}

/// Rules for turning a list page into candidate entries.
#[derive(Debug, Clone)]
pub struct ListRules {
    pub container: Selector,
    /// Selector for the detail link inside a row; `None` means first `a[href]`
    pub link: Option<Selector>,
    pub link_attr: String,
    pub fields: Vec<CompiledField>,
    pub max_items: usize,
}

/// Rules for reading a detail page.
#[derive(Debug, Clone)]
pub struct DetailRules {
    pub container: Option<Selector>,
    pub fields: Vec<CompiledField>,
}

/// Compiled pagination rule.
#[derive(Debug, Clone)]
pub enum Pagination {
    None,
    NextLink { selector: Selector, attr: String },
    QueryParam { param: String, start: u32 },
}

/// One monitored site, validated and immutable for the run.
#[derive(Debug, Clone)]
pub struct Target {
    pub name: String,
    pub base_url: Url,
    pub list: ListRules,
    pub detail: DetailRules,
    pub pagination: Pagination,
    pub max_pages: u32,
    pub key: KeyStrategy,
    pub filters: Vec<FieldFilter>,
    pub headers: Headers,
    pub store_path: PathBuf,
    pub schema: Schema,
}

impl Target {
    /// Validate a configured target and compile its rules.
    pub fn from_config(
        config: &TargetConfig,
        crawler: &CrawlerConfig,
        data_dir: &Path,
    ) -> Result<Self> {
        let name = config.name.trim();
        if name.is_empty() {
            return Err(AppError::config("target name is empty"));
        }
        let fail = |message: String| AppError::config(format!("target '{name}': {message}"));

        if config.url.trim().is_empty() {
            return Err(fail("url is empty".into()));
        }
        let base_url = Url::parse(config.url.trim()).map_err(|e| fail(format!("bad url: {e}")))?;
        if !matches!(base_url.scheme(), "http" | "https") {
            return Err(fail(format!("unsupported scheme '{}'", base_url.scheme())));
        }

        if config.container_selector.trim().is_empty() {
            return Err(fail("container_selector is empty".into()));
        }
        if config.list_fields.is_empty() && config.detail_fields.is_empty() {
            return Err(fail("at least one list or detail field is required".into()));
        }
        if config.max_pages == 0 {
            return Err(fail("max_pages must be > 0".into()));
        }
        if config.max_items == 0 {
            return Err(fail("max_items must be > 0".into()));
        }

        check_field_names(&config.list_fields).map_err(|m| fail(format!("list_fields: {m}")))?;
        check_field_names(&config.detail_fields)
            .map_err(|m| fail(format!("detail_fields: {m}")))?;

        let schema = Schema::new(
            config
                .list_fields
                .iter()
                .chain(&config.detail_fields)
                .map(|f| f.name.as_str()),
        );

        if let KeyStrategy::Fields(names) = &config.key {
            if names.is_empty() {
                return Err(fail("key fields list is empty".into()));
            }
            for key_field in names {
                if !config.list_fields.iter().any(|f| &f.name == key_field) {
                    return Err(fail(format!(
                        "key field '{key_field}' must be a list field"
                    )));
                }
            }
        }

        for rule in config.list_fields.iter().chain(&config.detail_fields) {
            let Some(source) = &rule.default_from else {
                continue;
            };
            if source == &rule.name || !config.list_fields.iter().any(|f| &f.name == source) {
                return Err(fail(format!(
                    "field '{}': default_from '{source}' must name another list field",
                    rule.name
                )));
            }
        }

        for filter in &config.filters {
            if !schema.contains(&filter.field) {
                return Err(fail(format!("filter on unknown field '{}'", filter.field)));
            }
        }

        let pagination = match &config.pagination {
            PaginationRule::None => Pagination::None,
            PaginationRule::NextLink { selector, attr } => Pagination::NextLink {
                selector: parse_selector(selector)?,
                attr: attr.clone(),
            },
            PaginationRule::QueryParam { param, start } => {
                if param.trim().is_empty() {
                    return Err(fail("pagination param is empty".into()));
                }
                Pagination::QueryParam {
                    param: param.clone(),
                    start: *start,
                }
            }
        };

        let headers = merge_headers(crawler, &config.headers);
        to_header_map(&headers)?;

        let store_path = resolve_within(data_dir, &config.store)?;

        Ok(Self {
            name: name.to_string(),
            base_url,
            list: ListRules {
                container: parse_selector(&config.container_selector)?,
                link: config.link_selector.as_deref().map(parse_selector).transpose()?,
                link_attr: config.link_attr.clone(),
                fields: compile_fields(&config.list_fields)?,
                max_items: config.max_items,
            },
            detail: DetailRules {
                container: config
                    .detail_container
                    .as_deref()
                    .map(parse_selector)
                    .transpose()?,
                fields: compile_fields(&config.detail_fields)?,
            },
            pagination,
            max_pages: config.max_pages,
            key: config.key.clone(),
            filters: config.filters.clone(),
            headers,
            store_path,
            schema,
        })
    }

    /// Whether detail pages need to be fetched at all.
    pub fn has_detail_fields(&self) -> bool {
        !self.detail.fields.is_empty()
    }

    fn fields(&self) -> impl Iterator<Item = &CompiledField> {
        self.list.fields.iter().chain(&self.detail.fields)
    }

    /// Fill empty fields from their `default_from` list field.
    pub fn apply_defaults(&self, values: &mut FieldValues) {
        for field in self.fields() {
            let Some(source) = &field.default_from else {
                continue;
            };
            if values.get(&field.name).is_some_and(|v| !v.trim().is_empty()) {
                continue;
            }
            if let Some(value) = values.get(source).filter(|v| !v.trim().is_empty()).cloned() {
                values.insert(field.name.clone(), value);
            }
        }
    }

    /// First required field that is empty in `values`.
    pub fn missing_required(&self, values: &FieldValues) -> Option<&str> {
        self.fields()
            .filter(|field| field.required)
            .find(|field| values.get(&field.name).is_none_or(|v| v.trim().is_empty()))
            .map(|field| field.name.as_str())
    }
}

/// Parse a CSS selector, mapping failures to a selector error.
pub fn parse_selector(s: &str) -> Result<Selector> {
    Selector::parse(s).map_err(|e| AppError::selector(s, format!("{e:?}")))
}

fn compile_fields(rules: &[FieldRule]) -> Result<Vec<CompiledField>> {
    rules.iter().map(CompiledField::compile).collect()
}

fn check_field_names(rules: &[FieldRule]) -> std::result::Result<(), String> {
    let mut seen = HashSet::new();
    for rule in rules {
        let name = rule.name.as_str();
        if name == crate::models::KEY_COLUMN || name == crate::models::FETCHED_AT_COLUMN {
            return Err(format!("'{name}' is a reserved column name"));
        }
        if !seen.insert(name) {
            return Err(format!("duplicate field '{name}'"));
        }
    }
    Ok(())
}
