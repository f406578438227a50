// src/pipeline/crawl.rs

//! Target crawling pipeline.
//!
//! Targets run one at a time. Each one is contained: whatever goes wrong
//! is recorded in its [`TargetOutcome`] and the next target still runs.

use chrono::{DateTime, Local, SecondsFormat};
use serde::Serialize;

use crate::error::{AppError, Result};
use crate::models::{
    CandidateEntry, Config, CrawlerConfig, FieldValues, Record, Target, TargetConfig,
};
use crate::pipeline::dedup::DedupEngine;
use crate::services::{
    Fetcher, PageState, Pacer, check_robots, collect_entries, detail_parser::parse_detail,
};
use crate::storage::{CsvStore, RecordStore};
use crate::utils::log as report;

/// How a target run ended.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", content = "reason", rename_all = "snake_case")]
pub enum TargetStatus {
    Completed,
    Failed(String),
    Skipped(String),
}

/// Per-target result of a run.
#[derive(Debug, Clone, Serialize)]
pub struct TargetOutcome {
    pub name: String,
    pub status: TargetStatus,
    pub pages_visited: u32,
    /// Entries found on list pages, before dedup
    pub candidates: usize,
    pub new_records: usize,
    /// New entries dropped by record filters
    pub filtered: usize,
    pub errors: Vec<String>,
}

impl TargetOutcome {
    fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            status: TargetStatus::Completed,
            pages_visited: 0,
            candidates: 0,
            new_records: 0,
            filtered: 0,
            errors: Vec::new(),
        }
    }

    pub fn is_completed(&self) -> bool {
        self.status == TargetStatus::Completed
    }
}

/// Result of a whole run.
#[derive(Debug, Clone, Serialize)]
pub struct RunSummary {
    pub started_at: DateTime<Local>,
    pub finished_at: DateTime<Local>,
    pub outcomes: Vec<TargetOutcome>,
}

impl RunSummary {
    /// True when at least one target completed.
    pub fn any_completed(&self) -> bool {
        self.outcomes.iter().any(TargetOutcome::is_completed)
    }

    pub fn total_new_records(&self) -> usize {
        self.outcomes.iter().map(|o| o.new_records).sum()
    }

    /// Print one summary block per target.
    pub fn print(&self) {
        for outcome in &self.outcomes {
            let status = match &outcome.status {
                TargetStatus::Completed => "completed".to_string(),
                TargetStatus::Failed(reason) => format!("failed: {reason}"),
                TargetStatus::Skipped(reason) => format!("skipped: {reason}"),
            };
            let mut items = vec![
                ("status", status),
                ("pages visited", outcome.pages_visited.to_string()),
                ("candidates", outcome.candidates.to_string()),
                ("new records", outcome.new_records.to_string()),
            ];
            if outcome.filtered > 0 {
                items.push(("filtered out", outcome.filtered.to_string()));
            }
            if !outcome.errors.is_empty() {
                items.push(("errors", outcome.errors.len().to_string()));
            }
            report::summary(&outcome.name, &items);
            for error in &outcome.errors {
                report::sub_item(&report::truncate(error, 120));
            }
        }

        let elapsed = self.finished_at - self.started_at;
        report::summary(
            "Run",
            &[
                ("targets", self.outcomes.len().to_string()),
                (
                    "completed",
                    self.outcomes
                        .iter()
                        .filter(|o| o.is_completed())
                        .count()
                        .to_string(),
                ),
                ("new records", self.total_new_records().to_string()),
                ("elapsed", format!("{}s", elapsed.num_seconds())),
            ],
        );
    }
}

/// Opens the store a target appends to.
pub type OpenStore = dyn Fn(&Target) -> Box<dyn RecordStore>;

fn open_csv_store(target: &Target) -> Box<dyn RecordStore> {
    Box::new(CsvStore::for_target(target))
}

/// Crawl every configured target (or only `only`), sequentially.
pub async fn run_crawler(
    config: &Config,
    fetcher: &dyn Fetcher,
    only: Option<&str>,
) -> Result<RunSummary> {
    run_crawler_with(config, fetcher, only, &open_csv_store).await
}

/// [`run_crawler`] with a custom store for each target.
pub async fn run_crawler_with(
    config: &Config,
    fetcher: &dyn Fetcher,
    only: Option<&str>,
    open_store: &OpenStore,
) -> Result<RunSummary> {
    let selected: Vec<&TargetConfig> = match only {
        Some(name) => {
            let found: Vec<_> = config.targets.iter().filter(|t| t.name == name).collect();
            if found.is_empty() {
                return Err(AppError::config(format!("no target named '{name}'")));
            }
            found
        }
        None => config.targets.iter().collect(),
    };

    let started_at = Local::now();
    report::header(&format!("Crawling {} target(s)", selected.len()));

    let mut outcomes = Vec::with_capacity(selected.len());
    for target_config in selected {
        outcomes.push(crawl_target_with(fetcher, config, target_config, open_store).await);
    }

    Ok(RunSummary {
        started_at,
        finished_at: Local::now(),
        outcomes,
    })
}

/// Run one target end to end against its CSV store.
pub async fn crawl_target(
    fetcher: &dyn Fetcher,
    config: &Config,
    target_config: &TargetConfig,
) -> TargetOutcome {
    crawl_target_with(fetcher, config, target_config, &open_csv_store).await
}

/// Run one target end to end. Never fails; problems land in the outcome.
async fn crawl_target_with(
    fetcher: &dyn Fetcher,
    config: &Config,
    target_config: &TargetConfig,
    open_store: &OpenStore,
) -> TargetOutcome {
    let mut outcome = TargetOutcome::new(&target_config.name);

    if !target_config.enabled {
        log::info!("[{}] Disabled; skipping", target_config.name);
        outcome.status = TargetStatus::Skipped("disabled".into());
        return outcome;
    }

    let target = match config.build_target(target_config) {
        Ok(target) => target,
        Err(e) => {
            log::error!("[{}] Invalid target: {e}", target_config.name);
            outcome.status = TargetStatus::Failed(e.to_string());
            return outcome;
        }
    };

    let store = open_store(&target);
    let result = run_target(fetcher, &config.crawler, &target, store.as_ref(), &mut outcome).await;
    if let Err(e) = result {
        log::error!("[{}] {e}", target.name);
        outcome.status = TargetStatus::Failed(e.to_string());
    }
    outcome
}

async fn run_target(
    fetcher: &dyn Fetcher,
    crawler: &CrawlerConfig,
    target: &Target,
    store: &dyn RecordStore,
    outcome: &mut TargetOutcome,
) -> Result<()> {
    let mut pacer = Pacer::from_millis(crawler.request_delay_ms);

    if crawler.respect_robots && !check_robots(fetcher, target, &mut pacer).await {
        log::warn!("[{}] Disallowed by robots.txt; skipping", target.name);
        outcome.status = TargetStatus::Skipped("disallowed by robots.txt".into());
        return Ok(());
    }

    let mut engine = DedupEngine::load(store).await?;
    log::info!(
        "[{}] {} known records in {}",
        target.name,
        engine.known_count(),
        store.location()
    );

    let pages = collect_entries(fetcher, target, &mut pacer).await;
    outcome.pages_visited = pages.pages_visited;
    outcome.candidates = pages.entries.len();
    outcome.errors.extend(pages.errors);

    if let Some(reason) = pages.aborted {
        if pages.state == PageState::AtPage(1) {
            outcome.status = TargetStatus::Failed(reason);
            return Ok(());
        }
        outcome.errors.push(format!("pagination stopped early: {reason}"));
    }

    let fresh = engine.filter_new(pages.entries, &target.key);
    log::info!(
        "[{}] {} candidates, {} new",
        target.name,
        outcome.candidates,
        fresh.len()
    );

    let mut records = Vec::with_capacity(fresh.len());
    for (key, entry) in fresh {
        let detail = if target.has_detail_fields() {
            pacer.wait().await;
            match fetch_detail(fetcher, target, &entry).await {
                Ok(values) => values,
                Err(e) => {
                    log::warn!("[{}] Detail skipped ({:?}): {e}", target.name, e.kind());
                    outcome.errors.push(e.to_string());
                    continue;
                }
            }
        } else {
            FieldValues::new()
        };

        let fetched_at = Local::now().to_rfc3339_opts(SecondsFormat::Secs, false);
        let mut record = Record::from_entry(key, &entry, detail, fetched_at);
        target.apply_defaults(&mut record.fields);

        if let Some(field) = target.missing_required(&record.fields) {
            log::warn!("[{}] {} skipped: '{field}' is empty", target.name, entry.link);
            outcome.errors.push(format!("{}: missing required field '{field}'", entry.link));
            continue;
        }

        if let Some(filter) = target
            .filters
            .iter()
            .find(|f| !f.accepts(record.field(&f.field)))
        {
            log::debug!(
                "[{}] {} dropped by filter on '{}'",
                target.name,
                entry.link,
                filter.field
            );
            outcome.filtered += 1;
            continue;
        }
        records.push(record);
    }

    if !records.is_empty() {
        outcome.new_records = engine.append(&records).await?;
        for record in &records {
            let title = record.field("title").unwrap_or(&record.key);
            report::sub_item(&format!("+ {}", report::truncate(title, 60)));
        }
    }
    Ok(())
}

async fn fetch_detail(
    fetcher: &dyn Fetcher,
    target: &Target,
    entry: &CandidateEntry,
) -> Result<FieldValues> {
    let content = fetcher.fetch(&entry.link, &target.headers).await?;
    parse_detail(&content, entry.link.as_str(), &target.detail)
}
