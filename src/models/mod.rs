// src/models/mod.rs

//! Domain models for the monitor.
//!
//! This module contains all data structures used throughout the application,
//! organized by their primary purpose.

mod config;
mod entry;
mod record;
mod target;

// Re-export all public types
pub use config::{
    Config, CrawlerConfig, DatePart, Extract, FieldFilter, FieldRule, KeyStrategy,
    PaginationRule, StorageConfig, TargetConfig,
};
pub use entry::{CandidateEntry, FieldValues};
pub use record::{FETCHED_AT_COLUMN, KEY_COLUMN, Record, Schema};
pub use target::{CompiledField, DetailRules, ListRules, Pagination, Target, parse_selector};
