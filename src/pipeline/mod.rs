//! Pipeline entry points for crawler operations.
//!
//! - `run_crawler`: Crawl every target and append new records
//! - `run_validate`: Check the configuration file
//! - `run_info`: Summarize stores and the last run

pub mod crawl;
pub mod dedup;
pub mod info;
pub mod report;
pub mod validate;

pub use crawl::{
    OpenStore, RunSummary, TargetOutcome, TargetStatus, crawl_target, run_crawler,
    run_crawler_with,
};
pub use dedup::{DedupEngine, filter_new};
pub use info::run_info;
pub use report::write_report;
pub use validate::run_validate;
