// src/pipeline/report.rs

//! Persisted report of the most recent run.

use std::path::PathBuf;

use tokio::io::AsyncWriteExt;

use crate::error::{AppError, Result};
use crate::models::StorageConfig;
use crate::pipeline::crawl::RunSummary;
use crate::utils::fs::{resolve_within, temp_path};

pub fn report_path(storage: &StorageConfig) -> Result<PathBuf> {
    resolve_within(&storage.data_dir, &storage.report_file)
}

/// Write `summary` as pretty JSON (write to temp, then rename).
pub async fn write_report(storage: &StorageConfig, summary: &RunSummary) -> Result<PathBuf> {
    let path = report_path(storage)?;
    let bytes = serde_json::to_vec_pretty(summary)?;

    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent).await?;
    }
    let tmp = temp_path(&path);
    let mut file = tokio::fs::File::create(&tmp).await?;
    file.write_all(&bytes).await?;
    file.flush().await?;
    drop(file);
    tokio::fs::rename(&tmp, &path).await?;

    log::debug!("Run report written to {}", path.display());
    Ok(path)
}

/// Load the last report, if one was written.
pub async fn read_report(storage: &StorageConfig) -> Result<Option<serde_json::Value>> {
    let path = report_path(storage)?;
    match tokio::fs::read(&path).await {
        Ok(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(AppError::Io(e)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::crawl::{TargetOutcome, TargetStatus};
    use chrono::Local;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_report_round_trip() {
        let tmp = TempDir::new().unwrap();
        let storage = StorageConfig {
            data_dir: tmp.path().to_path_buf(),
            report_file: "last_run.json".into(),
        };
        assert!(read_report(&storage).await.unwrap().is_none());

        let summary = RunSummary {
            started_at: Local::now(),
            finished_at: Local::now(),
            outcomes: vec![TargetOutcome {
                name: "news".into(),
                status: TargetStatus::Skipped("disabled".into()),
                pages_visited: 0,
                candidates: 0,
                new_records: 0,
                filtered: 0,
                errors: vec![],
            }],
        };
        let path = write_report(&storage, &summary).await.unwrap();
        assert_eq!(path, tmp.path().join("last_run.json"));
        assert!(!tmp.path().join("last_run.json.tmp").exists());

        let report = read_report(&storage).await.unwrap().unwrap();
        let outcome = &report["outcomes"][0];
        assert_eq!(outcome["name"], "news");
        assert_eq!(outcome["status"]["status"], "skipped");
        assert_eq!(outcome["status"]["reason"], "disabled");
    }

    #[test]
    fn test_report_file_must_stay_in_data_dir() {
        let storage = StorageConfig {
            data_dir: "data".into(),
            report_file: "../last_run.json".into(),
        };
        assert!(report_path(&storage).is_err());
    }
}
