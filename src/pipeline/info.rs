// src/pipeline/info.rs

//! Store and last-run overview.

use crate::error::Result;
use crate::models::Config;
use crate::pipeline::report::read_report;
use crate::storage::CsvStore;
use crate::utils::log as report;

/// Print record counts per target store and the last run report.
pub async fn run_info(config: &Config) -> Result<()> {
    report::header("Store overview");

    for target_config in &config.targets {
        let target = match config.build_target(target_config) {
            Ok(target) => target,
            Err(e) => {
                log::warn!("[{}] {e}", target_config.name);
                continue;
            }
        };

        let stats = CsvStore::for_target(&target).stats().await?;
        let mut items = vec![
            ("store", stats.location.clone()),
            ("records", stats.records.to_string()),
        ];
        items.extend(
            stats
                .filled
                .iter()
                .map(|(column, count)| (column.as_str(), format!("{count} filled"))),
        );
        report::summary(&target.name, &items);
    }

    match read_report(&config.storage).await? {
        Some(last) => {
            let finished = last["finished_at"].as_str().unwrap_or("unknown").to_string();
            report::sub_item(&format!("Last run finished at {finished}"));
            if let Some(outcomes) = last["outcomes"].as_array() {
                for outcome in outcomes {
                    report::sub_item(&format!(
                        "{}: {} ({} new)",
                        outcome["name"].as_str().unwrap_or("?"),
                        outcome["status"]["status"].as_str().unwrap_or("?"),
                        outcome["new_records"]
                    ));
                }
            }
        }
        None => report::sub_item("No run report found yet."),
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Record;
    use crate::storage::RecordStore;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_info_reads_existing_store() {
        let tmp = TempDir::new().unwrap();
        let mut config = Config::default();
        config.storage.data_dir = tmp.path().to_path_buf();

        let target = config.build_target(&config.targets[0]).unwrap();
        let store = CsvStore::for_target(&target);
        store
            .append(&[Record {
                key: "k".into(),
                fields: Default::default(),
                fetched_at: "now".into(),
            }])
            .await
            .unwrap();

        run_info(&config).await.unwrap();
        assert_eq!(store.stats().await.unwrap().records, 1);
    }
}
