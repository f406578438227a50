//! CSV file store.
//!
//! One file per target with a header row of `key`, the target's fields and
//! `fetched_at`. Appends rewrite the file through a temporary sibling and
//! a rename, copying the existing bytes unchanged.

use std::path::PathBuf;

use async_trait::async_trait;
use tokio::io::AsyncWriteExt;

use crate::error::{AppError, Result};
use crate::models::{Record, Schema, Target};
use crate::storage::{RecordStore, StoreStats};
use crate::utils::fs::temp_path;

/// CSV-backed record store.
#[derive(Debug, Clone)]
pub struct CsvStore {
    path: PathBuf,
    schema: Schema,
}

impl CsvStore {
    pub fn new(path: impl Into<PathBuf>, schema: Schema) -> Self {
        Self {
            path: path.into(),
            schema,
        }
    }

    pub fn for_target(target: &Target) -> Self {
        Self::new(&target.store_path, target.schema.clone())
    }

    fn fail(&self, message: impl std::fmt::Display) -> AppError {
        AppError::store_write(self.path.display().to_string(), message)
    }

    /// Read the file, returning None if it doesn't exist or is empty.
    async fn read_bytes(&self) -> Result<Option<Vec<u8>>> {
        match tokio::fs::read(&self.path).await {
            Ok(bytes) if bytes.is_empty() => Ok(None),
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(self.fail(e)),
        }
    }

    /// Write bytes atomically (write to temp, then rename).
    async fn write_bytes(&self, bytes: &[u8]) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| self.fail(e))?;
        }

        let tmp = temp_path(&self.path);
        let written = async {
            let mut file = tokio::fs::File::create(&tmp).await?;
            file.write_all(bytes).await?;
            file.sync_all().await?;
            drop(file);
            tokio::fs::rename(&tmp, &self.path).await
        }
        .await;

        if let Err(e) = written {
            let _ = tokio::fs::remove_file(&tmp).await;
            return Err(self.fail(e));
        }
        Ok(())
    }

    fn reader<'b>(&self, bytes: &'b [u8]) -> Result<csv::Reader<&'b [u8]>> {
        let mut reader = csv::ReaderBuilder::new().flexible(false).from_reader(bytes);
        let header = reader.headers().map_err(|e| self.fail(e))?;
        if !header.iter().eq(self.schema.columns().iter().map(String::as_str)) {
            return Err(self.fail(format!(
                "header [{}] does not match expected [{}]",
                header.iter().collect::<Vec<_>>().join(", "),
                self.schema.columns().join(", ")
            )));
        }
        Ok(reader)
    }

    fn encode_rows(&self, include_header: bool, records: &[Record]) -> Result<Vec<u8>> {
        let mut writer = csv::WriterBuilder::new()
            .has_headers(false)
            .from_writer(Vec::new());
        if include_header {
            writer
                .write_record(self.schema.columns())
                .map_err(|e| self.fail(e))?;
        }
        for record in records {
            writer
                .write_record(record.to_row(&self.schema))
                .map_err(|e| self.fail(e))?;
        }
        writer.into_inner().map_err(|e| self.fail(e))
    }

    /// Record count and per-column fill counts.
    pub async fn stats(&self) -> Result<StoreStats> {
        let columns = self.schema.columns();
        let mut filled = vec![0usize; columns.len()];
        let mut records = 0;

        if let Some(bytes) = self.read_bytes().await? {
            let mut reader = self.reader(&bytes)?;
            for row in reader.records() {
                let row = row.map_err(|e| self.fail(e))?;
                records += 1;
                for (count, value) in filled.iter_mut().zip(row.iter()) {
                    if !value.trim().is_empty() {
                        *count += 1;
                    }
                }
            }
        }

        Ok(StoreStats {
            location: self.location(),
            records,
            filled: columns.iter().cloned().zip(filled).collect(),
        })
    }
}

#[async_trait]
impl RecordStore for CsvStore {
    async fn load_keys(&self) -> Result<Vec<String>> {
        let Some(bytes) = self.read_bytes().await? else {
            return Ok(Vec::new());
        };

        let mut reader = self.reader(&bytes)?;
        let mut keys = Vec::new();
        for row in reader.records() {
            let row = row.map_err(|e| self.fail(e))?;
            if let Some(key) = row.get(0) {
                keys.push(key.to_string());
            }
        }
        Ok(keys)
    }

    async fn append(&self, records: &[Record]) -> Result<usize> {
        if records.is_empty() {
            return Ok(0);
        }

        let mut bytes = match self.read_bytes().await? {
            Some(existing) => {
                self.reader(&existing)?;
                existing
            }
            None => Vec::new(),
        };
        let include_header = bytes.is_empty();
        if !include_header && !bytes.ends_with(b"\n") {
            bytes.push(b'\n');
        }
        bytes.extend(self.encode_rows(include_header, records)?);

        self.write_bytes(&bytes).await?;
        log::debug!("Appended {} rows to {}", records.len(), self.location());
        Ok(records.len())
    }

    fn location(&self) -> String {
        self.path.display().to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::FieldValues;
    use tempfile::TempDir;

    fn schema() -> Schema {
        Schema::new(["title", "organizer"])
    }

    fn record(key: &str, title: &str) -> Record {
        Record {
            key: key.into(),
            fields: FieldValues::from([
                ("title".to_string(), title.to_string()),
                ("organizer".to_string(), "教發中心".to_string()),
            ]),
            fetched_at: "2024-05-01T08:00:00+08:00".into(),
        }
    }

    #[tokio::test]
    async fn test_missing_file_has_no_keys() {
        let tmp = TempDir::new().unwrap();
        let store = CsvStore::new(tmp.path().join("events.csv"), schema());
        assert!(store.load_keys().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_append_then_reload_keys_in_order() {
        let tmp = TempDir::new().unwrap();
        let store = CsvStore::new(tmp.path().join("nested/events.csv"), schema());

        assert_eq!(store.append(&[record("a", "第一場")]).await.unwrap(), 1);
        assert_eq!(
            store
                .append(&[record("b", "含,逗號"), record("c", "含\"引號\"")])
                .await
                .unwrap(),
            2
        );

        assert_eq!(store.load_keys().await.unwrap(), vec!["a", "b", "c"]);
        assert!(!tmp.path().join("nested/events.csv.tmp").exists());
    }

    #[tokio::test]
    async fn test_store_named_tmp_still_writes_through_a_sibling() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("events.tmp");
        let store = CsvStore::new(&path, schema());

        store.append(&[record("a", "甲")]).await.unwrap();
        store.append(&[record("b", "乙")]).await.unwrap();

        assert_eq!(store.load_keys().await.unwrap(), vec!["a", "b"]);
        assert!(!tmp.path().join("events.tmp.tmp").exists());
    }

    #[tokio::test]
    async fn test_existing_rows_are_byte_preserved() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("events.csv");
        let original = "key,title,organizer,fetched_at\r\nold,手動 編輯,,\r\n";
        std::fs::write(&path, original).unwrap();

        let store = CsvStore::new(&path, schema());
        store.append(&[record("new", "新")]).await.unwrap();

        let content = std::fs::read_to_string(&path).unwrap();
        assert!(content.starts_with(original));
        assert_eq!(store.load_keys().await.unwrap(), vec!["old", "new"]);
    }

    #[tokio::test]
    async fn test_missing_trailing_newline_is_repaired() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("events.csv");
        std::fs::write(&path, "key,title,organizer,fetched_at\nold,x,y,z").unwrap();

        let store = CsvStore::new(&path, schema());
        store.append(&[record("new", "新")]).await.unwrap();
        assert_eq!(store.load_keys().await.unwrap(), vec!["old", "new"]);
    }

    #[tokio::test]
    async fn test_header_mismatch_is_refused() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("events.csv");
        let original = "key,title,fetched_at\nold,x,y\n";
        std::fs::write(&path, original).unwrap();

        let store = CsvStore::new(&path, schema());
        assert!(matches!(
            store.load_keys().await,
            Err(AppError::StoreWrite { .. })
        ));
        assert!(matches!(
            store.append(&[record("new", "新")]).await,
            Err(AppError::StoreWrite { .. })
        ));
        assert_eq!(std::fs::read_to_string(&path).unwrap(), original);
    }

    #[tokio::test]
    async fn test_stats_counts_filled_columns() {
        let tmp = TempDir::new().unwrap();
        let store = CsvStore::new(tmp.path().join("events.csv"), schema());
        let mut partial = record("b", "");
        partial.fields.remove("organizer");
        store.append(&[record("a", "講座"), partial]).await.unwrap();

        let stats = store.stats().await.unwrap();
        assert_eq!(stats.records, 2);
        assert_eq!(stats.filled[0], ("key".to_string(), 2));
        assert_eq!(stats.filled[1], ("title".to_string(), 1));
        assert_eq!(stats.filled[2], ("organizer".to_string(), 1));
        assert_eq!(stats.filled[3], ("fetched_at".to_string(), 2));
    }
}
