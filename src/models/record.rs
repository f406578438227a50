//! Stored announcement records and the store column layout.

use serde::Serialize;

use crate::models::{CandidateEntry, FieldValues};

/// Column holding the unique key.
pub const KEY_COLUMN: &str = "key";

/// Column holding the crawl timestamp.
pub const FETCHED_AT_COLUMN: &str = "fetched_at";

/// Ordered column layout of a target's store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Schema {
    columns: Vec<String>,
}

impl Schema {
    /// Build the layout: key, each field once in first-seen order, fetched_at.
    pub fn new<'a>(field_names: impl IntoIterator<Item = &'a str>) -> Self {
        let mut columns = vec![KEY_COLUMN.to_string()];
        for name in field_names {
            if !columns.iter().any(|c| c == name) {
                columns.push(name.to_string());
            }
        }
        columns.push(FETCHED_AT_COLUMN.to_string());
        Self { columns }
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn contains(&self, column: &str) -> bool {
        self.columns.iter().any(|c| c == column)
    }
}

/// A fully resolved announcement.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Record {
    pub key: String,
    pub fields: FieldValues,
    pub fetched_at: String,
}

impl Record {
    /// Combine list-row fields with detail fields.
    ///
    /// A non-empty detail value replaces the list value of the same name;
    /// an empty one never erases data already captured from the list.
    pub fn from_entry(
        key: String,
        entry: &CandidateEntry,
        detail: FieldValues,
        fetched_at: impl Into<String>,
    ) -> Self {
        let mut fields = entry.fields.clone();
        for (name, value) in detail {
            if !value.trim().is_empty() {
                fields.insert(name, value);
            }
        }
        Self {
            key,
            fields,
            fetched_at: fetched_at.into(),
        }
    }

    pub fn field(&self, name: &str) -> Option<&str> {
        self.fields.get(name).map(String::as_str)
    }

    /// Render the record as a row in schema order; absent fields are empty.
    pub fn to_row(&self, schema: &Schema) -> Vec<String> {
        schema
            .columns()
            .iter()
            .map(|column| match column.as_str() {
                KEY_COLUMN => self.key.clone(),
                FETCHED_AT_COLUMN => self.fetched_at.clone(),
                name => self.fields.get(name).cloned().unwrap_or_default(),
            })
            .collect()
    }
}
