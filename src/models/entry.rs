//! Candidate entries discovered on list pages.

use std::collections::BTreeMap;

use sha2::{Digest, Sha256};
use url::Url;

use crate::models::KeyStrategy;
use crate::utils::url::{extract_notice_id, without_fragment};

/// Field name → extracted value. Absent fields are simply missing.
pub type FieldValues = BTreeMap<String, String>;

/// One row found on a list page, before detail enrichment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CandidateEntry {
    /// Absolute link to the detail page
    pub link: Url,

    /// Fields captured directly from the list row
    pub fields: FieldValues,
}

impl CandidateEntry {
    pub fn new(link: Url, fields: FieldValues) -> Self {
        Self { link, fields }
    }

    pub fn field(&self, name: &str) -> Option<&str> {
        self.fields.get(name).map(String::as_str)
    }

    /// Derive the unique key for this entry.
    ///
    /// The key only depends on data available on the list page, so it can
    /// be checked before the detail page is fetched.
    pub fn key(&self, strategy: &KeyStrategy) -> String {
        let link = without_fragment(&self.link);
        match strategy {
            KeyStrategy::Link => link.to_string(),
            KeyStrategy::LinkId => extract_notice_id(&link)
                .map(|id| format!("id:{id}"))
                .unwrap_or_else(|| link.to_string()),
            KeyStrategy::Fields(names) => {
                let mut hasher = Sha256::new();
                for name in names {
                    hasher.update(self.field(name).unwrap_or("").trim().as_bytes());
                    hasher.update([0x1f]);
                }
                format!("h:{}", &hex::encode(hasher.finalize())[..32])
            }
        }
    }
}
