// src/pipeline/dedup.rs

//! New-item detection against a target's store.

use std::collections::HashSet;

use crate::error::Result;
use crate::models::{CandidateEntry, KeyStrategy, Record};
use crate::storage::RecordStore;

/// Keep candidates whose key is not in `known`, in input order.
///
/// Duplicates within `candidates` are dropped too; the first one wins.
pub fn filter_new(
    candidates: Vec<CandidateEntry>,
    known: &HashSet<String>,
    strategy: &KeyStrategy,
) -> Vec<(String, CandidateEntry)> {
    let mut batch = HashSet::new();
    candidates
        .into_iter()
        .filter_map(|entry| {
            let key = entry.key(strategy);
            if known.contains(&key) || !batch.insert(key.clone()) {
                None
            } else {
                Some((key, entry))
            }
        })
        .collect()
}

/// Known-key set for one target run, backed by its store.
pub struct DedupEngine<'s> {
    store: &'s dyn RecordStore,
    known: HashSet<String>,
}

impl<'s> DedupEngine<'s> {
    /// Load every stored key once.
    pub async fn load(store: &'s dyn RecordStore) -> Result<Self> {
        let known: HashSet<String> = store.load_keys().await?.into_iter().collect();
        log::debug!("{} known keys in {}", known.len(), store.location());
        Ok(Self { store, known })
    }

    pub fn known_count(&self) -> usize {
        self.known.len()
    }

    pub fn filter_new(
        &self,
        candidates: Vec<CandidateEntry>,
        strategy: &KeyStrategy,
    ) -> Vec<(String, CandidateEntry)> {
        filter_new(candidates, &self.known, strategy)
    }

    /// Persist `records`, then mark their keys as known.
    ///
    /// On failure the known set is untouched, so the same records are
    /// still new on retry.
    pub async fn append(&mut self, records: &[Record]) -> Result<usize> {
        let written = self.store.append(records).await?;
        self.known
            .extend(records.iter().map(|record| record.key.clone()));
        Ok(written)
    }
}
