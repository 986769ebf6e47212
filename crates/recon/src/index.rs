use std::collections::hash_map::Entry;
use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::error::ReconError;
use crate::model::{Record, ReconWarning};

/// What to do when a source repeats a key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DuplicatePolicy {
    /// Keep the first row per key, warn about the rest.
    #[default]
    FirstWins,
    /// Fail the run.
    Strict,
}

/// A key seen more than once. `count` includes the kept row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DuplicateKey {
    pub key: String,
    pub count: usize,
}

/// Keys match after trimming surrounding whitespace. Case is significant.
pub fn normalize_key(raw: &str) -> &str {
    raw.trim()
}

/// Read-only key → record lookup over a source dataset.
///
/// The first record per key wins. Records with a blank key are not indexed.
#[derive(Debug)]
pub struct SourceIndex<'a> {
    by_key: HashMap<&'a str, &'a Record>,
    duplicates: Vec<DuplicateKey>,
    discarded: usize,
    blank_keys: usize,
}

impl<'a> SourceIndex<'a> {
    pub fn build(records: &'a [Record], key_field: &str) -> Self {
        let mut by_key: HashMap<&'a str, &'a Record> = HashMap::with_capacity(records.len());
        let mut duplicates: Vec<DuplicateKey> = Vec::new();
        let mut duplicate_slot: HashMap<&'a str, usize> = HashMap::new();
        let mut discarded = 0;
        let mut blank_keys = 0;

        for record in records {
            let key = normalize_key(record.raw(key_field).unwrap_or(""));
            if key.is_empty() {
                blank_keys += 1;
                continue;
            }

            match by_key.entry(key) {
                Entry::Vacant(slot) => {
                    slot.insert(record);
                }
                Entry::Occupied(_) => {
                    discarded += 1;
                    match duplicate_slot.get(key) {
                        Some(&i) => duplicates[i].count += 1,
                        None => {
                            duplicate_slot.insert(key, duplicates.len());
                            duplicates.push(DuplicateKey {
                                key: key.to_string(),
                                count: 2,
                            });
                        }
                    }
                }
            }
        }

        Self {
            by_key,
            duplicates,
            discarded,
            blank_keys,
        }
    }

    pub fn lookup(&self, key: &str) -> Option<&'a Record> {
        let key = normalize_key(key);
        if key.is_empty() {
            return None;
        }
        self.by_key.get(key).copied()
    }

    /// Number of distinct indexed keys.
    pub fn len(&self) -> usize {
        self.by_key.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_key.is_empty()
    }

    /// Repeated keys, in order of first repetition.
    pub fn duplicates(&self) -> &[DuplicateKey] {
        &self.duplicates
    }

    /// Rows dropped because their key was already indexed.
    pub fn discarded(&self) -> usize {
        self.discarded
    }

    pub fn blank_keys(&self) -> usize {
        self.blank_keys
    }

    /// Apply the duplicate policy: a warning under `FirstWins`, an error
    /// under `Strict`. `Ok(None)` when the source has no repeated keys.
    pub fn resolve_duplicates(
        &self,
        dataset: &str,
        policy: DuplicatePolicy,
    ) -> Result<Option<ReconWarning>, ReconError> {
        if self.duplicates.is_empty() {
            return Ok(None);
        }
        match policy {
            DuplicatePolicy::FirstWins => Ok(Some(ReconWarning::DuplicateKeys {
                dataset: dataset.to_string(),
                discarded: self.discarded,
                keys: self.duplicates.clone(),
            })),
            DuplicatePolicy::Strict => Err(ReconError::MergeAmbiguity {
                dataset: dataset.to_string(),
                duplicates: self.duplicates.clone(),
            }),
        }
    }
}
