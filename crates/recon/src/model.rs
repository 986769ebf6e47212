use std::fmt;

use serde::Serialize;

use crate::index::DuplicateKey;
use crate::report::{ChangeReport, ChangeSummary};
use crate::value::FieldValue;

// ---------------------------------------------------------------------------
// Records
// ---------------------------------------------------------------------------

/// One cell: the typed value plus the text it was read from.
#[derive(Debug, Clone, PartialEq)]
pub struct Cell {
    pub value: FieldValue,
    pub raw: String,
}

static ABSENT: FieldValue = FieldValue::Absent;

/// A normalized row, fields in header order.
///
/// `position` is the 0-based data row index in the input and never changes.
/// Untouched cells keep their raw text so they can be written back exactly.
#[derive(Debug, Clone, PartialEq)]
pub struct Record {
    pub position: usize,
    key_field: String,
    fields: Vec<(String, Cell)>,
}

impl Record {
    pub fn new(position: usize, key_field: impl Into<String>) -> Self {
        Self {
            position,
            key_field: key_field.into(),
            fields: Vec::new(),
        }
    }

    pub fn push(&mut self, name: impl Into<String>, value: FieldValue, raw: impl Into<String>) {
        self.fields.push((
            name.into(),
            Cell {
                value,
                raw: raw.into(),
            },
        ));
    }

    pub fn key_field(&self) -> &str {
        &self.key_field
    }

    /// Key text exactly as read.
    pub fn key(&self) -> &str {
        self.raw(&self.key_field).unwrap_or("")
    }

    pub fn cell(&self, field: &str) -> Option<&Cell> {
        self.fields.iter().find(|(name, _)| name == field).map(|(_, c)| c)
    }

    /// Cell at a column position, with its field name.
    pub fn cell_at(&self, index: usize) -> Option<(&str, &Cell)> {
        self.fields.get(index).map(|(name, c)| (name.as_str(), c))
    }

    pub fn get(&self, field: &str) -> Option<&FieldValue> {
        self.cell(field).map(|c| &c.value)
    }

    /// Field value, `Absent` when the record has no such field.
    pub fn value(&self, field: &str) -> &FieldValue {
        self.get(field).unwrap_or(&ABSENT)
    }

    pub fn raw(&self, field: &str) -> Option<&str> {
        self.cell(field).map(|c| c.raw.as_str())
    }

    /// Replace a field value. The raw text becomes the formatted value.
    /// Unknown fields are appended.
    pub fn set(&mut self, field: &str, value: FieldValue) {
        let raw = value.to_string();
        match self.fields.iter_mut().find(|(name, _)| name == field) {
            Some((_, cell)) => {
                cell.value = value;
                cell.raw = raw;
            }
            None => self.push(field, value, raw),
        }
    }

    pub fn field_names(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|(name, _)| name.as_str())
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

// ---------------------------------------------------------------------------
// Matching
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy)]
pub enum MatchResult<'a> {
    Matched {
        catalog: &'a Record,
        source: &'a Record,
    },
    Unmatched(&'a Record),
}

impl<'a> MatchResult<'a> {
    pub fn catalog(&self) -> &'a Record {
        match self {
            Self::Matched { catalog, .. } => catalog,
            Self::Unmatched(catalog) => catalog,
        }
    }

    pub fn is_matched(&self) -> bool {
        matches!(self, Self::Matched { .. })
    }
}

/// Terminal state of one catalog record after a pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RecordOutcome {
    Unmatched,
    NoChange,
    Updated,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct MatchStats {
    pub catalog_rows: usize,
    pub source_rows: usize,
    pub matched: usize,
    pub unmatched: usize,
    pub updated: usize,
}

impl MatchStats {
    pub fn record(&mut self, outcome: RecordOutcome) {
        match outcome {
            RecordOutcome::Unmatched => self.unmatched += 1,
            RecordOutcome::NoChange => self.matched += 1,
            RecordOutcome::Updated => {
                self.matched += 1;
                self.updated += 1;
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Changes + warnings
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChangeEntry {
    pub row: usize,
    pub key: String,
    pub field: String,
    pub old: FieldValue,
    pub new: FieldValue,
}

/// Recoverable conditions. Never fatal; returned next to the result.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ReconWarning {
    /// Rows dropped because an earlier row already claimed the key.
    DuplicateKeys {
        dataset: String,
        discarded: usize,
        keys: Vec<DuplicateKey>,
    },
    /// A money cell that did not parse; treated as absent.
    UnparsedMoney {
        dataset: String,
        row: usize,
        field: String,
        raw: String,
    },
}

impl fmt::Display for ReconWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::DuplicateKeys { dataset, discarded, keys } => {
                write!(
                    f,
                    "{dataset}: {discarded} duplicate row(s) discarded across {} key(s); first occurrence kept",
                    keys.len()
                )
            }
            Self::UnparsedMoney { dataset, row, field, raw } => {
                write!(f, "{dataset}, row {}: cannot parse '{field}' value {raw:?}; treated as blank", row + 1)
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Run output
// ---------------------------------------------------------------------------

/// Result of one catalog/source pass.
#[derive(Debug, Clone)]
pub struct Reconciliation {
    pub catalog: Vec<Record>,
    pub report: ChangeReport,
    pub stats: MatchStats,
    pub warnings: Vec<ReconWarning>,
}

#[derive(Debug, Clone, Serialize)]
pub struct PassReport {
    pub source: String,
    pub stats: MatchStats,
    pub report: ChangeReport,
    pub warnings: Vec<ReconWarning>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SyncMeta {
    pub config_name: String,
    pub engine_version: String,
    pub run_at: String,
}

/// Full result of a config-driven run. The updated catalog is carried for
/// the writer but left out of the JSON report.
#[derive(Debug, Clone, Serialize)]
pub struct SyncResult {
    pub meta: SyncMeta,
    pub summary: ChangeSummary,
    pub passes: Vec<PassReport>,
    pub warnings: Vec<ReconWarning>,
    #[serde(skip)]
    pub headers: Vec<String>,
    #[serde(skip)]
    pub catalog: Vec<Record>,
}
