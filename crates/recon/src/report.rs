use std::collections::HashSet;

use serde::Serialize;

use crate::model::{ChangeEntry, Record};

/// Field-level changes of a run, in catalog row order.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct ChangeReport {
    entries: Vec<ChangeEntry>,
}

impl ChangeReport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append the entries of one record. Callers push records in row order.
    pub fn push_record(&mut self, entries: Vec<ChangeEntry>) {
        self.entries.extend(entries);
    }

    /// Concatenate pass reports and order by catalog row. Entries for the
    /// same row keep pass order.
    pub fn merge<'a>(reports: impl IntoIterator<Item = &'a ChangeReport>) -> Self {
        let mut entries: Vec<ChangeEntry> = reports
            .into_iter()
            .flat_map(|r| r.entries.iter().cloned())
            .collect();
        entries.sort_by_key(|e| e.row);
        Self { entries }
    }

    pub fn entries(&self) -> &[ChangeEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Distinct changed rows, first-seen order.
    pub fn changed_rows(&self) -> Vec<usize> {
        let mut seen = HashSet::new();
        self.entries
            .iter()
            .filter(|e| seen.insert(e.row))
            .map(|e| e.row)
            .collect()
    }

    pub fn records_changed(&self) -> usize {
        self.changed_rows().len()
    }

    pub fn for_row(&self, row: usize) -> impl Iterator<Item = &ChangeEntry> {
        self.entries.iter().filter(move |e| e.row == row)
    }
}

/// What the CLI prints: how many records changed and which.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ChangeSummary {
    pub records_changed: usize,
    pub fields_changed: usize,
    pub changed_keys: Vec<String>,
}

/// Summarize a report. Without `report_field` every changed row lists its
/// own key. With it, keys come from that column of the updated record
/// (falling back to the entry key) and are de-duplicated in row order.
pub fn compute_summary(
    report: &ChangeReport,
    catalog: &[Record],
    report_field: Option<&str>,
) -> ChangeSummary {
    let rows = report.changed_rows();
    let mut seen = HashSet::new();
    let mut changed_keys = Vec::new();

    for row in &rows {
        let entry_key = report
            .for_row(*row)
            .next()
            .map(|e| e.key.as_str())
            .unwrap_or("");
        let key = match report_field {
            Some(field) => catalog
                .get(*row)
                .and_then(|r| r.raw(field))
                .unwrap_or(entry_key),
            None => entry_key,
        };
        if report_field.is_none() || seen.insert(key.to_string()) {
            changed_keys.push(key.to_string());
        }
    }

    ChangeSummary {
        records_changed: rows.len(),
        fields_changed: report.len(),
        changed_keys,
    }
}
