//! CSV in, CSV out. Every cell is read as text; typing happens in
//! [`crate::normalize`].

use std::path::Path;

use crate::error::ReconError;
use crate::model::Record;

/// Raw rows of one CSV file, header order preserved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawTable {
    pub name: String,
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl RawTable {
    pub fn new(name: impl Into<String>, headers: Vec<String>, rows: Vec<Vec<String>>) -> Self {
        Self {
            name: name.into(),
            headers,
            rows,
        }
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn column(&self, name: &str) -> Option<usize> {
        self.headers.iter().position(|h| h == name)
    }
}

/// Parse CSV text. Short rows are padded with empty cells; rows longer than
/// the header are rejected.
pub fn read_csv(name: &str, data: &str) -> Result<RawTable, ReconError> {
    let data = data.strip_prefix('\u{feff}').unwrap_or(data);
    let csv_err = |e: csv::Error| ReconError::Csv {
        dataset: name.to_string(),
        message: e.to_string(),
    };

    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_reader(data.as_bytes());

    let headers: Vec<String> = reader
        .headers()
        .map_err(csv_err)?
        .iter()
        .map(|h| h.to_string())
        .collect();

    let mut rows = Vec::new();
    for (i, record) in reader.records().enumerate() {
        let record = record.map_err(csv_err)?;
        if record.len() > headers.len() {
            return Err(ReconError::Csv {
                dataset: name.to_string(),
                message: format!(
                    "row {} has {} fields, header has {}",
                    i + 1,
                    record.len(),
                    headers.len()
                ),
            });
        }
        let mut cells: Vec<String> = record.iter().map(|c| c.to_string()).collect();
        cells.resize(headers.len(), String::new());
        rows.push(cells);
    }

    Ok(RawTable::new(name, headers, rows))
}

pub fn read_csv_file(name: &str, path: &Path) -> Result<RawTable, ReconError> {
    let data = std::fs::read_to_string(path)
        .map_err(|e| ReconError::Io(format!("cannot read {}: {e}", path.display())))?;
    read_csv(name, &data)
}

/// Cell text for column `index`. Positional when the record was read under
/// the same header, so repeated column names keep their own cells.
fn output_cell<'a>(record: &'a Record, index: usize, header: &str) -> &'a str {
    match record.cell_at(index) {
        Some((name, cell)) if name == header => &cell.raw,
        _ => record.raw(header).unwrap_or(""),
    }
}

/// Serialize records under `headers`, in record order.
pub fn write_csv(headers: &[String], records: &[Record]) -> Result<Vec<u8>, ReconError> {
    let csv_err = |e: csv::Error| ReconError::Csv {
        dataset: "output".into(),
        message: e.to_string(),
    };

    let mut writer = csv::WriterBuilder::new().from_writer(Vec::new());
    writer.write_record(headers).map_err(csv_err)?;

    for record in records {
        writer
            .write_record(headers.iter().enumerate().map(|(i, h)| output_cell(record, i, h)))
            .map_err(csv_err)?;
    }

    writer.into_inner().map_err(|e| ReconError::Csv {
        dataset: "output".into(),
        message: e.to_string(),
    })
}
