use tracing::debug;

use crate::error::ReconError;
use crate::model::{Record, ReconWarning};
use crate::schema::{FieldKind, Schema};
use crate::table::RawTable;
use crate::value::FieldValue;

/// Typed records of one dataset plus the cells that failed to parse.
#[derive(Debug, Clone)]
pub struct Normalized {
    pub records: Vec<Record>,
    pub warnings: Vec<ReconWarning>,
}

/// Coerce one cell per its declared kind.
pub fn coerce(raw: &str, kind: FieldKind) -> FieldValue {
    match kind {
        FieldKind::Identifier => FieldValue::identifier(raw),
        FieldKind::Money => FieldValue::money(raw),
        FieldKind::Text => FieldValue::text(raw),
    }
}

/// Normalize one row. Missing trailing cells read as empty.
///
/// A money cell with content that does not parse becomes `Absent` and is
/// reported as a warning; the rest of the row is unaffected.
pub fn normalize_row(
    headers: &[String],
    row: &[String],
    schema: &Schema,
    position: usize,
) -> (Record, Vec<ReconWarning>) {
    let mut record = Record::new(position, schema.key_field.clone());
    let mut warnings = Vec::new();

    for (i, name) in headers.iter().enumerate() {
        let raw = row.get(i).map(|s| s.as_str()).unwrap_or("");
        let kind = schema.kind_of(name);
        let value = coerce(raw, kind);

        if kind == FieldKind::Money && value.is_absent() && !raw.trim().is_empty() {
            warnings.push(ReconWarning::UnparsedMoney {
                dataset: schema.dataset.clone(),
                row: position,
                field: name.clone(),
                raw: raw.to_string(),
            });
        }

        record.push(name.clone(), value, raw);
    }

    (record, warnings)
}

/// Validate the header against the schema, then normalize every row.
/// A missing required column fails before any row is touched.
pub fn normalize_table(table: &RawTable, schema: &Schema) -> Result<Normalized, ReconError> {
    schema.validate_header(&table.headers)?;

    let mut records = Vec::with_capacity(table.rows.len());
    let mut warnings = Vec::new();

    for (position, row) in table.rows.iter().enumerate() {
        let (record, row_warnings) = normalize_row(&table.headers, row, schema, position);
        records.push(record);
        warnings.extend(row_warnings);
    }

    debug!(
        dataset = %schema.dataset,
        rows = records.len(),
        unparsed = warnings.len(),
        "normalized table"
    );

    Ok(Normalized { records, warnings })
}
