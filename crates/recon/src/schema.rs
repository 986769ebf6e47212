use serde::{Deserialize, Serialize};

use crate::error::ReconError;

/// How a column's cells are coerced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldKind {
    /// SKU, barcode, model number. Kept as exact text, never coerced.
    Identifier,
    /// Price-like cell. `$` and thousands separators stripped, parsed to a decimal.
    Money,
    /// Anything else. Empty cells are absent.
    Text,
}

impl std::fmt::Display for FieldKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Identifier => write!(f, "identifier"),
            Self::Money => write!(f, "money"),
            Self::Text => write!(f, "text"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldSpec {
    pub name: String,
    pub kind: FieldKind,
    pub required: bool,
}

/// Declared columns of one dataset. Undeclared columns are free text.
#[derive(Debug, Clone)]
pub struct Schema {
    pub dataset: String,
    pub key_field: String,
    fields: Vec<FieldSpec>,
}

impl Schema {
    /// New schema whose key field is a required identifier.
    pub fn new(dataset: impl Into<String>, key_field: impl Into<String>) -> Self {
        let key_field = key_field.into();
        Self {
            dataset: dataset.into(),
            fields: vec![FieldSpec {
                name: key_field.clone(),
                kind: FieldKind::Identifier,
                required: true,
            }],
            key_field,
        }
    }

    /// Declare a column. Declaring the same column twice with different
    /// kinds is a config error; `required` accumulates.
    pub fn declare(&mut self, name: &str, kind: FieldKind, required: bool) -> Result<(), ReconError> {
        match self.fields.iter_mut().find(|f| f.name == name) {
            Some(existing) if existing.kind != kind => Err(ReconError::ConfigValidation(format!(
                "{}: column '{name}' declared as both {} and {kind}",
                self.dataset, existing.kind
            ))),
            Some(existing) => {
                existing.required |= required;
                Ok(())
            }
            None => {
                self.fields.push(FieldSpec {
                    name: name.to_string(),
                    kind,
                    required,
                });
                Ok(())
            }
        }
    }

    /// Mark a column required, declaring it as text if unknown.
    pub fn require(&mut self, name: &str) {
        match self.fields.iter_mut().find(|f| f.name == name) {
            Some(existing) => existing.required = true,
            None => self.fields.push(FieldSpec {
                name: name.to_string(),
                kind: FieldKind::Text,
                required: true,
            }),
        }
    }

    pub fn spec(&self, name: &str) -> Option<&FieldSpec> {
        self.fields.iter().find(|f| f.name == name)
    }

    pub fn kind_of(&self, name: &str) -> FieldKind {
        self.spec(name).map(|f| f.kind).unwrap_or(FieldKind::Text)
    }

    pub fn fields(&self) -> &[FieldSpec] {
        &self.fields
    }

    pub fn required_fields(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().filter(|f| f.required).map(|f| f.name.as_str())
    }

    /// Check a header once, before any row is read. The first missing
    /// required column is reported.
    pub fn validate_header(&self, headers: &[String]) -> Result<(), ReconError> {
        for name in self.required_fields() {
            if !headers.iter().any(|h| h == name) {
                return Err(ReconError::MissingColumn {
                    dataset: self.dataset.clone(),
                    column: name.to_string(),
                });
            }
        }
        Ok(())
    }
}
