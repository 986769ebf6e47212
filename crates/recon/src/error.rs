use std::fmt;

use crate::index::DuplicateKey;

#[derive(Debug)]
pub enum ReconError {
    /// TOML parse / deserialization error.
    ConfigParse(String),
    /// Config validation error (duplicate target, rule on key field, etc.).
    ConfigValidation(String),
    /// Required column missing from an input header.
    MissingColumn { dataset: String, column: String },
    /// Strict duplicate policy and the dataset repeats keys.
    MergeAmbiguity { dataset: String, duplicates: Vec<DuplicateKey> },
    /// Malformed CSV input or output.
    Csv { dataset: String, message: String },
    /// IO error (file read, etc.).
    Io(String),
}

impl ReconError {
    /// True for failures caused by bad input shape or config rather than
    /// by the environment. Callers surface these as validation failures.
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            Self::ConfigParse(_) | Self::ConfigValidation(_) | Self::MissingColumn { .. }
        )
    }
}

impl fmt::Display for ReconError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ConfigParse(msg) => write!(f, "config parse error: {msg}"),
            Self::ConfigValidation(msg) => write!(f, "config validation error: {msg}"),
            Self::MissingColumn { dataset, column } => {
                write!(f, "{dataset}: missing required column '{column}'")
            }
            Self::MergeAmbiguity { dataset, duplicates } => {
                write!(
                    f,
                    "{dataset}: {} key(s) appear more than once (strict matching)",
                    duplicates.len()
                )?;
                for dup in duplicates.iter().take(10) {
                    write!(f, "\n  key {:?} appears {} times", dup.key, dup.count)?;
                }
                if duplicates.len() > 10 {
                    write!(f, "\n  ... and {} more", duplicates.len() - 10)?;
                }
                Ok(())
            }
            Self::Csv { dataset, message } => write!(f, "{dataset}: CSV error: {message}"),
            Self::Io(msg) => write!(f, "IO error: {msg}"),
        }
    }
}

impl std::error::Error for ReconError {}
