//! CLI Exit Code Registry
//!
//! This is the single source of truth for all `psync` exit codes.
//! Exit codes are part of the shell contract; scripts rely on them.
//!
//! | Code | Meaning                                                  |
//! |------|----------------------------------------------------------|
//! | 0    | Success                                                  |
//! | 1    | General error; `diff --fail-on-diff` found differences   |
//! | 2    | Usage error (bad args, no catalog file given)            |
//! | 3    | Validation error (config or missing column)              |
//! | 4    | Duplicate keys under strict matching                     |
//! | 5    | I/O error (read, write, malformed CSV)                   |
//!
//! # Adding New Exit Codes
//!
//! 1. Add the constant
//! 2. Document what triggers it
//! 3. Update the table above
//! 4. Wire it into [`recon_exit_code`] or the relevant command

use pricesync_recon::ReconError;

/// Success - command completed without errors.
pub const EXIT_SUCCESS: u8 = 0;

/// General error - unspecified failure.
pub const EXIT_ERROR: u8 = 1;

/// `psync diff --fail-on-diff` found differences.
/// Like `diff(1)`, exit 1 means "files differ."
pub const EXIT_DIFF_FOUND: u8 = 1;

/// Usage error - bad arguments, missing required options.
pub const EXIT_USAGE: u8 = 2;

/// Config rejected or a required column is missing. Printed with the
/// `validation error:` prefix.
pub const EXIT_VALIDATION: u8 = 3;

/// Duplicate source keys with strict matching.
pub const EXIT_MERGE_AMBIGUITY: u8 = 4;

/// File could not be read or written, or CSV is malformed.
pub const EXIT_IO: u8 = 5;

/// Map an engine error to its exit code.
pub fn recon_exit_code(err: &ReconError) -> u8 {
    match err {
        ReconError::ConfigParse(_)
        | ReconError::ConfigValidation(_)
        | ReconError::MissingColumn { .. } => EXIT_VALIDATION,
        ReconError::MergeAmbiguity { .. } => EXIT_MERGE_AMBIGUITY,
        ReconError::Csv { .. } | ReconError::Io(_) => EXIT_IO,
    }
}
