//! Library half of `psync`: locating inputs and rendering outputs.
//! The binary owns argument parsing and exit codes.

pub mod format;
pub mod load;
