//! `psync diff`: compare two catalog snapshots field by field.

use std::io::Write;
use std::path::{Path, PathBuf};

use clap::Args;
use pricesync_cli::format::{diff_csv, diff_summary_lines, warning_lines};
use pricesync_recon::engine::{DEFAULT_DIFF_KEY, DEFAULT_MONEY_FIELDS};
use pricesync_recon::table::read_csv_file;
use pricesync_recon::{diff_snapshots, DiffOptions, DuplicatePolicy};

use crate::exit_codes::{EXIT_DIFF_FOUND, EXIT_ERROR};
use crate::CliError;

#[derive(Args)]
pub struct DiffArgs {
    /// Catalog snapshot before the update
    pub before: PathBuf,

    /// Catalog snapshot after the update
    pub after: PathBuf,

    /// Key column present in both snapshots
    #[arg(long, default_value = DEFAULT_DIFF_KEY)]
    pub key: String,

    /// Columns to compare, comma-separated (default: every shared column)
    #[arg(long, value_delimiter = ',')]
    pub fields: Option<Vec<String>>,

    /// Columns compared as money, comma-separated
    /// (default: Variant Price, Cost per item, Compare At Price)
    #[arg(long, value_delimiter = ',')]
    pub money: Option<Vec<String>>,

    /// Write the diff CSV here instead of stdout
    #[arg(long, short = 'o')]
    pub output: Option<PathBuf>,

    /// Fail on duplicate keys instead of keeping the first row
    #[arg(long)]
    pub strict: bool,

    /// Exit 1 when any shared record differs
    #[arg(long)]
    pub fail_on_diff: bool,

    /// Print the JSON diff report to stdout
    #[arg(long)]
    pub json: bool,

    /// Suppress warnings and notes on stderr
    #[arg(long, short = 'q')]
    pub quiet: bool,
}

fn label(path: &Path) -> String {
    path.display().to_string()
}

pub fn cmd_diff(args: DiffArgs) -> Result<(), CliError> {
    let before_label = label(&args.before);
    let after_label = label(&args.after);
    let before = read_csv_file(&before_label, &args.before)?;
    let after = read_csv_file(&after_label, &args.after)?;

    let options = DiffOptions {
        key_field: args.key,
        fields: args.fields,
        money: args
            .money
            .unwrap_or_else(|| DEFAULT_MONEY_FIELDS.iter().map(|s| s.to_string()).collect()),
        duplicates: if args.strict {
            DuplicatePolicy::Strict
        } else {
            DuplicatePolicy::FirstWins
        },
    };
    let diff = diff_snapshots(&before, &after, &options)?;

    if !args.quiet {
        for line in warning_lines(&diff.warnings) {
            eprintln!("{line}");
        }
        for line in diff_summary_lines(&diff, &before_label, &after_label) {
            eprintln!("{line}");
        }
    }

    let csv_bytes = diff_csv(&diff).map_err(|e| CliError::io(format!("cannot render diff CSV: {e}")))?;

    match args.output {
        Some(ref path) => {
            std::fs::write(path, &csv_bytes)
                .map_err(|e| CliError::io(format!("cannot write {}: {e}", path.display())))?;
            if !args.quiet {
                eprintln!("wrote {}", path.display());
            }
        }
        None if !args.json => {
            std::io::stdout()
                .write_all(&csv_bytes)
                .map_err(|e| CliError::io(format!("cannot write to stdout: {e}")))?;
        }
        None => {}
    }

    if args.json {
        let json_str = serde_json::to_string_pretty(&diff).map_err(|e| CliError {
            code: EXIT_ERROR,
            message: format!("JSON serialization error: {e}"),
            hint: None,
        })?;
        println!("{json_str}");
    }

    if args.fail_on_diff && diff.has_differences() {
        return Err(CliError {
            code: EXIT_DIFF_FOUND,
            message: format!("{} record(s) differ", diff.records.len()),
            hint: None,
        });
    }
    Ok(())
}
