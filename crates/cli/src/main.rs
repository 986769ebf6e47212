// pricesync CLI - update a product catalog from vendor price lists

mod diff;
mod exit_codes;
mod sync;

use std::process::ExitCode;

use clap::{Parser, Subcommand};
use pricesync_recon::ReconError;
use tracing_subscriber::EnvFilter;

use exit_codes::{recon_exit_code, EXIT_IO, EXIT_SUCCESS, EXIT_USAGE, EXIT_VALIDATION};

#[derive(Parser)]
#[command(name = "psync")]
#[command(about = "Update a product catalog from vendor price lists")]
#[command(version = concat!(env!("CARGO_PKG_VERSION"), " (", env!("PSYNC_COMMIT"), ")"))]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Log per-pass statistics to stderr (RUST_LOG takes precedence)
    #[arg(long, short = 'v', global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Apply the price lists of a sync config to a catalog
    #[command(after_help = "\
Exit code 3 means the config or an input header was rejected; nothing was written.

Examples:
  psync update presets/profile.sync.toml
  psync update profile.sync.toml --catalog export.csv --output export_updated.csv
  psync update stentor.sync.toml --dry-run --json | jq .summary
  psync update daddario.sync.toml --strict --report changes.json")]
    Update(sync::UpdateArgs),

    /// Report field differences between two catalog snapshots
    #[command(after_help = "\
Exit code 1 with --fail-on-diff means at least one shared record differs.

Examples:
  psync diff products.csv products_updated.csv
  psync diff before.csv after.csv --output price_diff.csv
  psync diff before.csv after.csv --fields 'Variant Price,Cost per item'
  psync diff before.csv after.csv --key Handle --fail-on-diff")]
    Diff(diff::DiffArgs),

    /// Check a sync config and the input headers without running
    #[command(after_help = "\
Examples:
  psync validate presets/stentor.sync.toml
  psync validate stentor.sync.toml --catalog stentor_products.csv")]
    Validate(sync::ValidateArgs),
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "info" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let result = match cli.command {
        Commands::Update(args) => sync::cmd_update(args),
        Commands::Diff(args) => diff::cmd_diff(args),
        Commands::Validate(args) => sync::cmd_validate(args),
    };

    match result {
        Ok(()) => ExitCode::from(EXIT_SUCCESS),
        Err(CliError { code, message, hint }) => {
            if !message.is_empty() {
                if code == EXIT_VALIDATION {
                    eprintln!("validation error: {}", message);
                } else {
                    eprintln!("error: {}", message);
                }
            }
            if let Some(hint) = hint {
                eprintln!("hint:  {}", hint);
            }
            ExitCode::from(code)
        }
    }
}

#[derive(Debug)]
pub struct CliError {
    pub code: u8,
    pub message: String,
    pub hint: Option<String>,
}

impl CliError {
    pub fn args(msg: impl Into<String>) -> Self {
        Self { code: EXIT_USAGE, message: msg.into(), hint: None }
    }

    pub fn io(msg: impl Into<String>) -> Self {
        Self { code: EXIT_IO, message: msg.into(), hint: None }
    }

    /// Add a hint to an existing error.
    pub fn with_hint(mut self, hint: impl Into<String>) -> Self {
        self.hint = Some(hint.into());
        self
    }
}

impl From<ReconError> for CliError {
    fn from(err: ReconError) -> Self {
        let code = recon_exit_code(&err);
        let hint = match &err {
            ReconError::MissingColumn { .. } => {
                Some("column names are matched exactly; check the config against the CSV header")
            }
            ReconError::MergeAmbiguity { .. } => {
                Some("without --strict the first row per key is used and the rest are reported")
            }
            _ => None,
        };
        let message = match err {
            ReconError::ConfigParse(msg) | ReconError::ConfigValidation(msg) => format!("config: {msg}"),
            other => other.to_string(),
        };
        Self { code, message, hint: hint.map(String::from) }
    }
}
