//! `psync update` / `psync validate`: config-driven catalog updates.

use std::path::{Path, PathBuf};

use clap::Args;
use pricesync_cli::format::{summary_text, warning_lines};
use pricesync_cli::load::{catalog_path, load_input, output_path, read_config};
use pricesync_recon::table::write_csv;
use pricesync_recon::{DuplicatePolicy, SyncConfig};

use crate::exit_codes::EXIT_ERROR;
use crate::CliError;

#[derive(Args)]
pub struct UpdateArgs {
    /// Path to the .sync.toml config file
    pub config: PathBuf,

    /// Catalog CSV (overrides [catalog] file)
    #[arg(long)]
    pub catalog: Option<PathBuf>,

    /// Where to write the updated catalog (default: <catalog>_updated.csv)
    #[arg(long, short = 'o')]
    pub output: Option<PathBuf>,

    /// Write the JSON change report to a file
    #[arg(long)]
    pub report: Option<PathBuf>,

    /// Print the JSON change report to stdout instead of the summary
    #[arg(long)]
    pub json: bool,

    /// Run and report without writing the updated catalog
    #[arg(long)]
    pub dry_run: bool,

    /// Fail on duplicate source keys instead of keeping the first row
    #[arg(long)]
    pub strict: bool,

    /// Match and apply rules on all cores
    #[arg(long)]
    pub parallel: bool,

    /// Suppress warnings and notes on stderr
    #[arg(long, short = 'q')]
    pub quiet: bool,
}

#[derive(Args)]
pub struct ValidateArgs {
    /// Path to the .sync.toml config file
    pub config: PathBuf,

    /// Catalog CSV whose header to check (overrides [catalog] file)
    #[arg(long)]
    pub catalog: Option<PathBuf>,
}

fn require_catalog(config: &SyncConfig, config_path: &Path, flag: Option<&Path>) -> Result<PathBuf, CliError> {
    catalog_path(config, config_path, flag).ok_or_else(|| {
        CliError::args("no catalog file given")
            .with_hint("set `file` under [catalog] in the config, or pass --catalog")
    })
}

pub fn cmd_update(args: UpdateArgs) -> Result<(), CliError> {
    let mut config = read_config(&args.config)?;
    if args.strict {
        for source in &mut config.sources {
            source.on_duplicate = DuplicatePolicy::Strict;
        }
    }
    if args.parallel {
        config.parallel = true;
    }

    let catalog = require_catalog(&config, &args.config, args.catalog.as_deref())?;
    let input = load_input(&config, &args.config, &catalog)?;
    let result = pricesync_recon::run(&config, &input)?;

    if !args.quiet {
        for line in warning_lines(&result.warnings) {
            eprintln!("{line}");
        }
    }

    let out = output_path(&config, &args.config, &catalog, args.output.as_deref());
    if args.dry_run {
        if !args.quiet {
            eprintln!("dry run: {} not written", out.display());
        }
    } else {
        let bytes = write_csv(&result.headers, &result.catalog)?;
        std::fs::write(&out, bytes)
            .map_err(|e| CliError::io(format!("cannot write {}: {e}", out.display())))?;
        if !args.quiet {
            eprintln!("wrote {}", out.display());
        }
    }

    if args.json || args.report.is_some() {
        let json_str = serde_json::to_string_pretty(&result).map_err(|e| CliError {
            code: EXIT_ERROR,
            message: format!("JSON serialization error: {e}"),
            hint: None,
        })?;

        if let Some(ref path) = args.report {
            std::fs::write(path, &json_str)
                .map_err(|e| CliError::io(format!("cannot write {}: {e}", path.display())))?;
            if !args.quiet {
                eprintln!("wrote {}", path.display());
            }
        }
        if args.json {
            println!("{json_str}");
            return Ok(());
        }
    }

    print!("{}", summary_text(&result.summary));
    Ok(())
}

pub fn cmd_validate(args: ValidateArgs) -> Result<(), CliError> {
    let config = read_config(&args.config)?;
    let rules: usize = config.sources.iter().map(|s| s.rules.len()).sum();

    let Some(catalog) = catalog_path(&config, &args.config, args.catalog.as_deref()) else {
        eprintln!(
            "valid: '{}' with {} source(s), {} rule(s); no catalog given, headers not checked",
            config.name,
            config.sources.len(),
            rules,
        );
        return Ok(());
    };

    let input = load_input(&config, &args.config, &catalog)?;
    pricesync_recon::validate_input(&config, &input)?;

    eprintln!(
        "valid: '{}' with {} source(s), {} rule(s); all headers present",
        config.name,
        config.sources.len(),
        rules,
    );
    Ok(())
}
