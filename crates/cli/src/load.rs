// Input discovery for `psync update` / `psync validate`.
// Paths in a config are relative to the config file's directory.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use pricesync_recon::table::read_csv_file;
use pricesync_recon::{ReconError, SyncConfig, SyncInput};
use tracing::debug;

pub fn read_config(path: &Path) -> Result<SyncConfig, ReconError> {
    let text = std::fs::read_to_string(path)
        .map_err(|e| ReconError::Io(format!("cannot read config {}: {e}", path.display())))?;
    SyncConfig::from_toml(&text)
}

/// Directory config-relative paths resolve against.
pub fn base_dir(config_path: &Path) -> &Path {
    match config_path.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => dir,
        _ => Path::new("."),
    }
}

/// `--catalog` wins over `[catalog] file`. `None` when neither is set.
pub fn catalog_path(config: &SyncConfig, config_path: &Path, flag: Option<&Path>) -> Option<PathBuf> {
    match flag {
        Some(path) => Some(path.to_path_buf()),
        None => config
            .catalog
            .file
            .as_ref()
            .map(|file| base_dir(config_path).join(file)),
    }
}

/// `--output`, then `[catalog] output`, then `<stem>_updated.csv` next to
/// the catalog.
pub fn output_path(
    config: &SyncConfig,
    config_path: &Path,
    catalog: &Path,
    flag: Option<&Path>,
) -> PathBuf {
    if let Some(path) = flag {
        return path.to_path_buf();
    }
    match config.catalog.output {
        Some(ref file) => base_dir(config_path).join(file),
        None => default_output_path(catalog),
    }
}

pub fn default_output_path(catalog: &Path) -> PathBuf {
    let stem = catalog
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "catalog".to_string());
    catalog.with_file_name(format!("{stem}_updated.csv"))
}

/// Read the catalog and every source named by the config.
pub fn load_input(config: &SyncConfig, config_path: &Path, catalog_file: &Path) -> Result<SyncInput, ReconError> {
    let base = base_dir(config_path);
    let catalog = read_csv_file("catalog", catalog_file)?;
    debug!(path = %catalog_file.display(), rows = catalog.len(), "catalog loaded");

    let mut sources = HashMap::with_capacity(config.sources.len());
    for source in &config.sources {
        let path = base.join(&source.file);
        let table = read_csv_file(&source.name, &path)?;
        debug!(source = %source.name, path = %path.display(), rows = table.len(), "source loaded");
        sources.insert(source.name.clone(), table);
    }

    Ok(SyncInput { catalog, sources })
}
