//! `stocktake initial` and `stocktake audit`: load inputs, run the engine,
//! report, then optionally save to the store and export spreadsheets.

use std::path::{Path, PathBuf};

use clap::Args;
use stocktake_io::{read_rows, write_table, SqliteStore};
use stocktake_recon::classify::{FINAL_AUDIT_ROUND, FIRST_AUDIT_ROUND};
use stocktake_recon::export::{divergences_view, full_view, result_file_stem, transfers_view};
use stocktake_recon::persist::SaveReport;
use stocktake_recon::{
    load_pending, process_audit, process_initial, save_run, AuditInput, InitialInput, RawRow, ReconError,
    ReconRun, Status, StocktakeConfig,
};

use crate::CliError;

const DEFAULT_CONFIG: &str = "stocktake.toml";
const DEFAULT_DB: &str = "stocktake.db";

const DIVERGENCES_FILE: &str = "Relatorio_Divergencias.xlsx";
const TRANSFERS_FILE: &str = "Relatorio_Transferencias.xlsx";

/// Flags shared by both modes.
#[derive(Args, Debug, Clone, Default)]
pub struct RunOptions {
    /// Config file with column aliases and store path [default: ./stocktake.toml if present]
    #[arg(long, env = "STOCKTAKE_CONFIG")]
    pub config: Option<PathBuf>,

    /// SQLite database (overrides [store] path in the config)
    #[arg(long, env = "STOCKTAKE_DB")]
    pub db: Option<PathBuf>,

    /// Persist items and counts to the database
    #[arg(long)]
    pub save: bool,

    /// Write the result, divergence and transfer workbooks into this directory
    #[arg(long, value_name = "DIR")]
    pub export: Option<PathBuf>,

    /// Print the run as JSON to stdout instead of the item listing
    #[arg(long)]
    pub json: bool,
}

pub fn cmd_initial(
    system: Option<PathBuf>,
    round1: Option<PathBuf>,
    round2: Option<PathBuf>,
    options: RunOptions,
) -> Result<(), CliError> {
    let loaded = load_config(options.config.as_deref())?;

    let input = InitialInput {
        system: read_optional(system.as_deref())?,
        round1: read_optional(round1.as_deref())?,
        round2: read_optional(round2.as_deref())?,
    };

    let run = process_initial(&input, &loaded.config.aliases).map_err(CliError::recon)?;

    let saved = if options.save {
        let mut store = open_store(&options, &loaded)?;
        Some(save_run(&mut store, &run).map_err(CliError::recon)?)
    } else {
        None
    };

    report(&run, saved, &options)
}

pub fn cmd_audit(round: u8, counts: Option<PathBuf>, options: RunOptions) -> Result<(), CliError> {
    // Checked before the store is opened so a typo never creates a database file.
    if !(FIRST_AUDIT_ROUND..=FINAL_AUDIT_ROUND).contains(&round) {
        return Err(CliError::recon(ReconError::InvalidRound(round)));
    }

    let loaded = load_config(options.config.as_deref())?;
    let counts = read_optional(counts.as_deref())?;

    let mut store = open_store(&options, &loaded)?;
    let pending = load_pending(&store).map_err(CliError::recon)?;

    let input = AuditInput { round, pending, counts };
    let run = match process_audit(&input, &loaded.config.aliases) {
        Ok(run) => run,
        Err(e) if e.is_noop() => {
            eprintln!("nothing to audit: no pending items in the store");
            return Ok(());
        }
        Err(e) => return Err(CliError::recon(e)),
    };

    let saved = if options.save {
        Some(save_run(&mut store, &run).map_err(CliError::recon)?)
    } else {
        None
    };

    report(&run, saved, &options)
}

// ---------------------------------------------------------------------------
// Inputs
// ---------------------------------------------------------------------------

struct LoadedConfig {
    config: StocktakeConfig,
    /// Directory relative store paths resolve against.
    base_dir: PathBuf,
}

/// Explicit `--config` must exist; the implicit `./stocktake.toml` is optional.
fn load_config(path: Option<&Path>) -> Result<LoadedConfig, CliError> {
    let (path, explicit) = match path {
        Some(p) => (p.to_path_buf(), true),
        None => (PathBuf::from(DEFAULT_CONFIG), false),
    };

    if !explicit && !path.exists() {
        return Ok(LoadedConfig {
            config: StocktakeConfig::default(),
            base_dir: PathBuf::from("."),
        });
    }

    let text = std::fs::read_to_string(&path)
        .map_err(|e| CliError::config(format!("cannot read config {}: {e}", path.display())))?;
    let config = StocktakeConfig::from_toml(&text).map_err(CliError::recon)?;
    tracing::debug!(path = %path.display(), "config loaded");

    let base_dir = path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .map(Path::to_path_buf)
        .unwrap_or_else(|| PathBuf::from("."));
    Ok(LoadedConfig { config, base_dir })
}

fn read_optional(path: Option<&Path>) -> Result<Option<Vec<RawRow>>, CliError> {
    path.map(|p| read_rows(p).map_err(CliError::adapter)).transpose()
}

fn store_path(options: &RunOptions, loaded: &LoadedConfig) -> PathBuf {
    if let Some(db) = &options.db {
        return db.clone();
    }
    match &loaded.config.store.path {
        Some(p) if p.is_relative() => loaded.base_dir.join(p),
        Some(p) => p.clone(),
        None => PathBuf::from(DEFAULT_DB),
    }
}

fn open_store(options: &RunOptions, loaded: &LoadedConfig) -> Result<SqliteStore, CliError> {
    let path = store_path(options, loaded);
    SqliteStore::open(&path).map_err(|e| {
        CliError::adapter(e).with_hint(format!("check that {} is a writable SQLite file", path.display()))
    })
}

// ---------------------------------------------------------------------------
// Output
// ---------------------------------------------------------------------------

fn report(run: &ReconRun, saved: Option<SaveReport>, options: &RunOptions) -> Result<(), CliError> {
    if options.json {
        let json = serde_json::to_string_pretty(run)
            .map_err(|e| CliError::io(format!("JSON serialization error: {e}")))?;
        println!("{json}");
    } else {
        print_items(run);
    }

    print_summary(run);

    if let Some(saved) = saved {
        eprintln!(
            "saved: {} items, {} counts",
            saved.items_upserted, saved.counts_inserted
        );
    }

    if let Some(dir) = &options.export {
        for path in export_run(run, dir)? {
            eprintln!("wrote {}", path.display());
        }
    }

    Ok(())
}

fn print_items(run: &ReconRun) {
    println!(
        "{:<12} {:<16} {:<12} {:>10} {:>10}  {:<22} {}",
        "LOCAL", "GTIN", "LOTE", "CONTADO", "SISTEMA", "STATUS", "AÇÃO"
    );
    for item in &run.items {
        println!(
            "{:<12} {:<16} {:<12} {:>10} {:>10}  {:<22} {}",
            item.key.location,
            item.key.product,
            item.key.lot,
            item.deciding_qty(),
            item.system_qty,
            item.status.label(),
            item.action,
        );
    }
}

/// Human summary to stderr.
fn print_summary(run: &ReconRun) {
    let s = &run.summary;
    eprintln!(
        "{}: {} items, {} ok, {} divergences, {} transfers, {} rows excluded",
        run.meta.mode, s.total_items, s.ok_family, s.divergences, s.transfers, s.excluded_rows,
    );
    for status in Status::ALL {
        if let Some(n) = s.status_counts.get(status.label()).filter(|n| **n > 0) {
            eprintln!("  {:<22} {n}", status.label());
        }
    }
}

/// Write the three workbooks of a run. Returns the paths written.
fn export_run(run: &ReconRun, dir: &Path) -> Result<Vec<PathBuf>, CliError> {
    if dir.is_file() {
        return Err(CliError::args(format!("--export expects a directory, {} is a file", dir.display())));
    }
    std::fs::create_dir_all(dir)
        .map_err(|e| CliError::io(format!("cannot create {}: {e}", dir.display())))?;

    let files = [
        (dir.join(format!("{}.xlsx", result_file_stem(run.meta.mode))), full_view(run)),
        (dir.join(DIVERGENCES_FILE), divergences_view(run)),
        (dir.join(TRANSFERS_FILE), transfers_view(run)),
    ];

    let mut written = Vec::with_capacity(files.len());
    for (path, table) in files {
        write_table(&table, &path).map_err(CliError::adapter)?;
        written.push(path);
    }
    Ok(written)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn db_flag_beats_config_path() {
        let loaded = LoadedConfig {
            config: StocktakeConfig::from_toml("[store]\npath = \"inv.db\"\n").unwrap(),
            base_dir: PathBuf::from("/srv/stock"),
        };
        let mut options = RunOptions::default();
        assert_eq!(store_path(&options, &loaded), PathBuf::from("/srv/stock/inv.db"));

        options.db = Some(PathBuf::from("other.db"));
        assert_eq!(store_path(&options, &loaded), PathBuf::from("other.db"));
    }

    #[test]
    fn default_store_path_without_config() {
        let loaded = LoadedConfig {
            config: StocktakeConfig::default(),
            base_dir: PathBuf::from("."),
        };
        assert_eq!(store_path(&RunOptions::default(), &loaded), PathBuf::from(DEFAULT_DB));
    }

    #[test]
    fn explicit_config_must_exist() {
        let err = load_config(Some(Path::new("/nonexistent/stocktake.toml"))).err().unwrap();
        assert_eq!(err.code, crate::exit_codes::EXIT_CONFIG);
    }

    #[test]
    fn invalid_config_maps_to_config_code() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("stocktake.toml");
        std::fs::write(&path, "[aliases]\nlot = []\n").unwrap();
        let err = load_config(Some(&path)).err().unwrap();
        assert_eq!(err.code, crate::exit_codes::EXIT_CONFIG);
        assert!(err.message.contains("aliases.lot"));
    }
}
