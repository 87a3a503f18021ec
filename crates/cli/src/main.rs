// stocktake CLI - multi-round physical inventory reconciliation

mod exit_codes;
mod run;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use stocktake_io::IoError;
use stocktake_recon::ReconError;

use exit_codes::{io_exit_code, recon_exit_code, EXIT_CONFIG, EXIT_IO, EXIT_SUCCESS, EXIT_USAGE};
use run::RunOptions;

#[derive(Parser)]
#[command(name = "stocktake")]
#[command(about = "Reconcile physical stock counts against the system inventory")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// First pass: system file plus round 1 and round 2 counts
    #[command(after_help = "\
Examples:
  stocktake initial --system sistema.xlsx --round1 contagem1.csv --round2 contagem2.csv
  stocktake initial --system sistema.csv --round2 contagem2.csv --save
  stocktake initial --system sistema.csv --round1 c1.csv --round2 c2.csv --export out/
  stocktake initial --system sistema.csv --round2 c2.csv --json | jq .summary")]
    Initial {
        /// System inventory file (.csv, .xlsx, .xls, .ods)
        #[arg(long)]
        system: Option<PathBuf>,

        /// Round 1 count file
        #[arg(long)]
        round1: Option<PathBuf>,

        /// Round 2 count file
        #[arg(long)]
        round2: Option<PathBuf>,

        #[command(flatten)]
        options: RunOptions,
    },

    /// Recount round 3-6 over the items still pending in the store
    #[command(after_help = "\
Exit code 0 with no output file means nothing was pending.

Examples:
  stocktake audit --round 3 --counts contagem3.csv --save
  stocktake audit --round 4 --counts contagem4.xlsx --db inventario.db --export out/")]
    Audit {
        /// Audit round (3-6)
        #[arg(long)]
        round: u8,

        /// Count file for this round
        #[arg(long)]
        counts: Option<PathBuf>,

        #[command(flatten)]
        options: RunOptions,
    },
}

fn init_tracing() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn"));

    // stderr only; stdout is reserved for --json
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing();

    let result = match cli.command {
        Commands::Initial { system, round1, round2, options } => {
            run::cmd_initial(system, round1, round2, options)
        }
        Commands::Audit { round, counts, options } => run::cmd_audit(round, counts, options),
    };

    match result {
        Ok(()) => ExitCode::from(EXIT_SUCCESS),
        Err(CliError { code, message, hint }) => {
            if !message.is_empty() {
                eprintln!("error: {}", message);
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

    pub fn config(msg: impl Into<String>) -> Self {
        Self { code: EXIT_CONFIG, message: msg.into(), hint: None }
    }

    /// Engine error with its registry code and a hint for the common cases.
    pub fn recon(err: ReconError) -> Self {
        let hint = match &err {
            ReconError::MissingRequiredInput { mode: "initial", .. } => {
                Some("pass the system inventory with --system".to_string())
            }
            ReconError::MissingRequiredInput { .. } => {
                Some("pass this round's count file with --counts".to_string())
            }
            ReconError::InvalidRound(_) => Some("audit rounds run from 3 to 6".to_string()),
            _ => None,
        };
        Self { code: recon_exit_code(&err), message: err.to_string(), hint }
    }

    /// Adapter error (file read, export write, database).
    pub fn adapter(err: IoError) -> Self {
        Self { code: io_exit_code(&err), message: err.to_string(), hint: None }
    }

    /// Add a hint to an existing error.
    pub fn with_hint(mut self, hint: impl Into<String>) -> Self {
        self.hint = Some(hint.into());
        self
    }
}
