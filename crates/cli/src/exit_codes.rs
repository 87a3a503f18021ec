//! CLI Exit Code Registry
//!
//! This is the single source of truth for all CLI exit codes.
//! Scripts that chain `stocktake initial` and `stocktake audit` rely on them.
//!
//! # Exit Code Ranges
//!
//! | Range   | Domain           | Description                              |
//! |---------|------------------|------------------------------------------|
//! | 0       | Universal        | Success, or nothing to do                |
//! | 1       | Universal        | General error (unspecified)              |
//! | 2       | Universal        | CLI usage error (bad args)               |
//! | 60-69   | stocktake        | Reconciliation run codes                 |
//!
//! # Adding New Exit Codes
//!
//! 1. Add the constant in the appropriate range
//! 2. Document what triggers it
//! 3. Update the table above
//! 4. Wire it into `exit_code_for` or the command's error handling

use stocktake_io::IoError;
use stocktake_recon::ReconError;

// =============================================================================
// Universal (0-2)
// =============================================================================

/// Success. Also returned when an audit finds no pending items.
pub const EXIT_SUCCESS: u8 = 0;

/// General error - unspecified failure.
/// Avoid using this; prefer a specific error code.
pub const EXIT_ERROR: u8 = 1;

/// Usage error - bad arguments, missing required options.
pub const EXIT_USAGE: u8 = 2;

// =============================================================================
// Stocktake (60-69)
// =============================================================================

/// System file (initial) or the round's count file (audit) not supplied.
pub const EXIT_MISSING_INPUT: u8 = 60;

/// Audit round outside 3..=6.
pub const EXIT_INVALID_ROUND: u8 = 61;

/// Store could not be opened, or rejected a select, upsert or insert.
pub const EXIT_PERSISTENCE: u8 = 62;

/// Config file unreadable, malformed or invalid.
pub const EXIT_CONFIG: u8 = 63;

/// Input file unreadable or export file unwritable.
pub const EXIT_IO: u8 = 64;

/// Map an engine error to its exit code.
pub fn recon_exit_code(err: &ReconError) -> u8 {
    match err {
        ReconError::MissingRequiredInput { .. } => EXIT_MISSING_INPUT,
        ReconError::InvalidRound(_) => EXIT_INVALID_ROUND,
        ReconError::Persistence { .. } => EXIT_PERSISTENCE,
        ReconError::ConfigParse(_) | ReconError::ConfigValidation(_) => EXIT_CONFIG,
        ReconError::EmptyPendingSet => EXIT_SUCCESS,
    }
}

/// Map an adapter error to its exit code.
pub fn io_exit_code(err: &IoError) -> u8 {
    match err {
        IoError::Database(_) => EXIT_PERSISTENCE,
        _ => EXIT_IO,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codes_are_distinct() {
        let codes = [
            EXIT_SUCCESS,
            EXIT_ERROR,
            EXIT_USAGE,
            EXIT_MISSING_INPUT,
            EXIT_INVALID_ROUND,
            EXIT_PERSISTENCE,
            EXIT_CONFIG,
            EXIT_IO,
        ];
        let mut sorted = codes.to_vec();
        sorted.sort();
        sorted.dedup();
        assert_eq!(sorted.len(), codes.len());
    }

    #[test]
    fn engine_errors_map_to_registry() {
        assert_eq!(recon_exit_code(&ReconError::InvalidRound(7)), EXIT_INVALID_ROUND);
        assert_eq!(recon_exit_code(&ReconError::EmptyPendingSet), EXIT_SUCCESS);
        assert_eq!(
            recon_exit_code(&ReconError::ConfigValidation("aliases.lot".into())),
            EXIT_CONFIG
        );
        assert_eq!(
            recon_exit_code(&ReconError::MissingRequiredInput { mode: "initial", input: "system file" }),
            EXIT_MISSING_INPUT
        );
    }
}
