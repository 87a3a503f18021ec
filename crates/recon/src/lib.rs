//! `stocktake-recon`: physical inventory reconciliation engine.
//!
//! Pure engine crate: receives pre-loaded spreadsheet rows and pending items,
//! returns classified results. No file or database dependencies.

pub mod aggregate;
pub mod classify;
pub mod config;
pub mod engine;
pub mod error;
pub mod evidence;
pub mod export;
pub mod model;
pub mod normalize;
pub mod persist;

pub use config::StocktakeConfig;
pub use engine::{process_audit, process_initial};
pub use error::{PersistStage, ReconError, StoreError};
pub use model::{AuditInput, InitialInput, InventoryItem, PendingItem, RawRow, ReconRun, RunMode, Status};
pub use normalize::FieldAliases;
pub use persist::{build_payload, load_pending, save_run, InventoryStore};
