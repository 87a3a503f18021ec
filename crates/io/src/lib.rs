// Row sources, export writers and the SQLite store

pub mod csv;
pub mod error;
pub mod store;
pub mod xlsx;

use std::path::Path;

use stocktake_recon::export::ExportTable;
use stocktake_recon::RawRow;

pub use error::IoError;
pub use store::SqliteStore;

/// Spreadsheet formats a row source understands, chosen by extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SheetFormat {
    Csv,
    Excel,
}

impl SheetFormat {
    pub fn from_path(path: &Path) -> Result<Self, IoError> {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase())
            .unwrap_or_default();
        match ext.as_str() {
            "csv" | "tsv" | "txt" => Ok(Self::Csv),
            "xlsx" | "xlsm" | "xls" | "xlsb" | "ods" => Ok(Self::Excel),
            _ => Err(IoError::UnsupportedFormat(path.display().to_string())),
        }
    }
}

/// Read every data row of a spreadsheet file (first sheet for workbooks).
pub fn read_rows(path: &Path) -> Result<Vec<RawRow>, IoError> {
    let rows = match SheetFormat::from_path(path)? {
        SheetFormat::Csv => csv::read_rows(path)?,
        SheetFormat::Excel => xlsx::read_rows(path)?,
    };
    tracing::debug!(path = %path.display(), rows = rows.len(), "rows loaded");
    Ok(rows)
}

/// Write an export table; the extension picks CSV or XLSX.
pub fn write_table(table: &ExportTable, path: &Path) -> Result<(), IoError> {
    match SheetFormat::from_path(path)? {
        SheetFormat::Csv => csv::write_table(table, path),
        SheetFormat::Excel => xlsx::write_table(table, path),
    }
}
