use thiserror::Error;

#[derive(Debug, Error)]
pub enum IoError {
    #[error("{path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("unsupported file type: {0} (expected .csv, .xlsx, .xls or .ods)")]
    UnsupportedFormat(String),

    #[error("CSV error in {path}: {message}")]
    Csv { path: String, message: String },

    #[error("spreadsheet error in {path}: {message}")]
    Workbook { path: String, message: String },

    #[error("{path}: file has no header row")]
    NoHeader { path: String },

    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),
}
