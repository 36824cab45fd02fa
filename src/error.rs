use thiserror::Error;

// ---------------------------------------------------------------------------
// AnalysisError – every way a single pipeline run can fail
// ---------------------------------------------------------------------------

/// Errors raised while loading a table, deriving channels or summarising them.
///
/// Line numbers are 1-based physical lines of the input; field numbers are
/// 1-based positions within that line.
#[derive(Debug, Error)]
pub enum AnalysisError {
    #[error("line {line}: expected {expected} columns, found {actual}")]
    MalformedInput {
        line: usize,
        expected: usize,
        actual: usize,
    },

    #[error("line {line}, field {field}: '{value}' is not a finite number")]
    InvalidNumber {
        line: usize,
        field: usize,
        value: String,
    },

    #[error("input contains no data rows")]
    NoData,

    #[error("channel '{channel}': column {column} out of range (table has {columns} columns)")]
    InvalidColumnSpec {
        channel: String,
        column: usize,
        columns: usize,
    },

    #[error("channel '{0}' has no samples to summarise")]
    EmptyChannel(String),

    #[error("invalid channel definition '{0}': expected NAME=CAUSE:EFFECT[@ID] or NAME=:EFFECT[@ID]")]
    InvalidChannel(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Csv(#[from] csv::Error),

    #[error(transparent)]
    Arrow(#[from] arrow::error::ArrowError),

    #[error(transparent)]
    Parquet(#[from] parquet::errors::ParquetError),
}

pub type Result<T, E = AnalysisError> = std::result::Result<T, E>;
