use thiserror::Error;

/// Root error type for the look-through pipeline.
///
/// Validation and parse failures abort the stage that raised them; everything
/// recoverable (missing prices, missing fund files, sink failures) is carried
/// as data instead, see [`crate::lookthrough::LookupMiss`].
#[derive(Error, Debug)]
pub enum Error {
    #[error("input validation failed: {0}")]
    Validation(#[from] ValidationError),

    #[error("parse failed: {0}")]
    Parse(#[from] ParseError),

    #[error("I/O error on {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to read {path}: {source}")]
    Csv {
        path: String,
        #[source]
        source: csv::Error,
    },
}

pub type Result<T> = std::result::Result<T, Error>;

/// Malformed or incomplete input tables. Fatal: continuing would produce a
/// misleading report.
#[derive(Error, Debug, PartialEq, Eq)]
pub enum ValidationError {
    #[error("table '{table}' is missing required column '{column}'")]
    MissingColumn {
        table: &'static str,
        column: &'static str,
    },

    #[error("table '{table}' is empty")]
    EmptyTable { table: &'static str },

    #[error("unknown category '{value}' in {table} row {row}")]
    UnknownCategory {
        table: &'static str,
        row: usize,
        value: String,
    },
}

/// A field that should be numeric is not, even after locale normalization.
/// Fatal at the row level; names the offending row so the source file can be
/// corrected.
#[derive(Error, Debug, PartialEq)]
pub enum ParseError {
    #[error("fund '{fund}' row {row}: weight '{value}' is not numeric")]
    Weight {
        fund: String,
        row: usize,
        value: String,
    },

    #[error("portfolio row {row} ('{label}'): quantity '{value}' is not numeric")]
    Quantity {
        row: usize,
        label: String,
        value: String,
    },
}
