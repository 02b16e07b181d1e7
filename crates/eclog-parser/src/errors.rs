use std::path::PathBuf;

use polars::prelude::PolarsError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ParserError {
    #[error("failed to open log file {path}: {source}")]
    Open {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("log file has no header row")]
    MissingHeader,

    #[error("header column {index} invalid: {message}")]
    InvalidHeader { index: usize, message: String },

    #[error("CSV error at data row {line_index}: {source}")]
    Csv {
        line_index: usize,
        #[source]
        source: csv::Error,
    },

    #[error("failed to assemble log table: {0}")]
    Polars(#[from] PolarsError),
}
