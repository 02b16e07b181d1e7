use polars::prelude::DataFrame;
use serde::{Deserialize, Serialize};

use crate::schema;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogReaderOptions {
    pub delimiter: u8,
    /// Column holding raw tick counts; parsed to `Int64`, every other column stays `String`.
    pub timestamp_column: String,
}

impl Default for LogReaderOptions {
    fn default() -> Self {
        Self {
            delimiter: b',',
            timestamp_column: schema::TIMESTAMP.to_string(),
        }
    }
}

/// A raw log export loaded into memory, one row per request in file order.
#[derive(Debug, Clone)]
pub struct ParsedLogTable {
    pub df: DataFrame,
    /// Non-empty tick fields that were not a valid signed 64-bit integer.
    pub malformed_timestamps: usize,
    /// Rows whose field count differed from the header.
    pub ragged_rows: usize,
}

impl ParsedLogTable {
    pub fn row_count(&self) -> usize {
        self.df.height()
    }
}
