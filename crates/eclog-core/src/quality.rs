use polars::prelude::DataFrame;
use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MissingValueCount {
    pub column: String,
    pub missing: usize,
}

/// Null count per column, in table column order. Used for operator visibility only.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct MissingValueReport {
    pub row_count: usize,
    pub columns: Vec<MissingValueCount>,
}

impl MissingValueReport {
    pub fn get(&self, column: &str) -> Option<usize> {
        self.columns
            .iter()
            .find(|entry| entry.column == column)
            .map(|entry| entry.missing)
    }

    pub fn total_missing(&self) -> usize {
        self.columns.iter().map(|entry| entry.missing).sum()
    }

    pub fn incomplete_columns(&self) -> impl Iterator<Item = &MissingValueCount> {
        self.columns.iter().filter(|entry| entry.missing > 0)
    }
}

pub fn count_missing_values(df: &DataFrame) -> MissingValueReport {
    let columns = df
        .get_columns()
        .iter()
        .map(|column| MissingValueCount {
            column: column.name().to_string(),
            missing: column.null_count(),
        })
        .collect();

    MissingValueReport {
        row_count: df.height(),
        columns,
    }
}
