use std::collections::HashSet;
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

use csv::ReaderBuilder;
use polars::prelude::*;
use tracing::{debug, warn};

use crate::errors::ParserError;
use crate::model::{LogReaderOptions, ParsedLogTable};

enum ColumnBuffer {
    Text(Vec<Option<String>>),
    Ticks(Vec<Option<i64>>),
}

impl ColumnBuffer {
    fn into_column(self, name: &str) -> Column {
        match self {
            ColumnBuffer::Text(values) => Series::new(name.into(), values).into(),
            ColumnBuffer::Ticks(values) => Series::new(name.into(), values).into(),
        }
    }
}

pub fn read_log_file(
    path: impl AsRef<Path>,
    options: &LogReaderOptions,
) -> Result<ParsedLogTable, ParserError> {
    let path = path.as_ref();
    let file = File::open(path).map_err(|source| ParserError::Open {
        path: path.to_path_buf(),
        source,
    })?;
    debug!(path = %path.display(), "reading access log");
    read_log_table(BufReader::new(file), options)
}

/// Loads a delimited access-log export. Empty fields become nulls, the configured timestamp
/// column is parsed to tick integers, and rows are never dropped: short rows are padded with
/// nulls and surplus fields are ignored.
pub fn read_log_table<R: Read>(
    reader: R,
    options: &LogReaderOptions,
) -> Result<ParsedLogTable, ParserError> {
    let mut csv_reader = ReaderBuilder::new()
        .delimiter(options.delimiter)
        .has_headers(true)
        .flexible(true)
        .from_reader(reader);

    let header_record = csv_reader
        .byte_headers()
        .map_err(|source| ParserError::Csv {
            line_index: 0,
            source,
        })?
        .clone();
    if header_record.is_empty() {
        return Err(ParserError::MissingHeader);
    }

    let headers = parse_headers(&header_record)?;
    let width = headers.len();

    let mut buffers: Vec<ColumnBuffer> = headers
        .iter()
        .map(|name| {
            if *name == options.timestamp_column {
                ColumnBuffer::Ticks(Vec::new())
            } else {
                ColumnBuffer::Text(Vec::new())
            }
        })
        .collect();

    let mut malformed_timestamps = 0usize;
    let mut ragged_rows = 0usize;

    for (line_index, result) in csv_reader.byte_records().enumerate() {
        let record = result.map_err(|source| ParserError::Csv { line_index, source })?;
        if record.len() != width {
            ragged_rows += 1;
        }

        for (idx, buffer) in buffers.iter_mut().enumerate() {
            let field = record
                .get(idx)
                .filter(|bytes| !bytes.is_empty())
                .map(|bytes| String::from_utf8_lossy(bytes));

            match buffer {
                ColumnBuffer::Text(values) => values.push(field.map(|text| text.into_owned())),
                ColumnBuffer::Ticks(values) => {
                    let ticks = field.as_deref().and_then(parse_ticks);
                    if field.is_some() && ticks.is_none() {
                        malformed_timestamps += 1;
                    }
                    values.push(ticks);
                }
            }
        }
    }

    if ragged_rows > 0 {
        warn!(ragged_rows, "rows with a field count different from the header");
    }
    if malformed_timestamps > 0 {
        warn!(
            malformed_timestamps,
            column = %options.timestamp_column,
            "tick values that are not 64-bit integers were loaded as nulls"
        );
    }

    let columns: Vec<Column> = buffers
        .into_iter()
        .zip(headers.iter())
        .map(|(buffer, name)| buffer.into_column(name))
        .collect();
    let df = DataFrame::new(columns)?;

    debug!(rows = df.height(), columns = df.width(), "access log loaded");

    Ok(ParsedLogTable {
        df,
        malformed_timestamps,
        ragged_rows,
    })
}

fn parse_headers(record: &csv::ByteRecord) -> Result<Vec<String>, ParserError> {
    let mut seen = HashSet::new();
    let mut headers = Vec::with_capacity(record.len());

    for (index, raw) in record.iter().enumerate() {
        let mut name = String::from_utf8_lossy(raw).into_owned();
        if index == 0 {
            name = name.trim_start_matches('\u{feff}').to_string();
        }
        if name.trim().is_empty() {
            return Err(ParserError::InvalidHeader {
                index,
                message: "empty column name".to_string(),
            });
        }
        if !seen.insert(name.clone()) {
            return Err(ParserError::InvalidHeader {
                index,
                message: format!("duplicate column name '{name}'"),
            });
        }
        headers.push(name);
    }

    Ok(headers)
}

pub(crate) fn parse_ticks(field: &str) -> Option<i64> {
    field.trim().parse::<i64>().ok()
}
