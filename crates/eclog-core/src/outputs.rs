use std::fmt;
use std::io::{Cursor, Write};
use std::path::{Path, PathBuf};

use chrono::DateTime;
use eclog_parser::schema::TIMESTAMP_FORMAT;
use polars::io::parquet::write::{ParquetCompression, ParquetWriter};
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use tempfile::NamedTempFile;
use tracing::{debug, info};

use crate::error::{PipelineError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    Csv,
    Parquet,
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OutputFormat::Csv => f.write_str("csv"),
            OutputFormat::Parquet => f.write_str("parquet"),
        }
    }
}

/// Location and content digest of a persisted dataset.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PersistedOutput {
    pub path: PathBuf,
    pub format: OutputFormat,
    pub bytes: usize,
    pub blake3: String,
}

/// Formats microseconds since the Unix epoch the way the dataset persists timestamps.
pub fn format_timestamp_micros(micros: i64) -> Option<String> {
    DateTime::from_timestamp_micros(micros)
        .map(|dt| dt.naive_utc().format(TIMESTAMP_FORMAT).to_string())
}

enum CellSource<'a> {
    Text(&'a StringChunked),
    Timestamp(&'a DatetimeChunked),
    Other(&'a Column),
}

impl CellSource<'_> {
    fn cell(&self, idx: usize) -> Result<String> {
        let value = match self {
            CellSource::Text(values) => values.get(idx).map(str::to_string),
            CellSource::Timestamp(values) => values.get(idx).and_then(format_timestamp_micros),
            CellSource::Other(column) => match column.get(idx)? {
                AnyValue::Null => None,
                AnyValue::String(text) => Some(text.to_string()),
                AnyValue::StringOwned(text) => Some(text.to_string()),
                other => Some(other.to_string()),
            },
        };
        Ok(value.unwrap_or_default())
    }
}

/// Serializes the table as delimited text with a header row. Null cells are empty fields and
/// microsecond datetimes use the persisted timestamp format.
pub fn render_csv(df: &DataFrame, delimiter: u8) -> Result<Vec<u8>> {
    let mut writer = csv::WriterBuilder::new()
        .delimiter(delimiter)
        .from_writer(Vec::new());

    writer.write_record(df.get_column_names().iter().map(|name| name.as_str()))?;

    let sources = df
        .get_columns()
        .iter()
        .map(|column| match column.dtype() {
            DataType::String => Ok(CellSource::Text(column.str()?)),
            DataType::Datetime(TimeUnit::Microseconds, _) => {
                Ok(CellSource::Timestamp(column.datetime()?))
            }
            _ => Ok(CellSource::Other(column)),
        })
        .collect::<Result<Vec<_>>>()?;

    let mut row = Vec::with_capacity(sources.len());
    for idx in 0..df.height() {
        row.clear();
        for source in &sources {
            row.push(source.cell(idx)?);
        }
        writer.write_record(&row)?;
    }

    writer
        .into_inner()
        .map_err(|err| PipelineError::Io(err.into_error()))
}

pub fn render_parquet(df: &DataFrame) -> Result<Vec<u8>> {
    let mut buffer = Vec::new();
    {
        let mut cursor = Cursor::new(&mut buffer);
        let mut clone = df.clone();
        ParquetWriter::new(&mut cursor)
            .with_compression(ParquetCompression::Zstd(None))
            .finish(&mut clone)?;
    }
    Ok(buffer)
}

/// Writes the dataset to a temporary file next to `path` and renames it into place, so a
/// failed run never leaves a partial file behind.
pub fn persist_output(
    df: &DataFrame,
    path: &Path,
    format: OutputFormat,
    delimiter: u8,
) -> Result<PersistedOutput> {
    let bytes = match format {
        OutputFormat::Csv => render_csv(df, delimiter)?,
        OutputFormat::Parquet => render_parquet(df)?,
    };

    let directory = path
        .parent()
        .filter(|parent| !parent.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));

    let persist_err = |source: std::io::Error| PipelineError::Persist {
        path: path.to_path_buf(),
        source,
    };

    let mut staged = NamedTempFile::new_in(directory).map_err(persist_err)?;
    staged.write_all(&bytes).map_err(persist_err)?;
    staged.as_file().sync_all().map_err(persist_err)?;
    debug!(staged = %staged.path().display(), "output staged");
    staged
        .persist(path)
        .map_err(|err| persist_err(err.error))?;

    let digest = blake3::hash(&bytes).to_hex().to_string();
    info!(
        path = %path.display(),
        format = %format,
        bytes = bytes.len(),
        blake3 = %digest,
        "dataset persisted"
    );

    Ok(PersistedOutput {
        path: path.to_path_buf(),
        format,
        bytes: bytes.len(),
        blake3: digest,
    })
}
