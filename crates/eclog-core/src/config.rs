use std::fs;
use std::num::NonZeroUsize;
use std::path::Path;

use eclog_parser::{schema, LogReaderOptions};
use serde::{Deserialize, Serialize};

use crate::error::{PipelineError, Result};
use crate::outputs::OutputFormat;
use crate::referrer::DEFAULT_INTERNAL_DOMAIN;
use crate::timestamp_decoder::DEFAULT_PROGRESS_INTERVAL;

/// Maps a field delimiter to the byte the CSV reader and writer split on. Only ASCII
/// characters other than the quote and line terminators are accepted.
pub fn delimiter_byte(delimiter: char) -> Result<u8> {
    if delimiter.is_ascii() && !matches!(delimiter, '"' | '\n' | '\r') {
        return Ok(delimiter as u8);
    }
    Err(PipelineError::Config(format!(
        "delimiter {delimiter:?} must be a single ASCII character other than a quote or newline"
    )))
}

/// Input column names consumed by the enrichment stages.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ColumnNames {
    pub timestamp: String,
    pub ip_id: String,
    pub user_agent: String,
    pub uri: String,
    pub referrer: String,
    pub user_id: String,
}

impl Default for ColumnNames {
    fn default() -> Self {
        Self {
            timestamp: schema::TIMESTAMP.to_string(),
            ip_id: schema::IP_ID.to_string(),
            user_agent: schema::USER_AGENT.to_string(),
            uri: schema::URI.to_string(),
            referrer: schema::REFERRER.to_string(),
            user_id: schema::USER_ID.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct EnrichConfig {
    pub columns: ColumnNames,
    /// Rows between progress updates while decoding timestamps.
    pub progress_interval: usize,
    /// Referrers containing this domain are internal navigation.
    pub internal_domain: String,
    /// Drop the user identifier column before the dataset is persisted.
    pub redact_user_id: bool,
    pub delimiter: char,
    pub output_format: OutputFormat,
}

impl Default for EnrichConfig {
    fn default() -> Self {
        Self {
            columns: ColumnNames::default(),
            progress_interval: DEFAULT_PROGRESS_INTERVAL,
            internal_domain: DEFAULT_INTERNAL_DOMAIN.to_string(),
            redact_user_id: false,
            delimiter: ',',
            output_format: OutputFormat::Csv,
        }
    }
}

impl EnrichConfig {
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: Self = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let content = fs::read_to_string(path.as_ref())?;
        Self::from_toml_str(&content)
    }

    pub fn validate(&self) -> Result<()> {
        self.progress_stride()?;
        self.delimiter_byte()?;
        if self.internal_domain.trim().is_empty() {
            return Err(PipelineError::Config(
                "internal_domain must not be empty".to_string(),
            ));
        }
        Ok(())
    }

    pub fn progress_stride(&self) -> Result<NonZeroUsize> {
        NonZeroUsize::new(self.progress_interval).ok_or_else(|| {
            PipelineError::Config("progress_interval must be greater than zero".to_string())
        })
    }

    pub fn delimiter_byte(&self) -> Result<u8> {
        delimiter_byte(self.delimiter)
    }

    pub fn reader_options(&self) -> Result<LogReaderOptions> {
        Ok(LogReaderOptions {
            delimiter: self.delimiter_byte()?,
            timestamp_column: self.columns.timestamp.clone(),
        })
    }
}
