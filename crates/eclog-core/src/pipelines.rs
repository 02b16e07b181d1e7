use std::path::Path;

use eclog_parser::{read_log_file, schema};
use once_cell::sync::Lazy;
use polars::prelude::DataFrame;
use tracing::{info, warn};

use crate::config::EnrichConfig;
use crate::country::extract_country_codes;
use crate::error::{PipelineError, Result};
use crate::outputs::{persist_output, PersistedOutput};
use crate::quality::{count_missing_values, MissingValueReport};
use crate::referrer::ReferrerClassifier;
use crate::timestamp_decoder::{ProgressObserver, TimestampDecoder};
use crate::uri::UriClassifier;
use crate::user_agent::UserAgentClassifier;

#[derive(Debug, Clone)]
pub struct StageDescriptor {
    pub code: &'static str,
    pub description: &'static str,
    pub output_columns: &'static [&'static str],
}

static STAGES: Lazy<Vec<StageDescriptor>> = Lazy::new(|| {
    vec![
        StageDescriptor {
            code: TimestampDecoder::STAGE,
            description: "Decode 100 ns tick counts into calendar timestamps",
            output_columns: &[schema::TIMESTAMP],
        },
        StageDescriptor {
            code: "country_code",
            description: "Extract the country suffix of the anonymized IP identifier",
            output_columns: &[schema::COUNTRY_CODE],
        },
        StageDescriptor {
            code: "user_agent",
            description: "Classify user agents into browser, OS and device type",
            output_columns: &[schema::BROWSER, schema::OS, schema::DEVICE_TYPE],
        },
        StageDescriptor {
            code: "uri_type",
            description: "Classify request paths into content types",
            output_columns: &[schema::URI_TYPE],
        },
        StageDescriptor {
            code: "referrer_type",
            description: "Classify referrers into traffic sources",
            output_columns: &[schema::REFERRER_TYPE],
        },
        StageDescriptor {
            code: "redact_user_id",
            description: "Drop the user identifier column when redaction is requested",
            output_columns: &[],
        },
        StageDescriptor {
            code: "missing_values",
            description: "Count missing values per column",
            output_columns: &[],
        },
    ]
});

/// Enrichment stages in execution order.
pub fn all_stage_descriptors() -> &'static [StageDescriptor] {
    STAGES.as_slice()
}

#[derive(Debug, Clone)]
pub struct EnrichmentOutput {
    pub dataframe: DataFrame,
    pub missing_values: MissingValueReport,
    /// Tick values present in the input that could not be mapped to a calendar date.
    pub failed_timestamps: usize,
    pub user_id_redacted: bool,
}

#[derive(Debug, Clone)]
pub struct EnrichmentRun {
    pub output: EnrichmentOutput,
    pub persisted: PersistedOutput,
    pub malformed_timestamps: usize,
}

/// Runs the enrichment stages over one table, in a fixed order.
#[derive(Debug, Clone)]
pub struct Orchestrator {
    config: EnrichConfig,
    timestamps: TimestampDecoder,
    user_agents: UserAgentClassifier,
    uris: UriClassifier,
    referrers: ReferrerClassifier,
}

impl Orchestrator {
    pub fn new(config: EnrichConfig) -> Result<Self> {
        config.validate()?;
        let timestamps = TimestampDecoder::new(config.progress_stride()?);
        let referrers = ReferrerClassifier::new(&config.internal_domain);
        Ok(Self {
            config,
            timestamps,
            user_agents: UserAgentClassifier::default(),
            uris: UriClassifier::default(),
            referrers,
        })
    }

    pub fn config(&self) -> &EnrichConfig {
        &self.config
    }

    /// Columns that must be present before any stage runs.
    pub fn required_columns(&self) -> Vec<&str> {
        let columns = &self.config.columns;
        let mut required = vec![
            columns.timestamp.as_str(),
            columns.ip_id.as_str(),
            columns.user_agent.as_str(),
            columns.uri.as_str(),
            columns.referrer.as_str(),
        ];
        if self.config.redact_user_id {
            required.push(columns.user_id.as_str());
        }
        required
    }

    pub fn validate_schema(&self, df: &DataFrame) -> Result<()> {
        for name in self.required_columns() {
            if df.column(name).is_err() {
                return Err(PipelineError::MissingColumn(name.to_string()));
            }
        }
        Ok(())
    }

    pub fn run(
        &self,
        mut df: DataFrame,
        observer: &mut dyn ProgressObserver,
    ) -> Result<EnrichmentOutput> {
        self.validate_schema(&df)?;
        let columns = &self.config.columns;
        let rows = df.height();

        info!(step = 2, rows, "decoding timestamps");
        let failed_timestamps = self
            .timestamps
            .apply(&mut df, &columns.timestamp, observer)?;
        if failed_timestamps > 0 {
            warn!(failed_timestamps, "tick values outside the calendar range were left empty");
        }

        info!(step = 3, "extracting country codes");
        extract_country_codes(&mut df, &columns.ip_id)?;

        info!(step = 4, "classifying user agents");
        self.user_agents.apply(&mut df, &columns.user_agent)?;

        info!(step = 5, "classifying request paths");
        self.uris.apply(&mut df, &columns.uri)?;

        info!(step = 6, "classifying referrers");
        self.referrers.apply(&mut df, &columns.referrer)?;

        let user_id_redacted = if self.config.redact_user_id {
            info!(column = %columns.user_id, "removing user id column");
            df = df.drop(&columns.user_id)?;
            true
        } else {
            info!(column = %columns.user_id, "user id column retained");
            false
        };

        info!(step = 7, "counting missing values");
        let missing_values = count_missing_values(&df);

        debug_assert_eq!(df.height(), rows);

        Ok(EnrichmentOutput {
            dataframe: df,
            missing_values,
            failed_timestamps,
            user_id_redacted,
        })
    }

    /// Loads `input`, enriches it and persists the result to `output`. Nothing is written
    /// unless every stage succeeded.
    pub fn run_file(
        &self,
        input: &Path,
        output: &Path,
        observer: &mut dyn ProgressObserver,
    ) -> Result<EnrichmentRun> {
        info!(step = 1, input = %input.display(), "loading access log");
        let parsed = read_log_file(input, &self.config.reader_options()?)?;
        let malformed_timestamps = parsed.malformed_timestamps;

        let enriched = self.run(parsed.df, observer)?;

        let persisted = persist_output(
            &enriched.dataframe,
            output,
            self.config.output_format,
            self.config.delimiter_byte()?,
        )?;

        Ok(EnrichmentRun {
            output: enriched,
            persisted,
            malformed_timestamps,
        })
    }
}
