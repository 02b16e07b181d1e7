//! Read-only exploration of an enriched dataset: date/hour/country filters and the
//! descriptive aggregates behind each chart.

use std::cmp::Reverse;
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use chrono::{DateTime, NaiveDate, NaiveDateTime, Timelike};
use eclog_parser::{read_log_file, schema, LogReaderOptions};
use once_cell::sync::OnceCell;
use polars::prelude::*;
use serde::Serialize;
use tracing::{debug, warn};

use crate::error::{PipelineError, Result};

pub const DEFAULT_COUNTRY_SELECTION: usize = 4;

/// Columns the exploration layer reads from the enriched dataset.
pub const EXPLORE_COLUMNS: [&str; 8] = [
    schema::TIMESTAMP,
    schema::HTTP_METHOD,
    schema::COUNTRY_CODE,
    schema::URI_TYPE,
    schema::REFERRER_TYPE,
    schema::DEVICE_TYPE,
    schema::BROWSER,
    schema::OS,
];

pub fn default_start_date() -> NaiveDate {
    NaiveDate::from_ymd_opt(2019, 12, 1).unwrap_or_default()
}

pub fn default_end_date() -> NaiveDate {
    NaiveDate::from_ymd_opt(2020, 5, 29).unwrap_or_default()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Chart {
    TrafficOverview,
    TimeBased,
    CountryAnalysis,
    ReferrerAndUri,
    DeviceBrowserOs,
}

impl Chart {
    pub const ALL: [Chart; 5] = [
        Chart::TrafficOverview,
        Chart::TimeBased,
        Chart::CountryAnalysis,
        Chart::ReferrerAndUri,
        Chart::DeviceBrowserOs,
    ];

    pub fn code(&self) -> &'static str {
        match self {
            Chart::TrafficOverview => "traffic-overview",
            Chart::TimeBased => "time-based",
            Chart::CountryAnalysis => "country-analysis",
            Chart::ReferrerAndUri => "referrer-uri",
            Chart::DeviceBrowserOs => "device-browser-os",
        }
    }

    pub fn title(&self) -> &'static str {
        match self {
            Chart::TrafficOverview => "Traffic Overview",
            Chart::TimeBased => "Time-Based Analysis",
            Chart::CountryAnalysis => "Country Analysis",
            Chart::ReferrerAndUri => "Referrer and URI Analysis",
            Chart::DeviceBrowserOs => "Device, Browser, and OS Analysis",
        }
    }
}

impl fmt::Display for Chart {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.title())
    }
}

impl FromStr for Chart {
    type Err = String;

    fn from_str(value: &str) -> std::result::Result<Self, Self::Err> {
        Chart::ALL
            .iter()
            .copied()
            .find(|chart| chart.code() == value || chart.title() == value)
            .ok_or_else(|| format!("unknown chart '{value}'"))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ExploreFilter {
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    /// Inclusive hour-of-day bounds, 0..=23.
    pub start_hour: u32,
    pub end_hour: u32,
    /// `None` selects the most frequent countries of the whole dataset.
    pub countries: Option<Vec<String>>,
    pub log_scale: bool,
}

impl Default for ExploreFilter {
    fn default() -> Self {
        Self {
            start_date: default_start_date(),
            end_date: default_end_date(),
            start_hour: 0,
            end_hour: 23,
            countries: None,
            log_scale: false,
        }
    }
}

impl ExploreFilter {
    pub fn validate(&self) -> Result<()> {
        if self.start_date > self.end_date {
            return Err(PipelineError::Config(format!(
                "start date {} is after end date {}",
                self.start_date, self.end_date
            )));
        }
        if self.end_hour > 23 || self.start_hour > self.end_hour {
            return Err(PipelineError::Config(format!(
                "hour range {}..={} must lie within 0..=23",
                self.start_hour, self.end_hour
            )));
        }
        Ok(())
    }

    fn accepts(&self, timestamp: NaiveDateTime) -> bool {
        let date = timestamp.date();
        let hour = timestamp.hour();
        date >= self.start_date
            && date <= self.end_date
            && hour >= self.start_hour
            && hour <= self.end_hour
    }
}

/// One bar of a chart. `value` is the raw count, or `ln(1 + count)` on a log scale.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChartBar {
    pub label: String,
    pub count: usize,
    pub value: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChartTable {
    pub title: String,
    pub x_label: &'static str,
    pub log_scale: bool,
    pub bars: Vec<ChartBar>,
}

impl ChartTable {
    fn from_counts(
        title: impl Into<String>,
        x_label: &'static str,
        counts: Vec<(String, usize)>,
        log_scale: bool,
    ) -> Self {
        let bars = counts
            .into_iter()
            .map(|(label, count)| ChartBar {
                value: scale(count, log_scale),
                label,
                count,
            })
            .collect();
        Self {
            title: title.into(),
            x_label,
            log_scale,
            bars,
        }
    }
}

fn scale(count: usize, log_scale: bool) -> f64 {
    if log_scale {
        (count as f64).ln_1p()
    } else {
        count as f64
    }
}

/// The enriched dataset with its `TimeStamp` column parsed back into datetimes.
#[derive(Debug, Clone)]
pub struct ExploreDataset {
    df: DataFrame,
    unparsed_timestamps: usize,
}

impl ExploreDataset {
    pub fn load(path: impl AsRef<Path>, delimiter: u8) -> Result<Self> {
        let options = LogReaderOptions {
            delimiter,
            // Keep every column textual; timestamps are parsed with the persisted format below.
            timestamp_column: String::new(),
        };
        let parsed = read_log_file(path, &options)?;
        Self::from_dataframe(parsed.df)
    }

    /// Accepts a table whose `TimeStamp` column is either persisted text or a datetime column.
    pub fn from_dataframe(mut df: DataFrame) -> Result<Self> {
        for name in EXPLORE_COLUMNS {
            if df.column(name).is_err() {
                return Err(PipelineError::MissingColumn(name.to_string()));
            }
        }

        let mut unparsed_timestamps = 0usize;
        if df.column(schema::TIMESTAMP)?.dtype() == &DataType::String {
            let micros: Vec<Option<i64>> = df
                .column(schema::TIMESTAMP)?
                .str()?
                .into_iter()
                .map(|value| {
                    let parsed = value.and_then(parse_persisted_timestamp);
                    if value.is_some() && parsed.is_none() {
                        unparsed_timestamps += 1;
                    }
                    parsed.map(|ts| ts.and_utc().timestamp_micros())
                })
                .collect();
            let series = Series::new(schema::TIMESTAMP.into(), micros)
                .cast(&DataType::Datetime(TimeUnit::Microseconds, None))?;
            df.with_column(series)?;
        }

        if unparsed_timestamps > 0 {
            warn!(unparsed_timestamps, "timestamps not in the persisted format were ignored");
        }
        debug!(rows = df.height(), "exploration dataset ready");

        Ok(Self {
            df,
            unparsed_timestamps,
        })
    }

    pub fn dataframe(&self) -> &DataFrame {
        &self.df
    }

    pub fn row_count(&self) -> usize {
        self.df.height()
    }

    pub fn unparsed_timestamps(&self) -> usize {
        self.unparsed_timestamps
    }

    /// Country codes by descending request count; ties are ordered by code. Rows without a
    /// country code are not counted.
    pub fn country_frequencies(&self) -> Result<Vec<(String, usize)>> {
        let mut counts = value_counts(&self.df, schema::COUNTRY_CODE)?;
        counts.retain(|(code, _)| !code.is_empty());
        Ok(counts)
    }

    pub fn default_countries(&self) -> Result<Vec<String>> {
        Ok(self
            .country_frequencies()?
            .into_iter()
            .take(DEFAULT_COUNTRY_SELECTION)
            .map(|(code, _)| code)
            .collect())
    }

    /// Returns the rows matching `filter` as a new view; the dataset itself is never modified.
    pub fn filter(&self, filter: &ExploreFilter) -> Result<FilteredView> {
        filter.validate()?;

        let countries = match filter.countries.as_ref().filter(|c| !c.is_empty()) {
            Some(countries) => countries.clone(),
            None => self.default_countries()?,
        };

        let timestamps = self.df.column(schema::TIMESTAMP)?.datetime()?;
        let codes = self.df.column(schema::COUNTRY_CODE)?.str()?;

        let mask: Vec<bool> = timestamps
            .physical()
            .into_iter()
            .zip(codes)
            .map(|(micros, code)| {
                let in_window = micros
                    .and_then(DateTime::from_timestamp_micros)
                    .is_some_and(|dt| filter.accepts(dt.naive_utc()));
                let in_countries = code.is_some_and(|code| countries.iter().any(|c| c == code));
                in_window && in_countries
            })
            .collect();

        let mask = BooleanChunked::from_slice("mask".into(), &mask);
        let df = self.df.filter(&mask)?;
        debug!(rows = df.height(), countries = ?countries, "filter applied");

        Ok(FilteredView {
            df,
            countries,
            log_scale: filter.log_scale,
        })
    }
}

#[derive(Debug, Clone)]
pub struct FilteredView {
    df: DataFrame,
    countries: Vec<String>,
    log_scale: bool,
}

impl FilteredView {
    pub fn dataframe(&self) -> &DataFrame {
        &self.df
    }

    pub fn row_count(&self) -> usize {
        self.df.height()
    }

    pub fn countries(&self) -> &[String] {
        &self.countries
    }

    pub fn value_counts(&self, column: &str) -> Result<Vec<(String, usize)>> {
        value_counts(&self.df, column)
    }

    /// Requests per calendar date, in date order.
    pub fn daily_counts(&self) -> Result<Vec<(NaiveDate, usize)>> {
        let mut counts: BTreeMap<NaiveDate, usize> = BTreeMap::new();
        let timestamps = self.df.column(schema::TIMESTAMP)?.datetime()?;
        for micros in timestamps.physical().into_iter().flatten() {
            if let Some(dt) = DateTime::from_timestamp_micros(micros) {
                *counts.entry(dt.date_naive()).or_insert(0) += 1;
            }
        }
        Ok(counts.into_iter().collect())
    }

    pub fn charts(&self, selection: &[Chart]) -> Result<Vec<ChartTable>> {
        let mut tables = Vec::new();
        for chart in Chart::ALL.iter().filter(|chart| selection.contains(chart)) {
            match chart {
                Chart::TrafficOverview => {
                    tables.push(self.count_chart(
                        "HTTP Method Distribution",
                        "HTTP Method",
                        schema::HTTP_METHOD,
                    )?);
                }
                Chart::TimeBased => {
                    let counts = self
                        .daily_counts()?
                        .into_iter()
                        .map(|(date, count)| (date.to_string(), count))
                        .collect();
                    tables.push(ChartTable::from_counts(
                        "Requests Over Time",
                        "Date",
                        counts,
                        self.log_scale,
                    ));
                }
                Chart::CountryAnalysis => {
                    tables.push(self.count_chart(
                        "Requests by Country",
                        "Country Code",
                        schema::COUNTRY_CODE,
                    )?);
                    for country in &self.countries {
                        tables.extend(self.country_breakdown(country)?);
                    }
                }
                Chart::ReferrerAndUri => {
                    tables.push(self.count_chart("URI Types", "URI Type", schema::URI_TYPE)?);
                    tables.push(self.count_chart(
                        "Referrer Types",
                        "Referrer Type",
                        schema::REFERRER_TYPE,
                    )?);
                }
                Chart::DeviceBrowserOs => {
                    tables.push(self.count_chart(
                        "Device Types",
                        "Device Type",
                        schema::DEVICE_TYPE,
                    )?);
                    tables.push(self.count_chart(
                        "Browser Distribution",
                        "Browser",
                        schema::BROWSER,
                    )?);
                    tables.push(self.count_chart(
                        "OS Distribution",
                        "Operating System",
                        schema::OS,
                    )?);
                }
            }
        }
        Ok(tables)
    }

    fn count_chart(
        &self,
        title: &str,
        x_label: &'static str,
        column: &str,
    ) -> Result<ChartTable> {
        Ok(ChartTable::from_counts(
            title,
            x_label,
            value_counts(&self.df, column)?,
            self.log_scale,
        ))
    }

    fn country_breakdown(&self, country: &str) -> Result<Vec<ChartTable>> {
        let codes = self.df.column(schema::COUNTRY_CODE)?.str()?;
        let mask: Vec<bool> = codes.into_iter().map(|code| code == Some(country)).collect();
        let subset = self
            .df
            .filter(&BooleanChunked::from_slice("mask".into(), &mask))?;

        let breakdown = [
            ("URI Types", "URI Type", schema::URI_TYPE),
            ("Referrer Types", "Referrer Type", schema::REFERRER_TYPE),
            ("Device Types", "Device Type", schema::DEVICE_TYPE),
            ("Browser Distribution", "Browser", schema::BROWSER),
            ("OS Distribution", "Operating System", schema::OS),
        ];

        breakdown
            .into_iter()
            .map(|(title, x_label, column)| {
                Ok(ChartTable::from_counts(
                    format!("{title} for {country}"),
                    x_label,
                    value_counts(&subset, column)?,
                    self.log_scale,
                ))
            })
            .collect()
    }
}

/// Load-once access to an exploration dataset shared by every query.
#[derive(Debug)]
pub struct DatasetProvider {
    path: PathBuf,
    delimiter: u8,
    dataset: OnceCell<ExploreDataset>,
}

impl DatasetProvider {
    pub fn new(path: impl Into<PathBuf>, delimiter: u8) -> Self {
        Self {
            path: path.into(),
            delimiter,
            dataset: OnceCell::new(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn is_loaded(&self) -> bool {
        self.dataset.get().is_some()
    }

    pub fn dataset(&self) -> Result<&ExploreDataset> {
        self.dataset
            .get_or_try_init(|| ExploreDataset::load(&self.path, self.delimiter))
    }
}

pub fn parse_persisted_timestamp(value: &str) -> Option<NaiveDateTime> {
    NaiveDateTime::parse_from_str(value, schema::TIMESTAMP_FORMAT).ok()
}

/// Non-null values of `column` by descending frequency; ties are ordered by value.
fn value_counts(df: &DataFrame, column: &str) -> Result<Vec<(String, usize)>> {
    let mut counts: HashMap<&str, usize> = HashMap::new();
    for value in df.column(column)?.str()?.into_iter().flatten() {
        *counts.entry(value).or_insert(0) += 1;
    }

    let mut ordered: Vec<(String, usize)> = counts
        .into_iter()
        .map(|(value, count)| (value.to_string(), count))
        .collect();
    ordered.sort_by(|a, b| (Reverse(a.1), &a.0).cmp(&(Reverse(b.1), &b.0)));
    Ok(ordered)
}
