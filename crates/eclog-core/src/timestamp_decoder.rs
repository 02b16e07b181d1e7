use std::num::NonZeroUsize;

use chrono::{DateTime, NaiveDateTime};
use polars::prelude::*;
use tracing::info;

use crate::error::Result;

pub const TICKS_PER_SECOND: i64 = 10_000_000;
pub const SECONDS_PER_DAY: i64 = 24 * 60 * 60;
pub const TICKS_PER_DAY: i64 = TICKS_PER_SECOND * SECONDS_PER_DAY;
pub const DEFAULT_PROGRESS_INTERVAL: usize = 100_000;

const TICKS_PER_MICRO: i64 = 10;
const MICROS_PER_SECOND: i64 = 1_000_000;
/// 0001-01-01T00:00:00 relative to the Unix epoch.
const TICK_EPOCH_UNIX_SECONDS: i64 = -62_135_596_800;
/// 9999-12-31T23:59:59.999999 relative to the Unix epoch.
const MAX_UNIX_MICROS: i64 = 253_402_300_799 * MICROS_PER_SECOND + 999_999;

/// Converts a tick count (100 ns units since 0001-01-01) to microseconds since the Unix epoch.
///
/// Negative ticks and ticks past the end of year 9999 have no calendar representation and
/// yield `None`. Sub-microsecond remainders are truncated.
pub fn ticks_to_unix_micros(ticks: i64) -> Option<i64> {
    if ticks < 0 {
        return None;
    }
    let micros = ticks / TICKS_PER_MICRO + TICK_EPOCH_UNIX_SECONDS * MICROS_PER_SECOND;
    (micros <= MAX_UNIX_MICROS).then_some(micros)
}

pub fn decode_ticks(ticks: i64) -> Option<NaiveDateTime> {
    ticks_to_unix_micros(ticks)
        .and_then(DateTime::from_timestamp_micros)
        .map(|dt| dt.naive_utc())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Progress {
    /// 1-based index of the batch that is about to be processed.
    pub batch: usize,
    pub total_batches: usize,
    pub rows_processed: usize,
    pub total_rows: usize,
}

/// Receives status updates from long-running stages. Observers never influence results.
pub trait ProgressObserver {
    fn on_progress(&mut self, stage: &'static str, progress: Progress);
}

#[derive(Debug, Default, Clone, Copy)]
pub struct NoopProgress;

impl ProgressObserver for NoopProgress {
    fn on_progress(&mut self, _stage: &'static str, _progress: Progress) {}
}

#[derive(Debug, Default, Clone, Copy)]
pub struct TracingProgress;

impl ProgressObserver for TracingProgress {
    fn on_progress(&mut self, stage: &'static str, progress: Progress) {
        info!(
            stage,
            rows_processed = progress.rows_processed,
            total_rows = progress.total_rows,
            "progress {}/{}",
            progress.batch,
            progress.total_batches
        );
    }
}

#[derive(Debug, Clone)]
pub struct DecodedTimestamps {
    pub series: Series,
    /// Rows with a tick value that fell outside the representable calendar range.
    pub failed: usize,
}

#[derive(Debug, Clone, Copy)]
pub struct TimestampDecoder {
    progress_interval: NonZeroUsize,
}

impl Default for TimestampDecoder {
    fn default() -> Self {
        Self {
            progress_interval: NonZeroUsize::new(DEFAULT_PROGRESS_INTERVAL)
                .unwrap_or(NonZeroUsize::MIN),
        }
    }
}

impl TimestampDecoder {
    pub const STAGE: &'static str = "timestamp_decode";

    pub fn new(progress_interval: NonZeroUsize) -> Self {
        Self { progress_interval }
    }

    /// Decodes a tick column into a `Datetime(Microseconds)` series of the same length and name.
    pub fn decode_column(
        &self,
        ticks: &Int64Chunked,
        observer: &mut dyn ProgressObserver,
    ) -> Result<DecodedTimestamps> {
        let total_rows = ticks.len();
        let interval = self.progress_interval.get();
        let total_batches = total_rows / interval + 1;

        let mut micros: Vec<Option<i64>> = Vec::with_capacity(total_rows);
        let mut failed = 0usize;

        for (idx, value) in ticks.into_iter().enumerate() {
            if idx % interval == 0 {
                observer.on_progress(
                    Self::STAGE,
                    Progress {
                        batch: idx / interval + 1,
                        total_batches,
                        rows_processed: idx,
                        total_rows,
                    },
                );
            }

            let decoded = value.and_then(ticks_to_unix_micros);
            if value.is_some() && decoded.is_none() {
                failed += 1;
            }
            micros.push(decoded);
        }

        let series = Series::new(ticks.name().clone(), micros)
            .cast(&DataType::Datetime(TimeUnit::Microseconds, None))?;

        Ok(DecodedTimestamps { series, failed })
    }

    /// Replaces `column` in place with its decoded datetimes and returns the failure count.
    pub fn apply(
        &self,
        df: &mut DataFrame,
        column: &str,
        observer: &mut dyn ProgressObserver,
    ) -> Result<usize> {
        let ticks = df
            .column(column)?
            .as_materialized_series()
            .cast(&DataType::Int64)?;
        let decoded = self.decode_column(ticks.i64()?, observer)?;
        df.with_column(decoded.series)?;
        Ok(decoded.failed)
    }
}
