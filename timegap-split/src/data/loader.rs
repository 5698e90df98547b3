//! Data loader for tabular inputs.
//!
//! Loads CSV or Parquet files into a polars `DataFrame` and extracts the
//! timestamp column the splitter works on. Supported timestamp columns:
//! - `Date` (days since the Unix epoch)
//! - `Datetime` in any time unit (time zones are dropped, values read as UTC)
//! - `String` in one of `TIMESTAMP_FORMATS`, a plain `%Y-%m-%d` date, or RFC 3339

use std::fs;
use std::io;
use std::path::Path;

use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime};
use polars::prelude::*;
use thiserror::Error;
use tracing::debug;

use super::types::TimeIndex;

/// Accepted string layouts for timestamp values.
pub const TIMESTAMP_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
];

#[derive(Error, Debug)]
pub enum LoaderError {
    #[error("File not found: {0}")]
    FileNotFound(String),

    #[error("Unsupported file format: {0}")]
    UnsupportedFormat(String),

    #[error("Column not found: {0}")]
    MissingColumn(String),

    #[error("Column {column} has type {dtype}, which is not an orderable timestamp")]
    UnsupportedType { column: String, dtype: String },

    #[error("Invalid timestamp in column {column} at row {row}: {value}")]
    InvalidTimestamp {
        column: String,
        row: usize,
        value: String,
    },

    #[error("Polars error: {0}")]
    Polars(#[from] PolarsError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Load a CSV or Parquet file into a `DataFrame`.
///
/// The format is chosen from the file extension. CSV date columns are
/// parsed into temporal types where polars recognizes them.
pub fn load_frame(path: &Path) -> Result<DataFrame, LoaderError> {
    match fs::metadata(path) {
        Ok(_) => {}
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            return Err(LoaderError::FileNotFound(path.display().to_string()));
        }
        Err(e) => return Err(e.into()),
    }

    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase());

    let lf = match ext.as_deref() {
        Some("csv") => LazyCsvReader::new(path)
            .with_has_header(true)
            .with_try_parse_dates(true)
            .finish()?,
        Some("parquet") => LazyFrame::scan_parquet(path, ScanArgsParquet::default())?,
        _ => {
            return Err(LoaderError::UnsupportedFormat(path.display().to_string()));
        }
    };

    let df = lf.collect()?;
    debug!("Loaded {} rows from {}", df.height(), path.display());
    Ok(df)
}

/// Extract the timestamp column `column` of `df` as a `TimeIndex`.
///
/// Fails on a missing column, a non-temporal dtype, nulls, or strings
/// that do not parse as timestamps.
pub fn time_index_from_frame(df: &DataFrame, column: &str) -> Result<TimeIndex, LoaderError> {
    let col = df
        .column(column)
        .map_err(|_| LoaderError::MissingColumn(column.to_string()))?;

    let timestamps: Vec<NaiveDateTime> = match col.dtype() {
        DataType::Date => {
            let days = col.cast(&DataType::Int32)?;
            days.i32()?
                .into_iter()
                .enumerate()
                .map(|(row, d)| {
                    let d = d.ok_or_else(|| null_at(column, row))?;
                    date_from_days(d)
                        .map(|date| date.and_time(NaiveTime::MIN))
                        .ok_or_else(|| invalid_at(column, row, d.to_string()))
                })
                .collect::<Result<_, _>>()?
        }
        DataType::Datetime(unit, _) => {
            let unit = *unit;
            let raw = col.cast(&DataType::Int64)?;
            raw.i64()?
                .into_iter()
                .enumerate()
                .map(|(row, v)| {
                    let v = v.ok_or_else(|| null_at(column, row))?;
                    datetime_from_raw(v, unit).ok_or_else(|| invalid_at(column, row, v.to_string()))
                })
                .collect::<Result<_, _>>()?
        }
        DataType::String => col
            .str()?
            .into_iter()
            .enumerate()
            .map(|(row, s)| {
                let s = s.ok_or_else(|| null_at(column, row))?;
                parse_timestamp(s).ok_or_else(|| invalid_at(column, row, s.to_string()))
            })
            .collect::<Result<_, _>>()?,
        other => {
            return Err(LoaderError::UnsupportedType {
                column: column.to_string(),
                dtype: other.to_string(),
            });
        }
    };

    Ok(TimeIndex::new(timestamps))
}

/// Parse a timestamp string.
pub fn parse_timestamp(s: &str) -> Option<NaiveDateTime> {
    let s = s.trim();
    if let Ok(date) = NaiveDate::parse_from_str(s, "%Y-%m-%d") {
        return Some(date.and_time(NaiveTime::MIN));
    }
    for fmt in TIMESTAMP_FORMATS {
        if let Ok(ts) = NaiveDateTime::parse_from_str(s, fmt) {
            return Some(ts);
        }
    }
    DateTime::parse_from_rfc3339(s).ok().map(|dt| dt.naive_utc())
}

/// Convert days since Unix epoch to NaiveDate.
fn date_from_days(days: i32) -> Option<NaiveDate> {
    NaiveDate::from_num_days_from_ce_opt(days.checked_add(719_163)?)
}

/// Convert a raw polars datetime value to a NaiveDateTime.
fn datetime_from_raw(value: i64, unit: TimeUnit) -> Option<NaiveDateTime> {
    let dt = match unit {
        TimeUnit::Nanoseconds => Some(DateTime::from_timestamp_nanos(value)),
        TimeUnit::Microseconds => DateTime::from_timestamp_micros(value),
        TimeUnit::Milliseconds => DateTime::from_timestamp_millis(value),
    };
    dt.map(|dt| dt.naive_utc())
}

fn null_at(column: &str, row: usize) -> LoaderError {
    invalid_at(column, row, "null".to_string())
}

fn invalid_at(column: &str, row: usize, value: String) -> LoaderError {
    LoaderError::InvalidTimestamp {
        column: column.to_string(),
        row,
        value,
    }
}
