//! Series normalizer.
//!
//! Accepts a series id (fetched through a `SeriesSource`), a polars frame, or
//! a named column, and returns a canonical series plus a display name.

use crate::error::DataError;
use crate::series::{parse_date, Record, TimeSeries};
use chrono::{DateTime, NaiveDate};
use polars::prelude::*;

/// Anything that can produce a canonical series by id.
///
/// `Client` is the production implementation; tests use in-memory maps.
pub trait SeriesSource: Send + Sync {
    fn get(
        &self,
        series_id: &str,
        start: Option<NaiveDate>,
        end: Option<NaiveDate>,
    ) -> Result<TimeSeries, DataError>;
}

/// The three accepted input shapes.
#[derive(Debug, Clone)]
pub enum SeriesInput {
    /// Series identifier; triggers a fetch.
    Id(String),
    /// Table with a date column and a `value` column (or exactly one
    /// non-date column).
    Frame(DataFrame),
    /// A bare column of values on its own date axis. Whatever name it
    /// carried upstream is dropped; it is reported as `series`.
    Column(TimeSeries),
}

impl From<&str> for SeriesInput {
    fn from(id: &str) -> Self {
        Self::Id(id.to_string())
    }
}

impl From<String> for SeriesInput {
    fn from(id: String) -> Self {
        Self::Id(id)
    }
}

impl From<DataFrame> for SeriesInput {
    fn from(df: DataFrame) -> Self {
        Self::Frame(df)
    }
}

impl From<TimeSeries> for SeriesInput {
    fn from(series: TimeSeries) -> Self {
        Self::Column(series)
    }
}

pub const DEFAULT_DISPLAY_NAME: &str = "series";

/// Normalize any accepted input into a sorted, date-filtered canonical series.
pub fn normalize(
    source: &dyn SeriesSource,
    input: &SeriesInput,
    start: Option<NaiveDate>,
    end: Option<NaiveDate>,
) -> Result<(TimeSeries, String), DataError> {
    let (series, name) = match input {
        SeriesInput::Id(id) => (source.get(id, start, end)?, id.clone()),
        SeriesInput::Frame(df) => (frame_to_series(df)?, DEFAULT_DISPLAY_NAME.to_string()),
        SeriesInput::Column(series) => (series.clone(), DEFAULT_DISPLAY_NAME.to_string()),
    };
    Ok((series.filter_range(start, end), name))
}

/// Convert a frame into a canonical series.
///
/// The date axis is the column named `date`, else the first `Date` or
/// `Datetime` column. The value column is `value`, else the only other column.
pub fn frame_to_series(df: &DataFrame) -> Result<TimeSeries, DataError> {
    let date_col = find_date_column(df)?;
    let others: Vec<&Column> = df
        .get_columns()
        .iter()
        .filter(|c| c.name().as_str() != date_col.name().as_str())
        .collect();

    let value_col = match others.iter().find(|c| c.name().as_str() == "value") {
        Some(c) => *c,
        None if others.len() == 1 => others[0],
        None => return Err(DataError::MissingValueColumn),
    };

    let dates = column_dates(date_col)?;
    let values = column_values(value_col)?;
    let records = dates
        .into_iter()
        .zip(values)
        .filter_map(|(d, v)| d.map(|d| Record::new(d, v)))
        .collect();
    Ok(TimeSeries::from_records(records))
}

fn find_date_column(df: &DataFrame) -> Result<&Column, DataError> {
    if let Ok(col) = df.column("date") {
        return Ok(col);
    }
    df.get_columns()
        .iter()
        .find(|c| matches!(c.dtype(), DataType::Date | DataType::Datetime(_, _)))
        .ok_or_else(|| {
            DataError::InvalidInput(
                "frame needs a 'date' column or a Date/Datetime typed column".into(),
            )
        })
}

/// Coerce a date column (Date, Datetime, or string) to dates; nulls stay `None`.
fn column_dates(col: &Column) -> Result<Vec<Option<NaiveDate>>, DataError> {
    match col.dtype() {
        DataType::Date => {
            let epoch = NaiveDate::from_ymd_opt(1970, 1, 1)
                .ok_or_else(|| DataError::InvalidInput("epoch out of range".into()))?;
            let days = col.cast(&DataType::Int32)?;
            Ok(days
                .i32()?
                .iter()
                .map(|d| d.and_then(|d| epoch.checked_add_signed(chrono::Duration::days(d as i64))))
                .collect())
        }
        DataType::Datetime(unit, _) => {
            let unit = *unit;
            let raw = col.cast(&DataType::Int64)?;
            Ok(raw
                .i64()?
                .iter()
                .map(|t| t.and_then(|t| timestamp_to_date(t, unit)))
                .collect())
        }
        DataType::String => col
            .str()?
            .iter()
            .map(|s| s.map(parse_date).transpose())
            .collect(),
        other => Err(DataError::InvalidInput(format!(
            "date column '{}' has unsupported type {other}",
            col.name()
        ))),
    }
}

fn timestamp_to_date(t: i64, unit: TimeUnit) -> Option<NaiveDate> {
    let per_sec: i64 = match unit {
        TimeUnit::Milliseconds => 1_000,
        TimeUnit::Microseconds => 1_000_000,
        TimeUnit::Nanoseconds => 1_000_000_000,
    };
    let nanos = t.rem_euclid(per_sec) * (1_000_000_000 / per_sec);
    DateTime::from_timestamp(t.div_euclid(per_sec), nanos as u32).map(|dt| dt.date_naive())
}

fn column_values(col: &Column) -> Result<Vec<f64>, DataError> {
    if !is_numeric(col.dtype()) {
        return Err(DataError::InvalidInput(format!(
            "value column '{}' is not numeric ({})",
            col.name(),
            col.dtype()
        )));
    }
    let values = col.cast(&DataType::Float64)?;
    Ok(values
        .f64()?
        .iter()
        .map(|v| v.unwrap_or(f64::NAN))
        .collect())
}

fn is_numeric(dtype: &DataType) -> bool {
    matches!(
        dtype,
        DataType::Float32
            | DataType::Float64
            | DataType::Int8
            | DataType::Int16
            | DataType::Int32
            | DataType::Int64
            | DataType::UInt8
            | DataType::UInt16
            | DataType::UInt32
            | DataType::UInt64
            | DataType::Boolean
            | DataType::Null
    )
}
