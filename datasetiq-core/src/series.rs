//! Canonical series: a date-indexed, single-column numeric series.
//!
//! Values use `f64::NAN` for missing observations. Dates are strictly
//! increasing once a series has been built through `from_records`.

use crate::error::DataError;
use chrono::{DateTime, NaiveDate, NaiveDateTime};
use polars::prelude::*;
use serde::{Deserialize, Serialize};

/// One `(date, value)` observation as delivered by the service.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Record {
    pub date: NaiveDate,
    pub value: f64,
}

impl Record {
    pub fn new(date: NaiveDate, value: f64) -> Self {
        Self { date, value }
    }
}

/// Parse a date boundary or record date: `YYYY-MM-DD`, a naive
/// `YYYY-MM-DDTHH:MM:SS` timestamp, or RFC 3339.
pub fn parse_date(raw: &str) -> Result<NaiveDate, DataError> {
    let s = raw.trim();
    if let Ok(d) = NaiveDate::parse_from_str(s, "%Y-%m-%d") {
        return Ok(d);
    }
    if let Ok(dt) = NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S") {
        return Ok(dt.date());
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Ok(dt.date_naive());
    }
    Err(DataError::InvalidInput(format!("unparseable date '{raw}'")))
}

/// Canonical series.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TimeSeries {
    dates: Vec<NaiveDate>,
    values: Vec<f64>,
}

impl TimeSeries {
    pub fn empty() -> Self {
        Self::default()
    }

    /// Build from records in any order: sorts ascending (stable) and keeps the
    /// first record seen for a repeated date.
    pub fn from_records(mut records: Vec<Record>) -> Self {
        records.sort_by_key(|r| r.date);
        records.dedup_by_key(|r| r.date);
        let (dates, values) = records.into_iter().map(|r| (r.date, r.value)).unzip();
        Self { dates, values }
    }

    pub fn dates(&self) -> &[NaiveDate] {
        &self.dates
    }

    pub fn values(&self) -> &[f64] {
        &self.values
    }

    pub fn len(&self) -> usize {
        self.dates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.dates.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (NaiveDate, f64)> + '_ {
        self.dates.iter().copied().zip(self.values.iter().copied())
    }

    /// Last observation (its value may be missing).
    pub fn last(&self) -> Option<(NaiveDate, f64)> {
        Some((*self.dates.last()?, *self.values.last()?))
    }

    /// Keep observations with `start <= date <= end`; either bound may be open.
    pub fn filter_range(&self, start: Option<NaiveDate>, end: Option<NaiveDate>) -> Self {
        self.filter(|date, _| {
            start.map_or(true, |s| date >= s) && end.map_or(true, |e| date <= e)
        })
    }

    /// Drop observations whose value is missing.
    pub fn drop_missing(&self) -> Self {
        self.filter(|_, value| !value.is_nan())
    }

    fn filter(&self, keep: impl Fn(NaiveDate, f64) -> bool) -> Self {
        let (dates, values) = self.iter().filter(|&(d, v)| keep(d, v)).unzip();
        Self { dates, values }
    }

    /// Export as a two-column frame (`date`, `value`).
    pub fn to_dataframe(&self) -> Result<DataFrame, DataError> {
        let df = DataFrame::new(vec![
            Column::new("date".into(), self.dates.clone()),
            Column::new("value".into(), self.values.clone()),
        ])?;
        Ok(df)
    }
}
