//! Multi-column table on a shared date axis.
//!
//! Every column has exactly `dates.len()` values; `f64::NAN` marks a missing
//! cell. Column order is insertion order.

use crate::error::DataError;
use crate::series::TimeSeries;
use chrono::NaiveDate;
use polars::prelude::*;
use std::collections::{BTreeSet, HashMap};
use std::io::Write;
use std::str::FromStr;

/// How date axes are combined when joining series.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum JoinMode {
    /// Intersection of all date sets.
    #[default]
    Inner,
    /// Union of all date sets; gaps become missing cells.
    Outer,
}

impl FromStr for JoinMode {
    type Err = DataError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "inner" => Ok(Self::Inner),
            "outer" => Ok(Self::Outer),
            other => Err(DataError::InvalidInput(format!(
                "unknown join mode '{other}' (expected 'inner' or 'outer')"
            ))),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Table {
    dates: Vec<NaiveDate>,
    columns: Vec<(String, Vec<f64>)>,
}

impl Table {
    /// Table with no rows and no columns.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Table with a date axis and no columns yet.
    pub fn with_dates(dates: Vec<NaiveDate>) -> Self {
        Self {
            dates,
            columns: Vec::new(),
        }
    }

    /// Single-column table from a canonical series.
    pub fn from_series(name: &str, series: &TimeSeries) -> Self {
        let mut table = Self::with_dates(series.dates().to_vec());
        table.columns.push((name.to_string(), series.values().to_vec()));
        table
    }

    /// Join named series on their dates.
    ///
    /// Each series contributes one column. With `Outer`, dates absent from a
    /// series become missing cells in its column.
    pub fn join(series: &[(String, TimeSeries)], mode: JoinMode) -> Self {
        if series.is_empty() {
            return Self::empty();
        }

        let dates: Vec<NaiveDate> = match mode {
            JoinMode::Outer => {
                let mut all = BTreeSet::new();
                for (_, s) in series {
                    all.extend(s.dates().iter().copied());
                }
                all.into_iter().collect()
            }
            JoinMode::Inner => {
                let mut common: BTreeSet<NaiveDate> = series[0].1.dates().iter().copied().collect();
                for (_, s) in &series[1..] {
                    let other: BTreeSet<NaiveDate> = s.dates().iter().copied().collect();
                    common = common.intersection(&other).copied().collect();
                }
                common.into_iter().collect()
            }
        };

        let mut table = Self::with_dates(dates);
        for (name, s) in series {
            let by_date: HashMap<NaiveDate, f64> = s.iter().collect();
            let column = table
                .dates
                .iter()
                .map(|d| by_date.get(d).copied().unwrap_or(f64::NAN))
                .collect();
            table.columns.push((name.clone(), column));
        }
        table
    }

    pub fn dates(&self) -> &[NaiveDate] {
        &self.dates
    }

    pub fn height(&self) -> usize {
        self.dates.len()
    }

    pub fn width(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.dates.is_empty() && self.columns.is_empty()
    }

    pub fn column_names(&self) -> Vec<&str> {
        self.columns.iter().map(|(n, _)| n.as_str()).collect()
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.columns.iter().any(|(n, _)| n == name)
    }

    pub fn column(&self, name: &str) -> Option<&[f64]> {
        self.columns
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v.as_slice())
    }

    pub(crate) fn columns_mut(&mut self) -> impl Iterator<Item = &mut Vec<f64>> {
        self.columns.iter_mut().map(|(_, v)| v)
    }

    /// Append a column, replacing any existing column of the same name.
    pub fn push_column(&mut self, name: impl Into<String>, values: Vec<f64>) {
        let name = name.into();
        debug_assert_eq!(values.len(), self.dates.len(), "column '{name}' length mismatch");
        match self.columns.iter_mut().find(|(n, _)| *n == name) {
            Some((_, existing)) => *existing = values,
            None => self.columns.push((name, values)),
        }
    }

    /// Number of missing cells across all columns.
    pub fn missing_count(&self) -> usize {
        self.columns
            .iter()
            .map(|(_, v)| v.iter().filter(|x| x.is_nan()).count())
            .sum()
    }

    /// Remove every row with a missing cell in any column.
    pub fn drop_incomplete_rows(&mut self) {
        let keep: Vec<bool> = (0..self.dates.len())
            .map(|i| self.columns.iter().all(|(_, v)| !v[i].is_nan()))
            .collect();
        let mut flags = keep.iter();
        self.dates.retain(|_| *flags.next().unwrap_or(&false));
        for (_, values) in &mut self.columns {
            let mut flags = keep.iter();
            values.retain(|_| *flags.next().unwrap_or(&false));
        }
    }

    /// Export as a frame with a leading `date` column.
    pub fn to_dataframe(&self) -> Result<DataFrame, DataError> {
        let mut cols = Vec::with_capacity(self.columns.len() + 1);
        cols.push(Column::new("date".into(), self.dates.clone()));
        for (name, values) in &self.columns {
            cols.push(Column::new(name.as_str().into(), values.clone()));
        }
        Ok(DataFrame::new(cols)?)
    }

    /// Write as CSV with a `date` header column; missing cells are empty.
    pub fn write_csv<W: Write>(&self, writer: W) -> Result<(), DataError> {
        let mut out = csv::Writer::from_writer(writer);
        let io_err = |e: csv::Error| DataError::InvalidInput(format!("csv write failed: {e}"));

        let mut header = vec!["date".to_string()];
        header.extend(self.columns.iter().map(|(n, _)| n.clone()));
        out.write_record(&header).map_err(io_err)?;

        for (i, date) in self.dates.iter().enumerate() {
            let mut row = vec![date.format("%Y-%m-%d").to_string()];
            for (_, values) in &self.columns {
                let v = values[i];
                row.push(if v.is_nan() { String::new() } else { v.to_string() });
            }
            out.write_record(&row).map_err(io_err)?;
        }
        out.flush()
            .map_err(|e| DataError::InvalidInput(format!("csv flush failed: {e}")))?;
        Ok(())
    }
}
