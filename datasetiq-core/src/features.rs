//! Feature engine: derived columns for a canonical series.
//!
//! Column naming, keyed by the base column name:
//! `<base>_mom_pct`, `<base>_yoy_pct`, `<base>_lag_<k>`,
//! `<base>_rollmean_<w>`, `<base>_rollstd_<w>`, `<base>_zscore`.

use crate::error::DataError;
use crate::series::TimeSeries;
use crate::stats;
use crate::table::Table;
use std::collections::BTreeSet;
use std::str::FromStr;

/// Observations per year assumed by the year-over-year family.
pub const YOY_PERIODS: usize = 12;

/// A named category of derived column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum FeatureFamily {
    Momentum,
    YearOverYear,
    Lags,
    RollingMean,
    RollingStd,
    ZScore,
}

impl FeatureFamily {
    pub const ALL: [FeatureFamily; 6] = [
        Self::Momentum,
        Self::YearOverYear,
        Self::Lags,
        Self::RollingMean,
        Self::RollingStd,
        Self::ZScore,
    ];
}

impl FromStr for FeatureFamily {
    type Err = DataError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "mom" | "momentum" => Ok(Self::Momentum),
            "yoy" => Ok(Self::YearOverYear),
            "lags" | "lag" => Ok(Self::Lags),
            "rolling_mean" | "rollmean" => Ok(Self::RollingMean),
            "rolling_std" | "rollstd" => Ok(Self::RollingStd),
            "zscore" => Ok(Self::ZScore),
            other => Err(DataError::InvalidInput(format!("unknown feature family '{other}'"))),
        }
    }
}

/// Independently toggleable feature families.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeatureSet(BTreeSet<FeatureFamily>);

impl FeatureSet {
    pub fn all() -> Self {
        Self(FeatureFamily::ALL.into_iter().collect())
    }

    pub fn none() -> Self {
        Self(BTreeSet::new())
    }

    pub fn only(families: impl IntoIterator<Item = FeatureFamily>) -> Self {
        Self(families.into_iter().collect())
    }

    pub fn contains(&self, family: FeatureFamily) -> bool {
        self.0.contains(&family)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl Default for FeatureSet {
    fn default() -> Self {
        Self::all()
    }
}

/// Parses a comma-separated family list, e.g. `"mom,lags,zscore"`.
impl FromStr for FeatureSet {
    type Err = DataError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.split(',')
            .filter(|t| !t.trim().is_empty())
            .map(FeatureFamily::from_str)
            .collect::<Result<BTreeSet<_>, _>>()
            .map(Self)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct FeatureOptions {
    pub lags: Vec<usize>,
    pub windows: Vec<usize>,
    pub families: FeatureSet,
    /// Remove rows holding any undefined feature value.
    pub drop_incomplete: bool,
}

impl Default for FeatureOptions {
    fn default() -> Self {
        Self {
            lags: vec![1, 3, 12],
            windows: vec![3, 6, 12],
            families: FeatureSet::all(),
            drop_incomplete: false,
        }
    }
}

impl FeatureOptions {
    pub fn validate(&self) -> Result<(), DataError> {
        if self.lags.iter().any(|&k| k == 0) {
            return Err(DataError::InvalidInput("lag periods must be positive".into()));
        }
        if self.windows.iter().any(|&w| w == 0) {
            return Err(DataError::InvalidInput("rolling windows must be positive".into()));
        }
        Ok(())
    }
}

/// Base `value` column plus one column per requested feature instance.
pub fn add_features(series: &TimeSeries, opts: &FeatureOptions) -> Result<Table, DataError> {
    opts.validate()?;
    let mut table = Table::from_series("value", series);
    append_features(&mut table, "value", &opts.lags, &opts.windows, &opts.families)?;
    if opts.drop_incomplete {
        table.drop_incomplete_rows();
    }
    Ok(table)
}

/// Append feature columns derived from `base` to `table`.
pub fn append_features(
    table: &mut Table,
    base: &str,
    lags: &[usize],
    windows: &[usize],
    families: &FeatureSet,
) -> Result<(), DataError> {
    let values = table
        .column(base)
        .ok_or_else(|| DataError::InvalidInput(format!("no column named '{base}'")))?
        .to_vec();

    if families.contains(FeatureFamily::Momentum) {
        table.push_column(format!("{base}_mom_pct"), stats::pct_change(&values, 1));
    }
    if families.contains(FeatureFamily::YearOverYear) {
        table.push_column(format!("{base}_yoy_pct"), stats::pct_change(&values, YOY_PERIODS));
    }
    if families.contains(FeatureFamily::Lags) {
        for &k in lags {
            table.push_column(format!("{base}_lag_{k}"), stats::shift(&values, k));
        }
    }
    if families.contains(FeatureFamily::RollingMean) {
        for &w in windows {
            table.push_column(format!("{base}_rollmean_{w}"), stats::rolling_mean(&values, w));
        }
    }
    if families.contains(FeatureFamily::RollingStd) {
        for &w in windows {
            table.push_column(format!("{base}_rollstd_{w}"), stats::rolling_std(&values, w));
        }
    }
    if families.contains(FeatureFamily::ZScore) {
        table.push_column(format!("{base}_zscore"), stats::zscore(&values));
    }
    Ok(())
}
