//! Multi-series alignment into a model-ready table.
//!
//! Pipeline: fetch each id → join on dates → impute → append per-column
//! features → impute again (warmup gaps from differencing, shifting and
//! rolling) → optionally drop incomplete rows.

use crate::error::DataError;
use crate::features::{append_features, FeatureSet};
use crate::impute::ImputeStrategy;
use crate::normalize::SeriesSource;
use crate::series::TimeSeries;
use crate::table::{JoinMode, Table};
use chrono::NaiveDate;
use rayon::prelude::*;
use std::collections::HashSet;
use tracing::debug;

/// Whether feature columns are appended per base column.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum FeatureMode {
    /// Base columns only.
    None,
    /// Every feature family.
    #[default]
    Default,
    /// A chosen subset of families.
    Families(FeatureSet),
}

impl FeatureMode {
    fn families(&self) -> Option<FeatureSet> {
        match self {
            Self::None => None,
            Self::Default => Some(FeatureSet::all()),
            Self::Families(set) if set.is_empty() => None,
            Self::Families(set) => Some(set.clone()),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct MlOptions {
    pub start: Option<NaiveDate>,
    pub end: Option<NaiveDate>,
    pub join: JoinMode,
    pub impute: ImputeStrategy,
    pub features: FeatureMode,
    pub lags: Vec<usize>,
    pub windows: Vec<usize>,
    pub drop_incomplete: bool,
}

impl Default for MlOptions {
    fn default() -> Self {
        Self {
            start: None,
            end: None,
            join: JoinMode::Inner,
            impute: ImputeStrategy::new([
                crate::impute::ImputeStep::ForwardFill,
                crate::impute::ImputeStep::Median,
            ]),
            features: FeatureMode::Default,
            lags: vec![1, 3, 12],
            windows: vec![3, 6, 12],
            drop_incomplete: false,
        }
    }
}

/// Fetch, align, impute and feature-engineer several series.
///
/// Columns are named by series id. Returns an empty table for no ids.
pub fn build_ml_table(
    source: &dyn SeriesSource,
    series_ids: &[String],
    opts: &MlOptions,
) -> Result<Table, DataError> {
    let mut seen = HashSet::new();
    let ids: Vec<&String> = series_ids.iter().filter(|id| seen.insert(*id)).collect();
    if ids.is_empty() {
        return Ok(Table::empty());
    }
    if opts.lags.iter().chain(&opts.windows).any(|&p| p == 0) {
        return Err(DataError::InvalidInput(
            "lag periods and rolling windows must be positive".into(),
        ));
    }

    let fetched: Vec<(String, TimeSeries)> = ids
        .par_iter()
        .map(|id| {
            let series = source.get(id, opts.start, opts.end)?;
            Ok(((*id).clone(), series.filter_range(opts.start, opts.end)))
        })
        .collect::<Result<_, DataError>>()?;

    let mut table = Table::join(&fetched, opts.join);
    debug!(
        series = ids.len(),
        rows = table.height(),
        join = ?opts.join,
        "joined base columns"
    );
    opts.impute.apply(&mut table);

    if let Some(families) = opts.features.families() {
        for id in &ids {
            append_features(&mut table, id, &opts.lags, &opts.windows, &families)?;
        }
        opts.impute.apply(&mut table);
    }

    if opts.drop_incomplete {
        table.drop_incomplete_rows();
    }
    Ok(table)
}
