//! Property tests for the feature engine and imputation.
//!
//! Uses proptest to verify:
//! 1. Row count is preserved and the value column is untouched
//! 2. Z-score is undefined for constant or single-observation series
//! 3. Rolling columns are undefined for exactly the warmup rows
//! 4. Median imputation leaves no gap when a column has any observation

use chrono::{Duration, NaiveDate};
use datasetiq_core::{add_features, FeatureOptions, ImputeStrategy, Record, Table, TimeSeries};
use proptest::prelude::*;

// ── Strategies (proptest) ────────────────────────────────────────────

fn arb_values(max_len: usize) -> impl Strategy<Value = Vec<f64>> {
    prop::collection::vec(
        prop_oneof![
            9 => (-1000.0..1000.0_f64).prop_map(|v| (v * 100.0).round() / 100.0),
            1 => Just(f64::NAN),
        ],
        0..max_len,
    )
}

fn arb_periods() -> impl Strategy<Value = Vec<usize>> {
    prop::collection::btree_set(1..15usize, 1..4).prop_map(|s| s.into_iter().collect())
}

fn daily(values: &[f64]) -> TimeSeries {
    let start = NaiveDate::from_ymd_opt(2020, 1, 1).unwrap();
    TimeSeries::from_records(
        values
            .iter()
            .enumerate()
            .map(|(i, &v)| Record::new(start + Duration::days(i as i64), v))
            .collect(),
    )
}

fn same(a: &[f64], b: &[f64]) -> bool {
    a.len() == b.len()
        && a
            .iter()
            .zip(b)
            .all(|(x, y)| (x.is_nan() && y.is_nan()) || x == y)
}

// ── 1. Shape preservation ────────────────────────────────────────────

proptest! {
    #[test]
    fn row_count_and_value_column_preserved(
        values in arb_values(60),
        lags in arb_periods(),
        windows in arb_periods(),
    ) {
        let series = daily(&values);
        let opts = FeatureOptions { lags: lags.clone(), windows: windows.clone(), ..FeatureOptions::default() };
        let table = add_features(&series, &opts).unwrap();

        prop_assert_eq!(table.height(), values.len());
        prop_assert!(same(table.column("value").unwrap(), &values));
        // value + mom + yoy + lags + 2 per window + zscore
        prop_assert_eq!(table.width(), 4 + lags.len() + 2 * windows.len());
    }
}

// ── 2. Z-score degeneracy ────────────────────────────────────────────

proptest! {
    #[test]
    fn constant_series_has_undefined_zscore(c in -100.0..100.0_f64, n in 0..40usize) {
        let table = add_features(&daily(&vec![c; n]), &FeatureOptions::default()).unwrap();
        prop_assert!(table.column("value_zscore").unwrap().iter().all(|v| v.is_nan()));
    }

    #[test]
    fn single_observation_has_undefined_zscore(c in -100.0..100.0_f64) {
        let table = add_features(&daily(&[c]), &FeatureOptions::default()).unwrap();
        prop_assert!(table.column("value_zscore").unwrap()[0].is_nan());
    }
}

// ── 3. Rolling warmup ────────────────────────────────────────────────

proptest! {
    #[test]
    fn rolling_warmup_is_undefined(
        values in prop::collection::vec(-50.0..50.0_f64, 0..40),
        w in 1..10usize,
    ) {
        let opts = FeatureOptions { windows: vec![w], ..FeatureOptions::default() };
        let table = add_features(&daily(&values), &opts).unwrap();
        let mean = table.column(&format!("value_rollmean_{w}")).unwrap();
        for (i, v) in mean.iter().enumerate() {
            prop_assert_eq!(v.is_nan(), i + 1 < w);
        }
    }
}

// ── 4. Median imputation ─────────────────────────────────────────────

proptest! {
    #[test]
    fn median_fill_leaves_no_gaps(values in arb_values(40)) {
        prop_assume!(values.iter().any(|v| !v.is_nan()));
        let mut table = Table::from_series("x", &daily(&values));
        "median".parse::<ImputeStrategy>().unwrap().apply(&mut table);
        prop_assert_eq!(table.missing_count(), 0);
    }
}
