//! End-to-end pipeline tests against an in-memory series source.

use chrono::{Months, NaiveDate};
use datasetiq_core::{
    build_ml_table, normalize, summarize, DataError, FeatureMode, JoinMode, MlOptions, Record,
    SeriesInput, SeriesSource, TimeSeries, Trend,
};
use std::collections::HashMap;

struct MemorySource(HashMap<String, TimeSeries>);

impl MemorySource {
    fn new(series: &[(&str, TimeSeries)]) -> Self {
        Self(
            series
                .iter()
                .map(|(id, s)| (id.to_string(), s.clone()))
                .collect(),
        )
    }
}

impl SeriesSource for MemorySource {
    fn get(
        &self,
        series_id: &str,
        start: Option<NaiveDate>,
        end: Option<NaiveDate>,
    ) -> Result<TimeSeries, DataError> {
        self.0
            .get(series_id)
            .map(|s| s.filter_range(start, end))
            .ok_or_else(|| DataError::NotFound {
                message: format!("series {series_id} not found"),
            })
    }
}

fn d(s: &str) -> NaiveDate {
    NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
}

fn monthly(first: &str, values: &[f64]) -> TimeSeries {
    let start = d(first);
    TimeSeries::from_records(
        values
            .iter()
            .enumerate()
            .map(|(i, &v)| Record::new(start + Months::new(i as u32), v))
            .collect(),
    )
}

fn ids(names: &[&str]) -> Vec<String> {
    names.iter().map(|s| s.to_string()).collect()
}

#[test]
fn inner_join_with_features_is_complete_after_median() {
    let cpi: Vec<f64> = (0..36).map(|i| 250.0 + i as f64 * 0.7).collect();
    let unrate: Vec<f64> = (0..30).map(|i| 3.5 + (i % 5) as f64 * 0.1).collect();
    let source = MemorySource::new(&[
        ("fred-cpi", monthly("2018-01-01", &cpi)),
        ("bls-u3", monthly("2018-07-01", &unrate)),
    ]);
    let opts = MlOptions {
        impute: "median".parse().unwrap(),
        ..MlOptions::default()
    };

    let table = build_ml_table(&source, &ids(&["fred-cpi", "bls-u3"]), &opts).unwrap();

    // intersection: 2018-07 ..= 2020-12
    assert_eq!(table.height(), 30);
    assert_eq!(table.dates()[0], d("2018-07-01"));
    for id in ["fred-cpi", "bls-u3"] {
        for suffix in [
            "",
            "_mom_pct",
            "_yoy_pct",
            "_lag_1",
            "_lag_3",
            "_lag_12",
            "_rollmean_3",
            "_rollstd_12",
            "_zscore",
        ] {
            let name = format!("{id}{suffix}");
            assert!(table.has_column(&name), "missing {name}");
        }
    }
    assert_eq!(table.missing_count(), 0);
}

#[test]
fn outer_join_then_ffill_and_median_fills_everything() {
    let source = MemorySource::new(&[
        ("a", monthly("2020-01-01", &[1.0, 2.0, 3.0, 4.0, 5.0, 6.0])),
        ("b", monthly("2020-03-01", &[10.0, f64::NAN, 30.0, 40.0, 50.0, 60.0])),
    ]);
    let opts = MlOptions {
        join: JoinMode::Outer,
        // eight rows cannot carry a 12-period change
        features: FeatureMode::Families("mom,lags,rolling_mean,rolling_std,zscore".parse().unwrap()),
        lags: vec![1],
        windows: vec![2],
        ..MlOptions::default()
    };

    let table = build_ml_table(&source, &ids(&["a", "b"]), &opts).unwrap();

    assert_eq!(table.height(), 8);
    assert_eq!(table.missing_count(), 0);
    let b = table.column("b").unwrap();
    // leading gap healed by median, interior gap by ffill
    assert_eq!(b[3], 10.0);
    assert_eq!(b[2], 10.0);
}

#[test]
fn date_filters_apply_per_series() {
    let values: Vec<f64> = (1..=24).map(|v| v as f64).collect();
    let source = MemorySource::new(&[
        ("a", monthly("2020-01-01", &values)),
        ("b", monthly("2020-01-01", &values)),
    ]);
    let opts = MlOptions {
        start: Some(d("2020-06-01")),
        end: Some(d("2020-12-01")),
        features: FeatureMode::None,
        ..MlOptions::default()
    };

    let table = build_ml_table(&source, &ids(&["a", "b"]), &opts).unwrap();

    assert_eq!(table.height(), 7);
    assert_eq!(table.column("a").unwrap()[0], 6.0);
}

#[test]
fn empty_id_list_is_an_empty_table() {
    let source = MemorySource::new(&[]);
    let table = build_ml_table(&source, &[], &MlOptions::default()).unwrap();
    assert_eq!(table.height(), 0);
    assert_eq!(table.width(), 0);
}

#[test]
fn unknown_id_fails_the_whole_build() {
    let source = MemorySource::new(&[("a", monthly("2020-01-01", &[1.0]))]);
    let err = build_ml_table(&source, &ids(&["a", "zzz"]), &MlOptions::default()).unwrap_err();
    assert!(matches!(err, DataError::NotFound { .. }));
}

#[test]
fn normalized_column_feeds_insight() {
    let values: Vec<f64> = (1..=24).map(|v| v as f64).collect();
    let column = monthly("2020-01-01", &values);
    let source = MemorySource::new(&[]);
    let (series, name) = normalize(&source, &SeriesInput::Column(column), None, None).unwrap();

    let insight = summarize(&series, &name, Some("1y"));

    assert_eq!(insight.series, "series");
    assert_eq!(insight.latest_value, Some(24.0));
    assert_eq!(insight.trend, Some(Trend::Upward));
}

#[test]
fn csv_export_of_ml_table() {
    let source = MemorySource::new(&[
        ("a", monthly("2020-01-01", &[1.0, 2.0])),
        ("b", monthly("2020-01-01", &[3.5, f64::NAN])),
    ]);
    let opts = MlOptions {
        impute: "none".parse().unwrap(),
        features: FeatureMode::None,
        ..MlOptions::default()
    };
    let table = build_ml_table(&source, &ids(&["a", "b"]), &opts).unwrap();

    let mut out = Vec::new();
    table.write_csv(&mut out).unwrap();
    let text = String::from_utf8(out).unwrap();
    assert_eq!(text, "date,a,b\n2020-01-01,1,3.5\n2020-02-01,2,\n");
}
