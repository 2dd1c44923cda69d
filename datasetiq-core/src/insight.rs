//! Insight summarizer: a compact statistical read of one series.

use crate::error::DataError;
use crate::series::TimeSeries;
use crate::stats;
use chrono::{Days, Months, NaiveDate};
use serde::Serialize;
use std::fmt;
use std::str::FromStr;

pub const DEFAULT_WINDOW: &str = "1y";
const SUMMARY_DELIMITER: &str = " | ";
const NO_DATA: &str = "No data available";

/// Lookback expressed as a calendar offset from the latest observation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Lookback {
    Years(u32),
    Months(u32),
    Days(u32),
}

impl Lookback {
    /// Earliest date kept for a series ending at `latest`.
    pub fn cutoff(self, latest: NaiveDate) -> Option<NaiveDate> {
        match self {
            Self::Years(n) => latest.checked_sub_months(Months::new(n.checked_mul(12)?)),
            Self::Months(n) => latest.checked_sub_months(Months::new(n)),
            Self::Days(n) => latest.checked_sub_days(Days::new(u64::from(n))),
        }
    }
}

impl FromStr for Lookback {
    type Err = DataError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let invalid = || DataError::InvalidInput(format!("invalid lookback window '{s}'"));
        let unit = s.chars().last().ok_or_else(invalid)?;
        let magnitude: u32 = s[..s.len() - unit.len_utf8()].parse().map_err(|_| invalid())?;
        match unit.to_ascii_lowercase() {
            'y' => Ok(Self::Years(magnitude)),
            'm' => Ok(Self::Months(magnitude)),
            'd' => Ok(Self::Days(magnitude)),
            _ => Err(invalid()),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Trend {
    Upward,
    Downward,
    Flat,
}

impl Trend {
    fn from_slope(slope: Option<f64>) -> Self {
        match slope {
            Some(s) if s > 0.0 => Self::Upward,
            Some(s) if s < 0.0 => Self::Downward,
            _ => Self::Flat,
        }
    }
}

impl fmt::Display for Trend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Upward => "upward",
            Self::Downward => "downward",
            Self::Flat => "flat",
        })
    }
}

/// Summary of a series. Every metric is absent for an empty series.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Insight {
    pub series: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub latest_date: Option<NaiveDate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub latest_value: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mom_change_pct: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub yoy_change_pct: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub volatility: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub trend: Option<Trend>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub window: Option<String>,
    pub summary: String,
}

impl Insight {
    fn no_data(name: &str) -> Self {
        Self {
            series: name.to_string(),
            latest_date: None,
            latest_value: None,
            mom_change_pct: None,
            yoy_change_pct: None,
            volatility: None,
            trend: None,
            window: None,
            summary: NO_DATA.to_string(),
        }
    }
}

/// Summarize `series` over an optional lookback window such as `"6m"` or `"1y"`.
///
/// A window that does not parse is ignored and the full history is used.
pub fn summarize(series: &TimeSeries, name: &str, window: Option<&str>) -> Insight {
    let Some((latest_date, latest_value)) = series.last() else {
        return Insight::no_data(name);
    };

    let lookback = window.and_then(|w| w.parse::<Lookback>().ok());
    let scoped = match lookback.and_then(|lb| lb.cutoff(latest_date)) {
        Some(cutoff) => series.filter_range(Some(cutoff), None),
        None => series.clone(),
    };
    let values = scoped.values();
    let n = values.len();

    let prior = (n > 1).then(|| values[n - 2]);
    let year_ago = (n > 12).then(|| values[n - 1 - 12]);
    let mom_change_pct = prior.and_then(|p| change_pct(latest_value, p));
    let yoy_change_pct = year_ago.and_then(|p| change_pct(latest_value, p));
    let volatility = if n > 2 { stats::sample_std(values) } else { None };
    let trend = Trend::from_slope(stats::mean_diff(values));

    let mut parts = vec![format!("{name}: latest {latest_value:.2} on {latest_date}")];
    if let Some(mom) = mom_change_pct {
        parts.push(format!("{mom:+.2}% vs prior"));
    }
    if let Some(yoy) = yoy_change_pct {
        parts.push(format!("{yoy:+.2}% YoY"));
    }
    parts.push(format!("trend {trend}"));
    if let Some(vol) = volatility {
        parts.push(format!("volatility (std) {vol:.2}"));
    }

    Insight {
        series: name.to_string(),
        latest_date: Some(latest_date),
        latest_value: Some(latest_value),
        mom_change_pct,
        yoy_change_pct,
        volatility,
        trend: Some(trend),
        window: window.map(str::to_string),
        summary: parts.join(SUMMARY_DELIMITER),
    }
}

fn change_pct(latest: f64, reference: f64) -> Option<f64> {
    if reference == 0.0 || reference.is_nan() || latest.is_nan() {
        return None;
    }
    Some((latest - reference) / reference * 100.0)
}
