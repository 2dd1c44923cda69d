//! Gap imputation for tables.
//!
//! A strategy is an ordered list of steps, always applied as forward-fill,
//! then backward-fill, then median-fill, whatever order the tokens were given
//! in. Parsed once from a token string such as `"ffill+median"` or `"none"`.

use crate::error::DataError;
use crate::stats;
use crate::table::Table;
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ImputeStep {
    /// Propagate the last observed value forward.
    ForwardFill,
    /// Propagate the next observed value backward.
    BackwardFill,
    /// Fill remaining gaps with the column's own median.
    Median,
}

impl ImputeStep {
    fn token(self) -> &'static str {
        match self {
            Self::ForwardFill => "ffill",
            Self::BackwardFill => "bfill",
            Self::Median => "median",
        }
    }

    fn apply(self, values: &mut [f64]) {
        match self {
            Self::ForwardFill => fill_forward(values.iter_mut()),
            Self::BackwardFill => fill_forward(values.iter_mut().rev()),
            Self::Median => {
                if let Some(m) = stats::median(values) {
                    for v in values.iter_mut().filter(|v| v.is_nan()) {
                        *v = m;
                    }
                }
            }
        }
    }
}

fn fill_forward<'a>(values: impl Iterator<Item = &'a mut f64>) {
    let mut last = f64::NAN;
    for v in values {
        if v.is_nan() {
            *v = last;
        } else {
            last = *v;
        }
    }
}

/// Ordered, deduplicated imputation steps. Empty means no imputation.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ImputeStrategy {
    steps: Vec<ImputeStep>,
}

impl ImputeStrategy {
    pub fn none() -> Self {
        Self::default()
    }

    pub fn new(steps: impl IntoIterator<Item = ImputeStep>) -> Self {
        let mut steps: Vec<ImputeStep> = steps.into_iter().collect();
        steps.sort();
        steps.dedup();
        Self { steps }
    }

    pub fn steps(&self) -> &[ImputeStep] {
        &self.steps
    }

    pub fn is_none(&self) -> bool {
        self.steps.is_empty()
    }

    /// Apply every step, in order, to every column.
    pub fn apply(&self, table: &mut Table) {
        for step in &self.steps {
            for column in table.columns_mut() {
                step.apply(column);
            }
        }
    }
}

impl FromStr for ImputeStrategy {
    type Err = DataError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim().to_ascii_lowercase();
        if s.is_empty() || s == "none" {
            return Ok(Self::none());
        }
        let steps = s
            .split(['+', ','])
            .map(|token| match token.trim() {
                "ffill" => Ok(ImputeStep::ForwardFill),
                "bfill" => Ok(ImputeStep::BackwardFill),
                "median" => Ok(ImputeStep::Median),
                other => Err(DataError::InvalidInput(format!(
                    "unknown imputation step '{other}' (expected ffill, bfill, median or none)"
                ))),
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self::new(steps))
    }
}

impl fmt::Display for ImputeStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.steps.is_empty() {
            return f.write_str("none");
        }
        let tokens: Vec<&str> = self.steps.iter().map(|s| s.token()).collect();
        f.write_str(&tokens.join("+"))
    }
}
