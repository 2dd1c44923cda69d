//! Numeric kernels over `f64` slices.
//!
//! `NaN` is the missing marker throughout: element-wise kernels propagate it,
//! aggregates skip it. Output vectors always have the input's length.

/// Percent change against the value `periods` rows earlier, scaled by 100.
/// Undefined when either side is missing or the reference is zero.
pub fn pct_change(values: &[f64], periods: usize) -> Vec<f64> {
    let mut out = vec![f64::NAN; values.len()];
    for i in periods..values.len() {
        let prev = values[i - periods];
        let curr = values[i];
        if !prev.is_nan() && !curr.is_nan() && prev != 0.0 {
            out[i] = (curr - prev) / prev * 100.0;
        }
    }
    out
}

/// Value from `periods` rows earlier aligned to the current row.
pub fn shift(values: &[f64], periods: usize) -> Vec<f64> {
    let mut out = vec![f64::NAN; values.len()];
    for i in periods..values.len() {
        out[i] = values[i - periods];
    }
    out
}

/// Trailing `window`-row mean; undefined for the first `window - 1` rows and
/// for any window containing a missing value.
pub fn rolling_mean(values: &[f64], window: usize) -> Vec<f64> {
    rolling(values, window, |w| Some(w.iter().sum::<f64>() / w.len() as f64))
}

/// Trailing `window`-row sample standard deviation (ddof = 1).
pub fn rolling_std(values: &[f64], window: usize) -> Vec<f64> {
    rolling(values, window, sample_std_dense)
}

fn rolling(values: &[f64], window: usize, f: impl Fn(&[f64]) -> Option<f64>) -> Vec<f64> {
    let n = values.len();
    let mut out = vec![f64::NAN; n];
    if window == 0 || n < window {
        return out;
    }
    for i in (window - 1)..n {
        let w = &values[(i + 1 - window)..=i];
        if w.iter().any(|v| v.is_nan()) {
            continue;
        }
        out[i] = f(w).unwrap_or(f64::NAN);
    }
    out
}

/// Mean of observed values, `None` if there are none.
pub fn mean(values: &[f64]) -> Option<f64> {
    let (sum, count) = values
        .iter()
        .filter(|v| !v.is_nan())
        .fold((0.0, 0usize), |(s, c), v| (s + v, c + 1));
    (count > 0).then(|| sum / count as f64)
}

/// Sample standard deviation of observed values; `None` below two observations.
pub fn sample_std(values: &[f64]) -> Option<f64> {
    let observed: Vec<f64> = values.iter().copied().filter(|v| !v.is_nan()).collect();
    sample_std_dense(&observed)
}

fn sample_std_dense(values: &[f64]) -> Option<f64> {
    let n = values.len();
    if n < 2 {
        return None;
    }
    let m = values.iter().sum::<f64>() / n as f64;
    let var = values.iter().map(|v| (v - m).powi(2)).sum::<f64>() / (n - 1) as f64;
    Some(var.sqrt())
}

/// Median of observed values, `None` if there are none.
pub fn median(values: &[f64]) -> Option<f64> {
    let mut observed: Vec<f64> = values.iter().copied().filter(|v| !v.is_nan()).collect();
    if observed.is_empty() {
        return None;
    }
    observed.sort_by(f64::total_cmp);
    let mid = observed.len() / 2;
    Some(if observed.len() % 2 == 0 {
        (observed[mid - 1] + observed[mid]) / 2.0
    } else {
        observed[mid]
    })
}

/// `(v - mean) / std` over the full sample; entirely undefined when the
/// observed values are all equal or the standard deviation cannot be computed.
///
/// Rounding in the mean leaves a constant series with a std of a few ulps,
/// so spreads at or below `EPSILON * max(|mean|, 1)` count as zero.
pub fn zscore(values: &[f64]) -> Vec<f64> {
    if is_constant(values) {
        return vec![f64::NAN; values.len()];
    }
    match (mean(values), sample_std(values)) {
        (Some(m), Some(s)) if s.is_finite() && s > f64::EPSILON * m.abs().max(1.0) => {
            values.iter().map(|v| (v - m) / s).collect()
        }
        _ => vec![f64::NAN; values.len()],
    }
}

fn is_constant(values: &[f64]) -> bool {
    let mut observed = values.iter().filter(|v| !v.is_nan());
    match observed.next() {
        Some(first) => observed.all(|v| v == first),
        None => true,
    }
}

/// Mean of consecutive differences, skipping pairs with a missing side.
pub fn mean_diff(values: &[f64]) -> Option<f64> {
    let diffs: Vec<f64> = values.windows(2).map(|w| w[1] - w[0]).collect();
    mean(&diffs)
}

/// Assert two f64 values are approximately equal (within epsilon).
#[cfg(test)]
pub fn assert_approx(actual: f64, expected: f64, epsilon: f64) {
    assert!(
        (actual - expected).abs() < epsilon,
        "assert_approx failed: actual={actual}, expected={expected}, diff={}, epsilon={epsilon}",
        (actual - expected).abs()
    );
}

#[cfg(test)]
pub const DEFAULT_EPSILON: f64 = 1e-10;
