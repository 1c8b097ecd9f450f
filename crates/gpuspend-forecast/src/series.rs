//! Daily series helpers
//!
//! Gap filling and the small amount of descriptive statistics the strategies
//! need. Standard deviations are population (divide by n).

use gpuspend_core::types::DailyValue;
use std::collections::BTreeMap;

/// Make a daily series contiguous between its first and last date
///
/// A missing day takes the previous day's value. Duplicate dates keep the
/// last observation.
///
/// # Examples
/// ```
/// use gpuspend_core::types::DailyValue;
/// use gpuspend_forecast::series::fill_gaps;
/// use chrono::NaiveDate;
///
/// let day = |d| NaiveDate::from_ymd_opt(2026, 3, d).unwrap();
/// let filled = fill_gaps(&[DailyValue::new(day(1), 5.0), DailyValue::new(day(4), 8.0)]);
///
/// let values: Vec<f64> = filled.iter().map(|p| p.value).collect();
/// assert_eq!(values, vec![5.0, 5.0, 5.0, 8.0]);
/// ```
pub fn fill_gaps(history: &[DailyValue]) -> Vec<DailyValue> {
    let observed: BTreeMap<_, _> = history.iter().map(|p| (p.date, p.value)).collect();
    let (Some((&first, _)), Some((&last, _))) =
        (observed.first_key_value(), observed.last_key_value())
    else {
        return Vec::new();
    };

    let mut filled = Vec::with_capacity(observed.len());
    let mut previous = 0.0;
    for date in first.iter_days().take_while(|d| *d <= last) {
        let value = observed.get(&date).copied().unwrap_or(previous);
        filled.push(DailyValue::new(date, value));
        previous = value;
    }
    filled
}

/// Simple moving average over full windows only
///
/// Returns an empty vector when the window is zero or longer than the series.
pub fn moving_average(values: &[f64], window: usize) -> Vec<f64> {
    if window == 0 || window > values.len() {
        return Vec::new();
    }
    values
        .windows(window)
        .map(|w| w.iter().sum::<f64>() / window as f64)
        .collect()
}

/// Slope of the least-squares line through `(i, values[i])`
///
/// Zero for fewer than two points.
pub fn linear_slope(values: &[f64]) -> f64 {
    let n = values.len();
    if n < 2 {
        return 0.0;
    }
    let n_f = n as f64;
    let mean_x = (n_f - 1.0) / 2.0;
    let mean_y = values.iter().sum::<f64>() / n_f;

    let (mut num, mut den) = (0.0, 0.0);
    for (i, y) in values.iter().enumerate() {
        let dx = i as f64 - mean_x;
        num += dx * (y - mean_y);
        den += dx * dx;
    }
    if den == 0.0 { 0.0 } else { num / den }
}

/// Consecutive differences `values[i+1] - values[i]`
pub fn first_differences(values: &[f64]) -> Vec<f64> {
    values.windows(2).map(|w| w[1] - w[0]).collect()
}

/// Population standard deviation, zero for an empty slice
pub fn std_dev(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let n = values.len() as f64;
    let mean = values.iter().sum::<f64>() / n;
    (values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n).sqrt()
}

/// Root mean squared error between two equal-length slices
pub fn rmse(actual: &[f64], predicted: &[f64]) -> f64 {
    if actual.is_empty() {
        return 0.0;
    }
    let sum: f64 = actual
        .iter()
        .zip(predicted)
        .map(|(a, p)| (a - p).powi(2))
        .sum();
    (sum / actual.len() as f64).sqrt()
}
