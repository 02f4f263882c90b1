//! Sample statistics for timing measurements

use std::cmp::Ordering;

/// Median of a sample; 0.0 for an empty sample
pub fn median(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    median_sorted(&sorted(values))
}

/// Tukey quartiles: medians of the lower and upper halves
pub fn quartiles(values: &[f64]) -> (f64, f64) {
    let sorted = sorted(values);
    let n = sorted.len();
    if n < 2 {
        let value = sorted.first().copied().unwrap_or(0.0);
        return (value, value);
    }

    let mid = n / 2;
    let lower = &sorted[..mid];
    // Odd sample: the middle element belongs to neither half
    let upper = &sorted[if n % 2 == 0 { mid } else { mid + 1 }..];

    (median_sorted(lower), median_sorted(upper))
}

/// Interquartile range (Q3 - Q1); 0.0 for fewer than two samples
pub fn iqr(values: &[f64]) -> f64 {
    if values.len() < 2 {
        return 0.0;
    }
    let (q1, q3) = quartiles(values);
    q3 - q1
}

fn sorted(values: &[f64]) -> Vec<f64> {
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(Ordering::Equal));
    sorted
}

fn median_sorted(sorted: &[f64]) -> f64 {
    let n = sorted.len();
    if n % 2 == 0 {
        (sorted[n / 2 - 1] + sorted[n / 2]) / 2.0
    } else {
        sorted[n / 2]
    }
}
