//! Hann analysis window.

use std::f64::consts::PI;

/// Builds a symmetric Hann window of length `size`.
///
/// `w[i] = 0.5 * (1 - cos(2πi / (N - 1)))`. A length of one yields `[1.0]`.
pub fn hann_window(size: usize) -> Vec<f64> {
    if size <= 1 {
        return vec![1.0; size];
    }
    let factor = 2.0 * PI / (size - 1) as f64;
    (0..size)
        .map(|i| 0.5 * (1.0 - (factor * i as f64).cos()))
        .collect()
}
