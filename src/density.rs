//! Scalar Gaussian densities and the summary statistics the engines share.
//!
//! ```text
//! N(x | μ, σ) = exp(-(x - μ)² / 2σ²) / (σ √(2π))
//! ```
//!
//! A non-positive `σ` is not a distribution; the density is defined as 0
//! (log-density `-∞`) so that iterative callers never have to handle an error
//! in the middle of a run.

use std::f64::consts::PI;

/// Smallest mixture density used before taking a logarithm.
pub const DENSITY_FLOOR: f64 = 1e-300;

/// Gaussian probability density at `x`.
///
/// Returns exactly `0.0` when `sigma <= 0` (or is NaN). Far tails underflow
/// to `0.0` instead of producing NaN.
pub fn gaussian_pdf(x: f64, mu: f64, sigma: f64) -> f64 {
    if !(sigma > 0.0) {
        return 0.0;
    }
    let z = (x - mu) / sigma;
    (-0.5 * z * z).exp() / (sigma * (2.0 * PI).sqrt())
}

/// Natural log of [`gaussian_pdf`], evaluated without the `exp`.
///
/// Stays finite where the density itself underflows, which is what the
/// responsibility computation relies on.
pub fn log_gaussian_pdf(x: f64, mu: f64, sigma: f64) -> f64 {
    if !(sigma > 0.0) {
        return f64::NEG_INFINITY;
    }
    let z = (x - mu) / sigma;
    -0.5 * z * z - sigma.ln() - 0.5 * (2.0 * PI).ln()
}

/// Log-sum-exp for numerical stability.
pub fn log_sum_exp(values: &[f64]) -> f64 {
    if values.is_empty() {
        return f64::NEG_INFINITY;
    }
    let max_val = values.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
    if max_val.is_infinite() {
        return max_val;
    }
    max_val
        + values
            .iter()
            .map(|&v| (v - max_val).exp())
            .sum::<f64>()
            .ln()
}

/// Arithmetic mean; `0.0` for an empty slice.
pub fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

/// Population variance (divides by `n`); `0.0` for an empty slice.
pub fn variance(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let m = mean(values);
    values.iter().map(|&v| (v - m) * (v - m)).sum::<f64>() / values.len() as f64
}

/// `(min, max)` of a slice, or `None` when it is empty.
pub fn min_max(values: &[f64]) -> Option<(f64, f64)> {
    let first = *values.first()?;
    Some(
        values
            .iter()
            .fold((first, first), |(lo, hi), &v| (lo.min(v), hi.max(v))),
    )
}
