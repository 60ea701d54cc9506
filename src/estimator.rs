//! The HyperLogLog cardinality estimator: raw estimate, small-range bias
//! correction, LinearCounting, and the algorithm switch.

use crate::bias::{correct_bias, threshold};
use crate::precision::Precision;

/// Computes the cardinality estimate from the indicator function `(Z^-1, V)`
/// over a dense/sparse register store.
pub(crate) fn estimate(precision: &Precision, z_inv: f64, zero_count: u32) -> u64 {
    let m = precision.m() as f64;

    let mut raw = precision.alpha_m * m * m / z_inv;

    if raw <= 5.0 * m {
        raw = correct_bias(raw, precision.b());
    }

    let linear_counting = if zero_count > 0 {
        m * (m / zero_count as f64).ln()
    } else {
        raw
    };

    let estimate = if linear_counting <= threshold(precision.b()) {
        linear_counting
    } else {
        raw
    };

    estimate.round() as u64
}
