//! Sizing helpers for Bloom filters

use crate::{BloomError, Result};
use std::f64::consts::LN_2;

/// Bloom filter dimensions derived from a capacity/error-rate estimate
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BloomParameters {
    /// Bit array length (m)
    pub num_bits: u32,
    /// Hash count (k)
    pub num_hashes: u32,
    /// Theoretical false positive rate once `expected_items` are inserted
    pub expected_fpr: f64,
}

/// Validate an estimate request and compute `(m, k)`
///
/// `m = ceil(-n * ln(p) / ln(2)^2)` and `k = round(m / n * ln(2))`, with `k`
/// clamped to at least 1.
pub fn optimal_bloom_parameters(expected_items: u64, fp_rate: f64) -> Result<BloomParameters> {
    if expected_items == 0 {
        return Err(BloomError::invalid("expected item count must be > 0"));
    }
    // NaN fails both comparisons
    if !(fp_rate > 0.0 && fp_rate < 1.0) {
        return Err(BloomError::invalid(format!(
            "false positive rate must be in (0, 1), got {}",
            fp_rate
        )));
    }

    let n = expected_items as f64;
    let bits = (-n * fp_rate.ln() / (LN_2 * LN_2)).ceil();
    if !bits.is_finite() || bits > f64::from(u32::MAX) {
        return Err(BloomError::invalid(format!(
            "{} items at rate {} need {} bits, more than a filter can hold",
            expected_items, fp_rate, bits
        )));
    }
    let num_bits = (bits as u32).max(1);

    let num_hashes = ((f64::from(num_bits) / n) * LN_2).round().max(1.0) as u32;

    Ok(BloomParameters {
        num_bits,
        num_hashes,
        expected_fpr: false_positive_rate(num_bits, num_hashes, expected_items),
    })
}

/// Theoretical false positive rate `(1 - e^(-k*n/m))^k`
pub fn false_positive_rate(num_bits: u32, num_hashes: u32, items: u64) -> f64 {
    if num_bits == 0 {
        return 1.0;
    }
    let m = f64::from(num_bits);
    let k = f64::from(num_hashes);
    (1.0 - (-k * items as f64 / m).exp()).powf(k)
}
