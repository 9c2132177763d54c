//! Optimal filter geometry.
//!
//! - m = -n*ln(p) / (ln(2)^2)  -- bits
//! - k = (m/n) * ln(2)         -- hash functions

use std::f64::consts::LN_2;

/// Smallest bit array handed out, also used for empty filters.
pub const MIN_BITS: usize = 64;

/// Filter geometry for a capacity and false positive rate.
#[derive(Clone, Debug, PartialEq)]
pub struct Geometry {
    pub size_bits: usize,
    pub hash_count: usize,
}

/// Size a filter for `capacity` values at false positive rate `fp_rate`.
///
/// A zero capacity yields the minimal filter, which contains nothing.
pub fn optimal_geometry(capacity: usize, fp_rate: f64) -> Geometry {
    if capacity == 0 {
        return Geometry {
            size_bits: MIN_BITS,
            hash_count: 1,
        };
    }

    let n = capacity as f64;
    let m = (-n * fp_rate.ln() / (LN_2 * LN_2)).ceil() as usize;
    let m = m.max(MIN_BITS);
    let k = ((m as f64 / n) * LN_2).round() as usize;

    Geometry {
        size_bits: m,
        hash_count: k.clamp(1, 32),
    }
}

/// Expected false positive rate: (1 - e^(-kn/m))^k
pub fn expected_fp_rate(size_bits: usize, hash_count: usize, inserted: usize) -> f64 {
    if size_bits == 0 {
        return 1.0;
    }
    let exponent = -(hash_count as f64) * (inserted as f64) / (size_bits as f64);
    (1.0 - exponent.exp()).powi(hash_count as i32)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_geometry_for_thousand_values() {
        let g = optimal_geometry(1000, 0.01);
        // ~9586 bits, 7 hashes
        assert!(g.size_bits >= 9000 && g.size_bits <= 10_000, "m={}", g.size_bits);
        assert_eq!(g.hash_count, 7);
    }

    #[test]
    fn test_empty_geometry_is_minimal() {
        let g = optimal_geometry(0, 0.01);
        assert_eq!(g.size_bits, MIN_BITS);
        assert_eq!(g.hash_count, 1);
    }

    #[test]
    fn test_expected_rate_matches_target() {
        let g = optimal_geometry(500, 0.001);
        let rate = expected_fp_rate(g.size_bits, g.hash_count, 500);
        assert!(rate <= 0.0011, "rate={}", rate);
    }
}
