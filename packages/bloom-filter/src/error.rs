//! Error types for the bloom filter.

use thiserror::Error;

/// Result type for filter operations.
pub type Result<T> = std::result::Result<T, BloomError>;

/// Bloom filter errors.
#[derive(Debug, Error)]
pub enum BloomError {
    /// Two filters with different geometry cannot be joined
    #[error("Incompatible filters: {left_bits}x{left_hashes} vs {right_bits}x{right_hashes}")]
    Incompatible {
        left_bits: usize,
        left_hashes: usize,
        right_bits: usize,
        right_hashes: usize,
    },

    /// Invalid false positive rate (must be in the open interval (0, 1))
    #[error("Invalid false positive rate: {0}")]
    InvalidRate(f64),

    /// Encoded filter could not be read
    #[error("Decode error: {0}")]
    Decode(String),

    /// Encoded filter could not be written
    #[error("Encode error: {0}")]
    Encode(String),
}
