//! Core bloom filter.
//!
//! A value that was added is always reported by `check`; values that were
//! never added are reported with probability close to the configured rate.

use std::io::{Read, Write};

use bincode::Options;
use bitvec::prelude::*;
use serde::{Deserialize, Serialize};

use crate::error::{BloomError, Result};
use crate::hash::positions;
use crate::params::{expected_fp_rate, optimal_geometry};

/// Largest encoded filter `load` accepts (1 GiB).
pub const MAX_ENCODED_BYTES: u64 = 1 << 30;

/// Fixed-width little-endian encoding, the layout `bincode::serialize` uses.
fn codec() -> impl Options {
    bincode::DefaultOptions::new()
        .with_fixint_encoding()
        .allow_trailing_bytes()
        .with_limit(MAX_ENCODED_BYTES)
}

/// Bloom filter for probabilistic membership testing.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct BloomFilter {
    /// Capacity the filter was sized for
    capacity: usize,
    /// Target false positive rate at capacity
    fp_rate: f64,
    /// Number of hash functions (k)
    hash_count: usize,
    /// Values added so far
    inserted: usize,
    #[serde(with = "bitvec_serde")]
    bits: BitVec<u8, Lsb0>,
}

mod bitvec_serde {
    use bitvec::prelude::*;
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    pub fn serialize<S>(bits: &BitVec<u8, Lsb0>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        (bits.as_raw_slice(), bits.len()).serialize(serializer)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<BitVec<u8, Lsb0>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let (bytes, len): (Vec<u8>, usize) = Deserialize::deserialize(deserializer)?;
        let mut bits = BitVec::<u8, Lsb0>::from_vec(bytes);
        bits.truncate(len);
        Ok(bits)
    }
}

impl BloomFilter {
    /// Create an empty filter sized for `capacity` values at `fp_rate`.
    pub fn initialize(capacity: usize, fp_rate: f64) -> Result<Self> {
        if !(fp_rate > 0.0 && fp_rate < 1.0) {
            return Err(BloomError::InvalidRate(fp_rate));
        }

        let geometry = optimal_geometry(capacity, fp_rate);
        Ok(Self {
            capacity,
            fp_rate,
            hash_count: geometry.hash_count,
            inserted: 0,
            bits: bitvec![u8, Lsb0; 0; geometry.size_bits],
        })
    }

    /// Add a value. `check(value)` returns true afterwards.
    pub fn add(&mut self, value: &[u8]) {
        for pos in positions(value, self.hash_count, self.bits.len()) {
            self.bits.set(pos, true);
        }
        self.inserted += 1;
    }

    /// Test whether a value might have been added.
    pub fn check(&self, value: &[u8]) -> bool {
        positions(value, self.hash_count, self.bits.len()).all(|pos| self.bits[pos])
    }

    /// Union `other` into this filter.
    ///
    /// Both filters must share bit length and hash count.
    pub fn join(&mut self, other: &BloomFilter) -> Result<()> {
        if self.bits.len() != other.bits.len() || self.hash_count != other.hash_count {
            return Err(BloomError::Incompatible {
                left_bits: self.bits.len(),
                left_hashes: self.hash_count,
                right_bits: other.bits.len(),
                right_hashes: other.hash_count,
            });
        }

        for (s, o) in self
            .bits
            .as_raw_mut_slice()
            .iter_mut()
            .zip(other.bits.as_raw_slice())
        {
            *s |= *o;
        }
        self.inserted += other.inserted;
        Ok(())
    }

    /// Serialize the filter into `writer`.
    pub fn write<W: Write>(&self, writer: W) -> Result<()> {
        codec()
            .serialize_into(writer, self)
            .map_err(|e| BloomError::Encode(e.to_string()))
    }

    /// Read a filter previously produced by [`BloomFilter::write`].
    pub fn load<R: Read>(reader: R) -> Result<Self> {
        let filter: BloomFilter = codec()
            .deserialize_from(reader)
            .map_err(|e| BloomError::Decode(e.to_string()))?;

        if filter.bits.is_empty() || filter.hash_count == 0 {
            return Err(BloomError::Decode("filter has no bits or hashes".into()));
        }
        Ok(filter)
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn fp_rate(&self) -> f64 {
        self.fp_rate
    }

    pub fn inserted(&self) -> usize {
        self.inserted
    }

    pub fn size_bits(&self) -> usize {
        self.bits.len()
    }

    pub fn hash_count(&self) -> usize {
        self.hash_count
    }

    /// False positive rate expected for the current fill level.
    pub fn current_fp_rate(&self) -> f64 {
        expected_fp_rate(self.bits.len(), self.hash_count, self.inserted)
    }
}
