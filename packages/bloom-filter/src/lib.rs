//! Probabilistic membership filter.
//!
//! Used by the `bloom` output format to ship a compact "have we seen this
//! value" set instead of the full indicator list.
//!
//! # Example
//!
//! ```rust
//! use bloom_filter::BloomFilter;
//!
//! let mut filter = BloomFilter::initialize(100, 0.001)?;
//! filter.add(b"evil.example.com");
//! assert!(filter.check(b"evil.example.com"));
//!
//! let mut buf: Vec<u8> = Vec::new();
//! filter.write(&mut buf)?;
//! let restored = BloomFilter::load(buf.as_slice())?;
//! assert!(restored.check(b"evil.example.com"));
//! # Ok::<(), bloom_filter::BloomError>(())
//! ```

pub mod error;
pub mod filter;
pub mod hash;
pub mod params;

pub use error::{BloomError, Result};
pub use filter::{BloomFilter, MAX_ENCODED_BYTES};
