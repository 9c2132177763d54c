//! Bit positions via double hashing over MurmurHash3.

use std::io::Cursor;

fn murmur(value: &[u8], seed: u32) -> u64 {
    let mut cursor = Cursor::new(value);
    // Reading from an in-memory cursor cannot fail
    murmur3::murmur3_x64_128(&mut cursor, seed).unwrap_or(0) as u64
}

/// Compute `k` positions in `[0, m)` for a value: h(i) = h1 + i * h2
pub fn positions(value: &[u8], k: usize, m: usize) -> impl Iterator<Item = usize> {
    let h1 = murmur(value, 0);
    let h2 = murmur(value, 1);
    let m = m as u64;

    (0..k as u64).map(move |i| (h1.wrapping_add(i.wrapping_mul(h2)) % m) as usize)
}
