//! Element hashing for the Bloom engine
//!
//! Each element is digested once into a pair of 64-bit values `(h1, h2)`;
//! the `i`-th probe position is `(h1 + i * h2) mod m` (Kirsch–Mitzenmacher
//! double hashing). Both halves are FNV-1a digests under different offset
//! bases, passed through a 64-bit finalizer so short keys such as 4-byte
//! integers still spread across the whole word.

use fnv::FnvHasher;
use std::hash::Hasher;

/// Offset basis for the second FNV stream
const SECOND_STREAM_KEY: u64 = 0x9e37_79b9_7f4a_7c15;

/// 64-bit finalizer from MurmurHash3
#[inline]
fn fmix64(mut x: u64) -> u64 {
    x ^= x >> 33;
    x = x.wrapping_mul(0xff51_afd7_ed55_8ccd);
    x ^= x >> 33;
    x = x.wrapping_mul(0xc4ce_b9fe_1a85_ec53);
    x ^= x >> 33;
    x
}

#[inline]
fn fnv64(key: u64, element: &[u8]) -> u64 {
    let mut hasher = FnvHasher::with_key(key);
    hasher.write(element);
    hasher.finish()
}

/// Pair of base hashes from which all `k` probe positions are derived
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DoubleHash {
    h1: u64,
    h2: u64,
}

impl DoubleHash {
    /// Digest an element
    pub fn of(element: &[u8]) -> Self {
        let mut first = FnvHasher::default();
        first.write(element);
        let h1 = fmix64(first.finish());
        // odd step so a power-of-two modulus still visits distinct positions
        let h2 = fmix64(fnv64(SECOND_STREAM_KEY, element)) | 1;
        DoubleHash { h1, h2 }
    }

    /// Position of probe `i` in a bit array of `modulus` bits
    #[inline]
    pub fn index(&self, i: u32, modulus: u32) -> u32 {
        if modulus == 0 {
            return 0;
        }
        let combined = self.h1.wrapping_add(u64::from(i).wrapping_mul(self.h2));
        (combined % u64::from(modulus)) as u32
    }

    /// All `k` probe positions for a bit array of `modulus` bits
    pub fn indices(self, k: u32, modulus: u32) -> impl Iterator<Item = u32> {
        (0..k).map(move |i| self.index(i, modulus))
    }
}

/// Encode a fixed-width integer key the way the batch operations do
#[inline]
pub fn encode_u32(value: u32) -> [u8; 4] {
    value.to_le_bytes()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_double_hash_deterministic() {
        assert_eq!(DoubleHash::of(b"alpha"), DoubleHash::of(b"alpha"));
        assert_ne!(DoubleHash::of(b"alpha"), DoubleHash::of(b"beta"));
    }

    #[test]
    fn test_indices_in_range() {
        let hash = DoubleHash::of(b"some key");
        for m in [1u32, 7, 64, 1000, 9586] {
            assert!(hash.indices(7, m).all(|idx| idx < m));
        }
        assert_eq!(hash.index(3, 0), 0);
        assert_eq!(hash.index(3, 1), 0);
    }

    #[test]
    fn test_probe_diversity() {
        // Distinct probe positions for a single key
        let hash = DoubleHash::of(&encode_u32(42));
        let positions: std::collections::HashSet<u32> = hash.indices(7, 1024).collect();
        assert_eq!(positions.len(), 7);
    }

    #[test]
    fn test_small_integer_keys_spread() {
        // Consecutive integers must not collapse onto a few positions
        let firsts: std::collections::HashSet<u32> = (0..100u32)
            .map(|v| DoubleHash::of(&encode_u32(v)).index(0, 10_000))
            .collect();
        assert!(firsts.len() > 90);
    }

    #[test]
    fn test_encode_u32_little_endian() {
        assert_eq!(encode_u32(1), [1, 0, 0, 0]);
        assert_eq!(encode_u32(0x0403_0201), [1, 2, 3, 4]);
    }
}
