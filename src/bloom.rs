//! Standard Bloom filter implementation
//!
//! A space-efficient probabilistic data structure for membership testing.
//! The filter owns its dimensions `(m, k)` and a [`BitArray`]; only `add`
//! mutates it, and bits only ever go from 0 to 1.

use crate::bitarray::BitArray;
use crate::hash::{encode_u32, DoubleHash};
use crate::params::optimal_bloom_parameters;
use crate::serialized::SerializedForm;
use crate::{BloomError, Result};

/// A standard Bloom filter
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BloomFilter {
    /// Bit count
    m: u32,
    /// Hash count
    k: u32,
    /// Bit array storing the filter data
    bits: BitArray,
}

impl BloomFilter {
    /// Create a filter sized for `expected_items` at the target false positive rate
    ///
    /// # Arguments
    /// * `expected_items` - Expected number of elements to insert
    /// * `fp_rate` - Desired false positive rate, in (0, 1)
    pub fn with_estimates(expected_items: u64, fp_rate: f64) -> Result<Self> {
        let params = optimal_bloom_parameters(expected_items, fp_rate)?;
        tracing::debug!(
            expected_items,
            fp_rate,
            m = params.num_bits,
            k = params.num_hashes,
            "created bloom filter from estimates"
        );
        Self::with_size(params.num_bits, params.num_hashes)
    }

    /// Create an empty filter with explicit dimensions
    pub fn with_size(m: u32, k: u32) -> Result<Self> {
        check_dimensions(m, k)?;
        Ok(BloomFilter {
            m,
            k,
            bits: BitArray::new(m as usize),
        })
    }

    /// Rehydrate a filter from `(m, k)` and a serialized bit array
    ///
    /// `k` is kept verbatim. The buffer must decode to exactly `m` bits.
    pub fn from_serialized(m: u32, k: u32, bytes: &[u8]) -> Result<Self> {
        check_dimensions(m, k)?;
        let bits = BitArray::deserialize(bytes)?;
        if bits.len() as u64 != u64::from(m) {
            return Err(BloomError::DimensionMismatch {
                expected: u64::from(m),
                actual: bits.len() as u64,
            });
        }
        tracing::debug!(m, k, bytes = bytes.len(), "rehydrated bloom filter");
        Ok(BloomFilter { m, k, bits })
    }

    /// Rehydrate a filter from an exported snapshot
    pub fn from_form(form: &SerializedForm) -> Result<Self> {
        Self::from_serialized(form.m, form.k, &form.bytes)
    }

    /// Insert an element
    pub fn add(&mut self, element: &[u8]) {
        for idx in DoubleHash::of(element).indices(self.k, self.m) {
            // idx < m == bits.len()
            if let Err(err) = self.bits.set(idx as usize) {
                unreachable!("bloom probe escaped the bit array: {}", err);
            }
        }
    }

    /// Insert each value as its 4-byte little-endian encoding
    pub fn add_many(&mut self, elements: &[u32]) {
        for &value in elements {
            self.add(&encode_u32(value));
        }
    }

    /// Check if an element might be in the filter
    /// Returns true if the element might be present (with possible false positives)
    /// Returns false if the element is definitely not present
    pub fn test(&self, element: &[u8]) -> bool {
        DoubleHash::of(element)
            .indices(self.k, self.m)
            .all(|idx| self.bits.get(idx as usize).unwrap_or(false))
    }

    /// Test each value independently, in input order
    pub fn test_many(&self, elements: &[u32]) -> Vec<bool> {
        elements
            .iter()
            .map(|&value| self.test(&encode_u32(value)))
            .collect()
    }

    /// Get the capacity (number of bits)
    pub fn capacity(&self) -> u32 {
        self.m
    }

    /// Get the number of hash functions
    pub fn hash_count(&self) -> u32 {
        self.k
    }

    /// Underlying bit array
    pub fn bit_array(&self) -> &BitArray {
        &self.bits
    }

    /// Number of bits currently set
    pub fn bits_set(&self) -> usize {
        self.bits.count_ones()
    }

    /// Get the current load factor (fraction of bits set)
    pub fn load_factor(&self) -> f64 {
        self.bits_set() as f64 / f64::from(self.m)
    }

    /// Get the estimated false positive rate
    pub fn estimated_fpr(&self) -> f64 {
        self.load_factor().powi(self.k as i32)
    }

    /// Snapshot `(m, k, serialized bits)`
    pub fn export(&self) -> SerializedForm {
        SerializedForm {
            m: self.m,
            k: self.k,
            bytes: self.bits.serialize(),
        }
    }

    /// Get statistics about the filter
    pub fn stats(&self) -> BloomStats {
        let load_factor = self.load_factor();
        BloomStats {
            capacity: self.m,
            num_hash_functions: self.k,
            bits_set: self.bits_set(),
            load_factor,
            estimated_fpr: load_factor.powi(self.k as i32),
        }
    }
}

fn check_dimensions(m: u32, k: u32) -> Result<()> {
    if m == 0 {
        return Err(BloomError::invalid("bit count must be > 0"));
    }
    if k == 0 {
        return Err(BloomError::invalid("hash count must be > 0"));
    }
    Ok(())
}

/// Statistics about a Bloom filter
#[derive(Debug, Clone)]
pub struct BloomStats {
    pub capacity: u32,
    pub num_hash_functions: u32,
    pub bits_set: usize,
    pub load_factor: f64,
    pub estimated_fpr: f64,
}

impl std::fmt::Display for BloomStats {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(
            f,
            "BloomFilter Stats:\n\
             - Capacity: {} bits\n\
             - Hash functions: {}\n\
             - Bits set: {}\n\
             - Load factor: {:.3}\n\
             - Estimated FPR: {:.6}",
            self.capacity,
            self.num_hash_functions,
            self.bits_set,
            self.load_factor,
            self.estimated_fpr
        )
    }
}
