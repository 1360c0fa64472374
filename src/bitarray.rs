//! Fixed-length bit array with a self-describing byte encoding
//!
//! The store knows nothing about hashing. It packs `len` bits into bytes and
//! serializes them behind an 8-byte little-endian bit-count header:
//!
//! ```text
//! [0..8)          bit count n (u64, little-endian)
//! [8..8+ceil(n/8)) packed bits, most significant bit first within each byte
//! ```
//!
//! Padding bits in the final byte are always zero.

use crate::{BloomError, Result};
use bit_vec::BitVec;
use byteorder::{ByteOrder, LittleEndian};

/// Size of the bit-count header in bytes
pub const HEADER_LEN: usize = 8;

/// Number of bytes needed to hold `bits` bits
fn packed_len(bits: u64) -> u64 {
    bits / 8 + u64::from(bits % 8 != 0)
}

/// An opaque, fixed-length sequence of bits
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BitArray {
    bits: BitVec,
}

impl BitArray {
    /// Create a zeroed bit array holding `size` bits
    pub fn new(size: usize) -> Self {
        BitArray {
            bits: BitVec::from_elem(size, false),
        }
    }

    /// Number of bits in the array
    pub fn len(&self) -> usize {
        self.bits.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bits.is_empty()
    }

    /// Read the bit at `index`
    pub fn get(&self, index: usize) -> Result<bool> {
        self.bits.get(index).ok_or(BloomError::IndexOutOfRange {
            index: index as u64,
            len: self.bits.len() as u64,
        })
    }

    /// Set the bit at `index`. Setting an already-set bit is a no-op.
    pub fn set(&mut self, index: usize) -> Result<()> {
        if index >= self.bits.len() {
            return Err(BloomError::IndexOutOfRange {
                index: index as u64,
                len: self.bits.len() as u64,
            });
        }
        self.bits.set(index, true);
        Ok(())
    }

    /// Number of bits currently set
    pub fn count_ones(&self) -> usize {
        self.bits.iter().filter(|&bit| bit).count()
    }

    /// Length of the encoding produced by [`serialize`](Self::serialize)
    pub fn serialized_len(&self) -> usize {
        HEADER_LEN + packed_len(self.bits.len() as u64) as usize
    }

    /// Encode the array as header + packed bits
    pub fn serialize(&self) -> Vec<u8> {
        let mut out = vec![0u8; HEADER_LEN];
        LittleEndian::write_u64(&mut out[..HEADER_LEN], self.bits.len() as u64);
        out.extend_from_slice(&self.bits.to_bytes());
        out
    }

    /// Decode an array previously produced by [`serialize`](Self::serialize)
    ///
    /// Fails with `MalformedBuffer` if the buffer is shorter than the header,
    /// if the payload length disagrees with the header, or if any padding bit
    /// in the final byte is set.
    pub fn deserialize(bytes: &[u8]) -> Result<Self> {
        if bytes.len() < HEADER_LEN {
            return Err(BloomError::malformed(format!(
                "buffer of {} bytes is shorter than the {}-byte header",
                bytes.len(),
                HEADER_LEN
            )));
        }

        let bit_count = LittleEndian::read_u64(&bytes[..HEADER_LEN]);
        let payload = &bytes[HEADER_LEN..];
        let expected = packed_len(bit_count);
        if payload.len() as u64 != expected {
            return Err(BloomError::malformed(format!(
                "header declares {} bits ({} bytes) but payload has {} bytes",
                bit_count,
                expected,
                payload.len()
            )));
        }
        let size = usize::try_from(bit_count)
            .map_err(|_| BloomError::malformed(format!("bit count {} too large", bit_count)))?;

        let tail_bits = (bit_count % 8) as u32;
        if tail_bits != 0 {
            let padding_mask = (1u8 << (8 - tail_bits)) - 1;
            if let Some(&last) = payload.last() {
                if last & padding_mask != 0 {
                    return Err(BloomError::malformed("nonzero padding bits in final byte"));
                }
            }
        }

        let mut bits = BitVec::from_bytes(payload);
        bits.truncate(size);
        Ok(BitArray { bits })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_is_zeroed() {
        let bits = BitArray::new(100);
        assert_eq!(bits.len(), 100);
        assert_eq!(bits.count_ones(), 0);
        assert!(!bits.get(99).unwrap());
    }

    #[test]
    fn test_set_and_get() {
        let mut bits = BitArray::new(20);
        bits.set(3).unwrap();
        bits.set(19).unwrap();
        assert!(bits.get(3).unwrap());
        assert!(bits.get(19).unwrap());
        assert!(!bits.get(4).unwrap());
        assert_eq!(bits.count_ones(), 2);
    }

    #[test]
    fn test_set_is_idempotent() {
        let mut bits = BitArray::new(16);
        bits.set(7).unwrap();
        let once = bits.clone();
        bits.set(7).unwrap();
        assert_eq!(bits, once);
        assert_eq!(bits.count_ones(), 1);
    }

    #[test]
    fn test_out_of_range() {
        let mut bits = BitArray::new(8);
        assert_eq!(
            bits.set(8),
            Err(BloomError::IndexOutOfRange { index: 8, len: 8 })
        );
        assert!(bits.get(100).is_err());
    }

    #[test]
    fn test_serialize_layout() {
        let mut bits = BitArray::new(10);
        bits.set(0).unwrap();
        bits.set(9).unwrap();

        let bytes = bits.serialize();
        assert_eq!(bytes.len(), bits.serialized_len());
        assert_eq!(&bytes[..8], &10u64.to_le_bytes());
        assert_eq!(&bytes[8..], &[0b1000_0000, 0b0100_0000]);
    }

    #[test]
    fn test_deserialize_restores_bits() {
        let mut bits = BitArray::new(77);
        for i in [0, 13, 40, 76] {
            bits.set(i).unwrap();
        }
        let restored = BitArray::deserialize(&bits.serialize()).unwrap();
        assert_eq!(restored, bits);
        assert_eq!(restored.len(), 77);
        assert!(restored.get(76).unwrap());
    }

    #[test]
    fn test_deserialize_short_buffer() {
        let err = BitArray::deserialize(&[1, 2]).unwrap_err();
        assert!(matches!(err, BloomError::MalformedBuffer(_)));
    }

    #[test]
    fn test_deserialize_length_mismatch() {
        let mut bytes = BitArray::new(64).serialize();
        bytes.pop();
        assert!(matches!(
            BitArray::deserialize(&bytes),
            Err(BloomError::MalformedBuffer(_))
        ));

        let mut bytes = BitArray::new(64).serialize();
        bytes.push(0);
        assert!(matches!(
            BitArray::deserialize(&bytes),
            Err(BloomError::MalformedBuffer(_))
        ));
    }

    #[test]
    fn test_deserialize_rejects_padding_bits() {
        let mut bytes = BitArray::new(12).serialize();
        // bits 12..16 are padding
        *bytes.last_mut().unwrap() = 0b0000_0001;
        assert!(matches!(
            BitArray::deserialize(&bytes),
            Err(BloomError::MalformedBuffer(_))
        ));
    }

    #[test]
    fn test_empty_array() {
        let bits = BitArray::new(0);
        assert!(bits.is_empty());
        let bytes = bits.serialize();
        assert_eq!(bytes.len(), HEADER_LEN);
        assert!(BitArray::deserialize(&bytes).unwrap().is_empty());
    }
}
