//! Flattened `(m, k, bytes)` form of a filter
//!
//! Canonical encoding, all integers little-endian:
//!
//! ```text
//! byte 0       serial version
//! byte 1       family id
//! bytes 2-3    reserved, zero
//! bytes 4-7    m
//! bytes 8-11   k
//! bytes 12-15  b_length
//! bytes 16..   bit-array encoding (b_length bytes)
//! ```

use crate::{BloomError, Result};
use byteorder::{ByteOrder, LittleEndian, ReadBytesExt};
use std::io::{Cursor, Read};

const SERIAL_VERSION: u8 = 1;
const FAMILY_ID: u8 = 0x42;
const PREAMBLE_LEN: usize = 16;

/// Snapshot of a filter: dimensions plus the serialized bit array
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SerializedForm {
    /// Bit count
    pub m: u32,
    /// Hash count
    pub k: u32,
    /// Bit-array bytes as produced by [`crate::BitArray::serialize`]
    pub bytes: Vec<u8>,
}

impl SerializedForm {
    /// Length of the bit-array buffer
    pub fn byte_length(&self) -> usize {
        self.bytes.len()
    }

    /// Encode into the canonical versioned layout
    ///
    /// Fails with `InvalidParameters` when the payload does not fit the
    /// 32-bit length field.
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        let b_length = payload_length(self.bytes.len())?;

        let mut preamble = [0u8; PREAMBLE_LEN];
        preamble[0] = SERIAL_VERSION;
        preamble[1] = FAMILY_ID;
        LittleEndian::write_u16(&mut preamble[2..4], 0);
        LittleEndian::write_u32(&mut preamble[4..8], self.m);
        LittleEndian::write_u32(&mut preamble[8..12], self.k);
        LittleEndian::write_u32(&mut preamble[12..16], b_length);

        let mut out = Vec::with_capacity(PREAMBLE_LEN + self.bytes.len());
        out.extend_from_slice(&preamble);
        out.extend_from_slice(&self.bytes);
        Ok(out)
    }

    /// Decode the canonical layout
    ///
    /// Only the framing is checked here; the bit-array payload is validated
    /// when the form is turned back into a filter.
    pub fn from_bytes(encoded: &[u8]) -> Result<Self> {
        if encoded.len() < PREAMBLE_LEN {
            return Err(BloomError::malformed(format!(
                "serialized filter of {} bytes is shorter than the {}-byte preamble",
                encoded.len(),
                PREAMBLE_LEN
            )));
        }

        let mut cursor = Cursor::new(encoded);
        let short = |_| BloomError::malformed("truncated preamble");

        let version = cursor.read_u8().map_err(short)?;
        if version != SERIAL_VERSION {
            return Err(BloomError::malformed(format!(
                "unsupported serial version: expected {}, got {}",
                SERIAL_VERSION, version
            )));
        }
        let family = cursor.read_u8().map_err(short)?;
        if family != FAMILY_ID {
            return Err(BloomError::malformed(format!(
                "invalid family: expected {:#x}, got {:#x}",
                FAMILY_ID, family
            )));
        }
        let reserved = cursor.read_u16::<LittleEndian>().map_err(short)?;
        if reserved != 0 {
            return Err(BloomError::malformed(format!(
                "nonzero reserved field: {:#06x}",
                reserved
            )));
        }
        let m = cursor.read_u32::<LittleEndian>().map_err(short)?;
        let k = cursor.read_u32::<LittleEndian>().map_err(short)?;
        let b_length = cursor.read_u32::<LittleEndian>().map_err(short)? as usize;

        let remaining = encoded.len() - PREAMBLE_LEN;
        if remaining != b_length {
            return Err(BloomError::malformed(format!(
                "preamble declares {} payload bytes but {} follow",
                b_length, remaining
            )));
        }

        let mut bytes = vec![0u8; b_length];
        cursor
            .read_exact(&mut bytes)
            .map_err(|_| BloomError::malformed("truncated payload"))?;

        Ok(SerializedForm { m, k, bytes })
    }
}

fn payload_length(len: usize) -> Result<u32> {
    u32::try_from(len).map_err(|_| {
        BloomError::invalid(format!(
            "payload of {} bytes exceeds the 32-bit length field",
            len
        ))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> SerializedForm {
        SerializedForm {
            m: 64,
            k: 4,
            bytes: vec![64, 0, 0, 0, 0, 0, 0, 0, 1, 2, 3, 4, 5, 6, 7, 8],
        }
    }

    #[test]
    fn test_preamble_layout() {
        let encoded = sample().to_bytes().unwrap();
        assert_eq!(encoded.len(), 16 + 16);
        assert_eq!(encoded[0], SERIAL_VERSION);
        assert_eq!(encoded[1], FAMILY_ID);
        assert_eq!(&encoded[4..8], &64u32.to_le_bytes());
        assert_eq!(&encoded[8..12], &4u32.to_le_bytes());
        assert_eq!(&encoded[12..16], &16u32.to_le_bytes());
        assert_eq!(&encoded[2..4], &[0, 0]);
        assert_eq!(SerializedForm::from_bytes(&encoded).unwrap(), sample());
    }

    #[test]
    fn test_payload_length_is_checked() {
        assert_eq!(payload_length(16).unwrap(), 16);
        assert_eq!(payload_length(u32::MAX as usize).unwrap(), u32::MAX);
        #[cfg(target_pointer_width = "64")]
        assert!(matches!(
            payload_length(u32::MAX as usize + 1),
            Err(BloomError::InvalidParameters(_))
        ));
    }

    #[test]
    fn test_rejects_bad_framing() {
        let encoded = sample().to_bytes().unwrap();

        assert!(SerializedForm::from_bytes(&encoded[..10]).is_err());
        assert!(SerializedForm::from_bytes(&encoded[..encoded.len() - 1]).is_err());

        let mut bad_version = encoded.clone();
        bad_version[0] = 9;
        assert!(matches!(
            SerializedForm::from_bytes(&bad_version),
            Err(BloomError::MalformedBuffer(_))
        ));

        let mut bad_family = encoded.clone();
        bad_family[1] = 0;
        assert!(SerializedForm::from_bytes(&bad_family).is_err());

        for (index, value) in [(2, 0xff), (3, 0x01)] {
            let mut reserved = encoded.clone();
            reserved[index] = value;
            assert!(matches!(
                SerializedForm::from_bytes(&reserved),
                Err(BloomError::MalformedBuffer(_))
            ));
        }

        let mut trailing = encoded;
        trailing.push(0);
        assert!(SerializedForm::from_bytes(&trailing).is_err());
    }
}
