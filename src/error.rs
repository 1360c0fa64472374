//! Error types shared by the bit-array store, the engine and the boundary layer

use thiserror::Error;

/// Coarse classification of a [`BloomError`].
///
/// The boundary layer maps each kind onto a stable status code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    InvalidParameters,
    DimensionMismatch,
    MalformedBuffer,
    IndexOutOfRange,
}

/// Errors returned by filter construction, deserialization and bit access
#[derive(Debug, Clone, PartialEq, Error)]
pub enum BloomError {
    /// Zero item estimate, out-of-range false-positive target or zero hash count
    #[error("Invalid parameters: {0}")]
    InvalidParameters(String),

    /// The decoded bit array does not hold exactly `m` bits
    #[error("Dimension mismatch: expected {expected} bits, buffer holds {actual}")]
    DimensionMismatch { expected: u64, actual: u64 },

    /// Buffer too short or internally inconsistent
    #[error("Malformed buffer: {0}")]
    MalformedBuffer(String),

    /// Bit access beyond the declared capacity
    #[error("Index {index} out of range for {len} bits")]
    IndexOutOfRange { index: u64, len: u64 },
}

impl BloomError {
    pub(crate) fn invalid(msg: impl Into<String>) -> Self {
        BloomError::InvalidParameters(msg.into())
    }

    pub(crate) fn malformed(msg: impl Into<String>) -> Self {
        BloomError::MalformedBuffer(msg.into())
    }

    /// Return the kind of this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            BloomError::InvalidParameters(_) => ErrorKind::InvalidParameters,
            BloomError::DimensionMismatch { .. } => ErrorKind::DimensionMismatch,
            BloomError::MalformedBuffer(_) => ErrorKind::MalformedBuffer,
            BloomError::IndexOutOfRange { .. } => ErrorKind::IndexOutOfRange,
        }
    }
}

pub type Result<T> = std::result::Result<T, BloomError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = BloomError::DimensionMismatch {
            expected: 64,
            actual: 72,
        };
        assert_eq!(
            err.to_string(),
            "Dimension mismatch: expected 64 bits, buffer holds 72"
        );

        let err = BloomError::malformed("buffer too short");
        assert_eq!(err.to_string(), "Malformed buffer: buffer too short");
    }

    #[test]
    fn test_error_kind() {
        assert_eq!(
            BloomError::invalid("k must be > 0").kind(),
            ErrorKind::InvalidParameters
        );
        assert_eq!(
            BloomError::IndexOutOfRange { index: 9, len: 8 }.kind(),
            ErrorKind::IndexOutOfRange
        );
    }
}
