//! # Shaped Bloom
//!
//! A Bloom filter whose state can be handed across a language boundary.
//!
//! The crate is layered bottom-up:
//! - [`bitarray`]: fixed-length bit array with a self-describing byte encoding
//! - [`bloom`]: the filter engine (sizing, insertion, membership, export)
//! - [`handle`] and [`ffi`]: the `#[repr(C)]` handle and the C ABI around it
//!
//! Enable the `python` feature to build the PyO3 extension module.

pub mod bitarray;
pub mod bloom;
pub mod config;
pub mod error;
pub mod ffi;
pub mod handle;
pub mod hash;
pub mod params;
pub mod serialized;

pub use bitarray::BitArray;
pub use bloom::{BloomFilter, BloomStats};
pub use config::ErrorPolicy;
pub use error::{BloomError, ErrorKind, Result};
pub use handle::BloomHandle;
pub use params::{optimal_bloom_parameters, BloomParameters};
pub use serialized::SerializedForm;

// Python bindings
#[cfg(feature = "python")]
pub mod python_module;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_basic_bloom_filter() {
        let mut bloom = BloomFilter::with_estimates(1000, 0.01).unwrap();

        bloom.add(b"alpha");
        bloom.add(b"beta");

        assert!(bloom.test(b"alpha"));
        assert!(bloom.test(b"beta"));
    }

    #[test]
    fn test_canonical_form_round_trip() {
        let mut bloom = BloomFilter::with_estimates(10, 0.01).unwrap();
        bloom.add_many(&[1, 5, 6]);

        let encoded = bloom.export().to_bytes().unwrap();
        let form = SerializedForm::from_bytes(&encoded).unwrap();
        let handle = BloomHandle::open_from_form(&form).unwrap();

        assert_eq!(handle.export().to_bytes().unwrap(), encoded);
        assert_eq!(handle.test_many(&[1, 5, 6]), vec![true; 3]);
    }
}
