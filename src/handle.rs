//! Owning handle shared with foreign callers
//!
//! A [`BloomHandle`] starts with a fixed `#[repr(C)]` header
//! `{ m, k, b_length, b }` where `b` points at `b_length` bytes holding the
//! serialized bit array. Foreign code may read those four fields through a
//! handle pointer but must never write them, free `b`, or copy the handle by
//! value: the live filter follows the header and is private to Rust.
//!
//! Ownership rules:
//! - `m`, `k` and `b_length` are fixed when the handle is opened.
//! - Every mutating call builds a complete new buffer, installs it in `b`,
//!   and frees the buffer it replaced before returning. Callers must re-read
//!   `b` after any mutating call.
//! - Bytes passed in are copied; the handle never keeps a reference into
//!   caller memory.
//! - Dropping the handle frees the current buffer exactly once.

use crate::bloom::BloomFilter;
use crate::serialized::SerializedForm;
use crate::{BloomError, Result};
use std::ptr;

/// Filter state laid out for direct access from C
#[repr(C)]
#[derive(Debug)]
pub struct BloomHandle {
    m: u32,
    k: u32,
    b_length: u32,
    b: *mut u8,
    // not part of the C header
    filter: BloomFilter,
}

// SAFETY: the handle exclusively owns `b`; nothing else aliases the buffer.
unsafe impl Send for BloomHandle {}

/// Move `bytes` onto the heap as a boxed slice and leak it as a raw pointer
pub(crate) fn leak_buffer(bytes: Vec<u8>) -> (*mut u8, usize) {
    let boxed = bytes.into_boxed_slice();
    let len = boxed.len();
    (Box::into_raw(boxed) as *mut u8, len)
}

/// Release a buffer produced by [`leak_buffer`]
///
/// # Safety
/// `ptr`/`len` must come from a single `leak_buffer` call and must not have
/// been released already.
pub(crate) unsafe fn release_buffer(ptr: *mut u8, len: usize) {
    if !ptr.is_null() {
        drop(Box::from_raw(ptr::slice_from_raw_parts_mut(ptr, len)));
    }
}

impl BloomHandle {
    /// Open a handle over a fresh filter sized from estimates
    pub fn open_with_estimates(expected_items: u64, fp_rate: f64) -> Result<Self> {
        Self::from_filter(BloomFilter::with_estimates(expected_items, fp_rate)?)
    }

    /// Open a handle over a filter rehydrated from `(m, k, bytes)`
    ///
    /// The bytes are validated and copied.
    pub fn open_from_serialized(m: u32, k: u32, bytes: &[u8]) -> Result<Self> {
        Self::from_filter(BloomFilter::from_serialized(m, k, bytes)?)
    }

    /// Open a handle from an exported snapshot
    pub fn open_from_form(form: &SerializedForm) -> Result<Self> {
        Self::open_from_serialized(form.m, form.k, &form.bytes)
    }

    /// Open a handle that takes ownership of `filter`
    pub fn from_filter(filter: BloomFilter) -> Result<Self> {
        let bytes = filter.export().bytes;
        let b_length = u32::try_from(bytes.len()).map_err(|_| {
            BloomError::invalid(format!(
                "serialized filter of {} bytes exceeds the handle's length field",
                bytes.len()
            ))
        })?;
        let (b, _) = leak_buffer(bytes);
        tracing::trace!(b_length, "opened bloom filter handle");

        Ok(BloomHandle {
            m: filter.capacity(),
            k: filter.hash_count(),
            b_length,
            b,
            filter,
        })
    }

    pub fn capacity(&self) -> u32 {
        self.m
    }

    pub fn hash_count(&self) -> u32 {
        self.k
    }

    /// Length of the current bit-array buffer
    pub fn byte_length(&self) -> u32 {
        self.b_length
    }

    /// Current bit-array buffer
    pub fn bytes(&self) -> &[u8] {
        if self.b.is_null() {
            return &[];
        }
        // SAFETY: `b` always points at `b_length` bytes owned by this handle.
        unsafe { std::slice::from_raw_parts(self.b, self.b_length as usize) }
    }

    /// The filter the buffer was encoded from
    pub fn filter(&self) -> &BloomFilter {
        &self.filter
    }

    /// Snapshot `(m, k, bytes)`
    pub fn export(&self) -> SerializedForm {
        SerializedForm {
            m: self.m,
            k: self.k,
            bytes: self.bytes().to_vec(),
        }
    }

    /// Insert an element, replacing the buffer
    pub fn add(&mut self, element: &[u8]) {
        self.filter.add(element);
        self.replace_buffer();
    }

    /// Insert each value as its 4-byte little-endian encoding, replacing the buffer once
    pub fn add_many(&mut self, elements: &[u32]) {
        self.filter.add_many(elements);
        self.replace_buffer();
    }

    pub fn test(&self, element: &[u8]) -> bool {
        self.filter.test(element)
    }

    pub fn test_many(&self, elements: &[u32]) -> Vec<bool> {
        self.filter.test_many(elements)
    }

    /// Release the handle and its buffer
    pub fn close(self) {
        drop(self)
    }

    /// Re-encode the filter into a new buffer and free the one it replaces
    fn replace_buffer(&mut self) {
        let bytes = self.filter.export().bytes;
        // encoded length depends only on m, so it still fits b_length
        debug_assert_eq!(bytes.len(), self.b_length as usize);
        let (new_ptr, _) = leak_buffer(bytes);

        let stale_ptr = std::mem::replace(&mut self.b, new_ptr);
        tracing::trace!(b_length = self.b_length, "replaced bloom filter buffer");

        // SAFETY: the stale buffer was installed by from_filter or a previous
        // replace_buffer with the same length.
        unsafe { release_buffer(stale_ptr, self.b_length as usize) };
    }
}

impl Drop for BloomHandle {
    fn drop(&mut self) {
        let stale = std::mem::replace(&mut self.b, ptr::null_mut());
        // SAFETY: `b`/`b_length` were installed by from_filter or
        // replace_buffer and are released only here.
        unsafe { release_buffer(stale, self.b_length as usize) };
        self.b_length = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_open_with_estimates() {
        let handle = BloomHandle::open_with_estimates(10, 0.01).unwrap();
        assert_eq!(handle.capacity(), 96);
        assert_eq!(handle.hash_count(), 7);
        assert_eq!(handle.byte_length(), 8 + 12);
        assert_eq!(handle.bytes().len(), 20);
    }

    #[test]
    fn test_add_replaces_buffer() {
        let mut handle = BloomHandle::open_with_estimates(100, 0.01).unwrap();
        let before = handle.bytes().to_vec();

        handle.add(b"alpha");
        assert_ne!(handle.bytes(), &before[..]);
        assert_eq!(handle.byte_length() as usize, before.len());
        assert!(handle.test(b"alpha"));
        assert!(!handle.test(b"gamma"));
    }

    #[test]
    fn test_add_many_test_many() {
        let mut handle = BloomHandle::open_with_estimates(1000, 0.01).unwrap();
        handle.add_many(&[1, 2, 3]);
        assert_eq!(handle.test_many(&[1, 2, 3, 4]), vec![true, true, true, false]);
    }

    #[test]
    fn test_handle_matches_engine() {
        let mut filter = BloomFilter::with_estimates(50, 0.01).unwrap();
        let mut handle = BloomHandle::from_filter(filter.clone()).unwrap();

        for element in [&b"a"[..], b"bb", b"ccc"] {
            filter.add(element);
            handle.add(element);
        }
        assert_eq!(handle.export(), filter.export());
        assert_eq!(handle.filter(), &filter);
    }

    #[test]
    fn test_interleaved_add_and_test_match_engine() {
        let mut filter = BloomFilter::with_estimates(200, 0.01).unwrap();
        let mut handle = BloomHandle::from_filter(filter.clone()).unwrap();
        let probes: Vec<u32> = (0..400).collect();

        for round in 0..20u32 {
            let element = round.to_be_bytes();
            assert_eq!(handle.test(&element), filter.test(&element));

            filter.add(&element);
            handle.add(&element);
            filter.add_many(&[round * 7, round * 11]);
            handle.add_many(&[round * 7, round * 11]);

            assert!(handle.test(&element));
            assert_eq!(handle.test_many(&probes), filter.test_many(&probes));
            // the C-visible buffer tracks the live filter
            assert_eq!(handle.bytes(), &filter.export().bytes[..]);
        }
    }

    #[test]
    fn test_repeated_replacement_and_drop() {
        // Buffer ownership; meaningful under `cargo miri test`
        let mut handle = BloomHandle::open_with_estimates(64, 0.05).unwrap();
        let length = handle.byte_length();
        for value in 0..500u32 {
            handle.add_many(&[value]);
            assert_eq!(handle.byte_length(), length);
            assert_eq!(handle.bytes().len(), length as usize);
        }
        let snapshot = handle.export();
        drop(handle);

        let reopened = BloomHandle::open_from_form(&snapshot).unwrap();
        assert_eq!(reopened.export(), snapshot);
        reopened.close();
    }

    #[test]
    fn test_reopen_copies_buffer() {
        let mut original = BloomHandle::open_with_estimates(10, 0.01).unwrap();
        original.add_many(&[1, 5, 6]);

        let form = original.export();
        let mut copy = BloomHandle::open_from_form(&form).unwrap();
        assert_ne!(copy.bytes().as_ptr(), original.bytes().as_ptr());
        assert_eq!(copy.test_many(&[1, 5, 6]), vec![true; 3]);

        // mutating the copy leaves the original untouched
        copy.add(b"only in copy");
        assert_eq!(original.export(), form);
        original.close();
    }

    #[test]
    fn test_open_rejects_malformed() {
        assert!(matches!(
            BloomHandle::open_from_serialized(64, 4, &[0, 0]),
            Err(BloomError::MalformedBuffer(_))
        ));
        assert!(BloomHandle::open_with_estimates(0, 0.01).is_err());
    }
}
