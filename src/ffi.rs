//! C ABI over [`BloomHandle`]
//!
//! Every function returns a [`BloomStatus`]; results travel through
//! out-parameters. On failure the out-parameters are left untouched and a
//! description is available from [`bloomf_last_error_message`] on the
//! calling thread.
//!
//! Handles come from `bloomf_new_*` and must be released with
//! [`bloomf_free`]. Flag buffers from [`bloomf_test_list_uint`] must be
//! released with [`bloomf_free_flags`]. See `include/shaped_bloom.h`.

use crate::config::ErrorPolicy;
use crate::error::ErrorKind;
use crate::handle::{leak_buffer, release_buffer, BloomHandle};
use crate::BloomError;
use std::cell::RefCell;
use std::ffi::{c_char, CString};
use std::ptr;
use std::sync::atomic::{AtomicU8, Ordering};

/// Outcome of a boundary call
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BloomStatus {
    Ok = 0,
    InvalidParameters = 1,
    DimensionMismatch = 2,
    MalformedBuffer = 3,
    IndexOutOfRange = 4,
    NullPointer = 5,
}

impl From<ErrorKind> for BloomStatus {
    fn from(kind: ErrorKind) -> Self {
        match kind {
            ErrorKind::InvalidParameters => BloomStatus::InvalidParameters,
            ErrorKind::DimensionMismatch => BloomStatus::DimensionMismatch,
            ErrorKind::MalformedBuffer => BloomStatus::MalformedBuffer,
            ErrorKind::IndexOutOfRange => BloomStatus::IndexOutOfRange,
        }
    }
}

static ERROR_POLICY: AtomicU8 = AtomicU8::new(0);

thread_local! {
    static LAST_ERROR: RefCell<Option<CString>> = const { RefCell::new(None) };
}

fn current_policy() -> ErrorPolicy {
    ErrorPolicy::from_raw(ERROR_POLICY.load(Ordering::Relaxed)).unwrap_or_default()
}

fn set_last_error(message: String) {
    let message = CString::new(message.replace('\0', " ")).ok();
    LAST_ERROR.with(|slot| *slot.borrow_mut() = message);
}

fn clear_last_error() {
    LAST_ERROR.with(|slot| *slot.borrow_mut() = None);
}

fn fail(err: BloomError) -> BloomStatus {
    tracing::warn!(error = %err, "bloom filter call failed");
    let status = BloomStatus::from(err.kind());
    set_last_error(err.to_string());
    // returns only under ErrorPolicy::Return
    let _ = current_policy().apply::<()>(Err(err));
    status
}

fn null_pointer(argument: &str) -> BloomStatus {
    tracing::warn!(argument, "null pointer passed to bloom filter call");
    set_last_error(format!("null pointer: {}", argument));
    if current_policy() == ErrorPolicy::Abort {
        tracing::error!(argument, "null pointer passed to bloom filter call, aborting");
        std::process::abort();
    }
    BloomStatus::NullPointer
}

/// Borrow a caller buffer for the duration of one call
///
/// # Safety
/// When `len > 0`, `data` must point at `len` readable elements.
unsafe fn borrow_slice<'a, T>(data: *const T, len: usize) -> Option<&'a [T]> {
    if len == 0 {
        Some(&[])
    } else if data.is_null() {
        None
    } else {
        Some(std::slice::from_raw_parts(data, len))
    }
}

fn install_handle(result: crate::Result<BloomHandle>, out: *mut *mut BloomHandle) -> BloomStatus {
    match result {
        Ok(handle) => {
            // SAFETY: `out` was checked for null by the caller of this helper.
            unsafe { *out = Box::into_raw(Box::new(handle)) };
            clear_last_error();
            BloomStatus::Ok
        }
        Err(err) => fail(err),
    }
}

/// Select how failures are reported: 0 returns a status, 1 aborts the process.
#[no_mangle]
pub extern "C" fn bloomf_set_error_policy(policy: u8) -> BloomStatus {
    match ErrorPolicy::from_raw(policy) {
        Some(policy) => {
            ERROR_POLICY.store(policy.to_raw(), Ordering::Relaxed);
            BloomStatus::Ok
        }
        None => fail(BloomError::invalid(format!("unknown error policy {}", policy))),
    }
}

/// Message for the last failed call on this thread, or null.
///
/// The pointer stays valid until the next call on the same thread.
#[no_mangle]
pub extern "C" fn bloomf_last_error_message() -> *const c_char {
    LAST_ERROR.with(|slot| {
        slot.borrow()
            .as_ref()
            .map_or(ptr::null(), |message| message.as_ptr())
    })
}

/// Create a filter sized for `n` items at false positive rate `fp`.
///
/// # Safety
/// `out` must be a valid pointer to writable storage for a handle pointer.
#[no_mangle]
pub unsafe extern "C" fn bloomf_new_with_estimates(
    n: u64,
    fp: f64,
    out: *mut *mut BloomHandle,
) -> BloomStatus {
    if out.is_null() {
        return null_pointer("out");
    }
    install_handle(BloomHandle::open_with_estimates(n, fp), out)
}

/// Rehydrate a filter from `(m, k)` and a serialized bit array.
///
/// `b_length` is the length the caller declares; `data_len` is the number of
/// bytes actually readable at `data`. They must agree.
///
/// # Safety
/// `data` must point at `data_len` readable bytes; `out` must be writable.
#[no_mangle]
pub unsafe extern "C" fn bloomf_new_from_serialized(
    m: u32,
    k: u32,
    b_length: u32,
    data: *const u8,
    data_len: usize,
    out: *mut *mut BloomHandle,
) -> BloomStatus {
    if out.is_null() {
        return null_pointer("out");
    }
    let Some(bytes) = borrow_slice(data, data_len) else {
        return null_pointer("data");
    };
    if b_length as usize != bytes.len() {
        return fail(BloomError::malformed(format!(
            "declared length {} but {} bytes supplied",
            b_length,
            bytes.len()
        )));
    }
    install_handle(BloomHandle::open_from_serialized(m, k, bytes), out)
}

/// Insert a byte string. Replaces `handle->b` and `handle->b_length`.
///
/// # Safety
/// `handle` must come from `bloomf_new_*`; `data` must point at `len` bytes.
#[no_mangle]
pub unsafe extern "C" fn bloomf_add(
    handle: *mut BloomHandle,
    data: *const u8,
    len: usize,
) -> BloomStatus {
    let Some(handle) = handle.as_mut() else {
        return null_pointer("handle");
    };
    let Some(element) = borrow_slice(data, len) else {
        return null_pointer("data");
    };
    handle.add(element);
    BloomStatus::Ok
}

/// Insert `len` integers, each as 4 little-endian bytes. Replaces `handle->b`
/// and `handle->b_length`.
///
/// # Safety
/// `handle` must come from `bloomf_new_*`; `values` must point at `len` integers.
#[no_mangle]
pub unsafe extern "C" fn bloomf_add_list_uint(
    handle: *mut BloomHandle,
    values: *const u32,
    len: usize,
) -> BloomStatus {
    let Some(handle) = handle.as_mut() else {
        return null_pointer("handle");
    };
    let Some(values) = borrow_slice(values, len) else {
        return null_pointer("values");
    };
    handle.add_many(values);
    BloomStatus::Ok
}

/// Test a byte string, writing the answer to `out`.
///
/// # Safety
/// `handle` must come from `bloomf_new_*`; `data` must point at `len` bytes;
/// `out` must be writable.
#[no_mangle]
pub unsafe extern "C" fn bloomf_test(
    handle: *const BloomHandle,
    data: *const u8,
    len: usize,
    out: *mut bool,
) -> BloomStatus {
    let Some(handle) = handle.as_ref() else {
        return null_pointer("handle");
    };
    let Some(element) = borrow_slice(data, len) else {
        return null_pointer("data");
    };
    if out.is_null() {
        return null_pointer("out");
    }
    *out = handle.test(element);
    BloomStatus::Ok
}

/// Test `len` integers. On success `*out` receives a new buffer of `len`
/// flag bytes (1 present, 0 absent) to be released with `bloomf_free_flags`.
///
/// # Safety
/// `handle` must come from `bloomf_new_*`; `values` must point at `len`
/// integers; `out` must be writable.
#[no_mangle]
pub unsafe extern "C" fn bloomf_test_list_uint(
    handle: *const BloomHandle,
    values: *const u32,
    len: usize,
    out: *mut *mut u8,
) -> BloomStatus {
    let Some(handle) = handle.as_ref() else {
        return null_pointer("handle");
    };
    let Some(values) = borrow_slice(values, len) else {
        return null_pointer("values");
    };
    if out.is_null() {
        return null_pointer("out");
    }
    let flags = handle
        .test_many(values)
        .into_iter()
        .map(u8::from)
        .collect::<Vec<_>>();
    let (flags_ptr, _) = leak_buffer(flags);
    *out = flags_ptr;
    BloomStatus::Ok
}

/// Release a handle and its bit buffer. Null is ignored.
///
/// # Safety
/// `handle` must come from `bloomf_new_*` and not have been freed.
#[no_mangle]
pub unsafe extern "C" fn bloomf_free(handle: *mut BloomHandle) {
    if !handle.is_null() {
        drop(Box::from_raw(handle));
    }
}

/// Release a flag buffer returned by `bloomf_test_list_uint`. Null is ignored.
///
/// # Safety
/// `flags` must come from `bloomf_test_list_uint` called with the same `len`.
#[no_mangle]
pub unsafe extern "C" fn bloomf_free_flags(flags: *mut u8, len: usize) {
    release_buffer(flags, len);
}
