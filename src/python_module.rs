//! Python bindings for shaped-bloom using PyO3

use crate::hash::encode_u32;
use crate::{BloomError, BloomHandle, SerializedForm};
use numpy::{IntoPyArray, PyArray1};
use pyo3::exceptions::PyValueError;
use pyo3::prelude::*;
use pyo3::types::PyBytes;

fn to_py_err(err: BloomError) -> PyErr {
    PyErr::new::<PyValueError, _>(err.to_string())
}

/// Python wrapper around a filter handle
#[pyclass(name = "BloomFilter")]
struct PyBloomFilter {
    inner: BloomHandle,
}

#[pymethods]
impl PyBloomFilter {
    #[new]
    #[pyo3(signature = (max_elements=None, error_rate=None, restore_from_serialized=None))]
    fn new(
        max_elements: Option<u64>,
        error_rate: Option<f64>,
        restore_from_serialized: Option<&[u8]>,
    ) -> PyResult<Self> {
        let inner = match (max_elements, error_rate, restore_from_serialized) {
            (Some(n), Some(fp), None) => BloomHandle::open_with_estimates(n, fp),
            (None, None, Some(encoded)) => {
                SerializedForm::from_bytes(encoded).and_then(|form| BloomHandle::open_from_form(&form))
            }
            _ => {
                return Err(PyValueError::new_err(
                    "either set max_elements and error_rate or set restore_from_serialized",
                ))
            }
        }
        .map_err(to_py_err)?;

        Ok(PyBloomFilter { inner })
    }

    /// Add a single 32-bit integer key
    fn add(&mut self, var: u32) {
        self.inner.add_many(&[var])
    }

    /// Add a list of 32-bit integer keys
    fn add_batch(&mut self, var: Vec<u32>) {
        self.inner.add_many(&var)
    }

    fn is_member(&self, var: u32) -> bool {
        self.inner.test(&encode_u32(var))
    }

    /// One flag per key, 1 if possibly present and 0 if absent
    fn are_members<'py>(&self, py: Python<'py>, var: Vec<u32>) -> &'py PyArray1<u8> {
        let flags: Vec<u8> = self
            .inner
            .test_many(&var)
            .into_iter()
            .map(u8::from)
            .collect();
        flags.into_pyarray(py)
    }

    /// Add an arbitrary byte-string key
    fn add_one_member(&mut self, var: &[u8]) {
        self.inner.add(var)
    }

    fn is_one_member(&self, var: &[u8]) -> bool {
        self.inner.test(var)
    }

    /// Canonical encoding; pass it back as `restore_from_serialized`
    fn serialize<'py>(&self, py: Python<'py>) -> PyResult<&'py PyBytes> {
        let encoded = self.inner.export().to_bytes().map_err(to_py_err)?;
        Ok(PyBytes::new(py, &encoded))
    }

    #[getter]
    fn m(&self) -> u32 {
        self.inner.capacity()
    }

    #[getter]
    fn k(&self) -> u32 {
        self.inner.hash_count()
    }

    #[getter]
    fn b_length(&self) -> u32 {
        self.inner.byte_length()
    }

    fn __contains__(&self, var: u32) -> bool {
        self.is_member(var)
    }

    fn __repr__(&self) -> String {
        format!(
            "BloomFilter(m={}, k={}, b_length={})",
            self.inner.capacity(),
            self.inner.hash_count(),
            self.inner.byte_length()
        )
    }
}

/// Python module definition
#[pymodule]
fn shaped_bloom(_py: Python, m: &PyModule) -> PyResult<()> {
    m.add_class::<PyBloomFilter>()?;
    m.add("__version__", env!("CARGO_PKG_VERSION"))?;

    Ok(())
}
