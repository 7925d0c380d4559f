//! Python binding layer for taxon namespaces and character matrices.
//!
//! Exposes `Taxon`, `TaxonNamespace` and `CharacterMatrix` classes with the
//! mapping protocol (`m[key] = seq`, `m[key]`, `key in m`, `del m[key]`,
//! `len(m)`, iteration over taxa), plus FASTA reading and pairwise
//! p-distances.
//!
//! Keys may be a `Taxon`, an `int` (position in the namespace) or a `str`
//! (taxon label). Errors map onto the usual Python exceptions:
//! bad positions raise `IndexError`, unknown labels and absent entries raise
//! `KeyError`, taxa outside the namespace raise `ValueError`.

use pyo3::exceptions::{PyIndexError, PyKeyError, PyTypeError, PyValueError};
use pyo3::prelude::*;

use crate::distances::pairwise_p_distance_matrix;
use crate::error::CharMatrixError;
use crate::io::{read_matrix, MatrixFormat};
use crate::matrix::{CharacterMatrix, TaxonKey};
use crate::sequence::{CharacterSequence, CharacterState};
use crate::taxon::{Taxon, TaxonNamespace};

fn to_py_err(e: CharMatrixError) -> PyErr {
    match e {
        CharMatrixError::IndexOutOfRange { .. } => PyIndexError::new_err(e.to_string()),
        CharMatrixError::LabelNotFound(_) | CharMatrixError::MissingEntry(_) => {
            PyKeyError::new_err(e.to_string())
        }
        _ => PyValueError::new_err(e.to_string()),
    }
}

#[pyclass(name = "Taxon", unsendable)]
#[derive(Clone)]
pub struct PyTaxon {
    inner: Taxon,
}

#[pymethods]
impl PyTaxon {
    #[new]
    fn new(label: String) -> Self {
        PyTaxon { inner: Taxon::new(label) }
    }

    #[getter]
    fn label(&self) -> String {
        self.inner.label().to_owned()
    }

    fn __eq__(&self, other: PyRef<'_, PyTaxon>) -> bool {
        self.inner == other.inner
    }

    fn __hash__(&self) -> u64 {
        use std::hash::{DefaultHasher, Hash, Hasher};
        let mut hasher = DefaultHasher::new();
        self.inner.hash(&mut hasher);
        hasher.finish()
    }

    fn __repr__(&self) -> String {
        format!("<Taxon '{}'>", self.inner.label())
    }
}

#[pyclass(name = "TaxonNamespace", unsendable)]
#[derive(Clone)]
pub struct PyTaxonNamespace {
    inner: TaxonNamespace,
}

#[pymethods]
impl PyTaxonNamespace {
    #[new]
    #[pyo3(signature = (labels=None))]
    fn new(labels: Option<Vec<String>>) -> Self {
        let inner = match labels {
            Some(labels) => TaxonNamespace::from_labels(labels),
            None => TaxonNamespace::new(),
        };
        PyTaxonNamespace { inner }
    }

    fn require_taxon(&self, label: String) -> PyTaxon {
        PyTaxon { inner: self.inner.require_taxon(label) }
    }

    fn add_taxon(&self, taxon: PyRef<'_, PyTaxon>) -> PyResult<bool> {
        self.inner.add_taxon(&taxon.inner).map_err(to_py_err)
    }

    fn labels(&self) -> Vec<String> {
        self.inner.labels()
    }

    fn __len__(&self) -> usize {
        self.inner.len()
    }

    fn __getitem__(&self, index: i64) -> PyResult<PyTaxon> {
        let len = self.inner.len();
        usize::try_from(index)
            .ok()
            .and_then(|i| self.inner.get(i))
            .map(|inner| PyTaxon { inner })
            .ok_or_else(|| to_py_err(CharMatrixError::IndexOutOfRange { index, len }))
    }

    fn __contains__(&self, taxon: PyRef<'_, PyTaxon>) -> bool {
        self.inner.contains(&taxon.inner)
    }

    fn __iter__(&self) -> TaxonIter {
        TaxonIter { taxa: self.inner.taxa().into_iter() }
    }
}

#[pyclass(unsendable)]
pub struct TaxonIter {
    taxa: std::vec::IntoIter<Taxon>,
}

#[pymethods]
impl TaxonIter {
    fn __iter__(slf: PyRef<'_, Self>) -> PyRef<'_, Self> {
        slf
    }

    fn __next__(mut slf: PyRefMut<'_, Self>) -> Option<PyTaxon> {
        slf.taxa.next().map(|inner| PyTaxon { inner })
    }
}

#[pyclass(name = "CharacterMatrix", unsendable)]
pub struct PyCharacterMatrix {
    inner: CharacterMatrix,
}

impl PyCharacterMatrix {
    fn extract_key(&self, key: &Bound<'_, PyAny>) -> PyResult<TaxonKey> {
        if let Ok(taxon) = key.extract::<PyRef<'_, PyTaxon>>() {
            return Ok(TaxonKey::Taxon(taxon.inner.clone()));
        }
        if let Ok(index) = key.extract::<i64>() {
            return TaxonKey::from_signed_index(index, self.inner.taxon_namespace().len()).map_err(to_py_err);
        }
        if let Ok(label) = key.extract::<String>() {
            return Ok(TaxonKey::Label(label));
        }
        Err(PyTypeError::new_err("key must be a Taxon, an int or a str"))
    }
}

fn extract_sequence(value: &Bound<'_, PyAny>) -> PyResult<CharacterSequence> {
    if let Ok(s) = value.extract::<String>() {
        return Ok(s.into());
    }
    let mut seq = CharacterSequence::new();
    for item in value.try_iter()? {
        let item = item?;
        if let Ok(code) = item.extract::<i64>() {
            seq.push(code);
        } else if let Ok(token) = item.extract::<String>() {
            seq.push(token);
        } else {
            return Err(PyTypeError::new_err("character states must be int or str"));
        }
    }
    Ok(seq)
}

fn state_to_py<'py>(py: Python<'py>, state: &CharacterState) -> PyResult<Bound<'py, PyAny>> {
    Ok(match state {
        CharacterState::Symbol(c) => (*c).into_pyobject(py)?.into_any(),
        CharacterState::Code(n) => (*n).into_pyobject(py)?.into_any(),
        CharacterState::Token(s) => s.as_str().into_pyobject(py)?.into_any(),
    })
}

#[pymethods]
impl PyCharacterMatrix {
    #[new]
    #[pyo3(signature = (taxon_namespace=None))]
    fn new(taxon_namespace: Option<PyRef<'_, PyTaxonNamespace>>) -> Self {
        let inner = match taxon_namespace {
            Some(ns) => CharacterMatrix::with_taxon_namespace(ns.inner.clone()),
            None => CharacterMatrix::new(),
        };
        PyCharacterMatrix { inner }
    }

    #[getter]
    fn taxon_namespace(&self) -> PyTaxonNamespace {
        PyTaxonNamespace { inner: self.inner.taxon_namespace().clone() }
    }

    fn __setitem__(&mut self, key: &Bound<'_, PyAny>, value: &Bound<'_, PyAny>) -> PyResult<()> {
        let key = self.extract_key(key)?;
        let seq = extract_sequence(value)?;
        self.inner.set(key, seq).map_err(to_py_err)
    }

    /// Returns the stored states as a new list of `str`/`int`.
    ///
    /// The list is a copy: appending to it does not change the matrix. Use
    /// `extend_sequence` or assign a new value to edit the stored sequence.
    fn __getitem__<'py>(&self, py: Python<'py>, key: &Bound<'py, PyAny>) -> PyResult<Vec<Bound<'py, PyAny>>> {
        let key = self.extract_key(key)?;
        let seq = self.inner.get(key).map_err(to_py_err)?;
        seq.iter().map(|state| state_to_py(py, state)).collect()
    }

    fn __contains__(&self, key: &Bound<'_, PyAny>) -> PyResult<bool> {
        let key = self.extract_key(key)?;
        self.inner.contains(key).map_err(to_py_err)
    }

    fn __delitem__(&mut self, key: &Bound<'_, PyAny>) -> PyResult<()> {
        let key = self.extract_key(key)?;
        self.inner.remove(key).map(|_| ()).map_err(to_py_err)
    }

    fn __len__(&self) -> usize {
        self.inner.len()
    }

    fn __iter__(&self) -> TaxonIter {
        let taxa: Vec<Taxon> = self.inner.taxa().cloned().collect();
        TaxonIter { taxa: taxa.into_iter() }
    }

    fn clear(&mut self) {
        self.inner.clear();
    }

    /// Appends states to the sequence stored for `key`, in place.
    fn extend_sequence(&mut self, key: &Bound<'_, PyAny>, values: &Bound<'_, PyAny>) -> PyResult<()> {
        let key = self.extract_key(key)?;
        let extra = extract_sequence(values)?;
        self.inner.get_mut(key).map_err(to_py_err)?.extend(extra);
        Ok(())
    }

    /// Sequence for `key` rendered as a string.
    fn sequence_string(&self, key: &Bound<'_, PyAny>) -> PyResult<String> {
        let key = self.extract_key(key)?;
        Ok(self.inner.get(key).map_err(to_py_err)?.to_string())
    }
}

/// Read a FASTA or NEXUS character matrix.
///
/// Args:
///     path: File path; `.gz` files are decompressed
///     taxon_namespace: Optional namespace every record must belong to
///
/// Raises:
///     ValueError: If the format cannot be guessed, parsing fails, or a record
///     names a taxon outside `taxon_namespace`
#[pyfunction]
#[pyo3(signature = (path, taxon_namespace=None))]
fn read_character_matrix(
    path: String,
    taxon_namespace: Option<PyRef<'_, PyTaxonNamespace>>,
) -> PyResult<PyCharacterMatrix> {
    let format = MatrixFormat::from_path(&path)
        .ok_or_else(|| PyValueError::new_err(format!("Cannot guess matrix format of {path}")))?;
    let ns = taxon_namespace.as_ref().map(|ns| &ns.inner);
    let inner = read_matrix(&path, format, ns).map_err(to_py_err)?;
    Ok(PyCharacterMatrix { inner })
}

/// Compute pairwise p-distances between all sequences of a matrix.
///
/// Returns:
///     A tuple of (taxon_labels, distance_matrix)
///
/// Raises:
///     ValueError: If sequences differ in length
#[pyfunction]
fn pairwise_p_distance(matrix: PyRef<'_, PyCharacterMatrix>) -> PyResult<(Vec<String>, Vec<Vec<f64>>)> {
    pairwise_p_distance_matrix(&matrix.inner).map_err(to_py_err)
}

/// Python module definition
#[pymodule]
fn charmatrix(m: &Bound<'_, PyModule>) -> PyResult<()> {
    m.add_class::<PyTaxon>()?;
    m.add_class::<PyTaxonNamespace>()?;
    m.add_class::<PyCharacterMatrix>()?;
    m.add_function(wrap_pyfunction!(read_character_matrix, m)?)?;
    m.add_function(wrap_pyfunction!(pairwise_p_distance, m)?)?;
    Ok(())
}
