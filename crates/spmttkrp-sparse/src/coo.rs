//! COO (Coordinate) sparse tensor format
//!
//! A [`SparseTensor`] of order N stores its nonzeros column-wise: one
//! [`IndexVector`] of coordinates per mode plus one [`ValueVector`] of
//! magnitudes. Nonzero `x` has coordinates `(indices[0][x], .., indices[N-1][x])`
//! and value `values[x]`. All N+1 columns always have the same length, `nnz`.
//!
//! Duplicate coordinates are allowed; consumers that reduce over nonzeros
//! (MTTKRP, [`SparseTensor::to_dense`]) add them up.
//!
//! # Examples
//!
//! ```
//! use spmttkrp_sparse::SparseTensor;
//!
//! let mut x = SparseTensor::new(&[3, 4, 5]).unwrap();
//! x.append(&[0, 1, 2], 2.5).unwrap();
//! x.append(&[2, 3, 4], -1.0).unwrap();
//!
//! assert_eq!(x.nmodes(), 3);
//! assert_eq!(x.nnz(), 2);
//! assert_eq!(x.mode_indices(1), &[1, 3]);
//! assert_eq!(x.values(), &[2.5, -1.0]);
//!
//! // Coordinates outside the extents are rejected
//! assert!(x.append(&[3, 0, 0], 1.0).is_err());
//! ```

use crate::error::SparseResult;
use scirs2_core::ndarray_ext::{ArrayD, IxDyn};
use spmttkrp_core::{is_permutation, ErrorInfo, Index, IndexVector, Value, ValueVector};
use std::cmp::Ordering;
use std::fmt;

const NEW_MODULE: &str = "SpTns New";
const APPEND_MODULE: &str = "SpTns Append";
const SORT_MODULE: &str = "SpTns Sort";

/// Sparse tensor in coordinate format
#[derive(Debug, Clone, PartialEq)]
pub struct SparseTensor {
    /// Extent of every mode
    dims: Vec<Index>,

    /// Mode priority of the last sort, identity until sorted
    sort_order: Vec<usize>,

    /// One coordinate column per mode
    indices: Vec<IndexVector>,

    /// Nonzero magnitudes
    values: ValueVector,
}

impl SparseTensor {
    /// Create an empty tensor with the given mode extents.
    ///
    /// # Errors
    ///
    /// `ValueError` when `dims` is empty.
    pub fn new(dims: &[Index]) -> SparseResult<Self> {
        if dims.is_empty() {
            return Err(ErrorInfo::value_error(
                NEW_MODULE,
                "a tensor needs at least one mode",
            ));
        }
        let nmodes = dims.len();
        Ok(SparseTensor {
            dims: dims.to_vec(),
            sort_order: (0..nmodes).collect(),
            indices: (0..nmodes).map(|_| IndexVector::new(0, 0)).collect(),
            values: ValueVector::new(0, 0),
        })
    }

    /// Build a tensor from per-mode coordinate columns and values.
    ///
    /// # Errors
    ///
    /// - `ShapeMismatch` when the number of columns differs from `dims.len()`
    ///   or a column length differs from `values.len()`
    /// - `ValueError` when a coordinate is outside its mode's extent
    pub fn from_parts(
        dims: &[Index],
        indices: Vec<Vec<Index>>,
        values: Vec<Value>,
    ) -> SparseResult<Self> {
        let mut tensor = Self::new(dims)?;
        if indices.len() != dims.len() {
            return Err(ErrorInfo::shape_mismatch(
                NEW_MODULE,
                format!("{} index columns for {} modes", indices.len(), dims.len()),
            ));
        }
        for (m, column) in indices.iter().enumerate() {
            if column.len() != values.len() {
                return Err(ErrorInfo::shape_mismatch(
                    NEW_MODULE,
                    format!(
                        "mode {} has {} coordinates but there are {} values",
                        m,
                        column.len(),
                        values.len()
                    ),
                ));
            }
            if let Some(x) = column.iter().position(|&i| i >= dims[m]) {
                return Err(ErrorInfo::value_error(
                    NEW_MODULE,
                    format!(
                        "nonzero {}: coordinate {} out of range for mode {} of extent {}",
                        x, column[x], m, dims[m]
                    ),
                ));
            }
        }

        tensor.indices = indices.into_iter().map(IndexVector::from).collect();
        tensor.values = ValueVector::from(values);
        Ok(tensor)
    }

    /// Add one nonzero at `coords`.
    ///
    /// # Errors
    ///
    /// - `ShapeMismatch` when `coords.len() != nmodes`
    /// - `ValueError` when a coordinate is outside its mode's extent
    pub fn append(&mut self, coords: &[Index], value: Value) -> SparseResult<()> {
        if coords.len() != self.nmodes() {
            return Err(ErrorInfo::shape_mismatch(
                APPEND_MODULE,
                format!(
                    "{} coordinates for a {}-mode tensor",
                    coords.len(),
                    self.nmodes()
                ),
            ));
        }
        if let Some(m) = (0..coords.len()).find(|&m| coords[m] >= self.dims[m]) {
            return Err(ErrorInfo::value_error(
                APPEND_MODULE,
                format!(
                    "coordinate {} out of range for mode {} of extent {}",
                    coords[m], m, self.dims[m]
                ),
            ));
        }

        for (column, &i) in self.indices.iter_mut().zip(coords) {
            column.append(i);
        }
        self.values.append(value);
        Ok(())
    }

    /// Number of modes (tensor order)
    pub fn nmodes(&self) -> usize {
        self.dims.len()
    }

    /// Extent of every mode
    pub fn dims(&self) -> &[Index] {
        &self.dims
    }

    /// Number of stored nonzeros
    pub fn nnz(&self) -> usize {
        self.values.len()
    }

    /// Mode priority used by the last [`sort_by_order`](Self::sort_by_order)
    pub fn sort_order(&self) -> &[usize] {
        &self.sort_order
    }

    /// Coordinates of every nonzero along `mode`.
    ///
    /// # Panics
    ///
    /// When `mode >= nmodes`.
    pub fn mode_indices(&self, mode: usize) -> &[Index] {
        self.indices[mode].as_slice()
    }

    /// Nonzero magnitudes in storage order
    pub fn values(&self) -> &[Value] {
        self.values.as_slice()
    }

    /// Nonzero magnitudes, mutably. Coordinates stay fixed.
    pub fn values_mut(&mut self) -> &mut [Value] {
        self.values.as_mut_slice()
    }

    /// Coordinates of nonzero `x`
    pub fn coords(&self, x: usize) -> Vec<Index> {
        self.indices.iter().map(|column| column[x]).collect()
    }

    /// Iterate over `(coordinates, value)` pairs in storage order
    pub fn entries(&self) -> impl Iterator<Item = (Vec<Index>, Value)> + '_ {
        self.values
            .iter()
            .enumerate()
            .map(move |(x, &v)| (self.coords(x), v))
    }

    /// Largest mode extent
    pub fn max_dim(&self) -> Index {
        self.dims.iter().copied().max().unwrap_or(0)
    }

    /// Fraction of stored entries: `nnz / Π dims`.
    ///
    /// Zero when any extent is zero.
    pub fn density(&self) -> f64 {
        let total: f64 = self.dims.iter().map(|&d| f64::from(d)).product();
        if total == 0.0 {
            0.0
        } else {
            self.nnz() as f64 / total
        }
    }

    /// Bytes held by the coordinate and value columns
    pub fn storage_bytes(&self) -> usize {
        self.nnz()
            * (self.nmodes() * std::mem::size_of::<Index>() + std::mem::size_of::<Value>())
    }

    /// Smallest and largest coordinate per mode, `None` for an empty tensor.
    pub fn index_bounds(&self) -> Option<(Vec<Index>, Vec<Index>)> {
        if self.nnz() == 0 {
            return None;
        }
        let (low, high) = self
            .indices
            .iter()
            .map(|column| {
                column
                    .iter()
                    .fold((Index::MAX, 0), |(lo, hi), &i| (lo.min(i), hi.max(i)))
            })
            .unzip();
        Some((low, high))
    }

    /// Number of nonzeros in every slice along `mode`.
    ///
    /// Entry `i` counts the nonzeros whose `mode` coordinate is `i`.
    ///
    /// # Errors
    ///
    /// `ValueError` when `mode >= nmodes`.
    pub fn slice_sizes(&self, mode: usize) -> SparseResult<Vec<usize>> {
        if mode >= self.nmodes() {
            return Err(ErrorInfo::value_error(
                "SpTns Slices",
                format!("mode {} of a {}-mode tensor", mode, self.nmodes()),
            ));
        }
        let mut sizes = vec![0usize; self.dims[mode] as usize];
        for &i in self.indices[mode].iter() {
            sizes[i as usize] += 1;
        }
        Ok(sizes)
    }

    /// Sort nonzeros lexicographically by coordinates, mode 0 first.
    pub fn sort(&mut self) {
        let identity: Vec<usize> = (0..self.nmodes()).collect();
        self.apply_sort(&identity);
    }

    /// Sort nonzeros lexicographically with mode priority `order`.
    ///
    /// The sort is stable, so nonzeros with equal coordinates keep their
    /// relative order.
    ///
    /// # Errors
    ///
    /// `ValueError` when `order` is not a permutation of the modes.
    pub fn sort_by_order(&mut self, order: &[usize]) -> SparseResult<()> {
        if !is_permutation(order, self.nmodes()) {
            return Err(ErrorInfo::value_error(
                SORT_MODULE,
                format!("{:?} is not a mode permutation of a {}-mode tensor", order, self.nmodes()),
            ));
        }
        self.apply_sort(order);
        Ok(())
    }

    fn apply_sort(&mut self, order: &[usize]) {
        let mut perm: Vec<usize> = (0..self.nnz()).collect();
        perm.sort_by(|&a, &b| {
            order
                .iter()
                .map(|&m| self.indices[m][a].cmp(&self.indices[m][b]))
                .find(|o| o.is_ne())
                .unwrap_or(Ordering::Equal)
        });

        for column in &mut self.indices {
            let sorted: Vec<Index> = perm.iter().map(|&x| column[x]).collect();
            *column = IndexVector::from(sorted);
        }
        let sorted: Vec<Value> = perm.iter().map(|&x| self.values[x]).collect();
        self.values = ValueVector::from(sorted);
        self.sort_order = order.to_vec();
    }

    /// Check the structural invariants: equal column lengths and in-range
    /// coordinates.
    pub fn validate(&self) -> SparseResult<()> {
        for (m, column) in self.indices.iter().enumerate() {
            if column.len() != self.nnz() {
                return Err(ErrorInfo::shape_mismatch(
                    NEW_MODULE,
                    format!("mode {} has {} coordinates, nnz is {}", m, column.len(), self.nnz()),
                ));
            }
            if column.iter().any(|&i| i >= self.dims[m]) {
                return Err(ErrorInfo::value_error(
                    NEW_MODULE,
                    format!("mode {} holds a coordinate past extent {}", m, self.dims[m]),
                ));
            }
        }
        Ok(())
    }

    /// Summary of shape and storage for display
    pub fn status(&self) -> TensorStatus {
        TensorStatus {
            nmodes: self.nmodes(),
            dims: self.dims.clone(),
            nnz: self.nnz(),
            density: self.density(),
            storage_bytes: self.storage_bytes(),
        }
    }

    /// Expand into a dense ndarray, adding duplicate coordinates together.
    ///
    /// Allocates `Π dims` values; intended for small tensors and tests.
    pub fn to_dense(&self) -> ArrayD<Value> {
        let shape: Vec<usize> = self.dims.iter().map(|&d| d as usize).collect();
        let mut dense = ArrayD::<Value>::zeros(IxDyn(&shape));
        for (coords, v) in self.entries() {
            let at: Vec<usize> = coords.iter().map(|&i| i as usize).collect();
            dense[IxDyn(&at)] += v;
        }
        dense
    }
}

/// Shape and storage summary of a [`SparseTensor`]
#[derive(Debug, Clone, PartialEq)]
pub struct TensorStatus {
    /// Number of modes
    pub nmodes: usize,
    /// Mode extents
    pub dims: Vec<Index>,
    /// Stored nonzeros
    pub nnz: usize,
    /// `nnz / Π dims`
    pub density: f64,
    /// Bytes held by coordinates and values
    pub storage_bytes: usize,
}

impl fmt::Display for TensorStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let dims: Vec<String> = self.dims.iter().map(|d| d.to_string()).collect();
        writeln!(f, "COO sparse tensor, {} modes", self.nmodes)?;
        writeln!(f, "DIMS = {}, NNZ = {}", dims.join("x"), self.nnz)?;
        writeln!(f, "DENSITY = {:e}", self.density)?;
        write!(f, "STORAGE = {} bytes", self.storage_bytes)
    }
}
