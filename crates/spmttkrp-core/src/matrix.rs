//! Row-major dense matrices with a padded, lane-aligned row stride
//!
//! A [`DenseMatrix`] of shape `rows × cols` stores element `(i, j)` at
//! `i * stride + j`, where `stride` is `cols` rounded up to a multiple of
//! [`LANE_WIDTH`](crate::LANE_WIDTH). The backing buffer holds `max(rows, 1) * stride` values and
//! starts on a 32-byte boundary, so every row starts on one too.
//!
//! Padding columns `[cols, stride)` are zero at creation. Nothing in this
//! crate writes them except [`DenseMatrix::zero_rows`], which clears whole
//! padded rows, so full-stride row reductions always see zeros there.
//!
//! # Examples
//!
//! ```
//! use spmttkrp_core::DenseMatrix;
//!
//! let mut m = DenseMatrix::new(3, 5);
//! assert_eq!(m.stride(), 8);
//! assert_eq!(m.capacity_rows(), 3);
//!
//! m.fill(2.0);
//! m[(1, 4)] = 7.0;
//! assert_eq!(m.row(1), &[2.0, 2.0, 2.0, 2.0, 7.0]);
//! assert_eq!(&m.padded_row(1)[5..], &[0.0, 0.0, 0.0]);
//! ```

use crate::aligned::AlignedBuffer;
use crate::error::{CoreResult, ErrorInfo};
use crate::types::{padded_stride, Index, Value};
use scirs2_core::ndarray_ext::{Array2, ArrayView2};
use scirs2_core::random::{rngs::StdRng, Rng, SeedableRng};
use std::ops::{Index as IndexOp, IndexMut};
use std::time::{SystemTime, UNIX_EPOCH};

/// Seed used by [`DenseMatrix::fill_random`] in reproducible mode.
pub const DETERMINISTIC_SEED: u64 = 1234;

/// Largest raw draw for random fills; values carry 31 bits of precision.
const RANDOM_MAX: u32 = (1 << 31) - 1;

/// Seed source for random matrix fills
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatrixSeed {
    /// Reproducible: the same seed always yields the same matrix
    Fixed(u64),
    /// Non-reproducible: seeded from the wall clock
    Clock,
}

impl MatrixSeed {
    /// Map the `use_random_seed` flag onto a seed source.
    pub fn from_flag(use_random_seed: bool) -> Self {
        if use_random_seed {
            MatrixSeed::Clock
        } else {
            MatrixSeed::Fixed(DETERMINISTIC_SEED)
        }
    }

    fn resolve(self) -> u64 {
        match self {
            MatrixSeed::Fixed(seed) => seed,
            MatrixSeed::Clock => SystemTime::now()
                .duration_since(UNIX_EPOCH)
                .map(|d| d.as_nanos() as u64)
                .unwrap_or(DETERMINISTIC_SEED),
        }
    }
}

/// Row-major dense matrix with padded row stride
#[derive(Debug, Clone)]
pub struct DenseMatrix {
    rows: usize,
    cols: usize,
    stride: usize,
    capacity_rows: usize,
    values: AlignedBuffer,
}

impl DenseMatrix {
    /// Create a zero-filled `rows × cols` matrix.
    pub fn new(rows: usize, cols: usize) -> Self {
        let stride = padded_stride(cols);
        let capacity_rows = rows.max(1);
        DenseMatrix {
            rows,
            cols,
            stride,
            capacity_rows,
            values: AlignedBuffer::zeroed(capacity_rows * stride),
        }
    }

    /// Create a matrix from row-major logical values (`rows * cols` of them).
    pub fn from_row_major(rows: usize, cols: usize, data: &[Value]) -> CoreResult<Self> {
        if data.len() != rows * cols {
            return Err(ErrorInfo::shape_mismatch(
                "Mtx New",
                format!(
                    "{} values supplied for a {} x {} matrix",
                    data.len(),
                    rows,
                    cols
                ),
            ));
        }
        let mut mtx = Self::new(rows, cols);
        if cols > 0 {
            for (i, src) in data.chunks_exact(cols).enumerate() {
                mtx.row_mut(i).copy_from_slice(src);
            }
        }
        Ok(mtx)
    }

    /// Number of logical rows
    pub fn rows(&self) -> usize {
        self.rows
    }

    /// Number of logical columns
    pub fn cols(&self) -> usize {
        self.cols
    }

    /// Row pitch in values (multiple of `LANE_WIDTH`, at least `cols`)
    pub fn stride(&self) -> usize {
        self.stride
    }

    /// Number of rows the buffer can hold
    pub fn capacity_rows(&self) -> usize {
        self.capacity_rows
    }

    /// Whole buffer, padding included: `capacity_rows * stride` values
    pub fn as_slice(&self) -> &[Value] {
        &self.values.as_slice()[..self.capacity_rows * self.stride]
    }

    /// Whole buffer, padding included, mutably
    pub fn as_mut_slice(&mut self) -> &mut [Value] {
        let len = self.capacity_rows * self.stride;
        &mut self.values.as_mut_slice()[..len]
    }

    /// Logical values of row `i`. Panics when `i >= capacity_rows`.
    pub fn row(&self, i: usize) -> &[Value] {
        let start = i * self.stride;
        &self.as_slice()[start..start + self.cols]
    }

    /// Logical values of row `i`, mutably
    pub fn row_mut(&mut self, i: usize) -> &mut [Value] {
        let start = i * self.stride;
        let cols = self.cols;
        &mut self.as_mut_slice()[start..start + cols]
    }

    /// Row `i` including its padding columns
    pub fn padded_row(&self, i: usize) -> &[Value] {
        let start = i * self.stride;
        &self.as_slice()[start..start + self.stride]
    }

    /// Logical row `i` addressed by a tensor coordinate, `None` past `rows`.
    pub fn get_row(&self, i: Index) -> Option<&[Value]> {
        let i = i as usize;
        if i < self.rows {
            Some(self.row(i))
        } else {
            None
        }
    }

    /// Overwrite every logical element with `value`; padding stays untouched.
    pub fn fill(&mut self, value: Value) {
        for i in 0..self.rows {
            self.row_mut(i).fill(value);
        }
    }

    /// Zero the first `nrows` rows including their padding.
    ///
    /// `nrows` is clamped to the buffer capacity.
    pub fn zero_rows(&mut self, nrows: usize) {
        let end = nrows.min(self.capacity_rows) * self.stride;
        self.as_mut_slice()[..end].fill(0.0);
    }

    /// Fill logical elements with uniform values in `[0, 1]`.
    ///
    /// With `use_random_seed == false` the result depends only on the shape,
    /// which makes validation runs reproducible. With `true` the generator is
    /// seeded from the wall clock.
    pub fn fill_random(&mut self, use_random_seed: bool) {
        self.fill_random_with(MatrixSeed::from_flag(use_random_seed));
    }

    /// Fill logical elements with uniform values in `[0, 1]` from `seed`.
    ///
    /// One generator is created per call and advanced once per element in
    /// row-major order.
    pub fn fill_random_with(&mut self, seed: MatrixSeed) {
        let mut rng = StdRng::seed_from_u64(seed.resolve());
        for i in 0..self.rows {
            for v in self.row_mut(i) {
                let raw: u32 = rng.random_range(0..=RANDOM_MAX);
                *v = (f64::from(raw) / f64::from(RANDOM_MAX)) as Value;
            }
        }
    }

    /// Copy the logical elements into an ndarray matrix.
    pub fn to_array2(&self) -> Array2<Value> {
        Array2::from_shape_fn((self.rows, self.cols), |(i, j)| self[(i, j)])
    }

    /// Build a padded matrix from an ndarray view.
    pub fn from_array2(view: &ArrayView2<Value>) -> Self {
        let (rows, cols) = view.dim();
        let mut mtx = Self::new(rows, cols);
        for ((i, j), &v) in view.indexed_iter() {
            mtx[(i, j)] = v;
        }
        mtx
    }

    /// Number of bytes held by the buffer
    pub fn storage_bytes(&self) -> usize {
        self.capacity_rows * self.stride * std::mem::size_of::<Value>()
    }

    /// True when padding columns of every allocated row are zero
    pub fn padding_is_zero(&self) -> bool {
        if self.stride == self.cols {
            return true;
        }
        (0..self.capacity_rows).all(|i| self.padded_row(i)[self.cols..].iter().all(|&v| v == 0.0))
    }
}

impl PartialEq for DenseMatrix {
    /// Matrices are equal when their shapes and logical elements match.
    fn eq(&self, other: &Self) -> bool {
        self.rows == other.rows
            && self.cols == other.cols
            && (0..self.rows).all(|i| self.row(i) == other.row(i))
    }
}

impl IndexOp<(usize, usize)> for DenseMatrix {
    type Output = Value;

    fn index(&self, (i, j): (usize, usize)) -> &Value {
        assert!(j < self.cols, "column {} out of range for {} columns", j, self.cols);
        &self.as_slice()[i * self.stride + j]
    }
}

impl IndexMut<(usize, usize)> for DenseMatrix {
    fn index_mut(&mut self, (i, j): (usize, usize)) -> &mut Value {
        assert!(j < self.cols, "column {} out of range for {} columns", j, self.cols);
        let stride = self.stride;
        &mut self.as_mut_slice()[i * stride + j]
    }
}
