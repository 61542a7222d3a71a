//! Sparse MTTKRP (Matricized Tensor Times Khatri-Rao Product)
//!
//! For a COO tensor X of order N, factor matrices `mats[0..N]` of rank R and
//! an output `mats[N]`, the mode-`n` MTTKRP computes
//!
//! ```text
//! out[i_n, r] = Σ_x  v_x · Π_{k=1}^{N-1} mats[order[k]][i_{order[k]}, r]
//! ```
//!
//! where `order` is a permutation of the modes with `order[0] == n`. Only the
//! first `dims[n]` rows of the output are written; they are cleared (padding
//! included) before accumulation starts.
//!
//! Two paths compute the same product:
//!
//! - **general**: any N. Each nonzero builds a rank-length scratch row
//!   `v_x · Π mats[order[k]][i, :]` and adds it into its output row.
//! - **3-mode**: `out[i, r] += v_x · B[j, r] · C[k, r]` with no scratch row.
//!
//! [`mttkrp`] picks the 3-mode path for order-3 tensors and the general path
//! otherwise. [`mttkrp_general`] and [`mttkrp_3d`] force one path.
//!
//! # Examples
//!
//! ```
//! use spmttkrp_core::DenseMatrix;
//! use spmttkrp_kernels::mttkrp;
//! use spmttkrp_sparse::SparseTensor;
//!
//! let mut x = SparseTensor::new(&[2, 2, 2]).unwrap();
//! x.append(&[0, 1, 1], 2.0).unwrap();
//!
//! let mut mats: Vec<DenseMatrix> = (0..3).map(|_| DenseMatrix::new(2, 1)).collect();
//! for m in &mut mats {
//!     m.fill(1.0);
//! }
//! mats.push(DenseMatrix::new(2, 1));
//!
//! mttkrp(&x, &mut mats, &[0, 1, 2], 0).unwrap();
//! assert_eq!(mats[3][(0, 0)], 2.0);
//! assert_eq!(mats[3][(1, 0)], 0.0);
//! ```

use crate::error::{ErrorInfo, KernelResult, SERIAL_MODULE};
use spmttkrp_core::{is_permutation, DenseMatrix, Index, Timer, Value, ValueVector};
use spmttkrp_sparse::SparseTensor;
use std::ops::Range;

/// Which accumulation loop a kernel runs
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum KernelPath {
    ThreeMode,
    General,
}

impl KernelPath {
    /// Specialized path for order-3 tensors, general otherwise
    pub(crate) fn for_modes(nmodes: usize) -> Self {
        if nmodes == 3 {
            KernelPath::ThreeMode
        } else {
            KernelPath::General
        }
    }

    pub(crate) fn name(self) -> &'static str {
        match self {
            KernelPath::ThreeMode => "3-mode",
            KernelPath::General => "general",
        }
    }
}

/// Destination of accumulated products, addressed by flat output offset
pub(crate) trait Accumulate {
    fn add(&mut self, at: usize, value: Value);
}

impl Accumulate for [Value] {
    #[inline]
    fn add(&mut self, at: usize, value: Value) {
        self[at] += value;
    }
}

/// Rank and row stride shared by every operand matrix
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct OperandShape {
    pub(crate) rank: usize,
    pub(crate) stride: usize,
    /// Output rows written by the kernel, `dims[mode]`
    pub(crate) out_rows: usize,
}

/// Validate a full MTTKRP call before anything is computed.
///
/// # Errors
///
/// - `ShapeMismatch` when there are not N+1 matrices, a factor's row count
///   differs from its mode extent, ranks or strides differ, or the output
///   cannot hold `dims[mode]` rows
/// - `ValueError` when `mode` is out of range or `mats_order` is not a mode
///   permutation starting with `mode`
pub(crate) fn check_operands(
    module: &'static str,
    x: &SparseTensor,
    mats: &[DenseMatrix],
    mats_order: &[usize],
    mode: usize,
) -> KernelResult<OperandShape> {
    let nmodes = x.nmodes();
    if mats.len() != nmodes + 1 {
        return Err(ErrorInfo::shape_mismatch(
            module,
            format!(
                "{} matrices for a {}-mode tensor, expected {}",
                mats.len(),
                nmodes,
                nmodes + 1
            ),
        ));
    }
    if mode >= nmodes {
        return Err(ErrorInfo::value_error(
            module,
            format!("mode {} of a {}-mode tensor", mode, nmodes),
        ));
    }
    if !is_permutation(mats_order, nmodes) || mats_order[0] != mode {
        return Err(ErrorInfo::value_error(
            module,
            format!(
                "mats_order {:?} is not a mode permutation starting with {}",
                mats_order, mode
            ),
        ));
    }

    let out = &mats[nmodes];
    for (m, (mtx, &dim)) in mats.iter().zip(x.dims()).enumerate() {
        if mtx.cols() != out.cols() {
            return Err(ErrorInfo::shape_mismatch(
                module,
                format!("mats[{}].cols = {}, output has {}", m, mtx.cols(), out.cols()),
            ));
        }
        if mtx.rows() != dim as usize {
            return Err(ErrorInfo::shape_mismatch(
                module,
                format!("mats[{}].rows = {}, dims[{}] = {}", m, mtx.rows(), m, dim),
            ));
        }
        if mtx.stride() != out.stride() {
            return Err(ErrorInfo::shape_mismatch(
                module,
                format!(
                    "mats[{}].stride = {}, output has {}",
                    m,
                    mtx.stride(),
                    out.stride()
                ),
            ));
        }
    }

    let out_rows = x.dims()[mode] as usize;
    if out.capacity_rows() < out_rows {
        return Err(ErrorInfo::shape_mismatch(
            module,
            format!(
                "output holds {} rows, mode {} needs {}",
                out.capacity_rows(),
                mode,
                out_rows
            ),
        ));
    }

    Ok(OperandShape {
        rank: out.cols(),
        stride: out.stride(),
        out_rows,
    })
}

/// Read-only inputs of one MTTKRP call
pub(crate) struct Operands<'a> {
    x: &'a SparseTensor,
    factors: &'a [DenseMatrix],
    order: &'a [usize],
    mode: usize,
    shape: OperandShape,
    path: KernelPath,
    module: &'static str,
}

impl<'a> Operands<'a> {
    pub(crate) fn new(
        x: &'a SparseTensor,
        factors: &'a [DenseMatrix],
        order: &'a [usize],
        mode: usize,
        shape: OperandShape,
        path: KernelPath,
        module: &'static str,
    ) -> Self {
        Operands {
            x,
            factors,
            order,
            mode,
            shape,
            path,
            module,
        }
    }

    /// Accumulate the nonzeros in `range` into `acc`.
    ///
    /// `scratch` needs at least `rank` elements on the general path.
    pub(crate) fn accumulate<A: Accumulate + ?Sized>(
        &self,
        range: Range<usize>,
        scratch: &mut [Value],
        acc: &mut A,
    ) -> KernelResult<()> {
        match self.path {
            KernelPath::ThreeMode => self.accumulate_3d(range, acc),
            KernelPath::General => self.accumulate_general(range, scratch, acc),
        }
    }

    fn accumulate_general<A: Accumulate + ?Sized>(
        &self,
        range: Range<usize>,
        scratch: &mut [Value],
        acc: &mut A,
    ) -> KernelResult<()> {
        let OperandShape { rank, stride, .. } = self.shape;
        let values = self.x.values();
        let out_inds = self.x.mode_indices(self.mode);
        let columns: Vec<(usize, &[Index])> = self.order[1..]
            .iter()
            .map(|&m| (m, self.x.mode_indices(m)))
            .collect();
        let scratch = &mut scratch[..rank];

        for x in range {
            scratch.fill(values[x]);
            for &(m, inds) in &columns {
                let row = self.factor_row(m, inds[x])?;
                for (s, &u) in scratch.iter_mut().zip(row) {
                    *s *= u;
                }
            }
            let base = out_inds[x] as usize * stride;
            for (r, &s) in scratch.iter().enumerate() {
                acc.add(base + r, s);
            }
        }
        Ok(())
    }

    fn accumulate_3d<A: Accumulate + ?Sized>(
        &self,
        range: Range<usize>,
        acc: &mut A,
    ) -> KernelResult<()> {
        let OperandShape { rank, stride, .. } = self.shape;
        let (mb, mc) = (self.order[1], self.order[2]);
        let values = self.x.values();
        let inds_a = self.x.mode_indices(self.mode);
        let inds_b = self.x.mode_indices(mb);
        let inds_c = self.x.mode_indices(mc);

        for x in range {
            let v = values[x];
            let b = self.factor_row(mb, inds_b[x])?;
            let c = self.factor_row(mc, inds_c[x])?;
            let base = inds_a[x] as usize * stride;
            for r in 0..rank {
                acc.add(base + r, v * b[r] * c[r]);
            }
        }
        Ok(())
    }

    fn factor_row(&self, m: usize, i: Index) -> KernelResult<&'a [Value]> {
        let factors: &'a [DenseMatrix] = self.factors;
        factors[m].get_row(i).ok_or_else(|| {
            ErrorInfo::value_error(
                self.module,
                format!(
                    "coordinate {} outside the {} rows of mats[{}]",
                    i,
                    factors[m].rows(),
                    m
                ),
            )
        })
    }
}

/// Mode-`mode` MTTKRP of `x` into `mats[N]`.
///
/// `mats[0..N]` are the factor matrices (`dims[m] × R`), `mats[N]` the
/// output, which must hold at least `dims[mode]` rows of rank `R`.
/// `mats_order` is a permutation of the modes with `mats_order[0] == mode`;
/// it fixes the order in which factor rows are multiplied.
///
/// Order-3 tensors take the 3-mode path, every other order the general one.
///
/// # Errors
///
/// `ShapeMismatch` or `ValueError` for inconsistent operands (see the
/// module docs); the output is untouched in that case.
pub fn mttkrp(
    x: &SparseTensor,
    mats: &mut [DenseMatrix],
    mats_order: &[usize],
    mode: usize,
) -> KernelResult<()> {
    run_serial(x, mats, mats_order, mode, KernelPath::for_modes(x.nmodes()))
}

/// [`mttkrp`] forced onto the general N-mode path, whatever the order.
pub fn mttkrp_general(
    x: &SparseTensor,
    mats: &mut [DenseMatrix],
    mats_order: &[usize],
    mode: usize,
) -> KernelResult<()> {
    run_serial(x, mats, mats_order, mode, KernelPath::General)
}

/// [`mttkrp`] on the 3-mode path.
///
/// # Errors
///
/// `ShapeMismatch` when `x` is not of order 3, plus everything [`mttkrp`]
/// reports.
pub fn mttkrp_3d(
    x: &SparseTensor,
    mats: &mut [DenseMatrix],
    mats_order: &[usize],
    mode: usize,
) -> KernelResult<()> {
    if x.nmodes() != 3 {
        return Err(ErrorInfo::shape_mismatch(
            SERIAL_MODULE,
            format!("3-mode kernel called on a {}-mode tensor", x.nmodes()),
        ));
    }
    run_serial(x, mats, mats_order, mode, KernelPath::ThreeMode)
}

fn run_serial(
    x: &SparseTensor,
    mats: &mut [DenseMatrix],
    mats_order: &[usize],
    mode: usize,
    path: KernelPath,
) -> KernelResult<()> {
    let shape = check_operands(SERIAL_MODULE, x, mats, mats_order, mode)?;
    let mut timer = Timer::started();

    let (factors, rest) = mats.split_at_mut(x.nmodes());
    let out = &mut rest[0];
    out.zero_rows(shape.out_rows);

    let ops = Operands::new(x, factors, mats_order, mode, shape, path, SERIAL_MODULE);
    let mut scratch = ValueVector::new(shape.rank, shape.rank);
    ops.accumulate(0..x.nnz(), scratch.as_mut_slice(), out.as_mut_slice())?;

    timer.stop();
    tracing::debug!(
        path = path.name(),
        nnz = x.nnz(),
        mode,
        rank = shape.rank,
        elapsed_secs = timer.elapsed_secs(),
        "serial mttkrp"
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use spmttkrp_core::ErrorCode;

    fn ones_mats(dims: &[Index], rank: usize) -> Vec<DenseMatrix> {
        let mut mats: Vec<DenseMatrix> = dims
            .iter()
            .map(|&d| {
                let mut m = DenseMatrix::new(d as usize, rank);
                m.fill(1.0);
                m
            })
            .collect();
        let max = dims.iter().copied().max().unwrap_or(0) as usize;
        mats.push(DenseMatrix::new(max, rank));
        mats
    }

    #[test]
    fn test_single_nonzero_scenario() {
        let mut x = SparseTensor::new(&[2, 2, 2]).unwrap();
        x.append(&[0, 1, 1], 2.0).unwrap();
        let mut mats = ones_mats(&[2, 2, 2], 1);

        mttkrp(&x, &mut mats, &[0, 1, 2], 0).unwrap();
        assert_eq!(mats[3].row(0), &[2.0]);
        assert_eq!(mats[3].row(1), &[0.0]);
    }

    #[test]
    fn test_empty_tensor_clears_output() {
        let x = SparseTensor::new(&[3, 4, 5]).unwrap();
        let mut mats = ones_mats(&[3, 4, 5], 4);
        mats[3].fill(9.0);

        mttkrp(&x, &mut mats, &[1, 2, 0], 1).unwrap();
        for i in 0..4 {
            assert_eq!(mats[3].row(i), &[0.0; 4]);
        }
        // Rows past dims[mode] are not part of the result
        assert_eq!(mats[3].row(4), &[9.0; 4]);
    }

    #[test]
    fn test_general_and_3d_paths_agree() {
        let mut x = SparseTensor::new(&[4, 3, 5]).unwrap();
        x.append(&[0, 0, 0], 1.5).unwrap();
        x.append(&[3, 2, 4], -2.0).unwrap();
        x.append(&[3, 1, 4], 0.25).unwrap();
        x.append(&[1, 2, 3], 4.0).unwrap();

        let mut a = ones_mats(&[4, 3, 5], 3);
        for (k, m) in a.iter_mut().take(3).enumerate() {
            m.fill_random_with(spmttkrp_core::MatrixSeed::Fixed(k as u64));
        }
        let mut b = a.clone();

        for mode in 0..3 {
            let order = [mode, (mode + 1) % 3, (mode + 2) % 3];
            mttkrp_3d(&x, &mut a, &order, mode).unwrap();
            mttkrp_general(&x, &mut b, &order, mode).unwrap();
            assert_eq!(a[3], b[3]);
        }
    }

    #[test]
    fn test_one_mode_tensor_sums_values() {
        let mut x = SparseTensor::new(&[3]).unwrap();
        x.append(&[2], 1.0).unwrap();
        x.append(&[2], 2.5).unwrap();
        x.append(&[0], -1.0).unwrap();
        let mut mats = ones_mats(&[3], 2);

        mttkrp(&x, &mut mats, &[0], 0).unwrap();
        assert_eq!(mats[1].row(0), &[-1.0, -1.0]);
        assert_eq!(mats[1].row(1), &[0.0, 0.0]);
        assert_eq!(mats[1].row(2), &[3.5, 3.5]);
    }

    #[test]
    fn test_validation_errors() {
        let mut x = SparseTensor::new(&[2, 3, 4]).unwrap();
        x.append(&[1, 2, 3], 1.0).unwrap();

        let mut mats = ones_mats(&[2, 3, 4], 2);
        let err = mttkrp(&x, &mut mats[..3], &[0, 1, 2], 0).unwrap_err();
        assert!(err.is_shape_mismatch());

        let err = mttkrp(&x, &mut mats, &[0, 1, 2], 3).unwrap_err();
        assert_eq!(err.code(), ErrorCode::ValueError);

        let err = mttkrp(&x, &mut mats, &[1, 0, 2], 0).unwrap_err();
        assert_eq!(err.code(), ErrorCode::ValueError);

        let err = mttkrp(&x, &mut mats, &[0, 1, 1], 0).unwrap_err();
        assert_eq!(err.code(), ErrorCode::ValueError);

        mats[1] = DenseMatrix::new(5, 2);
        let err = mttkrp(&x, &mut mats, &[0, 1, 2], 0).unwrap_err();
        assert!(err.is_shape_mismatch());
        assert_eq!(err.module(), SERIAL_MODULE);

        let mut mats = ones_mats(&[2, 3, 4], 2);
        mats[2] = DenseMatrix::new(4, 3);
        let err = mttkrp(&x, &mut mats, &[0, 1, 2], 0).unwrap_err();
        assert!(err.is_shape_mismatch());

        let mut mats = ones_mats(&[2, 3, 4], 2);
        mats[3] = DenseMatrix::new(2, 2);
        let err = mttkrp(&x, &mut mats, &[2, 0, 1], 2).unwrap_err();
        assert!(err.is_shape_mismatch());
    }

    #[test]
    fn test_rank_zero_is_a_no_op() {
        let mut x = SparseTensor::new(&[2, 2]).unwrap();
        x.append(&[0, 0], 1.0).unwrap();

        let mut mats: Vec<DenseMatrix> = (0..3).map(|_| DenseMatrix::new(2, 0)).collect();
        mttkrp(&x, &mut mats, &[0, 1], 0).unwrap();
        assert_eq!(mats[2].stride(), 0);
        assert!(mats[2].row(0).is_empty());
    }

    #[test]
    fn test_3d_rejects_other_orders() {
        let x = SparseTensor::new(&[2, 2]).unwrap();
        let mut mats = ones_mats(&[2, 2], 1);
        let err = mttkrp_3d(&x, &mut mats, &[0, 1], 0).unwrap_err();
        assert!(err.is_shape_mismatch());
    }

    #[test]
    fn test_failed_validation_leaves_output_untouched() {
        let mut x = SparseTensor::new(&[2, 2, 2]).unwrap();
        x.append(&[1, 1, 1], 1.0).unwrap();
        let mut mats = ones_mats(&[2, 2, 2], 2);
        mats[3].fill(7.0);
        mats[0] = DenseMatrix::new(3, 2);

        assert!(mttkrp(&x, &mut mats, &[0, 1, 2], 0).is_err());
        assert_eq!(mats[3].row(0), &[7.0, 7.0]);
    }
}
