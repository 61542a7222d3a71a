//! Scalar type definitions shared by every SpMTTKRP crate.
//!
//! Indices and values are both 32 bits wide. Nonzero counts use `usize`.

/// Coordinate of a nonzero along one mode, and the type of mode extents.
pub type Index = u32;

/// Magnitude of a nonzero and element type of every dense matrix.
pub type Value = f32;

/// Number of values in one aligned lane of a dense matrix row.
///
/// Row strides are always a multiple of this.
pub const LANE_WIDTH: usize = 8;

/// Byte alignment guaranteed for every dense matrix buffer and every row start.
pub const LANE_ALIGN_BYTES: usize = LANE_WIDTH * std::mem::size_of::<Value>();

/// Round a column count up to the row stride used by [`crate::DenseMatrix`].
///
/// ```
/// use spmttkrp_core::padded_stride;
///
/// assert_eq!(padded_stride(0), 0);
/// assert_eq!(padded_stride(1), 8);
/// assert_eq!(padded_stride(16), 16);
/// assert_eq!(padded_stride(17), 24);
/// ```
pub fn padded_stride(cols: usize) -> usize {
    cols.div_ceil(LANE_WIDTH) * LANE_WIDTH
}

/// True when `order` holds every mode in `0..nmodes` exactly once.
///
/// ```
/// use spmttkrp_core::is_permutation;
///
/// assert!(is_permutation(&[2, 0, 1], 3));
/// assert!(!is_permutation(&[0, 0, 1], 3));
/// assert!(!is_permutation(&[0, 1], 3));
/// ```
pub fn is_permutation(order: &[usize], nmodes: usize) -> bool {
    if order.len() != nmodes {
        return false;
    }
    let mut seen = vec![false; nmodes];
    for &m in order {
        if m >= nmodes || seen[m] {
            return false;
        }
        seen[m] = true;
    }
    true
}
