//! Lane-aligned value storage
//!
//! [`AlignedBuffer`] stores values in 32-byte lanes of [`LANE_WIDTH`] values.
//! The buffer start is therefore aligned to [`LANE_ALIGN_BYTES`], and so is
//! every offset that is a multiple of `LANE_WIDTH`. Dense matrices rely on
//! this to start every row on a lane boundary.

use crate::types::{Value, LANE_ALIGN_BYTES, LANE_WIDTH};

#[derive(Debug, Clone, Copy, Default, PartialEq)]
#[repr(C, align(32))]
struct Lane([Value; LANE_WIDTH]);

const _: () = assert!(std::mem::size_of::<Lane>() == LANE_ALIGN_BYTES);
const _: () = assert!(std::mem::align_of::<Lane>() == LANE_ALIGN_BYTES);

/// Zero-initialized value buffer whose start is aligned to 32 bytes
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AlignedBuffer {
    lanes: Vec<Lane>,
}

impl AlignedBuffer {
    /// Allocate room for at least `len` values, rounded up to whole lanes.
    pub fn zeroed(len: usize) -> Self {
        AlignedBuffer {
            lanes: vec![Lane::default(); len.div_ceil(LANE_WIDTH)],
        }
    }

    /// Number of values held (always a multiple of `LANE_WIDTH`)
    pub fn len(&self) -> usize {
        self.lanes.len() * LANE_WIDTH
    }

    /// True when no value is held
    pub fn is_empty(&self) -> bool {
        self.lanes.is_empty()
    }

    /// All values as a flat slice
    pub fn as_slice(&self) -> &[Value] {
        // SAFETY: `Lane` is `repr(C)` around `[Value; LANE_WIDTH]` and its size
        // equals its alignment, so a `Vec<Lane>` is a contiguous, padding-free
        // run of `len()` initialized values. The pointer is non-null and
        // aligned even when the vector is empty.
        unsafe { std::slice::from_raw_parts(self.lanes.as_ptr().cast::<Value>(), self.len()) }
    }

    /// All values as a flat mutable slice
    pub fn as_mut_slice(&mut self) -> &mut [Value] {
        let len = self.len();
        // SAFETY: see `as_slice`; the exclusive borrow of `self` guarantees
        // the returned slice is the only live reference into the lanes.
        unsafe { std::slice::from_raw_parts_mut(self.lanes.as_mut_ptr().cast::<Value>(), len) }
    }

    /// Set every value to zero
    pub fn zero(&mut self) {
        self.lanes.fill(Lane::default());
    }
}
