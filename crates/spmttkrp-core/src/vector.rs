//! Growable one-dimensional buffers
//!
//! [`DynVec`] keeps its own `len`/`capacity` bookkeeping on top of a fully
//! initialized backing store, so the growth policy is explicit rather than
//! left to `Vec`'s amortization strategy:
//!
//! - capacity never drops below 2
//! - `append` on a full vector grows capacity by half (`cap + cap / 2`), or
//!   by exactly one element when the `memcheck` feature is enabled
//! - `resize` reallocates whenever the required capacity `max(size, 2)`
//!   differs from the current one
//!
//! Every allocated slot is zero-initialized, including slots exposed by a
//! growing `resize`.
//!
//! # Examples
//!
//! ```
//! use spmttkrp_core::{IndexVector, ValueVector};
//!
//! let mut inds = IndexVector::new(0, 0);
//! assert_eq!(inds.capacity(), 2);
//!
//! for i in 0..5 {
//!     inds.append(i);
//! }
//! assert_eq!(inds.as_slice(), &[0, 1, 2, 3, 4]);
//!
//! let mut vals = ValueVector::new(3, 3);
//! vals.fill(1.5);
//! assert_eq!(vals.as_slice(), &[1.5, 1.5, 1.5]);
//! ```

use crate::types::{Index, Value};
use std::ops::{Index as IndexOp, IndexMut};

const MIN_CAPACITY: usize = 2;

/// Growable buffer with explicit length/capacity bookkeeping
#[derive(Debug, Clone)]
pub struct DynVec<T> {
    len: usize,
    data: Vec<T>,
}

/// Vector of per-mode coordinates
pub type IndexVector = DynVec<Index>;

/// Vector of nonzero magnitudes or scratch values
pub type ValueVector = DynVec<Value>;

impl<T: Copy + Default> DynVec<T> {
    /// Create a zero-filled vector of `len` used elements.
    ///
    /// Reserves `max(cap, len, 2)` elements.
    pub fn new(len: usize, cap: usize) -> Self {
        let cap = cap.max(len).max(MIN_CAPACITY);
        DynVec {
            len,
            data: vec![T::default(); cap],
        }
    }

    /// Create a vector holding exactly the given elements.
    pub fn from_slice(values: &[T]) -> Self {
        let mut vec = Self::new(values.len(), values.len());
        vec.data[..values.len()].copy_from_slice(values);
        vec
    }

    /// Number of used elements
    pub fn len(&self) -> usize {
        self.len
    }

    /// True when no element is used
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Number of allocated elements
    pub fn capacity(&self) -> usize {
        self.data.len()
    }

    /// Add `value` after the last used element, growing when full.
    pub fn append(&mut self, value: T) {
        if self.len >= self.capacity() {
            let new_cap = Self::grown_capacity(self.capacity(), self.len);
            self.data.resize(new_cap, T::default());
        }
        self.data[self.len] = value;
        self.len += 1;
    }

    #[cfg(not(feature = "memcheck"))]
    fn grown_capacity(cap: usize, _len: usize) -> usize {
        (cap + cap / 2).max(MIN_CAPACITY)
    }

    #[cfg(feature = "memcheck")]
    fn grown_capacity(_cap: usize, len: usize) -> usize {
        (len + 1).max(MIN_CAPACITY)
    }

    /// Set the number of used elements to `size`.
    ///
    /// Shrinking truncates. Growing exposes zeroed elements.
    pub fn resize(&mut self, size: usize) {
        let new_cap = size.max(MIN_CAPACITY);
        if new_cap != self.capacity() {
            self.data.resize(new_cap, T::default());
            self.data.shrink_to(new_cap);
        }
        if size > self.len {
            self.data[self.len..size].fill(T::default());
        }
        self.len = size;
    }

    /// Overwrite every used element with `value`.
    pub fn fill(&mut self, value: T) {
        self.as_mut_slice().fill(value);
    }

    /// Used elements
    pub fn as_slice(&self) -> &[T] {
        &self.data[..self.len]
    }

    /// Used elements, mutably
    pub fn as_mut_slice(&mut self) -> &mut [T] {
        &mut self.data[..self.len]
    }

    /// Iterate over the used elements
    pub fn iter(&self) -> std::slice::Iter<'_, T> {
        self.as_slice().iter()
    }

    /// Copy of the used elements
    pub fn to_vec(&self) -> Vec<T> {
        self.as_slice().to_vec()
    }
}

impl<T: Copy + Default> Default for DynVec<T> {
    fn default() -> Self {
        Self::new(0, 0)
    }
}

impl<T: Copy + Default + PartialEq> PartialEq for DynVec<T> {
    /// Vectors are equal when their used elements are; capacity is ignored.
    fn eq(&self, other: &Self) -> bool {
        self.as_slice() == other.as_slice()
    }
}

impl<T: Copy + Default> From<Vec<T>> for DynVec<T> {
    fn from(mut data: Vec<T>) -> Self {
        let len = data.len();
        if data.len() < MIN_CAPACITY {
            data.resize(MIN_CAPACITY, T::default());
        }
        DynVec { len, data }
    }
}

impl<T: Copy + Default> IndexOp<usize> for DynVec<T> {
    type Output = T;

    fn index(&self, i: usize) -> &T {
        &self.as_slice()[i]
    }
}

impl<T: Copy + Default> IndexMut<usize> for DynVec<T> {
    fn index_mut(&mut self, i: usize) -> &mut T {
        &mut self.as_mut_slice()[i]
    }
}

impl<'a, T: Copy + Default> IntoIterator for &'a DynVec<T> {
    type Item = &'a T;
    type IntoIter = std::slice::Iter<'a, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl<T: Copy + Default> Extend<T> for DynVec<T> {
    fn extend<I: IntoIterator<Item = T>>(&mut self, iter: I) {
        for value in iter {
            self.append(value);
        }
    }
}
