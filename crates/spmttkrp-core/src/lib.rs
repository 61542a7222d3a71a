//! # spmttkrp-core
//!
//! Building blocks shared by the SpMTTKRP crates.
//!
//! ## Overview
//!
//! - [`DynVec`] (with the [`IndexVector`] / [`ValueVector`] aliases): growable
//!   buffers with an explicit 1.5× growth policy. Every sparse tensor column
//!   is one of these.
//! - [`DenseMatrix`]: row-major matrix with a row stride padded to a multiple
//!   of eight values, stored on a 32-byte aligned [`AlignedBuffer`].
//! - [`Timer`] / [`time_operation`]: wall-clock instrumentation.
//! - [`ErrorInfo`] / [`ErrorCode`]: the error value every fallible call returns.
//! - [`io`]: matrix dump/parse and tolerant dump comparison.
//!
//! ## Quick Start
//!
//! ```
//! use spmttkrp_core::{DenseMatrix, ValueVector};
//!
//! let mut factor = DenseMatrix::new(100, 16);
//! factor.fill_random(false);
//! assert_eq!(factor.stride(), 16);
//!
//! let mut scratch = ValueVector::new(16, 16);
//! scratch.fill(0.0);
//! assert_eq!(scratch.len(), 16);
//! ```
//!
//! ## Features
//!
//! - `memcheck` - grow dynamic vectors by exactly one element per overflow

#![deny(warnings)]

pub mod aligned;
pub mod error;
pub mod io;
pub mod matrix;
pub mod timer;
pub mod types;
pub mod vector;


// Re-exports
pub use aligned::AlignedBuffer;
pub use error::{CoreResult, ErrorCode, ErrorInfo};
pub use matrix::{DenseMatrix, MatrixSeed, DETERMINISTIC_SEED};
pub use timer::{time_operation, Timer, TimingResult};
pub use types::*;
pub use vector::{DynVec, IndexVector, ValueVector};
