//! # spmttkrp-sparse
//!
//! Coordinate-format sparse tensors for SpMTTKRP.
//!
//! This crate provides:
//! - [`SparseTensor`]: COO storage of arbitrary order, one index column per mode
//! - `.tns` text load/dump ([`io`]), headered or headerless
//! - Shape summaries ([`TensorStatus`]), index bounds and slice sizes
//!
//! Sparse tensors are the read-only input of every MTTKRP kernel.

#![deny(warnings)]

pub mod coo;
pub mod error;
pub mod io;

// Re-exports
pub use coo::*;
pub use error::*;
