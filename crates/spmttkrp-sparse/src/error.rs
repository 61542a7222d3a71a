//! Error types for sparse tensor operations
//!
//! Sparse tensors report failures with the workspace-wide
//! [`ErrorInfo`](spmttkrp_core::ErrorInfo). Module names used here:
//!
//! - `SpTns New` / `SpTns Append`: construction and population
//! - `SpTns Sort`: reordering
//! - `SpTns Load` / `SpTns Dump`: `.tns` text I/O

pub use spmttkrp_core::error::{ErrorCode, ErrorInfo};

/// Result type alias for sparse tensor operations
pub type SparseResult<T> = Result<T, ErrorInfo>;
