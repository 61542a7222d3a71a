//! Error types for MTTKRP kernels
//!
//! Kernels report through the workspace-wide
//! [`ErrorInfo`](spmttkrp_core::ErrorInfo). Operand validation happens before
//! any output row is touched, so a `ShapeMismatch` or `ValueError` leaves the
//! output matrix unchanged. Faults raised inside a kernel (an out-of-range
//! factor row) may leave it partially written.

pub use spmttkrp_core::error::{ErrorCode, ErrorInfo};

/// Module name reported by the serial kernels
pub const SERIAL_MODULE: &str = "Cpu SpTns MTTKRP";

/// Module name reported by the parallel kernels
pub const PARALLEL_MODULE: &str = "Par SpTns MTTKRP";

/// Result type alias for kernel operations
pub type KernelResult<T> = Result<T, ErrorInfo>;
