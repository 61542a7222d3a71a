//! Error reporting for SpMTTKRP
//!
//! Every fallible operation in the workspace returns `Result<T, ErrorInfo>`.
//! An [`ErrorInfo`] carries what a caller needs to inspect a failure after the
//! fact: the reporting module, a stable numeric [`ErrorCode`], the source
//! location that raised it and an optional human-readable reason.
//!
//! There is no process-wide "last error" slot; the value travels with the
//! `Result`. In debug builds each error is also logged through `tracing` at
//! the point it is raised. Release builds skip the log line but keep the code.
//!
//! # Examples
//!
//! ```
//! use spmttkrp_core::error::{ErrorCode, ErrorInfo};
//!
//! fn check_rank(expected: usize, got: usize) -> Result<(), ErrorInfo> {
//!     if expected != got {
//!         return Err(ErrorInfo::shape_mismatch("Rank check", "column count differs"));
//!     }
//!     Ok(())
//! }
//!
//! let err = check_rank(16, 8).unwrap_err();
//! assert_eq!(err.code(), ErrorCode::ShapeMismatch);
//! assert_eq!(err.code().as_u32(), 2);
//! ```

use std::fmt;
use std::panic::Location;
use thiserror::Error;

/// Offset added to an OS `errno` to form an [`ErrorCode::Os`] numeric code.
pub const OS_ERROR_BASE: u32 = 0x10000;

/// Stable numeric classification of a failure
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    /// Unclassified failure
    Unknown,
    /// Operand shapes are inconsistent (rank, row counts, mode counts)
    ShapeMismatch,
    /// An argument or input value is out of its valid domain
    ValueError,
    /// Division by zero in a derived quantity
    ZeroDivision,
    /// Input exhausted before the expected amount of data was read
    NoMore,
    /// Operating-system failure, carrying the raw `errno` (0 when unknown)
    Os(i32),
}

impl ErrorCode {
    /// Numeric value of this code.
    ///
    /// ```
    /// use spmttkrp_core::error::ErrorCode;
    ///
    /// assert_eq!(ErrorCode::ShapeMismatch.as_u32(), 2);
    /// assert_eq!(ErrorCode::Os(2).as_u32(), 0x10002);
    /// ```
    pub fn as_u32(self) -> u32 {
        match self {
            ErrorCode::Unknown => 1,
            ErrorCode::ShapeMismatch => 2,
            ErrorCode::ValueError => 3,
            ErrorCode::ZeroDivision => 4,
            ErrorCode::NoMore => 99,
            ErrorCode::Os(errno) => OS_ERROR_BASE + errno.max(0) as u32,
        }
    }

    /// True for failures reported by the operating system.
    pub fn is_os(self) -> bool {
        matches!(self, ErrorCode::Os(_))
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{:08x}", self.as_u32())
    }
}

/// A reported failure: module, code, location and optional reason
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("[{module}] error {code} at {file}:{line}{}", reason_suffix(.reason))]
pub struct ErrorInfo {
    module: &'static str,
    code: ErrorCode,
    file: &'static str,
    line: u32,
    reason: Option<String>,
}

fn reason_suffix(reason: &Option<String>) -> String {
    match reason {
        Some(r) if !r.is_empty() => format!(", {}", r),
        _ => String::new(),
    }
}

/// Result type alias for core operations
pub type CoreResult<T> = Result<T, ErrorInfo>;

impl ErrorInfo {
    /// Raise an error at the caller's source location.
    #[track_caller]
    pub fn new(module: &'static str, code: ErrorCode, reason: impl Into<String>) -> Self {
        let reason = reason.into();
        let reason = if reason.is_empty() { None } else { Some(reason) };
        Self::at(module, code, reason, Location::caller())
    }

    /// Raise an error without a reason string.
    #[track_caller]
    pub fn bare(module: &'static str, code: ErrorCode) -> Self {
        Self::at(module, code, None, Location::caller())
    }

    /// Shape mismatch between operands
    #[track_caller]
    pub fn shape_mismatch(module: &'static str, reason: impl Into<String>) -> Self {
        Self::new(module, ErrorCode::ShapeMismatch, reason)
    }

    /// Argument outside its valid domain
    #[track_caller]
    pub fn value_error(module: &'static str, reason: impl Into<String>) -> Self {
        Self::new(module, ErrorCode::ValueError, reason)
    }

    /// Operating-system failure, keeping the raw `errno` when the I/O error has one.
    #[track_caller]
    pub fn from_io(module: &'static str, err: &std::io::Error) -> Self {
        let errno = err.raw_os_error().unwrap_or(0);
        Self::new(module, ErrorCode::Os(errno), err.to_string())
    }

    fn at(
        module: &'static str,
        code: ErrorCode,
        reason: Option<String>,
        location: &'static Location<'static>,
    ) -> Self {
        let info = ErrorInfo {
            module,
            code,
            file: location.file(),
            line: location.line(),
            reason,
        };
        info.complain();
        info
    }

    fn complain(&self) {
        if cfg!(debug_assertions) {
            tracing::error!(
                module = self.module,
                code = %self.code,
                file = self.file,
                line = self.line,
                reason = self.reason.as_deref().unwrap_or(""),
                "operation failed"
            );
        }
    }

    /// Module that raised the error
    pub fn module(&self) -> &'static str {
        self.module
    }

    /// Numeric classification
    pub fn code(&self) -> ErrorCode {
        self.code
    }

    /// Source file that raised the error
    pub fn file(&self) -> &'static str {
        self.file
    }

    /// Source line that raised the error
    pub fn line(&self) -> u32 {
        self.line
    }

    /// Human-readable explanation, if one was given
    pub fn reason(&self) -> Option<&str> {
        self.reason.as_deref()
    }

    /// Shorthand for `self.code() == ErrorCode::ShapeMismatch`
    pub fn is_shape_mismatch(&self) -> bool {
        self.code == ErrorCode::ShapeMismatch
    }
}
