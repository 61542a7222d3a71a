//! # SpMTTKRP - Sparse Matricized Tensor Times Khatri-Rao Product
//!
//! This is the **meta crate** that re-exports the SpMTTKRP components and
//! hosts the benchmark driver.
//!
//! ## Quick Start
//!
//! ```
//! use spmttkrp::prelude::*;
//!
//! let mut x = SparseTensor::new(&[2, 2, 2]).unwrap();
//! x.append(&[0, 1, 1], 2.0).unwrap();
//!
//! let mut mats: Vec<DenseMatrix> = (0..4).map(|_| DenseMatrix::new(2, 1)).collect();
//! for m in &mut mats[..3] {
//!     m.fill(1.0);
//! }
//!
//! mttkrp(&x, &mut mats, &[0, 1, 2], 0).unwrap();
//! assert_eq!(mats[3][(0, 0)], 2.0);
//! assert_eq!(mats[3][(1, 0)], 0.0);
//! ```
//!
//! ## Components
//!
//! ### Containers ([`core`])
//!
//! Dynamic vectors, padded dense matrices, timers, errors, matrix dumps.
//!
//! ### Sparse Tensors ([`sparse`])
//!
//! COO tensors and `.tns` text I/O.
//!
//! ```
//! use spmttkrp::sparse::{io::load_tns, SparseTensor};
//!
//! let text = "3\n2 2 2\n1 2 2 2.0\n";
//! let x: SparseTensor = load_tns(text.as_bytes(), 1).unwrap();
//! assert_eq!(x.coords(0), vec![0, 1, 1]);
//! ```
//!
//! ### Kernels ([`kernels`])
//!
//! Serial general and 3-mode MTTKRP, and the parallel kernel when the
//! `parallel` feature is enabled (default).
//!
//! ### Benchmark Driver ([`bench`])
//!
//! Load a tensor, run timed MTTKRP iterations, report GFLOP/s and bandwidth,
//! optionally dump and validate the output. The `spmttkrp-bench` binary is a
//! thin CLI over [`bench::run_bench`].

#![deny(warnings)]

pub mod bench;
pub mod logging;

pub use spmttkrp_core as core;
pub use spmttkrp_kernels as kernels;
pub use spmttkrp_sparse as sparse;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::bench::{run_bench, Backend, BenchConfig, BenchReport, Strategy};
    pub use crate::logging::{init_tracing, TracingConfig, TracingFormat};
    pub use spmttkrp_core::{
        DenseMatrix, DynVec, ErrorCode, ErrorInfo, Index, IndexVector, MatrixSeed, Timer, Value,
        ValueVector,
    };
    pub use spmttkrp_kernels::{mttkrp, mttkrp_3d, mttkrp_general};
    #[cfg(feature = "parallel")]
    pub use spmttkrp_kernels::{mttkrp_parallel, Accumulation, ParallelConfig, WorkerPool};
    pub use spmttkrp_sparse::{SparseTensor, TensorStatus};
}
