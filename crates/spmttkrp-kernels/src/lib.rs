//! # spmttkrp-kernels
//!
//! Sparse MTTKRP kernels over COO tensors.
//!
//! ## Overview
//!
//! MTTKRP is the dominant kernel of CP/PARAFAC decomposition. Given a sparse
//! tensor X of order N, factor matrices `mats[0..N]` and an output `mats[N]`,
//! the mode-`n` product accumulates `v_x · Π factor rows` into output row
//! `i_n` for every nonzero `x`.
//!
//! **Kernels:**
//! - [`mttkrp`]: serial, dispatching order-3 tensors to a scratch-free loop
//! - [`mttkrp_general`]: serial, general N-mode loop for any order
//! - [`mttkrp_3d`]: serial, 3-mode loop only
//! - [`WorkerPool::mttkrp`] / [`mttkrp_parallel`]: static partition over a
//!   fixed thread pool with atomic or privatized accumulation
//!
//! ## Quick Start
//!
//! ```rust
//! use spmttkrp_core::DenseMatrix;
//! use spmttkrp_kernels::mttkrp;
//! use spmttkrp_sparse::SparseTensor;
//!
//! let mut x = SparseTensor::new(&[3, 4, 5]).unwrap();
//! x.append(&[2, 3, 4], 1.5).unwrap();
//!
//! let rank = 8;
//! let mut mats: Vec<DenseMatrix> = x
//!     .dims()
//!     .iter()
//!     .map(|&d| {
//!         let mut m = DenseMatrix::new(d as usize, rank);
//!         m.fill(2.0);
//!         m
//!     })
//!     .collect();
//! mats.push(DenseMatrix::new(x.max_dim() as usize, rank));
//!
//! mttkrp(&x, &mut mats, &[0, 1, 2], 0).unwrap();
//! assert_eq!(mats[3][(2, 0)], 6.0);
//! ```
//!
//! ## Features
//!
//! - `parallel` (default) - Enable the thread-pool kernels using rayon

#![deny(warnings)]

pub mod error;
pub mod mttkrp;
#[cfg(feature = "parallel")]
pub mod parallel;


// Re-exports
pub use error::{KernelResult, PARALLEL_MODULE, SERIAL_MODULE};
pub use mttkrp::{mttkrp, mttkrp_3d, mttkrp_general};
#[cfg(feature = "parallel")]
pub use parallel::{mttkrp_parallel, static_partition, Accumulation, ParallelConfig, WorkerPool};
