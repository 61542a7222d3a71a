//! Integration tests for spmttkrp-kernels with spmttkrp-sparse tensors
//!
//! These tests drive the public kernels the way a CP-ALS driver does: one
//! tensor, N factor matrices plus a shared output, every mode in turn.

use scirs2_core::random::{rngs::StdRng, Rng, SeedableRng};
use spmttkrp_core::{DenseMatrix, ErrorCode, Index, MatrixSeed};
use spmttkrp_kernels::{mttkrp, mttkrp_3d, mttkrp_general};
use spmttkrp_sparse::SparseTensor;

/// Random tensor with `nnz` nonzeros (duplicates allowed)
fn random_tensor(dims: &[Index], nnz: usize, seed: u64) -> SparseTensor {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut x = SparseTensor::new(dims).unwrap();
    let mut coords = vec![0; dims.len()];
    for _ in 0..nnz {
        for (c, &d) in coords.iter_mut().zip(dims) {
            *c = rng.random_range(0..d);
        }
        let v: f32 = rng.random_range(-1.0..1.0);
        x.append(&coords, v).unwrap();
    }
    x
}

/// Deterministically filled factors plus an output sized for the largest mode
fn factor_set(x: &SparseTensor, rank: usize) -> Vec<DenseMatrix> {
    let mut mats: Vec<DenseMatrix> = x
        .dims()
        .iter()
        .map(|&d| {
            let mut m = DenseMatrix::new(d as usize, rank);
            m.fill_random(false);
            m
        })
        .collect();
    mats.push(DenseMatrix::new(x.max_dim() as usize, rank));
    mats
}

fn rotated_order(nmodes: usize, mode: usize) -> Vec<usize> {
    (0..nmodes).map(|i| (mode + i) % nmodes).collect()
}

/// Brute-force f64 MTTKRP over logical rows
fn brute_force(x: &SparseTensor, mats: &[DenseMatrix], mode: usize) -> Vec<Vec<f64>> {
    let rank = mats[0].cols();
    let mut out = vec![vec![0.0f64; rank]; x.dims()[mode] as usize];
    for (coords, v) in x.entries() {
        for (r, slot) in out[coords[mode] as usize].iter_mut().enumerate() {
            let mut prod = f64::from(v);
            for (m, &i) in coords.iter().enumerate() {
                if m != mode {
                    prod *= f64::from(mats[m][(i as usize, r)]);
                }
            }
            *slot += prod;
        }
    }
    out
}

fn max_relative_error(out: &DenseMatrix, expected: &[Vec<f64>]) -> f64 {
    let mut worst = 0.0f64;
    for (i, row) in expected.iter().enumerate() {
        for (r, &e) in row.iter().enumerate() {
            let got = f64::from(out[(i, r)]);
            worst = worst.max((got - e).abs() / e.abs().max(1.0));
        }
    }
    worst
}

#[test]
fn test_single_nonzero_mode_zero() {
    let mut x = SparseTensor::new(&[2, 2, 2]).unwrap();
    x.append(&[0, 1, 1], 2.0).unwrap();

    let mut mats: Vec<DenseMatrix> = (0..4).map(|_| DenseMatrix::new(2, 1)).collect();
    for m in &mut mats[..3] {
        m.fill(1.0);
    }

    mttkrp(&x, &mut mats, &[0, 1, 2], 0).unwrap();
    assert_eq!(mats[3][(0, 0)], 2.0);
    assert_eq!(mats[3][(1, 0)], 0.0);
}

#[test]
fn test_empty_tensor_every_mode() {
    let x = SparseTensor::new(&[5, 3, 7]).unwrap();
    let mut mats = factor_set(&x, 16);
    for mode in 0..3 {
        mttkrp(&x, &mut mats, &rotated_order(3, mode), mode).unwrap();
        for i in 0..x.dims()[mode] as usize {
            assert!(mats[3].row(i).iter().all(|&v| v == 0.0));
        }
    }
}

#[test]
fn test_3d_specialization_matches_general() {
    let x = random_tensor(&[40, 30, 20], 2000, 7);
    let mut fast = factor_set(&x, 16);
    let mut general = fast.clone();

    for mode in 0..3 {
        let order = rotated_order(3, mode);
        mttkrp_3d(&x, &mut fast, &order, mode).unwrap();
        mttkrp_general(&x, &mut general, &order, mode).unwrap();

        for i in 0..x.dims()[mode] as usize {
            for (&a, &b) in fast[3].row(i).iter().zip(general[3].row(i)) {
                assert!((a - b).abs() <= 1e-5 * b.abs().max(1.0));
            }
        }
    }
}

#[test]
fn test_five_mode_tensor_matches_brute_force() {
    let x = random_tensor(&[4, 5, 3, 6, 2], 300, 11);
    let mut mats = factor_set(&x, 10);

    for mode in 0..5 {
        mttkrp(&x, &mut mats, &rotated_order(5, mode), mode).unwrap();
        let expected = brute_force(&x, &mats, mode);
        assert!(max_relative_error(&mats[5], &expected) < 1e-4);
    }
}

#[test]
fn test_low_order_tensors_match_brute_force() {
    for dims in [vec![9], vec![6, 8], vec![3, 4, 5, 2]] {
        let x = random_tensor(&dims, 50, dims.len() as u64);
        let n = dims.len();
        let mut mats = factor_set(&x, 5);
        for mode in 0..n {
            mttkrp(&x, &mut mats, &rotated_order(n, mode), mode).unwrap();
            let expected = brute_force(&x, &mats, mode);
            assert!(max_relative_error(&mats[n], &expected) < 1e-4);
        }
    }
}

#[test]
fn test_serial_runs_are_bit_identical() {
    let x = random_tensor(&[25, 25, 25], 1500, 3);
    let mut a = factor_set(&x, 16);
    let mut b = factor_set(&x, 16);

    mttkrp(&x, &mut a, &[1, 2, 0], 1).unwrap();
    mttkrp(&x, &mut b, &[1, 2, 0], 1).unwrap();
    assert_eq!(a[3].as_slice(), b[3].as_slice());
}

#[test]
fn test_shape_mismatch_rows_and_cols() {
    let x = random_tensor(&[4, 5, 6], 20, 5);

    let mut mats = factor_set(&x, 8);
    mats[1] = DenseMatrix::new(4, 8);
    let err = mttkrp(&x, &mut mats, &[0, 1, 2], 0).unwrap_err();
    assert_eq!(err.code(), ErrorCode::ShapeMismatch);
    assert!(mats[3].as_slice().iter().all(|&v| v == 0.0));

    let mut mats = factor_set(&x, 8);
    mats[2] = DenseMatrix::new(6, 4);
    let err = mttkrp(&x, &mut mats, &[0, 1, 2], 0).unwrap_err();
    assert_eq!(err.code(), ErrorCode::ShapeMismatch);
    assert!(err.to_string().contains("mats[2].cols"));
}

#[test]
fn test_output_reused_across_modes() {
    let x = random_tensor(&[8, 3, 5], 100, 9);
    let mut mats = factor_set(&x, 4);

    // Mode 0 writes 8 rows, then mode 1 must clear its 3 rows before adding
    mttkrp(&x, &mut mats, &[0, 1, 2], 0).unwrap();
    mttkrp(&x, &mut mats, &[1, 2, 0], 1).unwrap();
    let expected = brute_force(&x, &mats, 1);
    assert!(max_relative_error(&mats[3], &expected) < 1e-4);
}

#[test]
fn test_random_seed_fill_still_valid_input() {
    let x = random_tensor(&[6, 6, 6], 40, 21);
    let mut mats = factor_set(&x, 3);
    for m in &mut mats[..3] {
        m.fill_random_with(MatrixSeed::Clock);
    }
    mttkrp(&x, &mut mats, &[2, 0, 1], 2).unwrap();
    let expected = brute_force(&x, &mats, 2);
    assert!(max_relative_error(&mats[3], &expected) < 1e-4);
}

#[cfg(feature = "parallel")]
mod parallel {
    use super::*;
    use spmttkrp_kernels::{mttkrp_parallel, Accumulation, ParallelConfig, WorkerPool};

    #[test]
    fn test_worker_counts_match_serial() {
        let x = random_tensor(&[50, 40, 30], 5000, 13);
        let mut serial = factor_set(&x, 16);
        mttkrp(&x, &mut serial, &[0, 1, 2], 0).unwrap();

        for accumulation in [Accumulation::Atomic, Accumulation::Privatized] {
            for workers in [1, 2, 4, 8] {
                let pool = WorkerPool::new(&ParallelConfig {
                    num_workers: Some(workers),
                    accumulation,
                })
                .unwrap();
                let mut mats = factor_set(&x, 16);
                pool.mttkrp(&x, &mut mats, &[0, 1, 2], 0).unwrap();

                for i in 0..50 {
                    for (&a, &b) in mats[3].row(i).iter().zip(serial[3].row(i)) {
                        assert!(
                            (a - b).abs() <= 1e-4 * b.abs().max(1.0),
                            "{:?} with {} workers: {} vs {}",
                            accumulation,
                            workers,
                            a,
                            b
                        );
                    }
                }
                assert!(mats[3].padding_is_zero());
            }
        }
    }

    #[test]
    fn test_parallel_general_path() {
        let x = random_tensor(&[7, 6, 5, 4], 800, 17);
        let pool = WorkerPool::new(&ParallelConfig {
            num_workers: Some(4),
            ..Default::default()
        })
        .unwrap();

        let mut mats = factor_set(&x, 8);
        for mode in 0..4 {
            pool.mttkrp(&x, &mut mats, &rotated_order(4, mode), mode)
                .unwrap();
            let expected = brute_force(&x, &mats, mode);
            assert!(max_relative_error(&mats[4], &expected) < 1e-4);
        }
    }

    #[test]
    fn test_parallel_empty_and_tiny_tensors() {
        let config = ParallelConfig {
            num_workers: Some(8),
            accumulation: Accumulation::Privatized,
        };

        let x = SparseTensor::new(&[3, 3, 3]).unwrap();
        let mut mats = factor_set(&x, 4);
        mats[3].fill(5.0);
        mttkrp_parallel(&x, &mut mats, &[0, 1, 2], 0, &config).unwrap();
        assert!(mats[3].as_slice().iter().all(|&v| v == 0.0));

        // Fewer nonzeros than workers
        let x = random_tensor(&[3, 3, 3], 3, 1);
        let mut mats = factor_set(&x, 4);
        mttkrp_parallel(&x, &mut mats, &[0, 1, 2], 0, &config).unwrap();
        let expected = brute_force(&x, &mats, 0);
        assert!(max_relative_error(&mats[3], &expected) < 1e-4);
    }

    #[test]
    fn test_parallel_validation_errors() {
        let x = random_tensor(&[4, 4, 4], 10, 2);
        let pool = WorkerPool::new(&ParallelConfig::default()).unwrap();

        let mut mats = factor_set(&x, 4);
        mats[0] = DenseMatrix::new(3, 4);
        let err = pool.mttkrp(&x, &mut mats, &[0, 1, 2], 0).unwrap_err();
        assert_eq!(err.code(), ErrorCode::ShapeMismatch);
        assert_eq!(err.module(), "Par SpTns MTTKRP");

        let mut mats = factor_set(&x, 4);
        let err = pool.mttkrp(&x, &mut mats, &[0, 2, 2], 0).unwrap_err();
        assert_eq!(err.code(), ErrorCode::ValueError);
    }
}
