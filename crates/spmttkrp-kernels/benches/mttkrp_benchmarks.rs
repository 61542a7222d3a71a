//! Performance benchmarks for spmttkrp-kernels
//!
//! Run with: cargo bench -p spmttkrp-kernels
//!
//! Benchmarks cover:
//! - Serial MTTKRP, 3-mode vs general path
//! - General path on 4- and 5-mode tensors
//! - Parallel MTTKRP, atomic vs privatized accumulation

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use scirs2_core::random::{rngs::StdRng, Rng, SeedableRng};
use spmttkrp_core::{DenseMatrix, Index};
use spmttkrp_kernels::*;
use spmttkrp_sparse::SparseTensor;

const RANK: usize = 16;

fn random_tensor(dims: &[Index], nnz: usize) -> SparseTensor {
    let mut rng = StdRng::seed_from_u64(42);
    let mut x = SparseTensor::new(dims).unwrap();
    let mut coords = vec![0; dims.len()];
    for _ in 0..nnz {
        for (c, &d) in coords.iter_mut().zip(dims) {
            *c = rng.random_range(0..d);
        }
        x.append(&coords, rng.random::<f32>()).unwrap();
    }
    x
}

fn factor_set(x: &SparseTensor) -> Vec<DenseMatrix> {
    let mut mats: Vec<DenseMatrix> = x
        .dims()
        .iter()
        .map(|&d| {
            let mut m = DenseMatrix::new(d as usize, RANK);
            m.fill_random(false);
            m
        })
        .collect();
    mats.push(DenseMatrix::new(x.max_dim() as usize, RANK));
    mats
}

/// Floating-point operations of one call: N·R per nonzero
fn flops(x: &SparseTensor) -> u64 {
    (x.nmodes() * RANK * x.nnz()) as u64
}

fn bench_serial_3d(c: &mut Criterion) {
    let mut group = c.benchmark_group("mttkrp_serial_3d");

    for &nnz in [10_000usize, 100_000, 500_000].iter() {
        let x = random_tensor(&[1000, 800, 600], nnz);
        let mut mats = factor_set(&x);
        group.throughput(Throughput::Elements(flops(&x)));

        group.bench_with_input(BenchmarkId::new("3-mode", nnz), &nnz, |bencher, _| {
            bencher.iter(|| {
                mttkrp_3d(black_box(&x), &mut mats, &[0, 1, 2], 0).unwrap();
            });
        });

        group.bench_with_input(BenchmarkId::new("general", nnz), &nnz, |bencher, _| {
            bencher.iter(|| {
                mttkrp_general(black_box(&x), &mut mats, &[0, 1, 2], 0).unwrap();
            });
        });
    }
    group.finish();
}

fn bench_serial_higher_order(c: &mut Criterion) {
    let mut group = c.benchmark_group("mttkrp_serial_nmode");

    for dims in [vec![200u32, 150, 100, 80], vec![60, 50, 40, 30, 20]] {
        let x = random_tensor(&dims, 100_000);
        let mut mats = factor_set(&x);
        let order: Vec<usize> = (0..dims.len()).collect();
        group.throughput(Throughput::Elements(flops(&x)));

        group.bench_with_input(
            BenchmarkId::new("general", format!("{}-mode", dims.len())),
            &dims,
            |bencher, _| {
                bencher.iter(|| {
                    mttkrp(black_box(&x), &mut mats, &order, 0).unwrap();
                });
            },
        );
    }
    group.finish();
}

#[cfg(feature = "parallel")]
fn bench_parallel(c: &mut Criterion) {
    let mut group = c.benchmark_group("mttkrp_parallel");
    let x = random_tensor(&[1000, 800, 600], 500_000);
    group.throughput(Throughput::Elements(flops(&x)));

    for accumulation in [Accumulation::Atomic, Accumulation::Privatized] {
        for &workers in [1usize, 2, 4, 8].iter() {
            let pool = WorkerPool::new(&ParallelConfig {
                num_workers: Some(workers),
                accumulation,
            })
            .unwrap();
            let mut mats = factor_set(&x);

            group.bench_with_input(
                BenchmarkId::new(format!("{:?}", accumulation), workers),
                &workers,
                |bencher, _| {
                    bencher.iter(|| {
                        pool.mttkrp(black_box(&x), &mut mats, &[0, 1, 2], 0)
                            .unwrap();
                    });
                },
            );
        }
    }
    group.finish();
}

#[cfg(feature = "parallel")]
criterion_group!(
    benches,
    bench_serial_3d,
    bench_serial_higher_order,
    bench_parallel
);

#[cfg(not(feature = "parallel"))]
criterion_group!(benches, bench_serial_3d, bench_serial_higher_order);

criterion_main!(benches);
