//! MTTKRP benchmark driver
//!
//! [`run_bench`] reproduces the classic COO MTTKRP benchmark flow:
//!
//! 1. Load a `.tns` tensor and log its status
//! 2. Allocate `N` random factor matrices (`dims[m] × R`) and one output
//!    (`max(dims) × R`)
//! 3. Order the factors as `mode, mode+1, …` modulo `N`
//! 4. Run one untimed warm-up call, then `niters` timed calls
//! 5. Report the average time, GFLOP/s (`N·R·nnz / t`) and bandwidth
//! 6. Optionally dump the output and compare it against a previous dump
//!
//! Validation runs fill the factors from the fixed seed so two runs of the
//! same input produce comparable dumps.

use anyhow::{bail, Context, Result};
use spmttkrp_core::io::{compare_dump_files, dump_matrix_to_file};
use spmttkrp_core::{DenseMatrix, Index, MatrixSeed, Timer, TimingResult, Value};
use spmttkrp_sparse::{io::load_tns_file, SparseTensor, TensorStatus};
use std::fmt;
use std::path::PathBuf;

/// Which kernel family runs the timed loop
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum Backend {
    /// Single-threaded kernel
    #[default]
    Serial,
    /// Thread-pool kernel (requires the `parallel` feature)
    Parallel,
}

/// Output accumulation strategy for the parallel backend
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum Strategy {
    /// Atomic adds into the shared output
    #[default]
    Atomic,
    /// Per-worker buffers merged after the join
    Privatized,
}

/// Benchmark configuration
#[derive(Debug, Clone)]
pub struct BenchConfig {
    /// Input `.tns` file
    pub input: PathBuf,
    /// Base of the coordinates in the input file
    pub start_index: Index,
    /// Mode to compute
    pub mode: usize,
    /// Number of factor columns
    pub rank: usize,
    /// Timed iterations
    pub niters: usize,
    /// Kernel family
    pub backend: Backend,
    /// Worker count for the parallel backend (None = all cores)
    pub threads: Option<usize>,
    /// Accumulation strategy for the parallel backend
    pub strategy: Strategy,
    /// Where to dump the output matrix
    pub output: Option<PathBuf>,
    /// Previous dump to validate the output against
    pub validate: Option<PathBuf>,
    /// Seed factor fills from the clock (ignored when validating)
    pub use_random_seed: bool,
}

impl BenchConfig {
    /// Defaults for `input`: 1-based coordinates, mode 0, rank 16, 5 iterations
    pub fn new(input: impl Into<PathBuf>) -> Self {
        Self {
            input: input.into(),
            start_index: 1,
            mode: 0,
            rank: 16,
            niters: 5,
            backend: Backend::Serial,
            threads: None,
            strategy: Strategy::Atomic,
            output: None,
            validate: None,
            use_random_seed: true,
        }
    }

    /// Seed source for the factor fills
    pub fn seed(&self) -> MatrixSeed {
        MatrixSeed::from_flag(self.use_random_seed && self.validate.is_none())
    }

    fn check(&self) -> Result<()> {
        if self.rank == 0 {
            bail!("rank must be at least 1");
        }
        if self.niters == 0 {
            bail!("niters must be at least 1");
        }
        if self.validate.is_some() && self.output.is_none() {
            bail!("validation needs an output file to compare");
        }
        if self.backend == Backend::Parallel && !cfg!(feature = "parallel") {
            bail!("parallel backend requested but built without the `parallel` feature");
        }
        Ok(())
    }
}

/// Result of one benchmark run
#[derive(Debug, Clone)]
pub struct BenchReport {
    /// Summary of the loaded tensor
    pub tensor: TensorStatus,
    /// Mode that was computed
    pub mode: usize,
    /// Factor ordering passed to the kernel
    pub order: Vec<usize>,
    /// Kernel family used
    pub backend: Backend,
    /// Workers used (1 for serial)
    pub workers: usize,
    /// Average time per iteration, with flop and byte counts attached
    pub timing: TimingResult,
    /// Output matrix after the last iteration
    pub output: DenseMatrix,
    /// Comparison against the validation dump, when one was given
    pub validation: Option<bool>,
}

impl fmt::Display for BenchReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "mode: {}, backend: {:?}, workers: {}",
            self.mode, self.backend, self.workers
        )?;
        writeln!(f, "[Average CooMTTKRP]: {:.6} s", self.timing.elapsed_secs)?;
        write!(
            f,
            "Performance: {:.10} GFlop/s, Bandwidth: {:.2} GB/s",
            self.timing.gflops().unwrap_or(0.0),
            self.timing.bandwidth_gbs().unwrap_or(0.0)
        )?;
        if let Some(ok) = self.validation {
            write!(
                f,
                "\nValidation {}",
                if ok { "Successful" } else { "FAILED" }
            )?;
        }
        Ok(())
    }
}

/// Factor ordering for `mode`: `mode` first, then the remaining modes cyclically
pub fn rotated_order(nmodes: usize, mode: usize) -> Vec<usize> {
    (0..nmodes).map(|i| (mode + i) % nmodes).collect()
}

/// Floating-point operations of one call: `N·R·nnz`
pub fn flop_count(x: &SparseTensor, rank: usize) -> f64 {
    x.nmodes() as f64 * rank as f64 * x.nnz() as f64
}

/// Bytes touched by one call: every coordinate and value once, plus every factor
pub fn byte_count(x: &SparseTensor, rank: usize) -> f64 {
    let index_bytes = std::mem::size_of::<Index>();
    let value_bytes = std::mem::size_of::<Value>();
    let tensor = (x.nmodes() * index_bytes + value_bytes) * x.nnz();
    let factors: usize = x
        .dims()
        .iter()
        .map(|&d| d as usize * rank * value_bytes)
        .sum();
    (tensor + factors) as f64
}

/// `N` filled factor matrices plus a zeroed output sized for the largest mode
pub fn allocate_factors(x: &SparseTensor, rank: usize, seed: MatrixSeed) -> Vec<DenseMatrix> {
    let mut mats: Vec<DenseMatrix> = x
        .dims()
        .iter()
        .map(|&d| {
            let mut m = DenseMatrix::new(d as usize, rank);
            m.fill_random_with(seed);
            m
        })
        .collect();
    mats.push(DenseMatrix::new(x.max_dim() as usize, rank));
    mats
}

/// Load the tensor named by `config` and benchmark MTTKRP on it.
pub fn run_bench(config: &BenchConfig) -> Result<BenchReport> {
    config.check()?;

    let x = load_tns_file(&config.input, config.start_index)
        .with_context(|| format!("loading {}", config.input.display()))?;
    let status = x.status();
    tracing::info!("{}", status);

    let n = x.nmodes();
    if config.mode >= n {
        bail!("mode {} out of range for a {}-mode tensor", config.mode, n);
    }

    let mut mats = allocate_factors(&x, config.rank, config.seed());
    let order = rotated_order(n, config.mode);
    tracing::info!(
        mode = config.mode,
        rank = config.rank,
        niters = config.niters,
        backend = ?config.backend,
        "starting benchmark"
    );

    let runner = Runner::new(config)?;
    let workers = runner.workers();

    // Warm-up, not timed
    runner.run(&x, &mut mats, &order, config.mode)?;

    let mut timer = Timer::started();
    for _ in 0..config.niters {
        mats[n].fill(0.0);
        runner.run(&x, &mut mats, &order, config.mode)?;
    }
    timer.stop();

    let average = timer.print_average_elapsed(config.niters, "Average CooMTTKRP");
    let timing = TimingResult::new("CooMTTKRP", average)
        .with_flops(flop_count(&x, config.rank))
        .with_bytes(byte_count(&x, config.rank));
    tracing::info!(
        "Performance: {:.10} GFlop/s, Bandwidth: {:.2} GB/s",
        timing.gflops().unwrap_or(0.0),
        timing.bandwidth_gbs().unwrap_or(0.0)
    );

    let output = mats.swap_remove(n);

    if let Some(path) = &config.output {
        dump_matrix_to_file(&output, path)
            .with_context(|| format!("dumping output to {}", path.display()))?;
        tracing::info!(path = %path.display(), "output dumped");
    }

    let validation = match (&config.validate, &config.output) {
        (Some(reference), Some(dumped)) => {
            let ok = compare_dump_files(reference, dumped).with_context(|| {
                format!(
                    "comparing {} against {}",
                    dumped.display(),
                    reference.display()
                )
            })?;
            if ok {
                tracing::info!(
                    "Validation Successful: {} matches {}",
                    dumped.display(),
                    reference.display()
                );
            } else {
                tracing::warn!("Files are not equal. Validation FAILED");
            }
            Some(ok)
        }
        _ => None,
    };

    Ok(BenchReport {
        tensor: status,
        mode: config.mode,
        order,
        backend: config.backend,
        workers,
        timing,
        output,
        validation,
    })
}

/// The kernel selected by a [`BenchConfig`], with its pool built once
enum Runner {
    Serial,
    #[cfg(feature = "parallel")]
    Parallel(spmttkrp_kernels::WorkerPool),
}

impl Runner {
    fn new(config: &BenchConfig) -> Result<Self> {
        match config.backend {
            Backend::Serial => Ok(Runner::Serial),
            #[cfg(feature = "parallel")]
            Backend::Parallel => {
                use spmttkrp_kernels::{Accumulation, ParallelConfig, WorkerPool};
                let accumulation = match config.strategy {
                    Strategy::Atomic => Accumulation::Atomic,
                    Strategy::Privatized => Accumulation::Privatized,
                };
                let pool = WorkerPool::new(&ParallelConfig {
                    num_workers: config.threads,
                    accumulation,
                })?;
                Ok(Runner::Parallel(pool))
            }
            #[cfg(not(feature = "parallel"))]
            Backend::Parallel => bail!("built without the `parallel` feature"),
        }
    }

    fn workers(&self) -> usize {
        match self {
            Runner::Serial => 1,
            #[cfg(feature = "parallel")]
            Runner::Parallel(pool) => pool.num_workers(),
        }
    }

    fn run(
        &self,
        x: &SparseTensor,
        mats: &mut [DenseMatrix],
        order: &[usize],
        mode: usize,
    ) -> Result<()> {
        match self {
            Runner::Serial => spmttkrp_kernels::mttkrp(x, mats, order, mode)?,
            #[cfg(feature = "parallel")]
            Runner::Parallel(pool) => pool.mttkrp(x, mats, order, mode)?,
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tensor() -> SparseTensor {
        let mut x = SparseTensor::new(&[4, 3, 2]).unwrap();
        x.append(&[0, 0, 0], 1.0).unwrap();
        x.append(&[3, 2, 1], 2.0).unwrap();
        x
    }

    #[test]
    fn test_rotated_order() {
        assert_eq!(rotated_order(3, 0), vec![0, 1, 2]);
        assert_eq!(rotated_order(3, 2), vec![2, 0, 1]);
        assert_eq!(rotated_order(1, 0), vec![0]);
    }

    #[test]
    fn test_flop_and_byte_counts() {
        let x = tensor();
        assert_eq!(flop_count(&x, 16), 3.0 * 16.0 * 2.0);
        // (3·4 + 4)·2 tensor bytes, (4 + 3 + 2)·16·4 factor bytes
        assert_eq!(byte_count(&x, 16), (32 + 576) as f64);
    }

    #[test]
    fn test_allocate_factors_shapes() {
        let x = tensor();
        let mats = allocate_factors(&x, 5, MatrixSeed::Fixed(7));
        assert_eq!(mats.len(), 4);
        for (m, &d) in x.dims().iter().enumerate() {
            assert_eq!(mats[m].rows(), d as usize);
            assert_eq!(mats[m].cols(), 5);
        }
        assert_eq!(mats[3].rows(), 4);
        assert!(mats[3].as_slice().iter().all(|&v| v == 0.0));
    }

    #[test]
    fn test_validation_forces_fixed_seed() {
        let mut config = BenchConfig::new("in.tns");
        assert_eq!(config.seed(), MatrixSeed::Clock);
        config.validate = Some("ref.txt".into());
        assert!(matches!(config.seed(), MatrixSeed::Fixed(_)));
    }

    #[test]
    fn test_config_checks() {
        let mut config = BenchConfig::new("in.tns");
        assert!(config.check().is_ok());

        config.rank = 0;
        assert!(config.check().is_err());
        config.rank = 16;

        config.niters = 0;
        assert!(config.check().is_err());
        config.niters = 5;

        config.validate = Some("ref.txt".into());
        assert!(config.check().is_err());
        config.output = Some("out.txt".into());
        assert!(config.check().is_ok());
    }
}
