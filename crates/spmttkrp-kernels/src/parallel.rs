//! Parallel MTTKRP on a fixed worker pool
//!
//! The nonzero range is split statically: with W workers and `nnz` nonzeros,
//! every worker takes a contiguous slice of `nnz / W` nonzeros and the first
//! `nnz % W` workers take one more. The pool runs exactly one slice per
//! worker thread (`rayon::ThreadPool::broadcast`), so there is no work
//! stealing and the partition is reproducible.
//!
//! Workers write the shared output in one of two ways ([`Accumulation`]):
//!
//! - **Atomic**: every scalar update is a compare-and-swap float add on the
//!   output cell.
//! - **Privatized**: every worker accumulates into its own
//!   `dims[mode] × stride` buffer; the buffers are added into the output in
//!   worker order once all workers are done.
//!
//! Summation order across workers is not fixed, so results match the serial
//! kernel within floating-point tolerance rather than bit for bit.
//!
//! Workers never panic on bad input: the first fault is stored in a shared
//! slot, the remaining workers stop at their next block boundary, and the
//! caller gets the error after the pool has joined.
//!
//! # Examples
//!
//! ```
//! use spmttkrp_core::DenseMatrix;
//! use spmttkrp_kernels::{Accumulation, ParallelConfig, WorkerPool};
//! use spmttkrp_sparse::SparseTensor;
//!
//! let mut x = SparseTensor::new(&[4, 4, 4]).unwrap();
//! for i in 0..4 {
//!     x.append(&[i, i, i], 1.0).unwrap();
//! }
//! let mut mats: Vec<DenseMatrix> = (0..4).map(|_| DenseMatrix::new(4, 2)).collect();
//! for m in &mut mats[..3] {
//!     m.fill(1.0);
//! }
//!
//! let pool = WorkerPool::new(&ParallelConfig {
//!     num_workers: Some(2),
//!     accumulation: Accumulation::Privatized,
//! })
//! .unwrap();
//! pool.mttkrp(&x, &mut mats, &[0, 1, 2], 0).unwrap();
//! assert_eq!(mats[3].row(3), &[1.0, 1.0]);
//! ```

use crate::error::{ErrorInfo, KernelResult, PARALLEL_MODULE};
use crate::mttkrp::{check_operands, Accumulate, KernelPath, Operands};
use spmttkrp_core::{DenseMatrix, ErrorCode, Timer, Value, ValueVector};
use spmttkrp_sparse::SparseTensor;
use std::ops::Range;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::OnceLock;

/// Nonzeros a worker processes between checks of the abort flag
const BLOCK_NNZ: usize = 4096;

/// How workers combine their contributions into the shared output
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Accumulation {
    /// Compare-and-swap float adds directly on the output
    #[default]
    Atomic,
    /// Per-worker private buffers, summed into the output afterwards
    Privatized,
}

/// Configuration for the parallel kernel
#[derive(Debug, Clone, Default)]
pub struct ParallelConfig {
    /// Number of worker threads (None = one per available core)
    pub num_workers: Option<usize>,

    /// Accumulation strategy (default: atomic)
    pub accumulation: Accumulation,
}

/// Fixed pool of worker threads running the parallel MTTKRP
///
/// Building the pool spawns the threads once; every [`mttkrp`](Self::mttkrp)
/// call reuses them.
#[derive(Debug)]
pub struct WorkerPool {
    pool: rayon::ThreadPool,
    accumulation: Accumulation,
}

impl WorkerPool {
    /// Spawn the worker threads described by `config`.
    ///
    /// # Errors
    ///
    /// - `ValueError` when `num_workers` is `Some(0)`
    /// - `Unknown` when the threads cannot be spawned
    pub fn new(config: &ParallelConfig) -> KernelResult<Self> {
        let mut builder = rayon::ThreadPoolBuilder::new()
            .thread_name(|i| format!("mttkrp-worker-{}", i));
        match config.num_workers {
            Some(0) => {
                return Err(ErrorInfo::value_error(
                    PARALLEL_MODULE,
                    "a worker pool needs at least one worker",
                ))
            }
            Some(n) => builder = builder.num_threads(n),
            None => {}
        }
        let pool = builder.build().map_err(|e| {
            ErrorInfo::new(
                PARALLEL_MODULE,
                ErrorCode::Unknown,
                format!("failed to build worker pool: {}", e),
            )
        })?;

        tracing::debug!(
            workers = pool.current_num_threads(),
            accumulation = ?config.accumulation,
            "worker pool ready"
        );
        Ok(WorkerPool {
            pool,
            accumulation: config.accumulation,
        })
    }

    /// Number of worker threads
    pub fn num_workers(&self) -> usize {
        self.pool.current_num_threads()
    }

    /// Accumulation strategy used by this pool
    pub fn accumulation(&self) -> Accumulation {
        self.accumulation
    }

    /// Parallel mode-`mode` MTTKRP of `x` into `mats[N]`.
    ///
    /// Same operands, preconditions and errors as [`crate::mttkrp`]; order-3
    /// tensors take the 3-mode path here too.
    pub fn mttkrp(
        &self,
        x: &SparseTensor,
        mats: &mut [DenseMatrix],
        mats_order: &[usize],
        mode: usize,
    ) -> KernelResult<()> {
        let shape = check_operands(PARALLEL_MODULE, x, mats, mats_order, mode)?;
        let path = KernelPath::for_modes(x.nmodes());
        let mut timer = Timer::started();

        let (factors, rest) = mats.split_at_mut(x.nmodes());
        let out = &mut rest[0];
        out.zero_rows(shape.out_rows);

        let ops = Operands::new(x, factors, mats_order, mode, shape, path, PARALLEL_MODULE);
        let parts = static_partition(x.nnz(), self.num_workers());
        let fault = FaultSlot::new();

        match self.accumulation {
            Accumulation::Atomic => {
                let cells = as_atomic_cells(out.as_mut_slice());
                self.pool.broadcast(|ctx| {
                    let mut sink = AtomicSink { cells };
                    let mut scratch = ValueVector::new(shape.rank, shape.rank);
                    run_blocks(parts[ctx.index()].clone(), &fault, |block| {
                        ops.accumulate(block, scratch.as_mut_slice(), &mut sink)
                    });
                });
            }
            Accumulation::Privatized => {
                let len = shape.out_rows * shape.stride;
                let privates: Vec<Vec<Value>> = self.pool.broadcast(|ctx| {
                    let mut private = vec![0.0; len];
                    let mut scratch = ValueVector::new(shape.rank, shape.rank);
                    run_blocks(parts[ctx.index()].clone(), &fault, |block| {
                        ops.accumulate(block, scratch.as_mut_slice(), private.as_mut_slice())
                    });
                    private
                });
                let target = &mut out.as_mut_slice()[..len];
                for private in &privates {
                    for (o, &p) in target.iter_mut().zip(private) {
                        *o += p;
                    }
                }
            }
        }

        fault.into_result()?;
        timer.stop();
        tracing::debug!(
            path = path.name(),
            accumulation = ?self.accumulation,
            workers = self.num_workers(),
            nnz = x.nnz(),
            mode,
            rank = shape.rank,
            elapsed_secs = timer.elapsed_secs(),
            "parallel mttkrp"
        );
        Ok(())
    }
}

/// One-shot parallel MTTKRP: builds a [`WorkerPool`] from `config` and runs it.
///
/// Prefer a long-lived [`WorkerPool`] when calling repeatedly.
pub fn mttkrp_parallel(
    x: &SparseTensor,
    mats: &mut [DenseMatrix],
    mats_order: &[usize],
    mode: usize,
    config: &ParallelConfig,
) -> KernelResult<()> {
    WorkerPool::new(config)?.mttkrp(x, mats, mats_order, mode)
}

/// Split `0..nnz` into `workers` contiguous ranges.
///
/// Every range holds `nnz / workers` items and the first `nnz % workers`
/// ranges hold one more. `workers == 0` is treated as one worker.
///
/// ```
/// use spmttkrp_kernels::static_partition;
///
/// assert_eq!(static_partition(10, 3), vec![0..4, 4..7, 7..10]);
/// assert_eq!(static_partition(2, 4), vec![0..1, 1..2, 2..2, 2..2]);
/// ```
pub fn static_partition(nnz: usize, workers: usize) -> Vec<Range<usize>> {
    let workers = workers.max(1);
    let (base, extra) = (nnz / workers, nnz % workers);
    let mut start = 0;
    (0..workers)
        .map(|w| {
            let len = base + usize::from(w < extra);
            let range = start..start + len;
            start += len;
            range
        })
        .collect()
}

/// First error raised by any worker, plus an abort flag for the others
#[derive(Debug, Default)]
struct FaultSlot {
    first: OnceLock<ErrorInfo>,
    abort: AtomicBool,
}

impl FaultSlot {
    fn new() -> Self {
        Self::default()
    }

    /// Keep `err` if it is the first fault and ask every worker to stop.
    fn record(&self, err: ErrorInfo) {
        let _ = self.first.set(err);
        self.abort.store(true, Ordering::Release);
    }

    fn is_aborted(&self) -> bool {
        self.abort.load(Ordering::Acquire)
    }

    fn into_result(self) -> KernelResult<()> {
        match self.first.into_inner() {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }
}

/// Run `f` over `range` in blocks of [`BLOCK_NNZ`], stopping at the first
/// error (recorded in `fault`) or when another worker has aborted.
fn run_blocks<F>(range: Range<usize>, fault: &FaultSlot, mut f: F)
where
    F: FnMut(Range<usize>) -> KernelResult<()>,
{
    let mut start = range.start;
    while start < range.end {
        if fault.is_aborted() {
            return;
        }
        let end = (start + BLOCK_NNZ).min(range.end);
        if let Err(err) = f(start..end) {
            fault.record(err);
            return;
        }
        start = end;
    }
}

/// Shared output viewed as atomically updatable cells
struct AtomicSink<'a> {
    cells: &'a [AtomicU32],
}

impl Accumulate for AtomicSink<'_> {
    #[inline]
    fn add(&mut self, at: usize, value: Value) {
        atomic_add(&self.cells[at], value);
    }
}

/// Reinterpret an exclusively borrowed value slice as atomic cells.
fn as_atomic_cells(values: &mut [Value]) -> &[AtomicU32] {
    // SAFETY: `AtomicU32` has the same size and bit validity as `u32`, and
    // `f32` has the same size and alignment (4) as `u32`. The exclusive
    // borrow is held for the lifetime of the returned slice, so every access
    // during that time goes through the atomics.
    unsafe { std::slice::from_raw_parts(values.as_mut_ptr().cast::<AtomicU32>(), values.len()) }
}

/// `*cell += value` for an `f32` stored as bits, via a CAS loop.
#[inline]
fn atomic_add(cell: &AtomicU32, value: Value) {
    let mut current = cell.load(Ordering::Relaxed);
    loop {
        let next = (Value::from_bits(current) + value).to_bits();
        match cell.compare_exchange_weak(current, next, Ordering::Relaxed, Ordering::Relaxed) {
            Ok(_) => return,
            Err(actual) => current = actual,
        }
    }
}
