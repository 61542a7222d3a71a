//! Wall-clock timing for kernel instrumentation
//!
//! [`Timer`] is a start/stop stopwatch. The `print_*` helpers report through
//! `tracing` and return the measured seconds so callers can aggregate them.
//! Timing never influences kernel results.

use std::time::{Duration, Instant};

/// Start/stop wall-clock stopwatch
#[derive(Debug, Clone, Default)]
pub struct Timer {
    started: Option<Instant>,
    elapsed: Duration,
}

impl Timer {
    /// Create a stopped timer with zero elapsed time
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a timer that is already running
    pub fn started() -> Self {
        let mut timer = Self::new();
        timer.start();
        timer
    }

    /// Start (or restart) measuring
    pub fn start(&mut self) {
        self.started = Some(Instant::now());
    }

    /// Stop measuring and record the interval since the last `start`.
    ///
    /// Stopping a timer that was never started records zero.
    pub fn stop(&mut self) {
        self.elapsed = self
            .started
            .take()
            .map(|t| t.elapsed())
            .unwrap_or_default();
    }

    /// Seconds recorded by the last `start`/`stop` pair
    pub fn elapsed_secs(&self) -> f64 {
        self.elapsed.as_secs_f64()
    }

    /// Report the recorded interval under `name`, returning it in seconds.
    pub fn print_elapsed(&self, name: &str) -> f64 {
        let secs = self.elapsed_secs();
        tracing::info!(operation = name, elapsed_secs = secs, "[{}]: {:.6} s", name, secs);
        secs
    }

    /// Report the recorded interval divided by `niters`, returning it in seconds.
    pub fn print_average_elapsed(&self, niters: usize, name: &str) -> f64 {
        let avg = if niters == 0 {
            0.0
        } else {
            self.elapsed_secs() / niters as f64
        };
        tracing::info!(
            operation = name,
            niters,
            average_secs = avg,
            "[{}]: {:.6} s",
            name,
            avg
        );
        avg
    }
}

/// Performance record for one timed operation
#[derive(Debug, Clone)]
pub struct TimingResult {
    /// Operation name
    pub operation: String,
    /// Elapsed time in seconds
    pub elapsed_secs: f64,
    /// Floating-point operations performed, if known
    pub flops: Option<f64>,
    /// Bytes moved, if known
    pub bytes: Option<f64>,
}

impl TimingResult {
    /// Create a record without throughput information
    pub fn new(operation: impl Into<String>, elapsed_secs: f64) -> Self {
        TimingResult {
            operation: operation.into(),
            elapsed_secs,
            flops: None,
            bytes: None,
        }
    }

    /// Attach a floating-point operation count
    pub fn with_flops(mut self, flops: f64) -> Self {
        self.flops = Some(flops);
        self
    }

    /// Attach a byte count
    pub fn with_bytes(mut self, bytes: f64) -> Self {
        self.bytes = Some(bytes);
        self
    }

    /// GFLOP/s, when a flop count and a positive time are known
    pub fn gflops(&self) -> Option<f64> {
        self.flops
            .filter(|_| self.elapsed_secs > 0.0)
            .map(|f| f / self.elapsed_secs / 1e9)
    }

    /// GB/s, when a byte count and a positive time are known
    pub fn bandwidth_gbs(&self) -> Option<f64> {
        self.bytes
            .filter(|_| self.elapsed_secs > 0.0)
            .map(|b| b / self.elapsed_secs / 1e9)
    }
}

/// Time an operation and return its result with the elapsed seconds
///
/// # Examples
///
/// ```
/// use spmttkrp_core::time_operation;
///
/// let (sum, timing) = time_operation("sum", || (0..1000u64).sum::<u64>());
/// assert_eq!(sum, 499_500);
/// assert!(timing.elapsed_secs >= 0.0);
/// ```
pub fn time_operation<F, T>(name: impl Into<String>, op: F) -> (T, TimingResult)
where
    F: FnOnce() -> T,
{
    let mut timer = Timer::started();
    let result = op();
    timer.stop();
    (result, TimingResult::new(name, timer.elapsed_secs()))
}
