//! Benchmark MTTKRP on a COO tensor loaded from a `.tns` file.
//!
//! ```text
//! spmttkrp-bench -i nell-2.tns -m 1 -r 16 --backend parallel -t 8
//! spmttkrp-bench -i nell-2.tns -o out.txt -v previous.txt
//! ```

use anyhow::{bail, Result};
use clap::Parser;
use spmttkrp::bench::{run_bench, Backend, BenchConfig, Strategy};
use spmttkrp::logging::{init_tracing, TracingConfig};
use std::path::PathBuf;

/// Matricized tensor times Khatri-Rao product benchmark (COO tensor, dense factors)
#[derive(Parser, Debug)]
#[command(name = "spmttkrp-bench")]
#[command(version)]
struct Args {
    /// Input tensor in .tns format
    #[arg(short, long)]
    input: PathBuf,

    /// Dump the output matrix to this file
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Mode to compute (0-based)
    #[arg(short, long, default_value_t = 0)]
    mode: usize,

    /// Number of factor matrix columns
    #[arg(short, long, default_value_t = 16)]
    rank: usize,

    /// Timed iterations after the warm-up call
    #[arg(short, long, default_value_t = 5)]
    niters: usize,

    /// Kernel family
    #[arg(short, long, value_enum, default_value_t = Backend::Serial)]
    backend: Backend,

    /// Worker threads for the parallel backend (default: all cores)
    #[arg(short = 't', long)]
    nthreads: Option<usize>,

    /// Output accumulation for the parallel backend
    #[arg(short, long, value_enum, default_value_t = Strategy::Atomic)]
    accumulation: Strategy,

    /// Compare the dumped output against a previous dump (fixes the factor seed)
    #[arg(short, long, requires = "output")]
    validate: Option<PathBuf>,

    /// Coordinate base of the input file
    #[arg(long, default_value_t = 1)]
    start_index: u32,

    /// Fill factors from the fixed seed even without validation
    #[arg(long)]
    deterministic: bool,
}

impl From<Args> for BenchConfig {
    fn from(args: Args) -> Self {
        BenchConfig {
            input: args.input,
            start_index: args.start_index,
            mode: args.mode,
            rank: args.rank,
            niters: args.niters,
            backend: args.backend,
            threads: args.nthreads,
            strategy: args.accumulation,
            output: args.output,
            validate: args.validate,
            use_random_seed: !args.deterministic,
        }
    }
}

fn main() -> Result<()> {
    init_tracing(TracingConfig::default())?;

    let args = Args::parse();
    let config = BenchConfig::from(args);
    let report = run_bench(&config)?;
    println!("{}", report);

    if report.validation == Some(false) {
        bail!("validation failed");
    }
    Ok(())
}
