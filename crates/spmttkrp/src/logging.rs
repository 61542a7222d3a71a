//! Subscriber setup for the `tracing` events emitted by the SpMTTKRP crates
//!
//! The libraries only emit events: kernel timings at `debug`, loader progress
//! at `debug`, driver results at `info`. Applications install a subscriber
//! once at startup with [`init_tracing`].
//!
//! # Environment Variables
//!
//! - `RUST_LOG`: filter directives (e.g., `RUST_LOG=spmttkrp_kernels=debug`)
//! - `SPMTTKRP_LOG_FORMAT`: `pretty`, `compact` or `full` (default: `full`)

use anyhow::Result;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

/// Filter used when `RUST_LOG` is unset
pub const DEFAULT_FILTER: &str = "info";

/// Tracing output format
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TracingFormat {
    /// Multi-line human-readable format
    Pretty,
    /// Single line per event, abbreviated fields
    Compact,
    /// Single line per event with span context
    Full,
}

impl TracingFormat {
    /// Parse from string, falling back to [`TracingFormat::Full`]
    pub fn parse(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "pretty" => TracingFormat::Pretty,
            "compact" => TracingFormat::Compact,
            _ => TracingFormat::Full,
        }
    }
}

/// Tracing configuration
#[derive(Debug, Clone)]
pub struct TracingConfig {
    /// Output format
    pub format: TracingFormat,
    /// Filter directive (e.g., "spmttkrp_kernels=debug,info")
    pub filter: String,
    /// Enable ANSI colors
    pub with_ansi: bool,
    /// Show target module paths
    pub with_target: bool,
    /// Show thread names (worker threads are named `mttkrp-worker-{i}`)
    pub with_thread_names: bool,
}

impl Default for TracingConfig {
    fn default() -> Self {
        let format = std::env::var("SPMTTKRP_LOG_FORMAT")
            .map(|s| TracingFormat::parse(&s))
            .unwrap_or(TracingFormat::Full);
        let filter = std::env::var("RUST_LOG").unwrap_or_else(|_| DEFAULT_FILTER.to_string());

        Self {
            format,
            filter,
            with_ansi: true,
            with_target: false,
            with_thread_names: false,
        }
    }
}

/// Install a global subscriber for `config`.
///
/// Fails if the filter does not parse or a global subscriber is already set.
pub fn init_tracing(config: TracingConfig) -> Result<()> {
    let filter = EnvFilter::try_new(&config.filter)?;

    match config.format {
        TracingFormat::Pretty => {
            let fmt_layer = fmt::layer()
                .pretty()
                .with_ansi(config.with_ansi)
                .with_target(config.with_target)
                .with_thread_names(config.with_thread_names)
                .with_filter(filter);
            tracing_subscriber::registry().with(fmt_layer).try_init()?;
        }
        TracingFormat::Compact => {
            let fmt_layer = fmt::layer()
                .compact()
                .with_ansi(config.with_ansi)
                .with_target(config.with_target)
                .with_thread_names(config.with_thread_names)
                .with_filter(filter);
            tracing_subscriber::registry().with(fmt_layer).try_init()?;
        }
        TracingFormat::Full => {
            let fmt_layer = fmt::layer()
                .with_ansi(config.with_ansi)
                .with_target(config.with_target)
                .with_thread_names(config.with_thread_names)
                .with_filter(filter);
            tracing_subscriber::registry().with(fmt_layer).try_init()?;
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_parse() {
        assert_eq!(TracingFormat::parse("pretty"), TracingFormat::Pretty);
        assert_eq!(TracingFormat::parse("COMPACT"), TracingFormat::Compact);
        assert_eq!(TracingFormat::parse("full"), TracingFormat::Full);
        assert_eq!(TracingFormat::parse("json"), TracingFormat::Full);
    }

    #[test]
    fn test_invalid_filter_is_rejected() {
        let config = TracingConfig {
            filter: "spmttkrp=notalevel".to_string(),
            ..Default::default()
        };
        assert!(init_tracing(config).is_err());
    }
}
