//! Observability: tracing setup, the terminal sink, and session counters.
//!
//! Diagnostics go through `tracing` to stderr. Chat lines meant for the user
//! go through a [`Sink`] so tests can capture them.

pub mod metrics;

use std::io::Write;

use tracing_subscriber::{fmt, EnvFilter};

pub use metrics::ClientMetrics;

/// Destination for rendered, user-facing lines.
pub trait Sink: Send + Sync {
    fn show(&self, line: &str);
}

/// Writes each line to stdout.
#[derive(Debug, Default, Clone, Copy)]
pub struct Console;

impl Sink for Console {
    fn show(&self, line: &str) {
        let mut out = std::io::stdout().lock();
        let _ = writeln!(out, "{line}");
    }
}

/// Install the global subscriber. `RUST_LOG` overrides the `info` default.
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}
