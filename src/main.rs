//! inferbench - bounded-concurrency benchmark for image-classification serving endpoints
//!
//! Sends a fixed number of predict requests built from a labelled validation
//! set, keeps at most `--concurrency` of them in flight, and reports the
//! error rate and elapsed time.

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::EnvFilter;

mod cli;

fn main() -> Result<()> {
    let cli = cli::Cli::parse();

    // RUST_LOG wins; otherwise --verbose picks the level
    let fallback = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(fallback)))
        .with_writer(std::io::stderr)
        .init();

    cli.run()
}
