//! Point-lookup contention benchmark.
//!
//! Run:     `cargo run --release --bin oltp-bench`
//! SQLite:  `cargo run --release --bin oltp-bench -- --store sqlite`
//! Local:   `cargo run --release --bin oltp-bench -- --policy partitioned`
//! JSON:    `cargo run --release --bin oltp-bench -- --json`

use std::io::{self, Write};
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;

use oltp_benchmarks::logging::init_logging;
use oltp_benchmarks::{open_store, report, AccessPolicy, BenchConfig, Orchestrator, StoreKind};

#[derive(Parser)]
#[command(name = "oltp-bench")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Store to benchmark: memory, sqlite or strata
    #[arg(value_name = "STORE")]
    store_arg: Option<String>,

    /// Store to benchmark (overrides the positional selector)
    #[arg(short, long)]
    store: Option<String>,

    /// JSON config file; flags override its values
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Number of partitions (and worker threads)
    #[arg(short, long)]
    partitions: Option<usize>,

    /// Rows per partition
    #[arg(short, long)]
    records: Option<u64>,

    /// Timed lookups per worker
    #[arg(short, long)]
    iterations: Option<u64>,

    /// Access policy: uniform or partitioned
    #[arg(long)]
    policy: Option<String>,

    /// Base random seed
    #[arg(long)]
    seed: Option<u64>,

    /// SQLite database file (default: temporary)
    #[arg(long)]
    sqlite_path: Option<PathBuf>,

    /// Print the JSON report instead of the console lines
    #[arg(long)]
    json: bool,

    /// Enable debug logging
    #[arg(short, long)]
    verbose: bool,
}

fn build_config(cli: &Cli) -> Result<BenchConfig> {
    let mut config = match &cli.config {
        Some(path) => BenchConfig::from_json_file(path)
            .with_context(|| format!("loading config {}", path.display()))?,
        None => BenchConfig::default(),
    };

    if let Some(selector) = cli.store.as_ref().or(cli.store_arg.as_ref()) {
        config.store = selector.parse::<StoreKind>()?;
    }
    if let Some(policy) = &cli.policy {
        config.access_policy = policy.parse::<AccessPolicy>()?;
    }
    if let Some(partitions) = cli.partitions {
        config.partition_count = partitions;
    }
    if let Some(records) = cli.records {
        config.record_count = records;
    }
    if let Some(iterations) = cli.iterations {
        config.iteration_count = iterations;
    }
    if let Some(seed) = cli.seed {
        config.seed = seed;
    }
    if let Some(path) = &cli.sqlite_path {
        config.sqlite_path = Some(path.clone());
    }

    config.validate()?;
    Ok(config)
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let config = build_config(&cli)?;
    let store = open_store(&config).context("opening store")?;
    let orchestrator = Orchestrator::new(config, store);
    let summary = orchestrator.run().context("benchmark aborted")?;

    let stdout = io::stdout();
    let mut out = stdout.lock();
    if cli.json {
        report::write_json(&summary, orchestrator.config(), &mut out)?;
    } else {
        report::write_console(&summary, &mut out)?;
    }
    out.flush()?;
    Ok(())
}
