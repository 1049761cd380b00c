//! Ripple-Index main entry point
//!
//! This is the command-line interface for the Ripple-Index crawler.

use anyhow::{Context, Result};
use clap::Parser;
use ripple_index::config::{load_config_with_hash, Config, DispatchMode};
use ripple_index::crawler::{run_crawl, run_service};
use ripple_index::normalize_url;
use ripple_index::output::{load_statistics, print_statistics};
use ripple_index::storage::SqliteStorage;
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

/// Ripple-Index: a distributed crawler that builds a reverse word index
///
/// By default runs one batch session from the configured seeds. With
/// `--serve` it runs as a crawling unit that accepts links over HTTP.
#[derive(Parser, Debug)]
#[command(name = "ripple-index")]
#[command(version)]
#[command(about = "Crawls pages and builds a reverse word index", long_about = None)]
struct Cli {
    /// Path to TOML configuration file
    #[arg(value_name = "CONFIG")]
    config: PathBuf,

    /// Additional seed URL (repeatable)
    #[arg(long = "seed", value_name = "URL")]
    seeds: Vec<String>,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,

    /// Run as a long-lived unit behind the HTTP listener
    #[arg(long, conflicts_with_all = ["dry_run", "stats"])]
    serve: bool,

    /// Validate config and show what would be crawled without actually crawling
    #[arg(long, conflicts_with_all = ["serve", "stats"])]
    dry_run: bool,

    /// Show statistics from the database and exit
    #[arg(long, conflicts_with_all = ["serve", "dry_run"])]
    stats: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    setup_logging(cli.verbose, cli.quiet);

    tracing::info!("Loading configuration from: {}", cli.config.display());
    let (config, config_hash) = load_config_with_hash(&cli.config)
        .with_context(|| format!("failed to load {}", cli.config.display()))?;
    tracing::debug!("Configuration hash: {}", config_hash);

    if cli.dry_run {
        handle_dry_run(&config, &cli.seeds);
    } else if cli.stats {
        handle_stats(&config)?;
    } else if cli.serve {
        let report = run_service(&config, &config_hash, &cli.seeds)
            .await
            .context("service session failed")?;
        println!("{}", report);
    } else {
        if config.seeds.is_empty() && cli.seeds.is_empty() {
            anyhow::bail!("no seeds: add `seeds = [...]` to the config or pass --seed");
        }
        let report = run_crawl(&config, &config_hash, &cli.seeds)
            .await
            .context("crawl session failed")?;
        println!("{}", report);
    }

    Ok(())
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("ripple_index=info,warn"),
            1 => EnvFilter::new("ripple_index=debug,info"),
            2 => EnvFilter::new("ripple_index=trace,debug"),
            _ => EnvFilter::new("trace"),
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .init();
}

/// Handles the --dry-run mode: validates config and shows what would be crawled
fn handle_dry_run(config: &Config, extra_seeds: &[String]) {
    println!("=== Ripple-Index Dry Run ===\n");

    let crawler = &config.crawler;
    println!("Crawler Configuration:");
    println!("  Max depth: {}", crawler.max_depth);
    println!("  Max fan-out: {}", crawler.max_fan_out);
    println!("  Workers: {}", crawler.worker_count);
    println!("  Queue capacity: {}", crawler.queue_capacity);
    println!("  Request timeout: {}ms", crawler.request_timeout_ms);
    println!("  Session timeout: {}s", crawler.session_timeout_secs);

    println!("\nUser Agent:");
    println!("  {}", config.user_agent.header_value());

    println!("\nFilter:");
    println!("  Allowed hosts: {}", config.filter.allowed_hosts.join(", "));
    if let Some(prefix) = &config.filter.path_prefix {
        println!("  Path prefix: {}", prefix);
    }
    println!("  Deny segments: {}", config.filter.deny_segments.len());

    println!("\nDispatch:");
    match (config.dispatch.mode, &config.dispatch.peer) {
        (DispatchMode::Remote, Some(peer)) => println!("  Remote peer: {}", peer),
        _ => println!("  Local"),
    }
    println!("  Shared visited set: {}", config.dispatch.shared_seen);

    println!("\nOutput:");
    println!("  Database: {}", config.output.database_path);
    println!("  Listener: {}", config.server.bind);

    let seeds: Vec<&String> = config.seeds.iter().chain(extra_seeds).collect();
    println!("\nSeeds ({}):", seeds.len());
    for seed in &seeds {
        match normalize_url(seed) {
            Ok(canonical) => println!("  - {}", canonical),
            Err(e) => println!("  - {} (invalid: {})", seed, e),
        }
    }

    println!("\n✓ Configuration is valid");
}

/// Handles the --stats mode: shows statistics from the database
fn handle_stats(config: &Config) -> Result<()> {
    println!("Database: {}\n", config.output.database_path);

    let storage = SqliteStorage::new(Path::new(&config.output.database_path))
        .context("failed to open database")?;
    let stats = load_statistics(&storage, 20)?;
    print_statistics(&stats);

    Ok(())
}
