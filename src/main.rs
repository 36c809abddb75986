//! Catalog-Harvest main entry point
//!
//! This is the command-line interface for the Catalog-Harvest product fetcher.

use catalog_harvest::config::load_config_with_hash;
use catalog_harvest::harvest::run_harvest;
use clap::Parser;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// Catalog-Harvest: a resumable product catalog fetcher
///
/// Catalog-Harvest fetches product records from a catalog API for a list of
/// identifiers, writes results to a tab-separated file and failures to a
/// separate log, and keeps a durable ledger so an interrupted run can be
/// relaunched without re-fetching finished work.
#[derive(Parser, Debug)]
#[command(name = "catalog-harvest")]
#[command(version = "1.0.0")]
#[command(about = "A resumable product catalog fetcher", long_about = None)]
struct Cli {
    /// Path to TOML configuration file
    #[arg(value_name = "CONFIG")]
    config: PathBuf,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,

    /// Resume an interrupted harvest (default behavior)
    #[arg(long, conflicts_with = "fresh")]
    resume: bool,

    /// Start over, discarding the ledger and both output files
    #[arg(long, conflicts_with = "resume")]
    fresh: bool,

    /// Validate config and show what would be fetched without fetching
    #[arg(long, conflicts_with_all = ["stats", "retry_failed"])]
    dry_run: bool,

    /// Show ledger statistics and exit
    #[arg(long, conflicts_with_all = ["dry_run", "retry_failed"])]
    stats: bool,

    /// Make previously failed identifiers eligible again, then exit
    #[arg(long, conflicts_with_all = ["dry_run", "stats"])]
    retry_failed: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Setup logging based on verbosity
    setup_logging(cli.verbose, cli.quiet);

    // Load and validate configuration
    tracing::info!("Loading configuration from: {}", cli.config.display());
    let (config, config_hash) = match load_config_with_hash(&cli.config) {
        Ok((cfg, hash)) => {
            tracing::info!("Configuration loaded successfully (hash: {})", hash);
            (cfg, hash)
        }
        Err(e) => {
            tracing::error!("Failed to load configuration: {}", e);
            return Err(e.into());
        }
    };

    // Handle different modes
    if cli.dry_run {
        handle_dry_run(&config)?;
    } else if cli.stats {
        handle_stats(&config)?;
    } else if cli.retry_failed {
        handle_retry_failed(&config)?;
    } else {
        handle_harvest(config, &config_hash, cli.fresh).await?;
    }

    Ok(())
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        // Only show errors
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("catalog_harvest=info,warn"),
            1 => EnvFilter::new("catalog_harvest=debug,info"),
            2 => EnvFilter::new("catalog_harvest=trace,debug"),
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

/// Handles the --dry-run mode: validates config and shows what would be fetched
fn handle_dry_run(
    config: &catalog_harvest::config::Config,
) -> Result<(), Box<dyn std::error::Error>> {
    use catalog_harvest::source::load_identifiers;
    use std::path::Path;

    println!("=== Catalog-Harvest Dry Run ===\n");

    println!("API:");
    println!("  Endpoint template: {}", config.api.endpoint_template);
    println!("  User agent: {}", config.api.user_agent);

    println!("\nFetch policy:");
    println!("  Max attempts: {}", config.fetch.max_attempts);
    println!(
        "  Backoff: {}ms initial, {}ms cap, {}ms jitter",
        config.fetch.initial_backoff_ms,
        config.fetch.max_backoff_ms,
        config.fetch.backoff_jitter_ms
    );
    println!("  Request timeout: {}s", config.fetch.request_timeout_secs);
    println!("  Max in flight: {}", config.fetch.max_in_flight);

    println!("\nInput:");
    println!("  Identifier file: {}", config.input.identifier_file);

    println!("\nOutput:");
    println!("  Results: {}", config.output.results_path);
    println!("  Failure log: {}", config.output.failure_log_path);
    println!("  Ledger: {}", config.output.ledger_path);

    let identifiers = load_identifiers(
        Path::new(&config.input.identifier_file),
        config.input.has_header,
    )?;

    println!("\n✓ Configuration is valid");
    println!("✓ Would fetch up to {} unique identifiers", identifiers.len());

    Ok(())
}

/// Handles the --stats mode: shows ledger statistics
fn handle_stats(
    config: &catalog_harvest::config::Config,
) -> Result<(), Box<dyn std::error::Error>> {
    use catalog_harvest::ledger::SqliteLedger;
    use catalog_harvest::output::{load_statistics, print_statistics};
    use std::path::Path;

    println!("Ledger: {}\n", config.output.ledger_path);

    let ledger = SqliteLedger::new(Path::new(&config.output.ledger_path))?;
    let stats = load_statistics(&ledger)?;
    print_statistics(&stats);

    Ok(())
}

/// Handles the --retry-failed mode: resets failed identifiers
fn handle_retry_failed(
    config: &catalog_harvest::config::Config,
) -> Result<(), Box<dyn std::error::Error>> {
    use catalog_harvest::ledger::{Ledger, SqliteLedger};
    use std::path::Path;

    let mut ledger = SqliteLedger::new(Path::new(&config.output.ledger_path))?;
    let reset = ledger.reset_failed()?;

    println!(
        "✓ {} failed identifier(s) are eligible again; run again to re-attempt them",
        reset
    );

    Ok(())
}

/// Handles the main harvest operation
async fn handle_harvest(
    config: catalog_harvest::config::Config,
    config_hash: &str,
    fresh: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    if fresh {
        tracing::info!("Starting fresh harvest (discarding previous state)");
    } else {
        tracing::info!("Starting harvest (will resume previous progress if any)");
    }

    let summary = match run_harvest(config, config_hash, fresh).await {
        Ok(summary) => summary,
        Err(e) => {
            tracing::error!("Harvest failed: {}", e);
            return Err(e.into());
        }
    };

    println!("\n========== Harvest Summary ==========");
    println!("Total identifiers: {}", summary.total_identifiers);
    println!("✅ Succeeded this run: {}", summary.succeeded);
    println!("❌ Failed this run: {}", summary.failed);
    println!("Skipped (already done): {}", summary.skipped);
    if summary.interrupted {
        println!("⏸ Interrupted — relaunch to resume remaining identifiers");
    }
    println!("=====================================\n");

    Ok(())
}
