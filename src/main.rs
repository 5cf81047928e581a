//! News-Harvest main entry point
//!
//! This is the command-line interface for the News-Harvest crawl-and-score
//! pipeline.

use anyhow::Context;
use clap::Parser;
use news_harvest::config::{load_config_with_hash, Config};
use news_harvest::output::{export_report, load_statistics, print_statistics};
use news_harvest::site::build_site;
use news_harvest::storage::SqliteStorage;
use news_harvest::Pipeline;
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

/// News-Harvest: rank news articles by reader engagement
///
/// News-Harvest crawls a news site's article listings for a date window,
/// scores every article from the likes on its comments and replies, and
/// stores the ranking in SQLite.
#[derive(Parser, Debug)]
#[command(name = "news-harvest")]
#[command(version)]
#[command(about = "Rank news articles by reader engagement", long_about = None)]
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

    /// Validate config and show the start queries without crawling
    #[arg(long, conflicts_with_all = ["stats", "report"])]
    dry_run: bool,

    /// Show statistics from the database and exit
    #[arg(long, conflicts_with_all = ["dry_run", "report"])]
    stats: bool,

    /// Write the ranked `score url` report from existing data and exit
    #[arg(long, conflicts_with_all = ["dry_run", "stats"])]
    report: bool,

    /// Report destination (defaults to [output].report-path, then stdout)
    #[arg(long, value_name = "PATH", requires = "report")]
    output: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    setup_logging(cli.verbose, cli.quiet);

    tracing::info!("Loading configuration from: {}", cli.config.display());
    let (config, config_hash) = load_config_with_hash(&cli.config)
        .with_context(|| format!("Failed to load configuration {}", cli.config.display()))?;
    tracing::info!("Configuration loaded successfully (hash: {})", config_hash);

    if cli.dry_run {
        handle_dry_run(&config);
    } else if cli.stats {
        handle_stats(&config)?;
    } else if cli.report {
        handle_report(&config, cli.output.as_deref())?;
    } else {
        handle_harvest(config, config_hash).await?;
    }

    Ok(())
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("news_harvest=info,warn"),
            1 => EnvFilter::new("news_harvest=debug,info"),
            2 => EnvFilter::new("news_harvest=trace,debug"),
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

/// Handles the --dry-run mode: shows the settings and the start queries
fn handle_dry_run(config: &Config) {
    println!("=== News-Harvest Dry Run ===\n");

    println!("Crawler Configuration:");
    println!("  Site: {}", config.crawler.site.as_str());
    println!("  Days ago: {}", config.crawler.days_ago);
    println!("  Batch target: {}", config.crawler.batch_target);
    match config.crawler.max_waves {
        Some(max) => println!("  Max waves: {}", max),
        None => println!("  Max waves: unlimited"),
    }

    println!("\nHTTP:");
    println!("  User agent: {}", config.http.user_agent);
    println!("  Timeout: {}s", config.http.timeout_secs);
    println!("  Max in flight: {}", config.http.max_in_flight);

    println!("\nOutput:");
    println!("  Database: {}", config.output.database_path);
    println!("  Buffer limit: {}", config.output.buffer_limit);

    let site = build_site(config);
    let queries = site.start_queries();
    println!("\nStart Queries ({}):", queries.len());
    for query in &queries {
        println!("  - {}", query);
    }

    println!("\n✓ Configuration is valid");
}

/// Handles the --stats mode: shows statistics from the database
fn handle_stats(config: &Config) -> anyhow::Result<()> {
    println!("Database: {}\n", config.output.database_path);

    let storage = SqliteStorage::new(Path::new(&config.output.database_path))?;
    let stats = load_statistics(&storage, config.crawler.site.as_str())?;
    print_statistics(&stats);

    Ok(())
}

/// Handles the --report mode: writes the ranked list
fn handle_report(config: &Config, output: Option<&Path>) -> anyhow::Result<()> {
    let storage = SqliteStorage::new(Path::new(&config.output.database_path))?;
    let path = output.or_else(|| config.output.report_path.as_deref().map(Path::new));

    export_report(&storage, config.crawler.site.as_str(), path)
        .context("Failed to write report")?;
    Ok(())
}

/// Handles the main harvest operation
async fn handle_harvest(config: Config, config_hash: String) -> anyhow::Result<()> {
    let storage = SqliteStorage::new(Path::new(&config.output.database_path))
        .with_context(|| format!("Failed to open database {}", config.output.database_path))?;
    let site = build_site(&config);

    tracing::info!(
        "Harvesting {} for the last {} days",
        site.name(),
        config.crawler.days_ago
    );

    let summary = Pipeline::new(config, site, storage)
        .with_config_hash(config_hash)
        .run()
        .await
        .context("Harvest failed")?;

    tracing::info!(
        "Harvest completed: {} batches, {} articles scored, {} written (run {})",
        summary.batches,
        summary.articles_scored,
        summary.articles_written,
        summary.run_id
    );

    Ok(())
}
