//! Board-Harvest main entry point
//!
//! This is the command-line interface for the Board-Harvest incremental crawler.

use anyhow::Context;
use board_harvest::board::Source;
use board_harvest::config::{load_config_with_hash, Config};
use board_harvest::crawler::{format_user_agent, pad_source_code, run_harvest};
use board_harvest::output::{load_statistics, print_report, print_statistics};
use board_harvest::storage::open_storage;
use clap::Parser;
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

/// Board-Harvest: an incremental discussion-board harvester
///
/// Board-Harvest crawls the discussion board of every listed stock, stops as
/// soon as it reaches posts it already has, and stores only the new ones.
#[derive(Parser, Debug)]
#[command(name = "board-harvest")]
#[command(version)]
#[command(about = "An incremental discussion-board harvester", long_about = None)]
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

    /// Number of listing pages fetched concurrently (overrides the config)
    #[arg(short = 'n', long, value_name = "N")]
    page_workers: Option<u32>,

    /// Crawl only this source code (repeatable)
    #[arg(long = "source", value_name = "CODE")]
    sources: Vec<String>,

    /// Validate config and show what would be crawled without actually crawling
    #[arg(long, conflicts_with = "stats")]
    dry_run: bool,

    /// Show statistics from the database and exit
    #[arg(long, conflicts_with = "dry_run")]
    stats: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    setup_logging(cli.verbose, cli.quiet);

    tracing::info!("Loading configuration from: {}", cli.config.display());
    let (mut config, config_hash) = match load_config_with_hash(&cli.config) {
        Ok((cfg, hash)) => {
            tracing::info!("Configuration loaded successfully (hash: {})", hash);
            (cfg, hash)
        }
        Err(e) => {
            tracing::error!("Failed to load configuration: {}", e);
            return Err(e.into());
        }
    };

    if let Some(workers) = cli.page_workers {
        anyhow::ensure!(
            (1..=64).contains(&workers),
            "--page-workers must be between 1 and 64, got {}",
            workers
        );
        config.crawler.page_workers = workers;
    }

    let sources = explicit_sources(&cli.sources)?;

    if cli.dry_run {
        handle_dry_run(&config, &sources);
    } else if cli.stats {
        handle_stats(&config)?;
    } else {
        handle_harvest(&config, &config_hash, sources).await?;
    }

    Ok(())
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("board_harvest=info,warn"),
            1 => EnvFilter::new("board_harvest=debug,info"),
            2 => EnvFilter::new("board_harvest=trace,debug"),
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

/// Normalizes `--source` codes the way the listed-company table does
fn explicit_sources(codes: &[String]) -> anyhow::Result<Vec<Source>> {
    codes
        .iter()
        .map(|code| {
            let code = code.trim();
            anyhow::ensure!(
                !code.is_empty() && code.chars().all(|c| c.is_ascii_alphanumeric()),
                "invalid source code '{}'",
                code
            );
            Ok(Source::new(pad_source_code(code)))
        })
        .collect()
}

/// Handles the --dry-run mode: validates config and shows what would be crawled
fn handle_dry_run(config: &Config, sources: &[Source]) {
    println!("=== Board-Harvest Dry Run ===\n");

    println!("Crawler Configuration:");
    println!("  Page workers: {}", config.crawler.page_workers);
    println!("  Item workers: {}", config.crawler.item_workers);
    println!("  Identity: {}", config.crawler.identity.to_db_string());
    println!("  Request timeout: {}s", config.crawler.request_timeout);
    println!("  Connect timeout: {}s", config.crawler.connect_timeout);

    println!("\nUser Agent:");
    println!("  {}", format_user_agent(&config.user_agent));

    println!("\nOrigin:");
    println!("  Board: {}{}", config.origin.base_url, config.origin.board_path);
    println!("  Source list: {}", config.origin.source_list_url);

    println!("\nOutput:");
    println!("  Database: {}", config.output.database_path);

    let named: Vec<Source> = if sources.is_empty() {
        config.sources.to_sources()
    } else {
        sources.to_vec()
    };

    println!("\n✓ Configuration is valid");
    if named.is_empty() {
        println!("✓ Would download the listed-company table and crawl every source");
    } else {
        println!("✓ Would crawl {} sources:", named.len());
        for source in &named {
            println!("  - {}", source);
        }
    }
}

/// Handles the --stats mode: shows statistics from the database
fn handle_stats(config: &Config) -> anyhow::Result<()> {
    println!("Database: {}\n", config.output.database_path);

    let storage = open_storage(Path::new(&config.output.database_path))
        .context("Failed to open database")?;
    let stats = load_statistics(&storage)?;

    print_statistics(&stats);

    Ok(())
}

/// Handles the main harvest operation
async fn handle_harvest(
    config: &Config,
    config_hash: &str,
    sources: Vec<Source>,
) -> anyhow::Result<()> {
    tracing::info!(
        "Harvesting with {} page workers, {} item workers, identity {}",
        config.crawler.page_workers,
        config.crawler.item_workers,
        config.crawler.identity.to_db_string()
    );

    match run_harvest(config, config_hash, sources).await {
        Ok(report) => {
            print_report(&report);
            Ok(())
        }
        Err(e) => {
            tracing::error!("Harvest failed: {}", e);
            Err(e.into())
        }
    }
}
