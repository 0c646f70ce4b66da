//! Tablecrawl main entry point
//!
//! This is the command-line interface for the Tablecrawl table crawler.

use anyhow::Context;
use clap::Parser;
use std::path::{Path, PathBuf};
use tablecrawl::config::{load_config_with_hash, validate, Config};
use tablecrawl::crawler::run_crawl;
use tablecrawl::output::{load_statistics, print_report, print_statistics};
use tracing_subscriber::EnvFilter;

/// Hash recorded for runs configured purely from the command line
const NO_CONFIG_HASH: &str = "none";

/// Tablecrawl: a paginated HTML-table crawler
///
/// Tablecrawl walks a listing page by page, extracts the primary data table
/// of every page, stores raw and chunked HTML artifacts, and writes row and
/// chunk records to a SQLite database.
#[derive(Parser, Debug)]
#[command(name = "tablecrawl")]
#[command(version)]
#[command(about = "A paginated HTML-table crawler", long_about = None)]
struct Cli {
    /// Path to TOML configuration file
    #[arg(value_name = "CONFIG")]
    config: Option<PathBuf>,

    /// Start URL, overriding the configuration file
    #[arg(long, value_name = "URL")]
    start_url: Option<String>,

    /// Cap on dispatched pages (0 = unbounded)
    #[arg(long)]
    max_pages: Option<u32>,

    /// Rows per chunk
    #[arg(long)]
    chunk_size: Option<usize>,

    /// Maximum number of pages in flight at once
    #[arg(long)]
    max_concurrency: Option<u32>,

    /// Do not persist raw page HTML
    #[arg(long)]
    no_raw_html: bool,

    /// Do not persist chunk HTML
    #[arg(long)]
    no_chunk_html: bool,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,

    /// Validate config and show what would be crawled without actually crawling
    #[arg(long, conflicts_with = "stats")]
    dry_run: bool,

    /// Show statistics from the database and exit
    #[arg(long, conflicts_with = "dry_run")]
    stats: bool,
}

impl Cli {
    /// Applies command-line overrides on top of the file configuration
    fn apply_overrides(&self, config: &mut Config) {
        if let Some(url) = &self.start_url {
            config.crawler.start_url = Some(url.clone());
        }
        if let Some(max_pages) = self.max_pages {
            config.crawler.max_pages = max_pages;
        }
        if let Some(chunk_size) = self.chunk_size {
            config.output.chunk_size = chunk_size;
        }
        if let Some(max_concurrency) = self.max_concurrency {
            config.crawler.max_concurrency = max_concurrency;
        }
        if self.no_raw_html {
            config.output.save_raw_html = false;
        }
        if self.no_chunk_html {
            config.output.save_chunk_html = false;
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    setup_logging(cli.verbose, cli.quiet);

    let (mut config, config_hash) = match &cli.config {
        Some(path) => {
            tracing::info!("Loading configuration from: {}", path.display());
            let (config, hash) = load_config_with_hash(path)
                .with_context(|| format!("Failed to load configuration from {}", path.display()))?;
            tracing::info!("Configuration loaded successfully (hash: {})", hash);
            (config, hash)
        }
        None => (Config::default(), NO_CONFIG_HASH.to_string()),
    };
    cli.apply_overrides(&mut config);

    if cli.stats {
        handle_stats(&config)?;
    } else if cli.dry_run {
        handle_dry_run(&config)?;
    } else {
        handle_crawl(config, &config_hash).await?;
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
            0 => EnvFilter::new("tablecrawl=info,warn"),
            1 => EnvFilter::new("tablecrawl=debug,info"),
            2 => EnvFilter::new("tablecrawl=trace,debug"),
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
fn handle_dry_run(config: &Config) -> anyhow::Result<()> {
    validate(config).context("Configuration is invalid")?;

    let crawler = &config.crawler;
    println!("=== Tablecrawl Dry Run ===\n");

    println!("Crawler Configuration:");
    println!("  Start URL: {}", crawler.start_url.as_deref().unwrap_or("-"));
    if crawler.max_pages == 0 {
        println!("  Max pages: unbounded");
    } else {
        println!("  Max pages: {}", crawler.max_pages);
    }
    println!("  Max concurrency: {}", crawler.max_concurrency);
    println!(
        "  Retries: {} (delay {}ms)",
        crawler.max_request_retries, crawler.retry_delay_ms
    );
    println!(
        "  Timeouts: navigation {}ms, stabilize {}ms",
        crawler.navigation_timeout_ms, crawler.stabilize_timeout_ms
    );
    println!("  Link scope: {:?}", crawler.link_scope);
    println!("  Table selector: {}", crawler.table_selector);
    println!(
        "  Follow selector: {}",
        crawler.follow_selector().unwrap_or("(pagination only)")
    );
    println!("  Respect robots.txt: {}", crawler.respect_robots_txt);

    println!("\nUser Agent:");
    println!("  {}", config.user_agent.header_value());

    println!("\nOutput:");
    println!("  Chunk size: {}", config.output.chunk_size);
    println!("  Save raw HTML: {}", config.output.save_raw_html);
    println!("  Save chunk HTML: {}", config.output.save_chunk_html);
    println!("  Artifacts: {}", config.output.artifact_dir);
    println!("  Database: {}", config.output.database_path);
    println!(
        "  Summary: {}",
        config.output.summary_path().unwrap_or("(not written)")
    );

    println!("\n✓ Configuration is valid");

    Ok(())
}

/// Handles the --stats mode: shows statistics from the database
fn handle_stats(config: &Config) -> anyhow::Result<()> {
    println!("Database: {}\n", config.output.database_path);

    let stats = load_statistics(Path::new(&config.output.database_path))
        .context("Failed to load statistics")?;
    print_statistics(&stats);

    Ok(())
}

/// Handles the main crawl operation
async fn handle_crawl(config: Config, config_hash: &str) -> anyhow::Result<()> {
    match run_crawl(config, config_hash).await {
        Ok(report) => {
            tracing::info!("Crawl completed");
            print_report(&report);
            Ok(())
        }
        Err(e) => {
            tracing::error!("Crawl failed: {}", e);
            Err(e.into())
        }
    }
}
