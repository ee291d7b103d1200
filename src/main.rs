//! Wenshu-Trawl main entry point
//!
//! This is the command-line interface for the Wenshu-Trawl judgment collector.

use anyhow::Context;
use chrono::{Local, NaiveDate};
use clap::Parser;
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;
use wenshu_trawl::config::{load_config_with_hash, validate, Config};
use wenshu_trawl::crawler::{plan_units, RunSummary, Shutdown};
use wenshu_trawl::output::{
    generate_markdown_summary, generate_summary, load_statistics, print_statistics,
};
use wenshu_trawl::state::UnitStatus;
use wenshu_trawl::storage::open_ledger;

/// Wenshu-Trawl: a patient, resumable judgment-document collector
///
/// Searches the judgment portal one date and region at a time, pages through
/// the results and saves each document as cleaned plain text. Interrupted
/// runs resume from what is already on disk.
#[derive(Parser, Debug)]
#[command(name = "wenshu-trawl")]
#[command(version = "1.0.0")]
#[command(about = "A patient, resumable judgment-document collector", long_about = None)]
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

    /// Crawl only these regions instead of the configured ones (repeatable)
    #[arg(long = "region", value_name = "REGION")]
    regions: Vec<String>,

    /// Restrict searches to one case category
    #[arg(long, value_name = "CATEGORY")]
    case_category: Option<String>,

    /// First judgment date to crawl (YYYY-MM-DD)
    #[arg(long = "from", value_name = "DATE")]
    from: Option<NaiveDate>,

    /// Last judgment date to crawl (YYYY-MM-DD)
    #[arg(long = "to", value_name = "DATE")]
    to: Option<NaiveDate>,

    /// Maximum result pages per unit
    #[arg(long, value_name = "N")]
    max_pages: Option<u32>,

    /// Validate config and list the units that would be crawled without crawling
    #[arg(long, conflicts_with_all = ["stats", "export_summary"])]
    dry_run: bool,

    /// Show statistics from the run ledger and exit
    #[arg(long, conflicts_with_all = ["dry_run", "export_summary"])]
    stats: bool,

    /// Generate markdown summary of the latest run and exit
    #[arg(long, conflicts_with_all = ["dry_run", "stats"])]
    export_summary: bool,
}

impl Cli {
    /// Applies command-line overrides on top of the file configuration
    fn apply_overrides(&self, config: &mut Config) {
        if !self.regions.is_empty() {
            config.crawl.regions = self.regions.clone();
        }
        if let Some(category) = &self.case_category {
            config.crawl.case_category = Some(category.clone());
        }
        if let Some(from) = self.from {
            config.crawl.start_date = Some(from);
        }
        if let Some(to) = self.to {
            config.crawl.end_date = Some(to);
        }
        if let Some(max_pages) = self.max_pages {
            config.crawl.max_pages = max_pages;
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Setup logging based on verbosity
    setup_logging(cli.verbose, cli.quiet);

    // Load and validate configuration
    tracing::info!("Loading configuration from: {}", cli.config.display());
    let (mut config, config_hash) = load_config_with_hash(&cli.config)
        .with_context(|| format!("failed to load {}", cli.config.display()))?;
    tracing::info!("Configuration loaded successfully (hash: {})", config_hash);

    cli.apply_overrides(&mut config);
    validate(&config).context("invalid command-line overrides")?;

    // Handle different modes
    if cli.dry_run {
        handle_dry_run(&config);
    } else if cli.stats {
        handle_stats(&config)?;
    } else if cli.export_summary {
        handle_export_summary(&config)?;
    } else {
        handle_crawl(config, config_hash).await?;
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
            0 => EnvFilter::new("wenshu_trawl=info,warn"),
            1 => EnvFilter::new("wenshu_trawl=debug,info"),
            2 => EnvFilter::new("wenshu_trawl=trace,debug"),
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

/// Handles the --dry-run mode: shows which units would be crawled
fn handle_dry_run(config: &Config) {
    println!("=== Wenshu-Trawl Dry Run ===\n");

    let today = Local::now().date_naive();
    let (start, end) = config.crawl.date_range(today);

    println!("Crawl Configuration:");
    println!("  Regions: {}", config.crawl.regions.join(", "));
    println!(
        "  Case category: {}",
        config.crawl.case_category.as_deref().unwrap_or("(all)")
    );
    println!("  Dates: {} to {}", start, end);
    println!("  Max pages per unit: {}", config.crawl.max_pages);
    println!("  Page size: {}", config.crawl.page_size);

    println!("\nOutput:");
    println!("  Link lists: {}", config.output.url_dir);
    println!("  Documents: {}", config.output.doc_dir);
    println!("  Ledger: {}", config.output.database_path);

    let plan = plan_units(config, today);
    let done = plan.iter().filter(|(_, complete)| *complete).count();

    println!("\nUnits ({} total, {} already on disk):", plan.len(), done);
    for (unit, complete) in &plan {
        let marker = if *complete { "done" } else { "todo" };
        println!("  [{}] {}", marker, unit);
    }

    println!("\n✓ Configuration is valid");
    println!("✓ Would crawl {} units", plan.len() - done);
}

/// Handles the --stats mode: shows statistics from the ledger
fn handle_stats(config: &Config) -> anyhow::Result<()> {
    println!("Database: {}\n", config.output.database_path);

    let ledger = open_ledger(Path::new(&config.output.database_path))?;
    let stats = load_statistics(&ledger)?;
    print_statistics(&stats);

    Ok(())
}

/// Handles the --export-summary mode: generates markdown summary
fn handle_export_summary(config: &Config) -> anyhow::Result<()> {
    println!("=== Exporting Run Summary ===\n");
    println!("Database: {}", config.output.database_path);
    println!("Output: {}", config.output.summary_path);
    println!();

    export_summary(config)?;

    println!("✓ Summary exported to: {}", config.output.summary_path);

    Ok(())
}

fn export_summary(config: &Config) -> anyhow::Result<()> {
    let ledger = open_ledger(Path::new(&config.output.database_path))?;

    tracing::info!("Loading run data from database...");
    let summary = generate_summary(&ledger)?;

    tracing::info!("Generating markdown summary...");
    generate_markdown_summary(&summary, Path::new(&config.output.summary_path))?;

    Ok(())
}

/// Handles the main crawl operation
async fn handle_crawl(config: Config, config_hash: String) -> anyhow::Result<()> {
    let shutdown = Shutdown::new();
    {
        let shutdown = shutdown.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                tracing::warn!("Interrupt received, stopping after the current step");
                shutdown.trigger();
            }
        });
    }

    tracing::info!(
        "Regions: {}, case category: {}",
        config.crawl.regions.join(", "),
        config.crawl.case_category.as_deref().unwrap_or("(all)")
    );

    let summary_config = config.clone();
    let summary = start_crawl(config, config_hash, shutdown).await?;

    print_run_summary(&summary);

    if let Err(e) = export_summary(&summary_config) {
        tracing::warn!("Could not write run summary: {}", e);
    }

    Ok(())
}

#[cfg(feature = "browser")]
async fn start_crawl(config: Config, config_hash: String, shutdown: Shutdown) -> anyhow::Result<RunSummary> {
    use wenshu_trawl::crawler::run_crawl;
    use wenshu_trawl::driver::ChromiumDriver;

    let driver = ChromiumDriver::new(config.browser.clone());
    let summary = run_crawl(config, config_hash, driver, shutdown)
        .await
        .context("crawl failed")?;
    Ok(summary)
}

#[cfg(not(feature = "browser"))]
async fn start_crawl(_config: Config, _config_hash: String, _shutdown: Shutdown) -> anyhow::Result<RunSummary> {
    anyhow::bail!("this binary was built without a browser driver; rebuild with `--features browser`")
}

fn print_run_summary(summary: &RunSummary) {
    println!("\n=== Run {} ===", if summary.interrupted { "interrupted" } else { "finished" });
    println!("  Units: {}", summary.units_total);
    for status in UnitStatus::all_states() {
        let count = summary.count(status);
        if count > 0 {
            println!("    {}: {}", status, count);
        }
    }
    println!("  Links collected: {}", summary.documents.links_found);
    println!("  Documents saved: {}", summary.documents.documents_saved);
    println!("  Documents failed: {}", summary.documents.documents_failed);
    println!("  Documents skipped: {}", summary.documents.documents_skipped);
}
