mod browser;
mod config;
mod db;
mod error;
mod extract;
mod listing;
mod loader;
mod markup;
mod pacing;
mod pipeline;
mod record;
mod sink;
#[cfg(test)]
mod testing;

use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use tokio_util::sync::CancellationToken;

use crate::browser::{ChromeSession, SessionGuard};
use crate::config::{PacingConfig, RetryConfig, ScrapeConfig, SelectorConfig};
use crate::error::ScrapeError;
use crate::extract::ExtractorRegistry;
use crate::listing::{ListingEntry, ListingResolver};
use crate::loader::PageLoader;
use crate::markup::PageSnapshot;
use crate::pacing::{NoDelay, Pacer, RandomDelay};
use crate::pipeline::{ExtractionPipeline, RunSummary};
use crate::record::ProductUrl;

#[derive(Parser)]
#[command(name = "catalog_scraper", about = "Product catalog scraper driving headless Chrome")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Scrape a listing page and every product it links to, then write CSV
    Run {
        /// Listing page to start from
        #[arg(long, default_value = config::DEFAULT_LISTING_URL)]
        url: String,
        /// CSV file to write
        #[arg(short, long, default_value = config::DEFAULT_OUTPUT)]
        output: PathBuf,
        /// Infinite-scroll rounds on the listing page
        #[arg(long, default_value_t = config::DEFAULT_SCROLL_ROUNDS)]
        scroll_rounds: u32,
        /// Lower bound of the pause between page actions, in seconds
        #[arg(long, default_value_t = config::DEFAULT_MIN_DELAY_SECS)]
        min_delay: f64,
        /// Upper bound of the pause between page actions, in seconds
        #[arg(long, default_value_t = config::DEFAULT_MAX_DELAY_SECS)]
        max_delay: f64,
        /// Navigation retries per product page
        #[arg(long, default_value_t = config::DEFAULT_MAX_RETRIES)]
        retries: u32,
        /// Base backoff between retries (doubles each attempt)
        #[arg(long, default_value_t = config::DEFAULT_BACKOFF_MS)]
        backoff_ms: u64,
        /// SQLite file holding finished products
        #[arg(long, default_value = config::DEFAULT_CHECKPOINT)]
        checkpoint: PathBuf,
        /// Scrape everything, neither reading nor writing a checkpoint
        #[arg(long, conflicts_with = "fresh")]
        no_checkpoint: bool,
        /// Clear the checkpoint before starting
        #[arg(long)]
        fresh: bool,
        /// JSON selector overrides (see `selectors`)
        #[arg(long)]
        selectors: Option<PathBuf>,
        /// Run Chrome with a visible window
        #[arg(long)]
        show_browser: bool,
    },
    /// Run the field extractors on a saved product page
    Extract {
        html: PathBuf,
        /// URL reported for the page (defaults to a file:// URL)
        #[arg(long)]
        url: Option<String>,
        #[arg(long)]
        selectors: Option<PathBuf>,
    },
    /// Resolve product links from a saved listing page
    Listing {
        html: PathBuf,
        /// Base for relative links
        #[arg(long, default_value = config::DEFAULT_LISTING_URL)]
        base_url: String,
        #[arg(long)]
        selectors: Option<PathBuf>,
    },
    /// Show checkpoint statistics
    Stats {
        #[arg(long, default_value = config::DEFAULT_CHECKPOINT)]
        checkpoint: PathBuf,
    },
    /// Print the default selector configuration as JSON
    Selectors,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let t0 = Instant::now();
    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Run {
            url,
            output,
            scroll_rounds,
            min_delay,
            max_delay,
            retries,
            backoff_ms,
            checkpoint,
            no_checkpoint,
            fresh,
            selectors,
            show_browser,
        } => {
            let cfg = ScrapeConfig {
                listing_url: url,
                output,
                scroll_rounds,
                pacing: PacingConfig::new(min_delay, max_delay)?,
                retry: RetryConfig {
                    max_retries: retries,
                    base_backoff: Duration::from_millis(backoff_ms),
                },
                checkpoint: (!no_checkpoint).then_some(checkpoint),
                fresh,
                headless: !show_browser,
                selectors: load_selectors(selectors.as_deref())?,
            };
            run(cfg).await
        }
        Commands::Extract { html, url, selectors } => {
            let selectors = load_selectors(selectors.as_deref())?;
            let registry = ExtractorRegistry::from_config(&selectors.detail)?;
            let page = PageSnapshot::parse(&read_html(&html)?);
            let href = url.unwrap_or_else(|| format!("file://{}", html.display()));
            let url = ProductUrl::canonicalize(&href, None)?;

            let record = registry.extract_record(url, &page);
            println!("{:<16} {}", "URL", record.url());
            for (field, value) in record.fields() {
                println!("{:<16} {}", field.column(), truncate(&value.render(), 100));
            }
            Ok(())
        }
        Commands::Listing { html, base_url, selectors } => {
            let selectors = load_selectors(selectors.as_deref())?;
            let resolver = ListingResolver::new(&selectors.listing, Some(&base_url))?;
            let page = PageSnapshot::parse(&read_html(&html)?);

            let entries = resolver.resolve(&page);
            for (i, entry) in entries.iter().enumerate() {
                match entry {
                    ListingEntry::Resolved(url) => println!("{:>4}  {}", i + 1, url),
                    ListingEntry::Unavailable(e) => println!("{:>4}  (unavailable: {})", i + 1, e),
                }
            }
            let urls = listing::product_urls(&entries);
            println!("\n{} product URLs from {} listing items", urls.len(), entries.len());
            Ok(())
        }
        Commands::Stats { checkpoint } => {
            let conn = db::connect(&checkpoint)?;
            db::init_schema(&conn)?;
            let s = db::get_stats(&conn)?;
            println!("Products:   {}", s.total);
            println!("Complete:   {}", s.complete);
            println!("Incomplete: {}", s.total - s.complete);
            println!("First:      {}", s.first_recorded.as_deref().unwrap_or("-"));
            println!("Last:       {}", s.last_recorded.as_deref().unwrap_or("-"));
            Ok(())
        }
        Commands::Selectors => {
            let json = serde_json::to_string_pretty(&SelectorConfig::default())?;
            println!("{json}");
            Ok(())
        }
    };

    let elapsed = t0.elapsed();
    if elapsed.as_secs() >= 1 {
        println!("\nDone in {}", format_duration(elapsed));
    }

    result
}

async fn run(cfg: ScrapeConfig) -> Result<()> {
    let cancel = CancellationToken::new();
    let on_signal = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_err() {
            return;
        }
        eprintln!("\nInterrupted, finishing the current product... (Ctrl-C again to quit now)");
        on_signal.cancel();
        if tokio::signal::ctrl_c().await.is_ok() {
            eprintln!("\nAborted; the checkpoint keeps every finished product.");
            std::process::exit(130);
        }
    });

    let pb = ProgressBar::new(0);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} {msg}")
            .unwrap()
            .progress_chars("#>-"),
    );

    let output = cfg.output.clone();
    let bar = pb.clone();
    // headless_chrome and the pacing pauses block, keep them off the runtime threads
    let outcome = tokio::task::spawn_blocking(move || scrape(&cfg, cancel, &bar))
        .await
        .context("scrape task panicked")?;
    pb.finish_and_clear();

    match outcome {
        Ok((summary, rows)) => {
            println!(
                "Recorded {} products ({} scraped, {} from checkpoint, {} listing items skipped)",
                rows, summary.recorded, summary.restored, summary.skipped
            );
            println!("Data written to {}", output.display());
            Ok(())
        }
        Err(ScrapeError::Cancelled { recorded }) => {
            println!("Cancelled after {recorded} products; nothing written. Run again to resume from the checkpoint.");
            Ok(())
        }
        Err(e) => Err(e).context("scrape failed"),
    }
}

fn scrape(
    cfg: &ScrapeConfig,
    cancel: CancellationToken,
    progress: &ProgressBar,
) -> Result<(RunSummary, usize), ScrapeError> {
    // Selector problems surface here, before Chrome starts.
    let resolver = ListingResolver::new(&cfg.selectors.listing, Some(&cfg.listing_url))?;
    let registry = ExtractorRegistry::from_config(&cfg.selectors.detail)?;

    let conn = match &cfg.checkpoint {
        Some(path) => {
            let conn = db::connect(path)?;
            db::init_schema(&conn)?;
            if cfg.fresh {
                let cleared = db::clear(&conn)?;
                tracing::info!(cleared, "checkpoint cleared");
            }
            Some(conn)
        }
        None => None,
    };

    let pacer: Box<dyn Pacer> = if cfg.pacing.is_zero() {
        Box::new(NoDelay)
    } else {
        Box::new(RandomDelay::new(cfg.pacing))
    };
    let mut session = SessionGuard::new(ChromeSession::launch(cfg.headless)?);

    let mut pipeline = ExtractionPipeline {
        loader: PageLoader::new(&mut *session, pacer.as_ref()),
        resolver,
        registry,
        retry: cfg.retry,
        checkpoint: conn.as_ref(),
        cancel,
        progress,
    };
    let run = pipeline.run(&cfg.listing_url, cfg.scroll_rounds)?;
    drop(pipeline);

    if run.sink.is_empty() {
        tracing::warn!("no products recorded, writing header only");
    }
    let rows = run.sink.flush(&cfg.output)?;
    Ok((run.summary, rows))
}

fn load_selectors(path: Option<&Path>) -> Result<SelectorConfig> {
    match path {
        Some(p) => SelectorConfig::load(p),
        None => Ok(SelectorConfig::default()),
    }
}

fn read_html(path: &Path) -> Result<String> {
    std::fs::read_to_string(path).with_context(|| format!("Failed to read {}", path.display()))
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let truncated: String = s.chars().take(max).collect();
        format!("{}...", truncated)
    }
}

fn format_duration(d: Duration) -> String {
    let secs = d.as_secs();
    if secs < 60 {
        format!("{:.1}s", d.as_secs_f64())
    } else if secs < 3600 {
        format!("{}m {}s", secs / 60, secs % 60)
    } else {
        format!("{}h {}m {}s", secs / 3600, (secs % 3600) / 60, secs % 60)
    }
}
