//! Listing → detail pages → records, strictly sequential.

use std::time::Duration;

use indicatif::ProgressBar;
use rusqlite::Connection;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, trace, warn};

use crate::config::RetryConfig;
use crate::db;
use crate::error::ScrapeError;
use crate::extract::ExtractorRegistry;
use crate::listing::{ListingEntry, ListingResolver};
use crate::loader::PageLoader;
use crate::markup::PageSnapshot;
use crate::record::{ProductRecord, ProductUrl};
use crate::sink::RecordSink;

/// Where a listing entry ended up.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UrlState {
    Pending,
    Loaded,
    Extracted,
    Recorded,
    /// Taken from the checkpoint without navigating.
    Restored,
    SkippedUrlInvalid,
}

/// Receives the 1-based count after each recorded product.
pub trait Progress {
    fn discovered(&self, total: usize);
    fn recorded(&self, count: usize, url: &ProductUrl);
}

impl Progress for ProgressBar {
    fn discovered(&self, total: usize) {
        self.set_length(total as u64);
    }

    fn recorded(&self, count: usize, url: &ProductUrl) {
        self.set_position(count as u64);
        self.set_message(url.to_string());
    }
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct RunSummary {
    pub listed: usize,
    pub recorded: usize,
    pub restored: usize,
    pub skipped: usize,
}

/// Records accumulated so far plus the progress counter.
#[derive(Debug, Default)]
pub struct ExtractionRun {
    pub sink: RecordSink,
    pub summary: RunSummary,
}

impl ExtractionRun {
    fn count(&self) -> usize {
        self.summary.recorded + self.summary.restored
    }
}

pub struct ExtractionPipeline<'a> {
    pub loader: PageLoader<'a>,
    pub resolver: ListingResolver,
    pub registry: ExtractorRegistry,
    pub retry: RetryConfig,
    pub checkpoint: Option<&'a Connection>,
    pub cancel: CancellationToken,
    pub progress: &'a dyn Progress,
}

impl ExtractionPipeline<'_> {
    pub fn run(&mut self, listing_url: &str, scroll_rounds: u32) -> Result<ExtractionRun, ScrapeError> {
        info!(url = listing_url, scroll_rounds, "loading listing page");
        self.loader.open(listing_url)?;
        self.loader.reveal_more(scroll_rounds, &self.cancel)?;
        let listing = self.loader.snapshot()?;
        let entries = self.resolver.resolve(&listing);
        drop(listing);

        let mut run = ExtractionRun::default();
        run.summary.listed = entries.len();
        let visitable = entries.iter().filter(|e| e.url().is_some()).count();
        info!(listed = entries.len(), visitable, "listing resolved");
        self.progress.discovered(visitable);

        for (position, entry) in entries.iter().enumerate() {
            if self.cancel.is_cancelled() {
                warn!(position, "cancellation requested, stopping before next product");
                return Err(ScrapeError::Cancelled {
                    recorded: run.count(),
                });
            }
            let state = self.process(entry, &mut run)?;
            debug!(position, ?state, "listing entry done");
        }

        info!(
            recorded = run.summary.recorded,
            restored = run.summary.restored,
            skipped = run.summary.skipped,
            "extraction finished"
        );
        Ok(run)
    }

    fn process(&mut self, entry: &ListingEntry, run: &mut ExtractionRun) -> Result<UrlState, ScrapeError> {
        let url = match entry {
            ListingEntry::Resolved(url) => url,
            ListingEntry::Unavailable(_) => {
                run.summary.skipped += 1;
                return Ok(UrlState::SkippedUrlInvalid);
            }
        };

        let (record, state) = match self.restore(url)? {
            Some(record) => {
                run.summary.restored += 1;
                (record, UrlState::Restored)
            }
            None => {
                trace!(url = %url, state = ?UrlState::Pending);
                let page = self.load_with_retry(url)?;
                trace!(url = %url, state = ?UrlState::Loaded);
                let record = self.registry.extract_record(url.clone(), &page);
                drop(page);
                trace!(url = %url, state = ?UrlState::Extracted);
                if let Some(conn) = self.checkpoint {
                    db::save_record(conn, &record)?;
                }
                run.summary.recorded += 1;
                (record, UrlState::Recorded)
            }
        };

        run.sink.push(record);
        let count = run.count();
        info!(count, url = %url, restored = state == UrlState::Restored, "product recorded");
        self.progress.recorded(count, url);
        Ok(state)
    }

    fn restore(&self, url: &ProductUrl) -> Result<Option<ProductRecord>, ScrapeError> {
        match self.checkpoint {
            Some(conn) => db::load_record(conn, url),
            None => Ok(None),
        }
    }

    fn load_with_retry(&mut self, url: &ProductUrl) -> Result<PageSnapshot, ScrapeError> {
        let max = self.retry.max_retries;
        let mut attempt = 0;
        loop {
            match self.loader.load(url.as_str()) {
                Ok(page) => return Ok(page),
                Err(e) if attempt < max => {
                    let backoff = backoff_for(self.retry.base_backoff, attempt);
                    warn!(
                        "Navigation to {} failed (attempt {}/{}), backing off {:.1}s: {}",
                        url,
                        attempt + 1,
                        max + 1,
                        backoff.as_secs_f64(),
                        e
                    );
                    std::thread::sleep(backoff);
                    attempt += 1;
                }
                Err(e) => {
                    return Err(ScrapeError::RetriesExhausted {
                        url: url.to_string(),
                        attempts: attempt + 1,
                        message: e.to_string(),
                    })
                }
            }
        }
    }
}

fn backoff_for(base: Duration, attempt: u32) -> Duration {
    base.saturating_mul(2u32.saturating_pow(attempt))
}
