use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};

use crate::record::Field;

/// Product listing page scraped when no `--url` is given.
pub const DEFAULT_LISTING_URL: &str = "https://www.gap.com/browse/category.do?cid=11900&department=75";
pub const DEFAULT_OUTPUT: &str = "gap_men_new_arrivals.csv";
pub const DEFAULT_CHECKPOINT: &str = "data/checkpoint.sqlite";
pub const DEFAULT_SCROLL_ROUNDS: u32 = 4;
pub const DEFAULT_MIN_DELAY_SECS: f64 = 4.0;
pub const DEFAULT_MAX_DELAY_SECS: f64 = 7.0;
/// Upper limit for either pacing bound.
pub const MAX_DELAY_SECS: f64 = 3600.0;
pub const DEFAULT_MAX_RETRIES: u32 = 3;
pub const DEFAULT_BACKOFF_MS: u64 = 2000;

/// Everything one `run` needs.
#[derive(Debug, Clone)]
pub struct ScrapeConfig {
    pub listing_url: String,
    pub output: PathBuf,
    pub scroll_rounds: u32,
    pub pacing: PacingConfig,
    pub retry: RetryConfig,
    pub checkpoint: Option<PathBuf>,
    pub fresh: bool,
    pub headless: bool,
    pub selectors: SelectorConfig,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PacingConfig {
    pub min: Duration,
    pub max: Duration,
}

impl Default for PacingConfig {
    fn default() -> Self {
        Self {
            min: Duration::from_secs_f64(DEFAULT_MIN_DELAY_SECS),
            max: Duration::from_secs_f64(DEFAULT_MAX_DELAY_SECS),
        }
    }
}

impl PacingConfig {
    pub fn new(min_secs: f64, max_secs: f64) -> Result<Self> {
        if !(0.0..=MAX_DELAY_SECS).contains(&min_secs) || !(0.0..=MAX_DELAY_SECS).contains(&max_secs) {
            bail!("delay bounds must be between 0 and {MAX_DELAY_SECS}s (got {min_secs}..{max_secs})");
        }
        if min_secs > max_secs {
            bail!("minimum delay {min_secs}s exceeds maximum delay {max_secs}s");
        }
        Ok(Self {
            min: Duration::try_from_secs_f64(min_secs)?,
            max: Duration::try_from_secs_f64(max_secs)?,
        })
    }

    pub fn is_zero(&self) -> bool {
        self.max.is_zero()
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RetryConfig {
    pub max_retries: u32,
    pub base_backoff: Duration,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: DEFAULT_MAX_RETRIES,
            base_backoff: Duration::from_millis(DEFAULT_BACKOFF_MS),
        }
    }
}

/// Site markup knowledge. Volatile, so it lives in data rather than code.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SelectorConfig {
    pub listing: ListingSelectors,
    pub detail: DetailSelectors,
}

impl SelectorConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read selector file {}", path.display()))?;
        serde_json::from_str(&raw)
            .with_context(|| format!("Failed to parse selector file {}", path.display()))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ListingSelectors {
    pub item: String,
    pub link: String,
}

impl Default for ListingSelectors {
    fn default() -> Self {
        Self {
            item: "div.category-page-1wcebst".into(),
            link: "a".into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DetailSelectors {
    pub breadcrumb: String,
    pub breadcrumb_link: String,
    pub name: String,
    pub price_container: String,
    pub price_selected: String,
    pub price_strike: String,
    pub currency_symbol: char,
    pub rating: String,
    pub rating_count: String,
    pub color: String,
    pub sizes: String,
    pub detail_blocks: String,
    pub detail_item: String,
    /// Block count → the field each block holds, in order.
    pub detail_layouts: BTreeMap<usize, Vec<Field>>,
    pub fit_exclude: Vec<String>,
    pub details_exclude: Vec<String>,
}

impl Default for DetailSelectors {
    fn default() -> Self {
        let mut detail_layouts = BTreeMap::new();
        detail_layouts.insert(
            3,
            vec![Field::FitSizing, Field::ProductDetails, Field::FabricCare],
        );
        detail_layouts.insert(2, vec![Field::ProductDetails, Field::FabricCare]);

        Self {
            breadcrumb: "div.pdp-mfe-1atmbpz".into(),
            breadcrumb_link: "a".into(),
            name: r#"h1[class^="pdp-mfe-"]"#.into(),
            price_container: "div.pdp-pricing.pdp-mfe-1x0pbuu".into(),
            price_selected: "span.pdp-pricing--highlight.pdp-pricing__selected".into(),
            price_strike: "span.product-price__strike".into(),
            currency_symbol: '$',
            rating: "span.pdp-mfe-3jhqep".into(),
            rating_count: "div.pdp-mfe-17iathi".into(),
            color: "span.swatch-label__value".into(),
            sizes: "div.pdp-dimension.pdp-dimension--should-display-redesign-in-stock".into(),
            detail_blocks: r#"ul[class^="product-information-item__list"]"#.into(),
            detail_item: "li".into(),
            detail_layouts,
            fit_exclude: vec!["wearing".into()],
            details_exclude: vec!["#".into(), "P.A.C.E.".into(), "pace".into()],
        }
    }
}
