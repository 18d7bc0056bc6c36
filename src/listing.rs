use tracing::warn;
use url::Url;

use crate::config::ListingSelectors;
use crate::error::{ExtractResult, ExtractionError};
use crate::markup::{attr_of, PageSnapshot, Query};
use crate::record::ProductUrl;

/// One listing tile, in display order.
#[derive(Debug, Clone, PartialEq)]
pub enum ListingEntry {
    Resolved(ProductUrl),
    /// The tile had no usable link; it is never visited.
    Unavailable(ExtractionError),
}

impl ListingEntry {
    pub fn url(&self) -> Option<&ProductUrl> {
        match self {
            ListingEntry::Resolved(url) => Some(url),
            ListingEntry::Unavailable(_) => None,
        }
    }
}

pub struct ListingResolver {
    item: Query,
    link: Query,
    base: Option<Url>,
}

impl ListingResolver {
    pub fn new(cfg: &ListingSelectors, base_url: Option<&str>) -> ExtractResult<Self> {
        let base = base_url
            .map(|u| {
                Url::parse(u).map_err(|e| ExtractionError::InvalidUrl {
                    href: u.to_string(),
                    reason: e.to_string(),
                })
            })
            .transpose()?;
        Ok(Self {
            item: Query::new(&cfg.item)?,
            link: Query::new(&cfg.link)?,
            base,
        })
    }

    /// Every listing tile's detail URL, in document order.
    pub fn resolve(&self, page: &PageSnapshot) -> Vec<ListingEntry> {
        page.select_all(&self.item)
            .into_iter()
            .enumerate()
            .map(|(position, tile)| {
                let href = self
                    .link
                    .first_within(tile)
                    .and_then(|a| attr_of(a, "href"))
                    .ok_or(ExtractionError::NoHref);
                match href.and_then(|h| ProductUrl::canonicalize(h, self.base.as_ref())) {
                    Ok(url) => ListingEntry::Resolved(url),
                    Err(e) => {
                        warn!(position, error = %e, "dropping listing item");
                        ListingEntry::Unavailable(e)
                    }
                }
            })
            .collect()
    }
}

/// Only the resolvable URLs, still in listing order.
pub fn product_urls(entries: &[ListingEntry]) -> Vec<ProductUrl> {
    entries.iter().filter_map(ListingEntry::url).cloned().collect()
}
