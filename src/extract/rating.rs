use std::sync::LazyLock;

use regex::Regex;

use crate::config::DetailSelectors;
use crate::error::{ExtractResult, ExtractionError};
use crate::markup::{text_of, PageSnapshot, Query};
use crate::record::{Field, FieldValue};

use super::FieldRule;

// "5 stars, 4 are filled" -> 4
static FILLED_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r",\s*(\d+(?:\.\d+)?)").unwrap());
// "1,204 ratings" -> 1,204
static COUNT_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^\s*(\d[\d,]*)").unwrap());

pub struct RatingRule {
    summary: Query,
}

impl RatingRule {
    pub fn new(cfg: &DetailSelectors) -> ExtractResult<Self> {
        Ok(Self {
            summary: Query::new(&cfg.rating)?,
        })
    }
}

impl FieldRule for RatingRule {
    fn name(&self) -> &'static str {
        "rating"
    }

    fn fields(&self) -> &[Field] {
        &[Field::Rating]
    }

    fn extract(&self, page: &PageSnapshot) -> ExtractResult<Vec<FieldValue>> {
        let text = text_of(page.require(&self.summary)?);
        let filled = FILLED_RE
            .captures(&text)
            .map(|caps| caps[1].to_string())
            .ok_or(ExtractionError::Unparsable {
                what: "star rating",
                text,
            })?;
        Ok(vec![FieldValue::Text(filled)])
    }
}

pub struct RatingCountRule {
    count: Query,
}

impl RatingCountRule {
    pub fn new(cfg: &DetailSelectors) -> ExtractResult<Self> {
        Ok(Self {
            count: Query::new(&cfg.rating_count)?,
        })
    }
}

impl FieldRule for RatingCountRule {
    fn name(&self) -> &'static str {
        "rating_count"
    }

    fn fields(&self) -> &[Field] {
        &[Field::RatingCount]
    }

    fn extract(&self, page: &PageSnapshot) -> ExtractResult<Vec<FieldValue>> {
        let text = text_of(page.require(&self.count)?);
        let count = COUNT_RE
            .captures(&text)
            .map(|caps| caps[1].to_string())
            .ok_or(ExtractionError::Unparsable {
                what: "rating count",
                text,
            })?;
        Ok(vec![FieldValue::Text(count)])
    }
}
