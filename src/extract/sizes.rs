use crate::config::DetailSelectors;
use crate::error::{ExtractResult, ExtractionError};
use crate::markup::{text_of, PageSnapshot, Query};
use crate::record::{Field, FieldValue};

use super::FieldRule;

/// In-stock sizes. Products without a size dimension (bags, belts) have no
/// size elements at all, which is `NotApplicable` rather than a failure.
pub struct SizesRule {
    size: Query,
}

impl SizesRule {
    pub fn new(cfg: &DetailSelectors) -> ExtractResult<Self> {
        Ok(Self {
            size: Query::new(&cfg.sizes)?,
        })
    }
}

impl FieldRule for SizesRule {
    fn name(&self) -> &'static str {
        "available_sizes"
    }

    fn fields(&self) -> &[Field] {
        &[Field::AvailableSizes]
    }

    fn extract(&self, page: &PageSnapshot) -> ExtractResult<Vec<FieldValue>> {
        let elements = page.select_all(&self.size);
        if elements.is_empty() {
            return Ok(vec![FieldValue::NotApplicable]);
        }

        let found = elements.len();
        let sizes: Vec<String> = elements
            .into_iter()
            .map(text_of)
            .filter(|s| !s.is_empty())
            .collect();
        if sizes.is_empty() {
            return Err(ExtractionError::Unparsable {
                what: "available sizes",
                text: format!("{found} size elements without text"),
            });
        }
        Ok(vec![FieldValue::List(sizes)])
    }
}
