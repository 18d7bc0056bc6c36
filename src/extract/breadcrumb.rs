use crate::config::DetailSelectors;
use crate::error::{ExtractResult, ExtractionError};
use crate::markup::{text_of, PageSnapshot, Query};
use crate::record::{Field, FieldValue};

use super::FieldRule;

/// Product type from the breadcrumb: the first link names the department,
/// the second the category, which is what we keep.
pub struct ProductTypeRule {
    container: Query,
    link: Query,
}

impl ProductTypeRule {
    pub fn new(cfg: &DetailSelectors) -> ExtractResult<Self> {
        Ok(Self {
            container: Query::new(&cfg.breadcrumb)?,
            link: Query::new(&cfg.breadcrumb_link)?,
        })
    }
}

impl FieldRule for ProductTypeRule {
    fn name(&self) -> &'static str {
        "product_type"
    }

    fn fields(&self) -> &[Field] {
        &[Field::Type]
    }

    fn extract(&self, page: &PageSnapshot) -> ExtractResult<Vec<FieldValue>> {
        let container = page.require(&self.container)?;
        let links = self.link.within(container);
        let category = links.get(1).ok_or_else(|| ExtractionError::TooFew {
            selector: self.link.as_str().to_string(),
            expected: 2,
            found: links.len(),
        })?;
        Ok(vec![FieldValue::Text(text_of(*category))])
    }
}
