use crate::error::{ExtractResult, ExtractionError};
use crate::markup::{text_of, PageSnapshot, Query};
use crate::record::{Field, FieldValue};

use super::FieldRule;

/// Text of the first element matching a selector. Used for name and color.
pub struct TextRule {
    name: &'static str,
    field: [Field; 1],
    query: Query,
}

impl TextRule {
    pub fn new(name: &'static str, field: Field, selector: &str) -> ExtractResult<Self> {
        Ok(Self {
            name,
            field: [field],
            query: Query::new(selector)?,
        })
    }
}

impl FieldRule for TextRule {
    fn name(&self) -> &'static str {
        self.name
    }

    fn fields(&self) -> &[Field] {
        &self.field
    }

    fn extract(&self, page: &PageSnapshot) -> ExtractResult<Vec<FieldValue>> {
        let text = text_of(page.require(&self.query)?);
        if text.is_empty() {
            return Err(ExtractionError::Unparsable {
                what: self.name,
                text,
            });
        }
        Ok(vec![FieldValue::Text(text)])
    }
}
