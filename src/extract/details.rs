use std::collections::BTreeMap;

use crate::config::DetailSelectors;
use crate::error::{ExtractResult, ExtractionError};
use crate::markup::{PageSnapshot, Query};
use crate::record::{Field, FieldValue};

use super::normalize::clean_line;
use super::FieldRule;

const DETAIL_FIELDS: [Field; 3] = [Field::FitSizing, Field::ProductDetails, Field::FabricCare];

/// Fit & sizing, product details and fabric & care lists.
///
/// The page renders these as sibling lists without labels, so which list is
/// which is decided by how many there are (`detail_layouts`). A count with
/// no layout fails all three fields.
pub struct DetailsRule {
    blocks: Query,
    item: Query,
    layouts: BTreeMap<usize, Vec<Field>>,
    fit_exclude: Vec<String>,
    details_exclude: Vec<String>,
}

impl DetailsRule {
    pub fn new(cfg: &DetailSelectors) -> ExtractResult<Self> {
        Ok(Self {
            blocks: Query::new(&cfg.detail_blocks)?,
            item: Query::new(&cfg.detail_item)?,
            layouts: cfg.detail_layouts.clone(),
            fit_exclude: cfg.fit_exclude.clone(),
            details_exclude: cfg.details_exclude.clone(),
        })
    }

    fn excludes(&self, field: Field) -> &[String] {
        match field {
            Field::FitSizing => &self.fit_exclude,
            Field::ProductDetails => &self.details_exclude,
            _ => &[],
        }
    }
}

impl FieldRule for DetailsRule {
    fn name(&self) -> &'static str {
        "details"
    }

    fn fields(&self) -> &[Field] {
        &DETAIL_FIELDS
    }

    fn extract(&self, page: &PageSnapshot) -> ExtractResult<Vec<FieldValue>> {
        let blocks = page.select_all(&self.blocks);
        let layout = self
            .layouts
            .get(&blocks.len())
            .ok_or(ExtractionError::UnexpectedBlockCount(blocks.len()))?;

        let mut values = vec![FieldValue::NotApplicable; DETAIL_FIELDS.len()];
        for (block, field) in blocks.into_iter().zip(layout) {
            let Some(slot) = DETAIL_FIELDS.iter().position(|f| f == field) else {
                continue;
            };
            let excludes = self.excludes(*field);
            let lines: Vec<String> = self
                .item
                .within(block)
                .into_iter()
                .map(|li| li.text().collect::<String>())
                .filter(|raw| !excludes.iter().any(|needle| raw.contains(needle.as_str())))
                .map(|raw| clean_line(&raw))
                .filter(|line| !line.is_empty())
                .collect();
            // a block holding only excluded lines says nothing about the product
            if !lines.is_empty() {
                values[slot] = FieldValue::List(lines);
            }
        }
        Ok(values)
    }
}
