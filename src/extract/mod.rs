//! Per-field extraction rules and the registry that isolates them.
//!
//! Each rule owns one field (or a fixed group, for prices and details) and
//! is run independently: an error or panic in one rule marks only its own
//! fields `Unavailable`.

pub mod breadcrumb;
pub mod details;
pub mod normalize;
pub mod prices;
pub mod rating;
pub mod sizes;
pub mod text;

use std::panic::{self, AssertUnwindSafe};

use tracing::debug;

use crate::config::DetailSelectors;
use crate::error::{ExtractResult, ExtractionError};
use crate::markup::PageSnapshot;
use crate::record::{Field, FieldValue, ProductRecord, ProductUrl, RecordBuilder};

/// An independent extraction rule.
pub trait FieldRule {
    fn name(&self) -> &'static str;

    /// Fields this rule produces, in the order `extract` returns them.
    fn fields(&self) -> &[Field];

    fn extract(&self, page: &PageSnapshot) -> ExtractResult<Vec<FieldValue>>;
}

pub struct ExtractorRegistry {
    rules: Vec<Box<dyn FieldRule>>,
}

impl ExtractorRegistry {
    /// Build the standard rule set. Fails only on an invalid selector.
    pub fn from_config(cfg: &DetailSelectors) -> ExtractResult<Self> {
        let rules: Vec<Box<dyn FieldRule>> = vec![
            Box::new(breadcrumb::ProductTypeRule::new(cfg)?),
            Box::new(text::TextRule::new("name", Field::Name, &cfg.name)?),
            Box::new(prices::PriceRule::new(cfg)?),
            Box::new(rating::RatingRule::new(cfg)?),
            Box::new(rating::RatingCountRule::new(cfg)?),
            Box::new(text::TextRule::new("color", Field::Color, &cfg.color)?),
            Box::new(sizes::SizesRule::new(cfg)?),
            Box::new(details::DetailsRule::new(cfg)?),
        ];
        Ok(Self { rules })
    }

    #[cfg(test)]
    pub fn with_rules(rules: Vec<Box<dyn FieldRule>>) -> Self {
        Self { rules }
    }

    /// Run every rule against `page` and assemble the record.
    pub fn extract_record(&self, url: ProductUrl, page: &PageSnapshot) -> ProductRecord {
        let mut builder = RecordBuilder::new(url);
        for rule in &self.rules {
            let values = run_isolated(rule.as_ref(), page).unwrap_or_else(|e| {
                debug!(rule = rule.name(), error = %e, "extraction failed");
                vec![FieldValue::Unavailable; rule.fields().len()]
            });
            for (field, value) in rule.fields().iter().zip(values) {
                builder.set(*field, value);
            }
        }
        builder.build()
    }
}

fn run_isolated(rule: &dyn FieldRule, page: &PageSnapshot) -> ExtractResult<Vec<FieldValue>> {
    let values = panic::catch_unwind(AssertUnwindSafe(|| rule.extract(page)))
        .map_err(|payload| ExtractionError::Panicked(panic_message(payload.as_ref())))??;

    let expected = rule.fields().len();
    if values.len() != expected {
        return Err(ExtractionError::Arity {
            rule: rule.name(),
            expected,
            got: values.len(),
        });
    }
    Ok(values)
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::DetailPage;

    struct Exploding;

    impl FieldRule for Exploding {
        fn name(&self) -> &'static str {
            "exploding"
        }
        fn fields(&self) -> &[Field] {
            &[Field::Color]
        }
        fn extract(&self, _page: &PageSnapshot) -> ExtractResult<Vec<FieldValue>> {
            panic!("selector engine blew up")
        }
    }

    struct WrongArity;

    impl FieldRule for WrongArity {
        fn name(&self) -> &'static str {
            "wrong_arity"
        }
        fn fields(&self) -> &[Field] {
            &[Field::SellingPrice, Field::MaxRetailPrice]
        }
        fn extract(&self, _page: &PageSnapshot) -> ExtractResult<Vec<FieldValue>> {
            Ok(vec![FieldValue::Text("1".into())])
        }
    }

    fn url() -> ProductUrl {
        ProductUrl::canonicalize("https://shop.test/p?pid=1", None).unwrap()
    }

    #[test]
    fn full_page_populates_every_field() {
        let registry = ExtractorRegistry::from_config(&DetailSelectors::default()).unwrap();
        let page = PageSnapshot::parse(&DetailPage::full().html());
        let record = registry.extract_record(url(), &page);

        assert_eq!(record.get(Field::Type), &FieldValue::Text("Jeans".into()));
        assert_eq!(record.get(Field::Name), &FieldValue::Text("Slim Taper Jeans".into()));
        assert_eq!(record.get(Field::SellingPrice), &FieldValue::Text("39.99".into()));
        assert_eq!(record.get(Field::MaxRetailPrice), &FieldValue::Text("59.99".into()));
        assert_eq!(record.get(Field::Rating), &FieldValue::Text("4".into()));
        assert_eq!(record.get(Field::RatingCount), &FieldValue::Text("128".into()));
        assert_eq!(record.get(Field::Color), &FieldValue::Text("Dark Indigo".into()));
        assert_eq!(
            record.get(Field::AvailableSizes),
            &FieldValue::List(vec!["30W".into(), "32W".into(), "34W".into()])
        );
        assert!(record.fields().all(|(_, v)| v.is_present()));
    }

    #[test]
    fn empty_page_never_escapes_the_rule_boundary() {
        let registry = ExtractorRegistry::from_config(&DetailSelectors::default()).unwrap();
        let page = PageSnapshot::parse("<html><body><p>blocked</p></body></html>");
        let record = registry.extract_record(url(), &page);

        for (field, value) in record.fields() {
            let expected = if field == Field::AvailableSizes {
                FieldValue::NotApplicable
            } else {
                FieldValue::Unavailable
            };
            assert_eq!(value, &expected, "field {:?}", field);
        }
    }

    #[test]
    fn panicking_rule_degrades_only_its_own_fields() {
        let cfg = DetailSelectors::default();
        let registry = ExtractorRegistry::with_rules(vec![
            Box::new(Exploding),
            Box::new(text::TextRule::new("name", Field::Name, &cfg.name).unwrap()),
        ]);
        let page = PageSnapshot::parse(&DetailPage::full().html());
        let record = registry.extract_record(url(), &page);

        assert_eq!(record.get(Field::Color), &FieldValue::Unavailable);
        assert_eq!(record.get(Field::Name), &FieldValue::Text("Slim Taper Jeans".into()));
    }

    #[test]
    fn wrong_value_count_is_treated_as_failure() {
        let registry = ExtractorRegistry::with_rules(vec![Box::new(WrongArity)]);
        let page = PageSnapshot::parse("<html></html>");
        let record = registry.extract_record(url(), &page);
        assert_eq!(record.get(Field::SellingPrice), &FieldValue::Unavailable);
        assert_eq!(record.get(Field::MaxRetailPrice), &FieldValue::Unavailable);
    }
}
