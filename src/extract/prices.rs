use std::sync::LazyLock;

use regex::Regex;

use crate::config::DetailSelectors;
use crate::error::{ExtractResult, ExtractionError};
use crate::markup::{text_of, PageSnapshot, Query};
use crate::record::{Field, FieldValue};

use super::FieldRule;

static PARENTHETICAL_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\([^()]*\)").unwrap());

/// Selling and max retail price. A highlighted price means a discount is
/// running and the struck-through price is the original; otherwise the
/// container holds a single price used for both.
pub struct PriceRule {
    container: Query,
    selected: Query,
    strike: Query,
    currency: char,
}

impl PriceRule {
    pub fn new(cfg: &DetailSelectors) -> ExtractResult<Self> {
        Ok(Self {
            container: Query::new(&cfg.price_container)?,
            selected: Query::new(&cfg.price_selected)?,
            strike: Query::new(&cfg.price_strike)?,
            currency: cfg.currency_symbol,
        })
    }

    fn strip_currency(&self, raw: &str) -> String {
        raw.trim().trim_matches(self.currency).trim().to_string()
    }
}

impl FieldRule for PriceRule {
    fn name(&self) -> &'static str {
        "prices"
    }

    fn fields(&self) -> &[Field] {
        &[Field::SellingPrice, Field::MaxRetailPrice]
    }

    fn extract(&self, page: &PageSnapshot) -> ExtractResult<Vec<FieldValue>> {
        let container = page.require(&self.container)?;

        let raw_selling = match self.selected.first_within(container) {
            Some(selected) => text_of(selected),
            None => text_of(container),
        };
        let selling = PARENTHETICAL_RE
            .replace_all(&self.strip_currency(&raw_selling), "")
            .trim()
            .to_string();
        if selling.is_empty() {
            return Err(ExtractionError::Unparsable {
                what: "selling price",
                text: raw_selling,
            });
        }

        let max_retail = self
            .strike
            .first_within(container)
            .map(|strike| self.strip_currency(&text_of(strike)))
            .filter(|s| !s.is_empty())
            .unwrap_or_else(|| selling.clone());

        Ok(vec![FieldValue::Text(selling), FieldValue::Text(max_retail)])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn prices(html: &str) -> ExtractResult<Vec<FieldValue>> {
        let rule = PriceRule::new(&DetailSelectors::default()).unwrap();
        rule.extract(&PageSnapshot::parse(html))
    }

    fn text(s: &str) -> FieldValue {
        FieldValue::Text(s.into())
    }

    #[test]
    fn single_price_is_both_selling_and_retail() {
        let got = prices(r#"<div class="pdp-pricing pdp-mfe-1x0pbuu">$49.99</div>"#).unwrap();
        assert_eq!(got, vec![text("49.99"), text("49.99")]);
    }

    #[test]
    fn highlighted_and_strike_prices() {
        let got = prices(
            r#"<div class="pdp-pricing pdp-mfe-1x0pbuu">
                 <span class="pdp-pricing--highlight pdp-pricing__selected pdp-mfe-1x0pbuu">$39.99</span>
                 <span class="product-price__strike pdp-mfe-eyzase">$59.99</span>
               </div>"#,
        )
        .unwrap();
        assert_eq!(got, vec![text("39.99"), text("59.99")]);
    }

    #[test]
    fn highlighted_without_strike_reuses_selling() {
        let got = prices(
            r#"<div class="pdp-pricing pdp-mfe-1x0pbuu">
                 <span class="pdp-pricing--highlight pdp-pricing__selected">$25.00</span>
               </div>"#,
        )
        .unwrap();
        assert_eq!(got, vec![text("25.00"), text("25.00")]);
    }

    #[test]
    fn parenthetical_note_is_removed_from_selling_price() {
        let got = prices(
            r#"<div class="pdp-pricing pdp-mfe-1x0pbuu">
                 <span class="pdp-pricing--highlight pdp-pricing__selected">$19.99 (40% off)</span>
                 <span class="product-price__strike">$32.99</span>
               </div>"#,
        )
        .unwrap();
        assert_eq!(got, vec![text("19.99"), text("32.99")]);
    }

    #[test]
    fn missing_container_fails() {
        assert!(matches!(
            prices("<div class='price'>$1</div>"),
            Err(ExtractionError::Missing(_))
        ));
    }

    #[test]
    fn empty_container_fails() {
        assert!(matches!(
            prices(r#"<div class="pdp-pricing pdp-mfe-1x0pbuu"> $ </div>"#),
            Err(ExtractionError::Unparsable { .. })
        ));
    }
}
