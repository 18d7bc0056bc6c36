use std::fmt;

use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::{ExtractResult, ExtractionError};

pub const NOT_AVAILABLE: &str = "Not available";
pub const NOT_APPLICABLE: &str = "Not applicable";

/// Extracted columns, in output order. The URL column precedes them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Field {
    Type,
    Name,
    SellingPrice,
    MaxRetailPrice,
    Rating,
    RatingCount,
    Color,
    AvailableSizes,
    FitSizing,
    ProductDetails,
    FabricCare,
}

pub const FIELD_COUNT: usize = 11;

impl Field {
    pub const ALL: [Field; FIELD_COUNT] = [
        Field::Type,
        Field::Name,
        Field::SellingPrice,
        Field::MaxRetailPrice,
        Field::Rating,
        Field::RatingCount,
        Field::Color,
        Field::AvailableSizes,
        Field::FitSizing,
        Field::ProductDetails,
        Field::FabricCare,
    ];

    pub fn column(self) -> &'static str {
        match self {
            Field::Type => "Type",
            Field::Name => "Name",
            Field::SellingPrice => "SellingPrice",
            Field::MaxRetailPrice => "MaxRetailPrice",
            Field::Rating => "Rating",
            Field::RatingCount => "RatingCount",
            Field::Color => "Color",
            Field::AvailableSizes => "AvailableSizes",
            Field::FitSizing => "FitSizing",
            Field::ProductDetails => "ProductDetails",
            Field::FabricCare => "FabricCare",
        }
    }

    fn index(self) -> usize {
        self as usize
    }
}

/// One cell of a product record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum FieldValue {
    Text(String),
    List(Vec<String>),
    /// Extraction was attempted and failed.
    Unavailable,
    /// The field does not exist for this product.
    NotApplicable,
}

impl FieldValue {
    pub fn is_present(&self) -> bool {
        matches!(self, FieldValue::Text(_) | FieldValue::List(_))
    }

    pub fn render(&self) -> String {
        match self {
            FieldValue::Text(s) => s.clone(),
            FieldValue::List(items) => items.join(", "),
            FieldValue::Unavailable => NOT_AVAILABLE.to_string(),
            FieldValue::NotApplicable => NOT_APPLICABLE.to_string(),
        }
    }
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.render())
    }
}

/// Canonical detail-page address: everything from the first `&` is dropped.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProductUrl(String);

impl ProductUrl {
    /// Resolve `href` (absolute, or relative to `base`) and strip trailing query parameters.
    pub fn canonicalize(href: &str, base: Option<&Url>) -> ExtractResult<Self> {
        let href = href.trim();
        if href.is_empty() {
            return Err(ExtractionError::NoHref);
        }

        let absolute = match Url::parse(href) {
            Ok(_) => href.to_string(),
            Err(url::ParseError::RelativeUrlWithoutBase) => {
                let base = base.ok_or_else(|| ExtractionError::InvalidUrl {
                    href: href.to_string(),
                    reason: "relative link without a base url".into(),
                })?;
                base.join(href)
                    .map_err(|e| ExtractionError::InvalidUrl {
                        href: href.to_string(),
                        reason: e.to_string(),
                    })?
                    .to_string()
            }
            Err(e) => {
                return Err(ExtractionError::InvalidUrl {
                    href: href.to_string(),
                    reason: e.to_string(),
                })
            }
        };

        let canonical = absolute.split('&').next().unwrap_or_default();
        Ok(Self(canonical.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ProductUrl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// One row of output. Immutable once built.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductRecord {
    url: ProductUrl,
    values: [FieldValue; FIELD_COUNT],
}

impl ProductRecord {
    pub fn header() -> Vec<&'static str> {
        std::iter::once("URL")
            .chain(Field::ALL.iter().map(|f| f.column()))
            .collect()
    }

    pub fn url(&self) -> &ProductUrl {
        &self.url
    }

    #[cfg(test)]
    pub fn get(&self, field: Field) -> &FieldValue {
        &self.values[field.index()]
    }

    pub fn fields(&self) -> impl Iterator<Item = (Field, &FieldValue)> {
        Field::ALL.iter().copied().zip(self.values.iter())
    }

    pub fn to_row(&self) -> Vec<String> {
        std::iter::once(self.url.to_string())
            .chain(self.values.iter().map(FieldValue::render))
            .collect()
    }
}

/// Collects field values for one page; unset fields become `Unavailable`.
pub struct RecordBuilder {
    url: ProductUrl,
    values: [Option<FieldValue>; FIELD_COUNT],
}

impl RecordBuilder {
    pub fn new(url: ProductUrl) -> Self {
        Self {
            url,
            values: std::array::from_fn(|_| None),
        }
    }

    pub fn set(&mut self, field: Field, value: FieldValue) {
        self.values[field.index()] = Some(value);
    }

    pub fn build(self) -> ProductRecord {
        ProductRecord {
            url: self.url,
            values: self.values.map(|v| v.unwrap_or(FieldValue::Unavailable)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn absolute_url_is_truncated_at_first_ampersand() {
        let url = ProductUrl::canonicalize(
            "https://www.gap.com/browse/product.do?pid=774933022&cid=11900&pcid=11900#pdp-page-content",
            None,
        )
        .unwrap();
        assert_eq!(url.as_str(), "https://www.gap.com/browse/product.do?pid=774933022");
    }

    #[test]
    fn relative_url_is_joined_to_base() {
        let base = Url::parse("https://www.gap.com/browse/category.do?cid=11900").unwrap();
        let url = ProductUrl::canonicalize("/browse/product.do?pid=1&vid=2", Some(&base)).unwrap();
        assert_eq!(url.as_str(), "https://www.gap.com/browse/product.do?pid=1");
    }

    #[test]
    fn empty_or_baseless_hrefs_fail() {
        assert_eq!(ProductUrl::canonicalize("  ", None), Err(ExtractionError::NoHref));
        assert!(matches!(
            ProductUrl::canonicalize("/p?pid=1", None),
            Err(ExtractionError::InvalidUrl { .. })
        ));
    }

    #[test]
    fn sentinels_render_distinctly() {
        assert_eq!(FieldValue::Unavailable.render(), "Not available");
        assert_eq!(FieldValue::NotApplicable.render(), "Not applicable");
        assert_eq!(
            FieldValue::List(vec!["S".into(), "M".into()]).render(),
            "S, M"
        );
    }

    #[test]
    fn builder_fills_gaps_with_unavailable() {
        let url = ProductUrl::canonicalize("https://x.test/p?pid=1", None).unwrap();
        let mut b = RecordBuilder::new(url);
        b.set(Field::Name, FieldValue::Text("Tee".into()));
        let record = b.build();

        assert_eq!(record.get(Field::Name), &FieldValue::Text("Tee".into()));
        assert_eq!(record.get(Field::Color), &FieldValue::Unavailable);
        assert_eq!(record.to_row().len(), ProductRecord::header().len());
        assert_eq!(ProductRecord::header()[0], "URL");
        assert_eq!(ProductRecord::header()[11], "FabricCare");
    }
}
