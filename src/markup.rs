//! Queryable view over one rendered page.

use scraper::{ElementRef, Html, Selector};

use crate::error::{ExtractResult, ExtractionError};

/// Immutable snapshot of a page's markup at one point in time.
pub struct PageSnapshot {
    document: Html,
}

impl PageSnapshot {
    pub fn parse(markup: &str) -> Self {
        Self {
            document: Html::parse_document(markup),
        }
    }

    /// All elements matching `selector`, in document order.
    pub fn select_all<'a>(&'a self, selector: &Query) -> Vec<ElementRef<'a>> {
        self.document.select(&selector.compiled).collect()
    }

    pub fn select_first<'a>(&'a self, selector: &Query) -> Option<ElementRef<'a>> {
        self.document.select(&selector.compiled).next()
    }

    /// Like `select_first`, but a missing element is an extraction error.
    pub fn require<'a>(&'a self, selector: &Query) -> ExtractResult<ElementRef<'a>> {
        self.select_first(selector)
            .ok_or_else(|| ExtractionError::Missing(selector.source.clone()))
    }
}

/// A compiled CSS selector that remembers its source text for error messages.
#[derive(Debug, Clone)]
pub struct Query {
    source: String,
    compiled: Selector,
}

impl Query {
    pub fn new(source: &str) -> ExtractResult<Self> {
        let compiled = Selector::parse(source).map_err(|e| ExtractionError::InvalidSelector {
            selector: source.to_string(),
            reason: e.to_string(),
        })?;
        Ok(Self {
            source: source.to_string(),
            compiled,
        })
    }

    pub fn as_str(&self) -> &str {
        &self.source
    }

    /// Matches of this selector nested under `scope`.
    pub fn within<'a>(&self, scope: ElementRef<'a>) -> Vec<ElementRef<'a>> {
        scope.select(&self.compiled).collect()
    }

    pub fn first_within<'a>(&self, scope: ElementRef<'a>) -> Option<ElementRef<'a>> {
        scope.select(&self.compiled).next()
    }
}

/// Concatenated text content of an element, trimmed.
pub fn text_of(element: ElementRef<'_>) -> String {
    element.text().collect::<String>().trim().to_string()
}

pub fn attr_of<'a>(element: ElementRef<'a>, name: &str) -> Option<&'a str> {
    element.value().attr(name)
}
