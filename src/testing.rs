//! Test doubles and markup fixtures.

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use serde_json::Value;

use crate::browser::BrowserSession;
use crate::error::ScrapeError;

#[derive(Debug, Default)]
pub struct BrowserLog {
    pub navigations: Vec<String>,
    pub scripts: Vec<String>,
    pub closed: bool,
}

/// In-memory browser: serves fixed markup per URL and records every call.
#[derive(Default)]
pub struct ScriptedBrowser {
    pages: HashMap<String, String>,
    failures: HashMap<String, usize>,
    current: Option<String>,
    log: Rc<RefCell<BrowserLog>>,
}

impl ScriptedBrowser {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn page(mut self, url: &str, html: &str) -> Self {
        self.pages.insert(url.to_string(), html.to_string());
        self
    }

    /// Fail the next `times` navigations to `url`.
    pub fn failing(mut self, url: &str, times: usize) -> Self {
        self.failures.insert(url.to_string(), times);
        self
    }

    pub fn log(&self) -> Rc<RefCell<BrowserLog>> {
        Rc::clone(&self.log)
    }
}

impl BrowserSession for ScriptedBrowser {
    fn navigate(&mut self, url: &str) -> Result<(), ScrapeError> {
        self.log.borrow_mut().navigations.push(url.to_string());
        if let Some(remaining) = self.failures.get_mut(url) {
            if *remaining > 0 {
                *remaining -= 1;
                return Err(ScrapeError::Navigation {
                    url: url.to_string(),
                    message: "net::ERR_CONNECTION_RESET".into(),
                });
            }
        }
        self.current = Some(url.to_string());
        Ok(())
    }

    fn run_script(&mut self, js: &str) -> Result<Value, ScrapeError> {
        self.log.borrow_mut().scripts.push(js.to_string());
        Ok(Value::Null)
    }

    fn current_markup(&mut self) -> Result<String, ScrapeError> {
        Ok(self
            .current
            .as_ref()
            .and_then(|url| self.pages.get(url))
            .cloned()
            .unwrap_or_else(|| "<html><body></body></html>".to_string()))
    }

    fn close(&mut self) -> Result<(), ScrapeError> {
        self.log.borrow_mut().closed = true;
        Ok(())
    }
}

/// Listing page with one tile per entry; `None` is a tile without a link.
pub fn listing_html(hrefs: &[Option<&str>]) -> String {
    let tiles: String = hrefs
        .iter()
        .map(|href| match href {
            Some(h) => format!(
                r#"<div class="category-page-1wcebst"><a href="{h}"><img src="x.jpg"></a><p>Tee</p></div>"#
            ),
            None => r#"<div class="category-page-1wcebst"><p>Sold out</p></div>"#.to_string(),
        })
        .collect();
    format!("<html><body><main>{tiles}</main></body></html>")
}

/// Detail page builder shaped like the default selectors expect.
pub struct DetailPage {
    pub name: String,
    pub breadcrumb: Vec<String>,
    pub price: String,
    pub sale: Option<(String, String)>,
    pub rating: String,
    pub rating_count: String,
    pub color: String,
    pub sizes: Vec<String>,
    pub blocks: Vec<Vec<String>>,
}

impl DetailPage {
    pub fn full() -> Self {
        Self {
            name: "Slim Taper Jeans".into(),
            breadcrumb: vec!["Men".into(), "Jeans".into()],
            price: "$59.99".into(),
            sale: Some(("$39.99".into(), "$59.99".into())),
            rating: "5 stars, 4 are filled".into(),
            rating_count: "128 ratings".into(),
            color: "Dark Indigo".into(),
            sizes: vec!["30W".into(), "32W".into(), "34W".into()],
            blocks: vec![
                vec!["Slim fit.".into(), "Model is wearing size 32W".into()],
                vec!["Stretch denim".into(), "#774933022".into()],
                vec!["98% cotton, 2% elastane".into(), "Machine wash.".into()],
            ],
        }
    }

    pub fn with_name(mut self, name: &str) -> Self {
        self.name = name.into();
        self
    }

    pub fn html(&self) -> String {
        let crumbs: String = self
            .breadcrumb
            .iter()
            .map(|c| format!(r##"<a href="#">{c}</a>"##))
            .collect();
        let pricing = match &self.sale {
            Some((selling, strike)) => format!(
                r#"<span class="pdp-pricing--highlight pdp-pricing__selected pdp-mfe-1x0pbuu">{selling}</span><span class="product-price__strike pdp-mfe-eyzase">{strike}</span>"#
            ),
            None => self.price.clone(),
        };
        let sizes: String = self
            .sizes
            .iter()
            .map(|s| {
                format!(
                    r#"<div class="pdp-mfe-17f6z2a pdp-dimension pdp-dimension--should-display-redesign-in-stock">{s}</div>"#
                )
            })
            .collect();
        let blocks: String = self
            .blocks
            .iter()
            .map(|items| {
                let lis: String = items.iter().map(|i| format!("<li>{i}</li>")).collect();
                format!(r#"<ul class="product-information-item__list pdp-mfe-1a">{lis}</ul>"#)
            })
            .collect();

        format!(
            r#"<html><body>
<div class="pdp-mfe-1atmbpz">{crumbs}</div>
<h1 class="pdp-mfe-1q3kbmx">{name}</h1>
<div class="pdp-pricing pdp-mfe-1x0pbuu">{pricing}</div>
<span class="pdp-mfe-3jhqep">{rating}</span>
<div class="pdp-mfe-17iathi">{count}</div>
<div class="swatch-label"><span class="swatch-label__value">{color}</span></div>
<div class="pdp-dimension-container">{sizes}</div>
<section>{blocks}</section>
</body></html>"#,
            name = self.name,
            rating = self.rating,
            count = self.rating_count,
            color = self.color,
        )
    }
}
