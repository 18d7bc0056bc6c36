//! Browser engine seam. The pipeline only needs four operations, so the
//! engine hides behind `BrowserSession` and tests swap in a scripted fake.

use std::ops::{Deref, DerefMut};
use std::sync::Arc;
use std::time::Duration;

use headless_chrome::{Browser, LaunchOptions, Tab};
use serde_json::Value;
use tracing::{debug, warn};

use crate::error::ScrapeError;

pub trait BrowserSession {
    fn navigate(&mut self, url: &str) -> Result<(), ScrapeError>;
    fn run_script(&mut self, js: &str) -> Result<Value, ScrapeError>;
    fn current_markup(&mut self) -> Result<String, ScrapeError>;
    fn close(&mut self) -> Result<(), ScrapeError>;
}

/// Headless Chrome with a single tab reused for the whole run.
pub struct ChromeSession {
    // Dropping the browser kills the Chrome process, so it must outlive the tab.
    _browser: Browser,
    tab: Arc<Tab>,
    closed: bool,
}

impl ChromeSession {
    pub fn launch(headless: bool) -> Result<Self, ScrapeError> {
        let options = LaunchOptions {
            headless,
            // Pacing pauses plus slow detail pages can exceed the 30s default.
            idle_browser_timeout: Duration::from_secs(600),
            ..Default::default()
        };
        let browser = Browser::new(options).map_err(|e| ScrapeError::Launch(format!("{e:#}")))?;
        let tab = browser
            .new_tab()
            .map_err(|e| ScrapeError::Launch(format!("{e:#}")))?;
        debug!(headless, "chrome session started");
        Ok(Self {
            _browser: browser,
            tab,
            closed: false,
        })
    }
}

impl BrowserSession for ChromeSession {
    fn navigate(&mut self, url: &str) -> Result<(), ScrapeError> {
        self.tab
            .navigate_to(url)
            .and_then(|tab| tab.wait_until_navigated())
            .map(|_| ())
            .map_err(|e| ScrapeError::Navigation {
                url: url.to_string(),
                message: format!("{e:#}"),
            })
    }

    fn run_script(&mut self, js: &str) -> Result<Value, ScrapeError> {
        let result = self
            .tab
            .evaluate(js, false)
            .map_err(|e| ScrapeError::Script(format!("{e:#}")))?;
        Ok(result.value.unwrap_or(Value::Null))
    }

    fn current_markup(&mut self) -> Result<String, ScrapeError> {
        self.tab
            .get_content()
            .map_err(|e| ScrapeError::Markup(format!("{e:#}")))
    }

    fn close(&mut self) -> Result<(), ScrapeError> {
        if self.closed {
            return Ok(());
        }
        self.closed = true;
        self.tab
            .close(true)
            .map(|_| ())
            .map_err(|e| ScrapeError::Script(format!("closing tab: {e:#}")))
    }
}

/// Owns a session and closes it on every exit path, including unwinding.
pub struct SessionGuard<B: BrowserSession> {
    session: B,
}

impl<B: BrowserSession> SessionGuard<B> {
    pub fn new(session: B) -> Self {
        Self { session }
    }
}

impl<B: BrowserSession> Deref for SessionGuard<B> {
    type Target = B;

    fn deref(&self) -> &B {
        &self.session
    }
}

impl<B: BrowserSession> DerefMut for SessionGuard<B> {
    fn deref_mut(&mut self) -> &mut B {
        &mut self.session
    }
}

impl<B: BrowserSession> Drop for SessionGuard<B> {
    fn drop(&mut self) {
        if let Err(e) = self.session.close() {
            warn!("Failed to close browser session: {}", e);
        }
    }
}
