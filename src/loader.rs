use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::browser::BrowserSession;
use crate::error::ScrapeError;
use crate::markup::PageSnapshot;
use crate::pacing::Pacer;

pub const SCROLL_BOTTOM: &str = "window.scrollTo(0, document.body.scrollHeight)";
pub const SCROLL_MIDDLE: &str = "window.scrollTo(0, document.body.scrollHeight / 2)";
pub const SCROLL_TOP: &str = "window.scrollTo(0, 0)";

/// Opens pages and coaxes lazily loaded content into the DOM.
pub struct PageLoader<'a> {
    session: &'a mut dyn BrowserSession,
    pacer: &'a dyn Pacer,
}

impl<'a> PageLoader<'a> {
    pub fn new(session: &'a mut dyn BrowserSession, pacer: &'a dyn Pacer) -> Self {
        Self { session, pacer }
    }

    /// Navigate and give the page time to render.
    pub fn open(&mut self, url: &str) -> Result<(), ScrapeError> {
        debug!(url, "navigating");
        self.session.navigate(url)?;
        self.pacer.pause();
        Ok(())
    }

    pub fn snapshot(&mut self) -> Result<PageSnapshot, ScrapeError> {
        let markup = self.session.current_markup()?;
        Ok(PageSnapshot::parse(&markup))
    }

    pub fn load(&mut self, url: &str) -> Result<PageSnapshot, ScrapeError> {
        self.open(url)?;
        self.snapshot()
    }

    /// Trigger infinite-scroll loading.
    ///
    /// A single jump to the bottom can race the loader and miss tiles that
    /// attach mid-viewport, so each round also revisits the midpoint. A final
    /// bottom, top, middle, bottom sweep picks up stragglers.
    ///
    /// `cancel` is checked before every round and before the sweep.
    pub fn reveal_more(&mut self, times: u32, cancel: &CancellationToken) -> Result<(), ScrapeError> {
        for round in 0..times {
            if cancel.is_cancelled() {
                return Err(ScrapeError::Cancelled { recorded: 0 });
            }
            debug!(round = round + 1, times, "scroll round");
            self.scroll(SCROLL_BOTTOM)?;
            self.pacer.pause();
            self.scroll(SCROLL_MIDDLE)?;
            self.pacer.pause();
        }

        if cancel.is_cancelled() {
            return Err(ScrapeError::Cancelled { recorded: 0 });
        }
        let sweep = [SCROLL_BOTTOM, SCROLL_TOP, SCROLL_MIDDLE, SCROLL_BOTTOM];
        for (i, script) in sweep.iter().enumerate() {
            if i > 0 {
                self.pacer.pause();
            }
            self.scroll(script)?;
        }
        Ok(())
    }

    fn scroll(&mut self, script: &str) -> Result<(), ScrapeError> {
        self.session.run_script(script).map(|_| ())
    }
}
