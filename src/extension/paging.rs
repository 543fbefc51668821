use std::sync::{Arc, Mutex, PoisonError};

use tracing::debug;

use crate::bus::{EventContext, Signal};
use crate::controller::Controller;
use crate::error::LoaderResult;
use crate::event::EventKind;

use super::traits::Extension;

/// Page references in the order they were rendered.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PageLog {
    pages: Vec<String>,
    exhausted: bool,
}

impl PageLog {
    pub fn pages(&self) -> &[String] {
        &self.pages
    }

    pub fn current(&self) -> Option<&str> {
        self.pages.last().map(String::as_str)
    }

    /// One-based number of the last page on screen; the initial document is
    /// page 1.
    pub fn page_number(&self) -> usize {
        self.pages.len() + 1
    }

    pub fn is_exhausted(&self) -> bool {
        self.exhausted
    }

    fn record(&mut self, url: &str) {
        self.pages.push(url.to_owned());
    }
}

/// Read side of a [`PagingExtension`], usable after the extension moved into
/// its controller.
#[derive(Debug, Clone)]
pub struct PageTracker {
    log: Arc<Mutex<PageLog>>,
}

impl PageTracker {
    pub fn snapshot(&self) -> PageLog {
        self.log
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

#[derive(Debug, Default)]
pub struct PagingExtension {
    log: Arc<Mutex<PageLog>>,
}

impl PagingExtension {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn tracker(&self) -> PageTracker {
        PageTracker {
            log: Arc::clone(&self.log),
        }
    }
}

impl Extension for PagingExtension {
    fn name(&self) -> &str {
        "paging"
    }

    fn bind(&mut self, controller: &mut Controller) -> LoaderResult<()> {
        // `next_page` still names the page being rendered until the render
        // completes.
        let log = Arc::clone(&self.log);
        controller.on(EventKind::Render, move |ctx: &EventContext<'_>| {
            if let Some(url) = ctx.next_page {
                let mut log = log.lock().unwrap_or_else(PoisonError::into_inner);
                log.record(url);
                debug!("page {} is {url}", log.page_number());
            }
            Signal::Proceed
        })?;

        let log = Arc::clone(&self.log);
        controller.on(EventKind::NoneLeft, move |_: &EventContext<'_>| {
            log.lock().unwrap_or_else(PoisonError::into_inner).exhausted = true;
            Signal::Proceed
        })?;
        Ok(())
    }
}
