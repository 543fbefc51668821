use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc::UnboundedSender;
use tokio::time::{self, Instant, Sleep};

use crate::dom::{Dom, Locator, NodeId};
use crate::error::LoaderResult;
use crate::event::{FetchCompletion, LoopEvent};
use crate::fetch::Fetcher;

/// One fetched page: raw body, the detached fragment it was parsed into and
/// the extracted items in source order.
#[derive(Debug, Clone, PartialEq)]
pub struct LoadedPage {
    pub url: String,
    pub body: String,
    pub fragment: NodeId,
    pub items: Vec<NodeId>,
}

pub struct LoadPipeline {
    fetcher: Arc<dyn Fetcher>,
    item: Locator,
    container: Locator,
    next: Locator,
    min_delay: Duration,
}

impl LoadPipeline {
    pub fn new(
        fetcher: Arc<dyn Fetcher>,
        item: Locator,
        container: Locator,
        next: Locator,
        min_delay: Duration,
    ) -> Self {
        Self {
            fetcher,
            item,
            container,
            next,
            min_delay,
        }
    }

    pub fn min_delay(&self) -> Duration {
        self.min_delay
    }

    /// Fetches, extracts, then holds the page until the minimum delay has
    /// passed since the fetch started. `min_delay` overrides the configured
    /// delay for this call.
    pub async fn load(
        &self,
        dom: &mut dyn Dom,
        url: &str,
        min_delay: Option<Duration>,
    ) -> LoaderResult<LoadedPage> {
        let started = Instant::now();
        let body = self.fetcher.get_text(url).await?;
        let page = self.extract(dom, url, body)?;
        if let Some(hold) = self.hold(started, min_delay) {
            hold.await;
        }
        Ok(page)
    }

    /// Timer for the rest of the minimum delay, or `None` once it has passed.
    pub fn hold(&self, started: Instant, min_delay: Option<Duration>) -> Option<Sleep> {
        let min_delay = min_delay.unwrap_or(self.min_delay);
        remaining_delay(min_delay, started, Instant::now()).map(time::sleep)
    }

    /// The fetch half of [`LoadPipeline::load`], reporting to the loop
    /// instead of returning.
    pub(crate) fn fetch_task(
        &self,
        cycle: u64,
        url: String,
        tx: UnboundedSender<LoopEvent>,
    ) -> impl Future<Output = ()> + Send + 'static {
        let started = Instant::now();
        let request = self.fetcher.get_text(&url);
        async move {
            let result = request.await;
            let _ = tx.send(LoopEvent::Fetched(FetchCompletion {
                cycle,
                url,
                started,
                result,
            }));
        }
    }

    /// Parses `body` and collects the items of its items container. The
    /// container is looked up inside the fragment first, then among its
    /// top-level nodes. No container or no items is an empty batch.
    pub fn extract(&self, dom: &mut dyn Dom, url: &str, body: String) -> LoaderResult<LoadedPage> {
        let fragment = dom.parse_fragment(&body)?;
        let items = match find_in_fragment(dom, fragment, &self.container) {
            Some(container) => dom.find_matching(&self.item, container),
            None => Vec::new(),
        };
        Ok(LoadedPage {
            url: url.to_string(),
            body,
            fragment,
            items,
        })
    }

    pub fn next_link(&self, dom: &dyn Dom, page: &LoadedPage) -> Option<String> {
        let link = find_in_fragment(dom, page.fragment, &self.next)?;
        href_of(dom, link)
    }

    pub fn document_next_link(&self, dom: &dyn Dom) -> Option<String> {
        let link = dom
            .find_matching(&self.next, dom.document())
            .into_iter()
            .next()?;
        href_of(dom, link)
    }

    pub fn remaining_delay(&self, started: Instant, now: Instant) -> Option<Duration> {
        remaining_delay(self.min_delay, started, now)
    }
}

fn remaining_delay(min_delay: Duration, started: Instant, now: Instant) -> Option<Duration> {
    let elapsed = now.saturating_duration_since(started);
    min_delay
        .checked_sub(elapsed)
        .filter(|remaining| !remaining.is_zero())
}

fn find_in_fragment(dom: &dyn Dom, fragment: NodeId, locator: &Locator) -> Option<NodeId> {
    let top_level = dom.children(fragment);
    top_level
        .iter()
        .find_map(|node| dom.find_matching(locator, *node).into_iter().next())
        .or_else(|| {
            top_level
                .into_iter()
                .find(|node| dom.matches(*node, locator))
        })
}

fn href_of(dom: &dyn Dom, link: NodeId) -> Option<String> {
    dom.attribute(link, "href")
        .map(|href| href.trim().to_string())
        .filter(|href| !href.is_empty())
}
