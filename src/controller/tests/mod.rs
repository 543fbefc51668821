mod scrolling;

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use futures_util::FutureExt;
use futures_util::future::BoxFuture;

use crate::bus::{EventContext, Signal};
use crate::config::Config;
use crate::controller::Controller;
use crate::dom::{Dom, Locator, MemoryDom};
use crate::error::{LoaderError, LoaderResult};
use crate::event::{EventKind, EventPayload};
use crate::fetch::Fetcher;

/// Three items of 100px under `.listing`, then a 40px pagination block.
const FIRST_PAGE: &str = r#"
[
  { "tag": "div", "class": "listing", "children": [
      { "tag": "div", "class": "item", "id": "a", "height": 100 },
      { "tag": "div", "class": "item", "id": "b", "height": 100 },
      { "tag": "div", "class": "item", "id": "c", "height": 100 }
  ]},
  { "tag": "nav", "class": "pagination", "height": 40, "children": [
      { "tag": "a", "class": "next", "attrs": { "href": "/page2" } }
  ]}
]"#;

const SECOND_PAGE: &str = r#"
{ "tag": "main", "children": [
    { "tag": "div", "class": "listing", "children": [
        { "tag": "div", "class": "item", "id": "d", "height": 100 },
        { "tag": "div", "class": "item", "id": "e", "height": 100 },
        { "tag": "div", "class": "item", "id": "f", "height": 100 }
    ]},
    { "tag": "nav", "class": "pagination", "children": [
        { "tag": "a", "class": "next", "attrs": { "href": "/page3" } }
    ]}
]}"#;

const THIRD_PAGE: &str = r#"
{ "tag": "main", "children": [
    { "tag": "div", "class": "listing", "children": [
        { "tag": "div", "class": "item", "id": "g", "height": 100 },
        { "tag": "div", "class": "item", "id": "h", "height": 100 },
        { "tag": "div", "class": "item", "id": "i", "height": 100 }
    ]}
]}"#;

/// Leaves the first threshold (300px) 50px below the viewport bottom.
const VIEWPORT: f64 = 250.0;

struct ScriptedFetcher {
    pages: HashMap<String, String>,
    latency: Duration,
    calls: Mutex<Vec<String>>,
}

impl ScriptedFetcher {
    fn new(latency: Duration) -> Self {
        Self {
            pages: HashMap::new(),
            latency,
            calls: Mutex::new(Vec::new()),
        }
    }

    fn page(mut self, url: &str, body: &str) -> Self {
        self.pages.insert(url.to_string(), body.to_string());
        self
    }

    fn calls(&self) -> Vec<String> {
        self.calls.lock().expect("calls lock").clone()
    }
}

impl Fetcher for ScriptedFetcher {
    fn get_text(&self, url: &str) -> BoxFuture<'static, LoaderResult<String>> {
        self.calls.lock().expect("calls lock").push(url.to_string());
        let body = self.pages.get(url).cloned();
        let url = url.to_string();
        let latency = self.latency;
        async move {
            tokio::time::sleep(latency).await;
            body.ok_or_else(|| {
                LoaderError::fetch_failure(url, LoaderError::invalid_argument("HTTP 404"))
            })
        }
        .boxed()
    }
}

fn three_pages(latency: Duration) -> Arc<ScriptedFetcher> {
    Arc::new(
        ScriptedFetcher::new(latency)
            .page("/page2", SECOND_PAGE)
            .page("/page3", THIRD_PAGE),
    )
}

fn config(min_render_delay_ms: u64, scroll_throttle_ms: u64) -> Config {
    let mut config = Config::default();
    config.selectors.pagination = Some(".pagination".to_string());
    config.timing.min_render_delay_ms = min_render_delay_ms;
    config.timing.scroll_throttle_ms = scroll_throttle_ms;
    config
}

fn controller_with(config: &Config, markup: &str, fetcher: &Arc<ScriptedFetcher>) -> Controller {
    let dom = MemoryDom::from_markup(markup, VIEWPORT).expect("fixture markup should parse");
    Controller::new(config, Box::new(dom), fetcher.clone())
}

fn controller(config: &Config, fetcher: &Arc<ScriptedFetcher>) -> Controller {
    controller_with(config, FIRST_PAGE, fetcher)
}

type EventLog = Arc<Mutex<Vec<String>>>;

/// Records every firing as `name` or `name url` for `next`.
fn record_events(controller: &mut Controller) -> EventLog {
    let log = EventLog::default();
    for kind in EventKind::ALL {
        let log = Arc::clone(&log);
        controller
            .on(kind, move |ctx: &EventContext<'_>| {
                let entry = match ctx.payload {
                    EventPayload::Next { url } => format!("next {url}"),
                    _ => ctx.kind().to_string(),
                };
                log.lock().expect("event log lock").push(entry);
                Signal::Proceed
            })
            .expect("built-in events are known");
    }
    log
}

fn entries(log: &EventLog) -> Vec<String> {
    log.lock().expect("event log lock").clone()
}

fn count(log: &EventLog, prefix: &str) -> usize {
    entries(log)
        .iter()
        .filter(|entry| entry.starts_with(prefix))
        .count()
}

fn item_ids(controller: &Controller) -> Vec<String> {
    let dom = controller.dom();
    dom.find_matching(&Locator::new(".item"), dom.document())
        .into_iter()
        .filter_map(|node| dom.attribute(node, "id"))
        .collect()
}

/// Scrolls so the viewport bottom sits at `bottom`.
fn scroll_bottom_to(controller: &mut Controller, bottom: f64) {
    controller.dom_mut().scroll_to(bottom - VIEWPORT);
}
