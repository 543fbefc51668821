use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::bus::Verdict;
use crate::error::LoaderError;
use crate::event::{EventPayload, FetchCompletion, LoopEvent};
use crate::load::LoadedPage;

use super::core::Controller;
use super::state::LifecycleState;

impl Controller {
    /// Hides the pagination block, binds the scroll signal and reads the
    /// first next-page reference from the document.
    pub fn initialize(&mut self) {
        if self.state == LifecycleState::Destroyed {
            return;
        }
        self.set_pagination_visible(false);
        self.bind();
        self.next_page = self.pipeline.document_next_link(self.dom.as_ref());
        self.state = LifecycleState::Idle;
        info!(
            "initialized, next page: {}",
            self.next_page.as_deref().unwrap_or("none")
        );
    }

    pub fn bind(&mut self) {
        if self.bound || self.state == LifecycleState::Destroyed {
            return;
        }
        self.bound = true;
        debug!("scroll signal bound");
    }

    pub fn unbind(&mut self) {
        if !self.bound {
            return;
        }
        self.bound = false;
        self.throttle.cancel();
        debug!("scroll signal unbound");
    }

    pub fn destroy(&mut self) {
        if self.state == LifecycleState::Destroyed {
            return;
        }
        self.unbind();
        self.set_pagination_visible(true);
        self.bus.mute();
        if let Some(task) = self.in_flight.take() {
            task.abort();
        }
        self.drop_held();
        self.state = LifecycleState::Destroyed;
        info!("destroyed after {} page(s)", self.stats.pages_loaded);
    }

    /// Starts a load/render cycle for the current next-page reference.
    ///
    /// Returns whether a further page existed to attempt. With no reference
    /// left this fires `noneLeft` on every call.
    pub fn next(&mut self) -> bool {
        if self.state == LifecycleState::Destroyed {
            return false;
        }
        if self.state.is_cycle_in_flight() {
            debug!("next ignored while {}", self.state);
            return self.next_page.is_some();
        }

        let Some(url) = self.next_page.clone() else {
            self.unbind();
            self.state = LifecycleState::Exhausted;
            let last_item = self.monitor.last_item(self.dom.as_ref());
            self.fire(EventPayload::NoneLeft { last_item });
            info!("no pages left");
            return false;
        };

        self.unbind();
        self.cycle = self.cycle.wrapping_add(1);
        self.cycle_started = Some(Instant::now());
        self.state = LifecycleState::Triggering;

        let token = self.fire(EventPayload::Next { url: &url });
        match token.settled() {
            Some(verdict) => self.apply_trigger_verdict(verdict, url),
            None => {
                let cycle = self.cycle;
                let tx = self.loop_tx.clone();
                debug!("next for {url} deferred by a listener");
                let watcher = self.spawn(async move {
                    let verdict = token.verdict().await;
                    let _ = tx.send(LoopEvent::TriggerSettled {
                        cycle,
                        url,
                        verdict,
                    });
                });
                match watcher {
                    Ok(task) => self.in_flight = Some(task),
                    Err(err) => self.abandon_cycle(err),
                }
            }
        }
        true
    }

    pub(super) fn apply_trigger_verdict(&mut self, verdict: Verdict, url: String) {
        self.in_flight = None;
        match verdict {
            Verdict::Accepted => {
                self.state = LifecycleState::Loading;
                info!("loading {url}");
                let fetch = self
                    .pipeline
                    .fetch_task(self.cycle, url, self.loop_tx.clone());
                match self.spawn(fetch) {
                    Ok(task) => self.in_flight = Some(task),
                    Err(err) => self.abandon_cycle(err),
                }
            }
            Verdict::Rejected => {
                debug!("next for {url} rejected by a listener");
                self.stats.record_veto();
                self.finish_cycle();
            }
        }
    }

    pub(super) fn on_fetched(&mut self, completion: FetchCompletion) {
        if completion.cycle != self.cycle || self.state != LifecycleState::Loading {
            debug!("dropping stale response for {}", completion.url);
            return;
        }
        self.in_flight = None;
        self.stats.record_fetch(completion.started.elapsed());

        let extracted = match completion.result {
            Ok(body) => self
                .pipeline
                .extract(self.dom.as_mut(), &completion.url, body),
            Err(err) => Err(err),
        };
        let page = match extracted {
            Ok(page) => page,
            Err(err) => {
                self.fail_cycle(err);
                return;
            }
        };

        self.fire(EventPayload::Load {
            body: &page.body,
            items: &page.items,
        });

        let Some(hold) = self.pipeline.hold(completion.started, None) else {
            self.deliver(page);
            return;
        };
        let cycle = self.cycle;
        let tx = self.loop_tx.clone();
        let timer = self.spawn(async move {
            hold.await;
            let _ = tx.send(LoopEvent::DelayElapsed { cycle });
        });
        match timer {
            Ok(task) => {
                self.held = Some(page);
                self.in_flight = Some(task);
            }
            Err(err) => {
                warn!("rendering {} without its minimum delay: {err}", page.url);
                self.deliver(page);
            }
        }
    }

    pub(super) fn on_delay_elapsed(&mut self, cycle: u64) {
        if cycle != self.cycle || self.state != LifecycleState::Loading {
            return;
        }
        if let Some(page) = self.held.take() {
            self.deliver(page);
        }
    }

    fn deliver(&mut self, page: LoadedPage) {
        self.in_flight = None;
        self.fire(EventPayload::DidLoad {
            body: &page.body,
            items: &page.items,
        });

        self.state = LifecycleState::Rendering;
        let anchor = self.monitor.last_item(self.dom.as_ref());
        let container = self.monitor.items_container(self.dom.as_ref());
        self.fire(EventPayload::Render { items: &page.items });
        self.stage
            .render(self.dom.as_mut(), anchor, container, &page.items);

        self.next_page = self.pipeline.next_link(self.dom.as_ref(), &page);
        self.dom.release(page.fragment);
        let cycle_elapsed = self
            .cycle_started
            .map(|started| started.elapsed())
            .unwrap_or_default();
        self.stats.record_render(page.items.len(), cycle_elapsed);
        info!(
            "rendered {} item(s) from {}, next page: {}",
            page.items.len(),
            page.url,
            self.next_page.as_deref().unwrap_or("none")
        );
        self.finish_cycle();
    }

    fn fail_cycle(&mut self, err: LoaderError) {
        self.stats.record_fetch_failure();
        self.abandon_cycle(err);
    }

    fn abandon_cycle(&mut self, err: LoaderError) {
        warn!("load cycle aborted: {err}");
        self.last_error = Some(err);
        self.drop_held();
        self.finish_cycle();
    }

    fn drop_held(&mut self) {
        if let Some(page) = self.held.take() {
            self.dom.release(page.fragment);
        }
    }

    fn finish_cycle(&mut self) {
        self.cycle_started = None;
        self.state = LifecycleState::Idle;
        self.bind();
    }

    fn set_pagination_visible(&mut self, visible: bool) {
        let Some(locator) = &self.pagination else {
            return;
        };
        let document = self.dom.document();
        for node in self.dom.find_matching(locator, document) {
            self.dom.set_visible(node, visible);
        }
    }
}
