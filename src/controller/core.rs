use std::future::Future;
use std::sync::Arc;

use tokio::runtime::Handle;
use tokio::sync::mpsc::{UnboundedReceiver, UnboundedSender, unbounded_channel};
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::debug;

use crate::bus::{CancellationToken, EventBus, EventContext, ListenerId, Signal};
use crate::config::Config;
use crate::dom::{Dom, Locator};
use crate::error::{LoaderError, LoaderResult};
use crate::event::{EventName, EventPayload, LoopEvent};
use crate::extension::Extension;
use crate::fetch::Fetcher;
use crate::load::{LoadPipeline, LoadedPage, RenderStage};
use crate::monitor::ScrollMonitor;
use crate::stats::LoaderStats;
use crate::throttle::Throttle;

use super::handle::ControllerHandle;
use super::state::LifecycleState;

/// Lifecycle controller for one scrollable viewport.
///
/// Owns its document, listeners, throttle and page reference. Asynchronous
/// work (fetches, timers, deferred verdicts) reports back through the
/// controller's loop channel, drained by [`Controller::run`],
/// [`Controller::run_until_idle`] or [`Controller::pump`].
///
/// That work is spawned on the current tokio runtime. Outside one,
/// [`Controller::next`] ends the cycle with [`LoaderError::Runtime`] as the
/// last error and a throttled scroll drops its trailing execution.
pub struct Controller {
    pub(super) dom: Box<dyn Dom>,
    pub(super) monitor: ScrollMonitor,
    pub(super) pipeline: LoadPipeline,
    pub(super) stage: RenderStage,
    pub(super) pagination: Option<Locator>,
    pub(super) bus: EventBus,
    pub(super) extensions: Vec<Box<dyn Extension>>,
    pub(super) throttle: Throttle,
    pub(super) throttle_epoch: u64,
    pub(super) state: LifecycleState,
    pub(super) bound: bool,
    pub(super) next_page: Option<String>,
    pub(super) cycle: u64,
    pub(super) cycle_started: Option<Instant>,
    pub(super) held: Option<LoadedPage>,
    pub(super) in_flight: Option<JoinHandle<()>>,
    pub(super) stats: LoaderStats,
    pub(super) last_error: Option<LoaderError>,
    pub(super) handle: ControllerHandle,
    pub(super) loop_tx: UnboundedSender<LoopEvent>,
    pub(super) loop_rx: UnboundedReceiver<LoopEvent>,
}

impl Controller {
    pub fn new(config: &Config, dom: Box<dyn Dom>, fetcher: Arc<dyn Fetcher>) -> Self {
        let selectors = &config.selectors;
        let item = Locator::new(selectors.item.as_str());
        let container = Locator::new(selectors.container.as_str());
        let (loop_tx, loop_rx) = unbounded_channel();

        Self {
            dom,
            monitor: ScrollMonitor::new(item.clone(), container.clone()),
            pipeline: LoadPipeline::new(
                fetcher,
                item,
                container,
                Locator::new(selectors.next.as_str()),
                config.timing.min_render_delay(),
            ),
            stage: RenderStage,
            pagination: selectors.pagination.as_deref().map(Locator::new),
            bus: EventBus::new(),
            extensions: Vec::new(),
            throttle: Throttle::new(config.timing.scroll_throttle()),
            throttle_epoch: 0,
            state: LifecycleState::Idle,
            bound: false,
            next_page: None,
            cycle: 0,
            cycle_started: None,
            held: None,
            in_flight: None,
            stats: LoaderStats::default(),
            last_error: None,
            handle: ControllerHandle::new(loop_tx.clone()),
            loop_tx,
            loop_rx,
        }
    }

    pub fn on<E, F>(&mut self, event: E, listener: F) -> LoaderResult<ListenerId>
    where
        E: EventName,
        F: FnMut(&EventContext<'_>) -> Signal + Send + 'static,
    {
        self.bus.on(event, listener)
    }

    pub fn off<E: EventName>(&mut self, event: E, id: ListenerId) -> LoaderResult<bool> {
        self.bus.off(event, id)
    }

    /// Binds the extension to this controller and keeps it for the
    /// controller's lifetime. A refused extension leaves no listeners
    /// behind.
    pub fn extension<X>(&mut self, extension: X) -> LoaderResult<()>
    where
        X: Extension + 'static,
    {
        if self.state == LifecycleState::Destroyed {
            return Err(LoaderError::invalid_argument(
                "cannot register an extension on a destroyed controller",
            ));
        }

        let mut extension = Box::new(extension);
        let mark = self.bus.watermark();
        if let Err(err) = extension.bind(self) {
            let removed = self.bus.remove_since(mark);
            debug!(
                "extension \"{}\" refused, dropped {removed} listener(s)",
                extension.name()
            );
            return Err(match err {
                LoaderError::InvalidExtension { .. } => err,
                other => LoaderError::invalid_extension(extension.name(), other.to_string()),
            });
        }
        debug!("extension \"{}\" bound", extension.name());
        self.extensions.push(extension);
        Ok(())
    }

    pub fn extensions(&self) -> impl Iterator<Item = &str> {
        self.extensions.iter().map(|extension| extension.name())
    }

    pub fn handle(&self) -> ControllerHandle {
        self.handle.clone()
    }

    pub fn state(&self) -> LifecycleState {
        self.state
    }

    pub fn is_bound(&self) -> bool {
        self.bound
    }

    pub fn next_page(&self) -> Option<&str> {
        self.next_page.as_deref()
    }

    pub fn stats(&self) -> &LoaderStats {
        &self.stats
    }

    pub fn last_error(&self) -> Option<&LoaderError> {
        self.last_error.as_ref()
    }

    pub fn dom(&self) -> &dyn Dom {
        self.dom.as_ref()
    }

    pub fn dom_mut(&mut self) -> &mut dyn Dom {
        self.dom.as_mut()
    }

    pub fn monitor(&self) -> &ScrollMonitor {
        &self.monitor
    }

    pub(super) fn fire(&mut self, payload: EventPayload<'_>) -> CancellationToken {
        let ctx = EventContext {
            payload,
            controller: &self.handle,
            next_page: self.next_page.as_deref(),
            state: self.state,
        };
        self.bus.emit(&ctx)
    }

    pub(super) fn spawn<F>(&self, task: F) -> LoaderResult<JoinHandle<()>>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        Ok(Handle::try_current()?.spawn(task))
    }
}
