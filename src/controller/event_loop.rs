use tokio::time::{self, Instant};
use tracing::{debug, warn};

use crate::event::{ControlCommand, EventPayload, LoopEvent};
use crate::throttle::ThrottleDecision;

use super::core::Controller;
use super::state::LifecycleState;

impl Controller {
    /// Processes loop events until the controller is destroyed.
    pub async fn run(&mut self) {
        while self.state != LifecycleState::Destroyed {
            let Some(event) = self.loop_rx.recv().await else {
                break;
            };
            self.handle_loop_event(event);
        }
    }

    /// Processes loop events until no cycle is in flight and no trailing
    /// scroll execution is pending.
    pub async fn run_until_idle(&mut self) {
        loop {
            self.pump();
            if self.is_settled() {
                return;
            }
            let Some(event) = self.loop_rx.recv().await else {
                return;
            };
            self.handle_loop_event(event);
        }
    }

    /// Waits for one loop event and handles it. Returns `false` once the
    /// controller is destroyed.
    pub async fn step(&mut self) -> bool {
        if self.state == LifecycleState::Destroyed {
            return false;
        }
        if let Some(event) = self.loop_rx.recv().await {
            self.handle_loop_event(event);
        }
        self.state != LifecycleState::Destroyed
    }

    /// Handles only the events already queued.
    pub fn pump(&mut self) -> usize {
        let mut handled = 0;
        while let Ok(event) = self.loop_rx.try_recv() {
            self.handle_loop_event(event);
            handled += 1;
        }
        handled
    }

    pub fn is_settled(&self) -> bool {
        self.state == LifecycleState::Destroyed
            || (!self.state.is_cycle_in_flight() && !self.throttle.has_pending())
    }

    /// Delivers one raw scroll signal through the throttle.
    pub fn scroll(&mut self) {
        if !self.bound || self.state == LifecycleState::Destroyed {
            return;
        }

        match self.throttle.poll(Instant::now()) {
            ThrottleDecision::Execute => self.handle_scroll(),
            ThrottleDecision::Schedule(delay) => {
                self.throttle_epoch = self.throttle_epoch.wrapping_add(1);
                let epoch = self.throttle_epoch;
                let tx = self.loop_tx.clone();
                let timer = self.spawn(async move {
                    time::sleep(delay).await;
                    let _ = tx.send(LoopEvent::ThrottleElapsed { epoch });
                });
                match timer {
                    Ok(timer) => self.throttle.arm(timer),
                    Err(err) => warn!("trailing scroll dropped: {err}"),
                }
            }
            ThrottleDecision::Coalesced => {}
        }
    }

    pub(super) fn handle_loop_event(&mut self, event: LoopEvent) {
        match event {
            LoopEvent::Scroll => self.scroll(),
            LoopEvent::ThrottleElapsed { epoch } => {
                if epoch != self.throttle_epoch || !self.bound || !self.throttle.has_pending() {
                    return;
                }
                self.throttle.fire_trailing(Instant::now());
                self.handle_scroll();
            }
            LoopEvent::Command(command) => match command {
                ControlCommand::Next => {
                    self.next();
                }
                ControlCommand::Bind => self.bind(),
                ControlCommand::Unbind => self.unbind(),
                ControlCommand::Destroy => self.destroy(),
            },
            LoopEvent::TriggerSettled {
                cycle,
                url,
                verdict,
            } => {
                if cycle != self.cycle || self.state != LifecycleState::Triggering {
                    debug!("dropping stale verdict for {url}");
                    return;
                }
                self.apply_trigger_verdict(verdict, url);
            }
            LoopEvent::Fetched(completion) => self.on_fetched(completion),
            LoopEvent::DelayElapsed { cycle } => self.on_delay_elapsed(cycle),
        }
    }

    fn handle_scroll(&mut self) {
        // Undetermined threshold: the document has no items yet.
        let Some(reading) = self.monitor.reading(self.dom.as_ref()) else {
            return;
        };
        self.fire(EventPayload::Scroll {
            offset: reading.offset,
            threshold: reading.threshold,
        });
        if reading.should_advance() {
            self.next();
        }
    }
}
