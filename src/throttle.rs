use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::Instant;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ThrottleDecision {
    /// Run the wrapped callback now.
    Execute,
    /// Arm a trailing timer for this long.
    Schedule(Duration),
    /// A trailing execution is already armed.
    Coalesced,
}

/// Rate limiter for a high-frequency signal with a trailing-edge guarantee.
///
/// State is only the last execution time and the pending trailing timer.
#[derive(Debug)]
pub struct Throttle {
    interval: Duration,
    last_execution: Option<Instant>,
    pending: Option<JoinHandle<()>>,
}

impl Throttle {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            last_execution: None,
            pending: None,
        }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    pub fn poll(&mut self, now: Instant) -> ThrottleDecision {
        if self.has_pending() {
            return ThrottleDecision::Coalesced;
        }

        let elapsed = self
            .last_execution
            .map(|last| now.saturating_duration_since(last));
        match elapsed {
            Some(elapsed) if elapsed < self.interval => {
                ThrottleDecision::Schedule(self.interval - elapsed)
            }
            _ => {
                self.last_execution = Some(now);
                ThrottleDecision::Execute
            }
        }
    }

    pub fn arm(&mut self, timer: JoinHandle<()>) {
        if let Some(previous) = self.pending.replace(timer) {
            previous.abort();
        }
    }

    /// Records the trailing execution; call when the armed timer fires.
    pub fn fire_trailing(&mut self, now: Instant) {
        self.pending = None;
        self.last_execution = Some(now);
    }

    pub fn cancel(&mut self) -> bool {
        match self.pending.take() {
            Some(timer) => {
                timer.abort();
                true
            }
            None => false,
        }
    }

    pub fn has_pending(&self) -> bool {
        self.pending.is_some()
    }
}

impl Drop for Throttle {
    fn drop(&mut self) {
        self.cancel();
    }
}
