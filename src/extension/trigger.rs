use std::sync::{Arc, Mutex, PoisonError};

use tracing::info;

use crate::bus::{Deferred, EventContext, Signal, deferred};
use crate::controller::Controller;
use crate::error::LoaderResult;
use crate::event::EventKind;

use super::traits::Extension;

#[derive(Debug, Default)]
struct ButtonState {
    rendered: usize,
    waiting: Option<(String, Deferred)>,
}

/// Manual "load more" control. Holds the pending `next` of a controller once
/// its automatic pages are used up.
#[derive(Debug, Clone, Default)]
pub struct TriggerButton {
    state: Arc<Mutex<ButtonState>>,
}

impl TriggerButton {
    pub fn is_waiting(&self) -> bool {
        self.lock().live().is_some()
    }

    pub fn pending_url(&self) -> Option<String> {
        self.lock().live().map(|(url, _)| url.clone())
    }

    /// Lets the held page load. Returns `false` if nothing was held.
    pub fn click(&self) -> bool {
        match self.lock().take_live() {
            Some((_, deferred)) => {
                deferred.resolve();
                true
            }
            None => false,
        }
    }

    /// Cancels the held page; the controller re-binds without loading.
    pub fn dismiss(&self) -> bool {
        match self.lock().take_live() {
            Some((_, deferred)) => {
                deferred.reject();
                true
            }
            None => false,
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, ButtonState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl ButtonState {
    /// The held page, forgetting it once its firing was settled elsewhere.
    fn live(&mut self) -> Option<&(String, Deferred)> {
        if self
            .waiting
            .as_ref()
            .is_some_and(|(_, deferred)| deferred.is_abandoned())
        {
            self.waiting = None;
        }
        self.waiting.as_ref()
    }

    fn take_live(&mut self) -> Option<(String, Deferred)> {
        self.live()?;
        self.waiting.take()
    }
}

/// Loads `auto_pages` pages on scroll, then waits for a click before each
/// further page.
#[derive(Debug)]
pub struct TriggerExtension {
    auto_pages: usize,
    button: TriggerButton,
}

impl TriggerExtension {
    pub fn new(auto_pages: usize) -> Self {
        Self {
            auto_pages,
            button: TriggerButton::default(),
        }
    }

    pub fn button(&self) -> TriggerButton {
        self.button.clone()
    }
}

impl Extension for TriggerExtension {
    fn name(&self) -> &str {
        "trigger"
    }

    fn bind(&mut self, controller: &mut Controller) -> LoaderResult<()> {
        let auto_pages = self.auto_pages;
        let button = self.button.clone();
        controller.on(EventKind::Next, move |ctx: &EventContext<'_>| {
            let mut state = button.lock();
            if state.rendered < auto_pages {
                return Signal::Proceed;
            }
            let url = ctx.next_page.unwrap_or_default().to_owned();
            info!("holding {url} until the trigger is clicked");
            let (pending, signal) = deferred();
            state.waiting = Some((url, pending));
            signal
        })?;

        let button = self.button.clone();
        controller.on(EventKind::Render, move |_: &EventContext<'_>| {
            button.lock().rendered += 1;
            Signal::Proceed
        })?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::TriggerButton;

    #[test]
    fn idle_button_ignores_clicks() {
        let button = TriggerButton::default();
        assert!(!button.is_waiting());
        assert!(!button.click());
        assert!(!button.dismiss());
        assert_eq!(button.pending_url(), None);
    }
}
