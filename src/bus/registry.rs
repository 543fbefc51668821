use std::fmt;

use crate::controller::{ControllerHandle, LifecycleState};
use crate::error::{LoaderError, LoaderResult};
use crate::event::{EventKind, EventName, EventPayload};

use super::token::{CancellationToken, Signal};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ListenerId(u64);

/// What a listener sees when its event fires: the payload and a view of the
/// owning controller.
pub struct EventContext<'a> {
    pub payload: EventPayload<'a>,
    pub controller: &'a ControllerHandle,
    pub next_page: Option<&'a str>,
    pub state: LifecycleState,
}

impl EventContext<'_> {
    pub fn kind(&self) -> EventKind {
        self.payload.kind()
    }
}

type BoxedListener = Box<dyn FnMut(&EventContext<'_>) -> Signal + Send>;

#[derive(Default)]
pub struct EventBus {
    slots: [Vec<(ListenerId, BoxedListener)>; EventKind::ALL.len()],
    next_id: u64,
    muted: bool,
}

impl fmt::Debug for EventBus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let counts = EventKind::ALL.map(|kind| (kind.name(), self.listener_count(kind)));
        f.debug_struct("EventBus")
            .field("listeners", &counts)
            .field("muted", &self.muted)
            .finish()
    }
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on<E, F>(&mut self, event: E, listener: F) -> LoaderResult<ListenerId>
    where
        E: EventName,
        F: FnMut(&EventContext<'_>) -> Signal + Send + 'static,
    {
        let kind = event.resolve()?;
        let id = ListenerId(self.next_id);
        self.next_id = self.next_id.saturating_add(1);
        self.slots[kind.index()].push((id, Box::new(listener)));
        Ok(id)
    }

    pub fn off<E: EventName>(&mut self, event: E, id: ListenerId) -> LoaderResult<bool> {
        let kind = event.resolve()?;
        let slot = &mut self.slots[kind.index()];
        let before = slot.len();
        slot.retain(|(registered, _)| *registered != id);
        Ok(slot.len() != before)
    }

    /// Fires by name; the name must agree with the payload.
    pub fn fire<E: EventName>(
        &mut self,
        event: E,
        ctx: &EventContext<'_>,
    ) -> LoaderResult<CancellationToken> {
        let kind = event.resolve()?;
        if kind != ctx.kind() {
            return Err(LoaderError::invalid_argument(format!(
                "payload for \"{}\" fired as \"{kind}\"",
                ctx.kind()
            )));
        }
        Ok(self.emit(ctx))
    }

    /// Invokes the payload's listeners in registration order.
    pub fn emit(&mut self, ctx: &EventContext<'_>) -> CancellationToken {
        if self.muted {
            return CancellationToken::resolved();
        }
        let slot = &mut self.slots[ctx.kind().index()];
        let signals = slot
            .iter_mut()
            .map(|(_, listener)| listener(ctx))
            .collect::<Vec<_>>();
        CancellationToken::combine(signals)
    }

    /// Id the next registered listener will receive.
    pub fn watermark(&self) -> ListenerId {
        ListenerId(self.next_id)
    }

    /// Removes every listener registered at or after `mark`. Returns how many
    /// were removed.
    pub fn remove_since(&mut self, mark: ListenerId) -> usize {
        let mut removed = 0;
        for slot in &mut self.slots {
            let before = slot.len();
            slot.retain(|(id, _)| *id < mark);
            removed += before - slot.len();
        }
        removed
    }

    pub fn listener_count(&self, kind: EventKind) -> usize {
        self.slots[kind.index()].len()
    }

    pub fn mute(&mut self) {
        self.muted = true;
    }

    pub fn is_muted(&self) -> bool {
        self.muted
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use tokio::sync::mpsc::unbounded_channel;

    use super::{EventBus, EventContext};
    use crate::bus::{Signal, Verdict};
    use crate::controller::{ControllerHandle, LifecycleState};
    use crate::error::LoaderError;
    use crate::event::{EventKind, EventPayload};

    fn handle() -> ControllerHandle {
        let (tx, _rx) = unbounded_channel();
        ControllerHandle::new(tx)
    }

    fn next_ctx<'a>(handle: &'a ControllerHandle) -> EventContext<'a> {
        EventContext {
            payload: EventPayload::Next { url: "/page2" },
            controller: handle,
            next_page: Some("/page2"),
            state: LifecycleState::Triggering,
        }
    }

    #[test]
    fn listeners_run_in_registration_order() {
        let handle = handle();
        let calls = Arc::new(Mutex::new(Vec::new()));
        let mut bus = EventBus::new();
        for label in ["first", "second", "third"] {
            let calls = Arc::clone(&calls);
            bus.on(EventKind::Next, move |_: &EventContext<'_>| {
                calls.lock().expect("calls lock").push(label);
                Signal::Proceed
            })
            .expect("next is a known event");
        }

        let token = bus.emit(&next_ctx(&handle));
        assert_eq!(token.settled(), Some(Verdict::Accepted));
        assert_eq!(
            *calls.lock().expect("calls lock"),
            vec!["first", "second", "third"]
        );
    }

    #[test]
    fn any_rejecting_listener_rejects_the_firing() {
        let handle = handle();
        let mut bus = EventBus::new();
        bus.on("next", |_: &EventContext<'_>| Signal::Proceed)
            .expect("next is a known event");
        bus.on("next", |_: &EventContext<'_>| Signal::Abort)
            .expect("next is a known event");
        assert!(bus.emit(&next_ctx(&handle)).is_rejected());
    }

    #[test]
    fn off_removes_only_the_given_listener() {
        let handle = handle();
        let mut bus = EventBus::new();
        let veto = bus
            .on(EventKind::Next, |_: &EventContext<'_>| Signal::Abort)
            .expect("next is a known event");
        bus.on(EventKind::Next, |_: &EventContext<'_>| Signal::Proceed)
            .expect("next is a known event");

        assert!(bus.off("next", veto).expect("next is a known event"));
        assert!(!bus.off("next", veto).expect("second removal is a no-op"));
        assert_eq!(bus.listener_count(EventKind::Next), 1);
        assert!(!bus.emit(&next_ctx(&handle)).is_rejected());
    }

    #[test]
    fn unknown_names_fail_on_off_and_fire() {
        let handle = handle();
        let mut bus = EventBus::new();
        let id = bus
            .on(EventKind::Render, |_: &EventContext<'_>| Signal::Proceed)
            .expect("render is a known event");

        assert!(matches!(
            bus.on("loaded", |_: &EventContext<'_>| Signal::Proceed),
            Err(LoaderError::UnknownEvent { .. })
        ));
        assert!(matches!(
            bus.off("rendered", id),
            Err(LoaderError::UnknownEvent { .. })
        ));
        assert!(matches!(
            bus.fire("nope", &next_ctx(&handle)),
            Err(LoaderError::UnknownEvent { .. })
        ));
        assert!(bus.fire("render", &next_ctx(&handle)).is_err());
        assert!(bus.fire("next", &next_ctx(&handle)).is_ok());
    }

    #[test]
    fn remove_since_keeps_earlier_listeners() {
        let handle = handle();
        let mut bus = EventBus::new();
        bus.on(EventKind::Next, |_: &EventContext<'_>| Signal::Proceed)
            .expect("next is a known event");
        let mark = bus.watermark();
        bus.on(EventKind::Next, |_: &EventContext<'_>| Signal::Abort)
            .expect("next is a known event");
        bus.on(EventKind::Render, |_: &EventContext<'_>| Signal::Proceed)
            .expect("render is a known event");

        assert_eq!(bus.remove_since(mark), 2);
        assert_eq!(bus.listener_count(EventKind::Next), 1);
        assert_eq!(bus.listener_count(EventKind::Render), 0);
        assert!(!bus.emit(&next_ctx(&handle)).is_rejected());
    }

    #[test]
    fn muted_bus_skips_listeners() {
        let handle = handle();
        let mut bus = EventBus::new();
        bus.on(EventKind::Next, |_: &EventContext<'_>| Signal::Abort)
            .expect("next is a known event");
        bus.mute();
        assert!(bus.is_muted());
        assert_eq!(
            bus.emit(&next_ctx(&handle)).settled(),
            Some(Verdict::Accepted)
        );
        assert_eq!(bus.listener_count(EventKind::Next), 1);
    }
}
