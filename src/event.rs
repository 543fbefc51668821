use std::fmt;
use std::str::FromStr;

use tokio::time::Instant;

use crate::bus::Verdict;
use crate::dom::NodeId;
use crate::error::{LoaderError, LoaderResult};

/// Lifecycle phases listeners can subscribe to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum EventKind {
    Next,
    Load,
    DidLoad,
    Render,
    Scroll,
    NoneLeft,
}

impl EventKind {
    pub const ALL: [EventKind; 6] = [
        Self::Next,
        Self::Load,
        Self::DidLoad,
        Self::Render,
        Self::Scroll,
        Self::NoneLeft,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Self::Next => "next",
            Self::Load => "load",
            Self::DidLoad => "didLoad",
            Self::Render => "render",
            Self::Scroll => "scroll",
            Self::NoneLeft => "noneLeft",
        }
    }

    pub(crate) fn index(self) -> usize {
        match self {
            Self::Next => 0,
            Self::Load => 1,
            Self::DidLoad => 2,
            Self::Render => 3,
            Self::Scroll => 4,
            Self::NoneLeft => 5,
        }
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.name())
    }
}

impl FromStr for EventKind {
    type Err = LoaderError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|kind| kind.name() == raw)
            .ok_or_else(|| LoaderError::unknown_event(raw))
    }
}

/// Anything that names an event: a typed [`EventKind`] or its string form.
pub trait EventName {
    fn resolve(self) -> LoaderResult<EventKind>;
}

impl EventName for EventKind {
    fn resolve(self) -> LoaderResult<EventKind> {
        Ok(self)
    }
}

impl EventName for &str {
    fn resolve(self) -> LoaderResult<EventKind> {
        self.parse()
    }
}

impl EventName for &String {
    fn resolve(self) -> LoaderResult<EventKind> {
        self.parse()
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum EventPayload<'a> {
    Next { url: &'a str },
    Load { body: &'a str, items: &'a [NodeId] },
    DidLoad { body: &'a str, items: &'a [NodeId] },
    Render { items: &'a [NodeId] },
    Scroll { offset: f64, threshold: f64 },
    NoneLeft { last_item: Option<NodeId> },
}

impl EventPayload<'_> {
    pub fn kind(&self) -> EventKind {
        match self {
            Self::Next { .. } => EventKind::Next,
            Self::Load { .. } => EventKind::Load,
            Self::DidLoad { .. } => EventKind::DidLoad,
            Self::Render { .. } => EventKind::Render,
            Self::Scroll { .. } => EventKind::Scroll,
            Self::NoneLeft { .. } => EventKind::NoneLeft,
        }
    }

    pub fn items(&self) -> &[NodeId] {
        match self {
            Self::Load { items, .. } | Self::DidLoad { items, .. } | Self::Render { items } => {
                items
            }
            _ => &[],
        }
    }
}

/// Requests a listener or platform adapter can queue on a controller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlCommand {
    Next,
    Bind,
    Unbind,
    Destroy,
}

#[derive(Debug)]
pub(crate) struct FetchCompletion {
    pub(crate) cycle: u64,
    pub(crate) url: String,
    pub(crate) started: Instant,
    pub(crate) result: LoaderResult<String>,
}

#[derive(Debug)]
pub(crate) enum LoopEvent {
    Scroll,
    ThrottleElapsed { epoch: u64 },
    Command(ControlCommand),
    TriggerSettled {
        cycle: u64,
        url: String,
        verdict: Verdict,
    },
    Fetched(FetchCompletion),
    DelayElapsed { cycle: u64 },
}
