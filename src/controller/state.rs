use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LifecycleState {
    /// Waiting for the scroll signal.
    Idle,
    /// `next` fired, waiting for listeners to accept or reject.
    Triggering,
    Loading,
    Rendering,
    /// No further page exists.
    Exhausted,
    Destroyed,
}

impl LifecycleState {
    pub fn is_cycle_in_flight(self) -> bool {
        matches!(self, Self::Triggering | Self::Loading | Self::Rendering)
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Triggering => "triggering",
            Self::Loading => "loading",
            Self::Rendering => "rendering",
            Self::Exhausted => "exhausted",
            Self::Destroyed => "destroyed",
        }
    }
}

impl fmt::Display for LifecycleState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}
