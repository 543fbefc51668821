mod registry;
mod token;

pub use registry::{EventBus, EventContext, ListenerId};
pub use token::{CancellationToken, Deferred, DeferredSignal, Signal, Verdict, deferred};
