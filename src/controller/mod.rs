mod core;
mod event_loop;
mod handle;
mod lifecycle;
mod state;

#[cfg(test)]
mod tests;

pub use core::Controller;
pub use handle::ControllerHandle;
pub use state::LifecycleState;
