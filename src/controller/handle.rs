use tokio::sync::mpsc::UnboundedSender;

use crate::event::{ControlCommand, LoopEvent};

/// Cloneable sender into a controller's event loop. Platform adapters feed
/// raw scroll signals through it; listeners use it to queue commands instead
/// of re-entering the controller.
#[derive(Debug, Clone)]
pub struct ControllerHandle {
    tx: UnboundedSender<LoopEvent>,
}

impl ControllerHandle {
    pub(crate) fn new(tx: UnboundedSender<LoopEvent>) -> Self {
        Self { tx }
    }

    /// Returns `false` once the controller is gone.
    pub fn scroll(&self) -> bool {
        self.tx.send(LoopEvent::Scroll).is_ok()
    }

    pub fn command(&self, command: ControlCommand) -> bool {
        self.tx.send(LoopEvent::Command(command)).is_ok()
    }

    pub fn next(&self) -> bool {
        self.command(ControlCommand::Next)
    }

    pub fn bind(&self) -> bool {
        self.command(ControlCommand::Bind)
    }

    pub fn unbind(&self) -> bool {
        self.command(ControlCommand::Unbind)
    }

    pub fn destroy(&self) -> bool {
        self.command(ControlCommand::Destroy)
    }

    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}
