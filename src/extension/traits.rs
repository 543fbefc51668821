use crate::controller::Controller;
use crate::error::{LoaderError, LoaderResult};

/// Add-on that hooks into a controller through its listener registry.
pub trait Extension: Send {
    fn name(&self) -> &str;

    /// Registers the extension's listeners. Implementations that keep the
    /// default are refused by [`Controller::extension`].
    fn bind(&mut self, controller: &mut Controller) -> LoaderResult<()> {
        let _ = controller;
        Err(LoaderError::invalid_extension(
            self.name(),
            "missing required method \"bind\"",
        ))
    }
}
