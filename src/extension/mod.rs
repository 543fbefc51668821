mod paging;
mod traits;
mod trigger;

pub use paging::{PageLog, PageTracker, PagingExtension};
pub use traits::Extension;
pub use trigger::{TriggerButton, TriggerExtension};
