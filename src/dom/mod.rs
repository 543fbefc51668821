mod memory;
mod selector;
mod traits;

pub use memory::{MarkupNode, MemoryDom};
pub use selector::Selector;
pub use traits::{Dom, Locator, NodeId};
