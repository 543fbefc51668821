use std::fmt;

use crate::error::LoaderResult;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub usize);

/// Opaque element locator. Interpretation belongs to the [`Dom`]
/// implementation.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Locator(String);

impl Locator {
    pub fn new(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Locator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Locator {
    fn from(raw: &str) -> Self {
        Self::new(raw)
    }
}

/// Document and viewport queries the loader consumes. Measurements are in
/// document pixels from the top of the scrollable region.
pub trait Dom: Send {
    fn document(&self) -> NodeId;
    fn scroll_position(&self) -> f64;
    fn viewport_height(&self) -> f64;
    fn scroll_to(&mut self, position: f64);

    fn offset_top(&self, node: NodeId) -> f64;
    fn height(&self, node: NodeId) -> f64;

    /// Descendants of `root` (excluding `root`) matching `locator`, in
    /// document order.
    fn find_matching(&self, locator: &Locator, root: NodeId) -> Vec<NodeId>;

    fn last_matching(&self, locator: &Locator, root: NodeId) -> Option<NodeId> {
        self.find_matching(locator, root).pop()
    }

    fn matches(&self, node: NodeId, locator: &Locator) -> bool;
    fn children(&self, node: NodeId) -> Vec<NodeId>;
    fn attribute(&self, node: NodeId, name: &str) -> Option<String>;

    /// Parses markup into a detached fragment and returns its synthetic root.
    /// The top-level nodes of the markup are the root's children.
    fn parse_fragment(&mut self, markup: &str) -> LoaderResult<NodeId>;

    /// Moves `nodes` (in order) directly after `anchor`.
    fn insert_after(&mut self, anchor: NodeId, nodes: &[NodeId]);
    fn append_children(&mut self, parent: NodeId, nodes: &[NodeId]);
    fn set_visible(&mut self, node: NodeId, visible: bool);

    /// Discards a detached subtree, typically a fragment whose items were
    /// moved out. Ids under it must not be used afterwards. Attached nodes
    /// are left alone.
    fn release(&mut self, _node: NodeId) {}
}
