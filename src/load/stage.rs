use tracing::warn;

use crate::dom::{Dom, NodeId};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Placement {
    AfterLastItem(NodeId),
    IntoContainer(NodeId),
    Dropped,
}

/// Splices fetched items into the live document.
#[derive(Debug, Clone, Copy, Default)]
pub struct RenderStage;

impl RenderStage {
    /// Items start hidden, are inserted in order, then shown. Without an
    /// anchor item the batch goes to the end of the items container.
    pub fn render(
        &self,
        dom: &mut dyn Dom,
        anchor: Option<NodeId>,
        container: Option<NodeId>,
        items: &[NodeId],
    ) -> Placement {
        if items.is_empty() {
            return match (anchor, container) {
                (Some(anchor), _) => Placement::AfterLastItem(anchor),
                (None, Some(container)) => Placement::IntoContainer(container),
                (None, None) => Placement::Dropped,
            };
        }

        for item in items {
            dom.set_visible(*item, false);
        }

        let placement = match (anchor, container) {
            (Some(anchor), _) => {
                dom.insert_after(anchor, items);
                Placement::AfterLastItem(anchor)
            }
            (None, Some(container)) => {
                dom.append_children(container, items);
                Placement::IntoContainer(container)
            }
            (None, None) => {
                warn!(
                    "no item or items container to render {} item(s) into",
                    items.len()
                );
                return Placement::Dropped;
            }
        };

        for item in items {
            dom.set_visible(*item, true);
        }
        placement
    }
}
