use std::collections::BTreeMap;

use serde::Deserialize;

use crate::error::{LoaderError, LoaderResult};

use super::selector::{ElementTree, Selector};
use super::traits::{Dom, Locator, NodeId};

const DOCUMENT_TAG: &str = "#document";
const FRAGMENT_TAG: &str = "#fragment";
const FREE_TAG: &str = "#free";

/// Serialized element accepted by [`MemoryDom::parse_fragment`].
#[derive(Debug, Clone, Deserialize, PartialEq, Default)]
#[serde(default)]
pub struct MarkupNode {
    pub tag: String,
    pub id: Option<String>,
    /// Space-separated class list.
    pub class: String,
    pub attrs: BTreeMap<String, String>,
    /// Own block height; the rendered height adds the children's.
    pub height: f64,
    pub children: Vec<MarkupNode>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum Markup {
    Many(Vec<MarkupNode>),
    One(MarkupNode),
}

#[derive(Debug, Clone)]
struct Node {
    tag: String,
    id: Option<String>,
    classes: Vec<String>,
    attrs: BTreeMap<String, String>,
    own_height: f64,
    visible: bool,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
}

impl Node {
    fn synthetic(tag: &str) -> Self {
        Self {
            tag: tag.to_string(),
            id: None,
            classes: Vec::new(),
            attrs: BTreeMap::new(),
            own_height: 0.0,
            visible: true,
            parent: None,
            children: Vec::new(),
        }
    }
}

/// Headless document: an element arena laid out as stacked blocks.
///
/// A node's rendered height is its own height plus its visible children's;
/// hidden nodes take no space. Released slots are reused by later parses.
#[derive(Debug, Clone)]
pub struct MemoryDom {
    nodes: Vec<Node>,
    free: Vec<NodeId>,
    document: NodeId,
    scroll_position: f64,
    viewport_height: f64,
}

impl MemoryDom {
    pub fn new(viewport_height: f64) -> Self {
        Self {
            nodes: vec![Node::synthetic(DOCUMENT_TAG)],
            free: Vec::new(),
            document: NodeId(0),
            scroll_position: 0.0,
            viewport_height: viewport_height.max(0.0),
        }
    }

    pub fn from_markup(markup: &str, viewport_height: f64) -> LoaderResult<Self> {
        let mut dom = Self::new(viewport_height);
        let fragment = dom.parse_fragment(markup)?;
        let top_level = dom.nodes[fragment.0].children.clone();
        let document = dom.document;
        dom.append_children(document, &top_level);
        dom.release(fragment);
        Ok(dom)
    }

    /// Live nodes, the document included.
    pub fn node_count(&self) -> usize {
        self.nodes.len() - self.free.len()
    }

    /// Slots ever allocated, live or free.
    pub fn capacity(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_visible(&self, node: NodeId) -> bool {
        self.nodes[node.0].visible
    }

    pub fn parent_of(&self, node: NodeId) -> Option<NodeId> {
        self.nodes[node.0].parent
    }

    pub fn is_attached(&self, node: NodeId) -> bool {
        let mut cursor = Some(node);
        while let Some(current) = cursor {
            if current == self.document {
                return true;
            }
            cursor = self.nodes[current.0].parent;
        }
        false
    }

    /// Scroll position at which the viewport bottom meets the document end.
    pub fn max_scroll(&self) -> f64 {
        (self.height(self.document) - self.viewport_height).max(0.0)
    }

    fn parsed(locator: &Locator) -> Option<Selector> {
        Selector::parse(locator.as_str()).ok()
    }

    fn push_markup(&mut self, markup: MarkupNode, parent: NodeId) -> LoaderResult<NodeId> {
        if markup.tag.trim().is_empty() || markup.tag.starts_with('#') {
            return Err(LoaderError::markup(format!(
                "invalid element tag \"{}\"",
                markup.tag
            )));
        }
        if !markup.height.is_finite() || markup.height < 0.0 {
            return Err(LoaderError::markup(format!(
                "element <{}> has invalid height {}",
                markup.tag, markup.height
            )));
        }

        let id = self.alloc(Node {
            tag: markup.tag.to_ascii_lowercase(),
            id: markup.id.filter(|value| !value.is_empty()),
            classes: markup.class.split_whitespace().map(str::to_string).collect(),
            attrs: markup.attrs,
            own_height: markup.height,
            visible: true,
            parent: Some(parent),
            children: Vec::new(),
        });
        self.nodes[parent.0].children.push(id);

        for child in markup.children {
            self.push_markup(child, id)?;
        }
        Ok(id)
    }

    fn alloc(&mut self, node: Node) -> NodeId {
        match self.free.pop() {
            Some(id) => {
                self.nodes[id.0] = node;
                id
            }
            None => {
                self.nodes.push(node);
                NodeId(self.nodes.len() - 1)
            }
        }
    }

    fn detach(&mut self, node: NodeId) {
        if let Some(parent) = self.nodes[node.0].parent.take() {
            self.nodes[parent.0].children.retain(|child| *child != node);
        }
    }

    fn collect_descendants(&self, root: NodeId, out: &mut Vec<NodeId>) {
        for &child in &self.nodes[root.0].children {
            out.push(child);
            self.collect_descendants(child, out);
        }
    }
}

impl ElementTree for MemoryDom {
    fn tag(&self, node: NodeId) -> &str {
        &self.nodes[node.0].tag
    }

    fn element_id(&self, node: NodeId) -> Option<&str> {
        self.nodes[node.0].id.as_deref()
    }

    fn has_class(&self, node: NodeId, class: &str) -> bool {
        self.nodes[node.0].classes.iter().any(|own| own == class)
    }

    fn parent(&self, node: NodeId) -> Option<NodeId> {
        self.nodes[node.0].parent
    }
}

impl Dom for MemoryDom {
    fn document(&self) -> NodeId {
        self.document
    }

    fn scroll_position(&self) -> f64 {
        self.scroll_position
    }

    fn viewport_height(&self) -> f64 {
        self.viewport_height
    }

    fn scroll_to(&mut self, position: f64) {
        self.scroll_position = position.clamp(0.0, self.max_scroll());
    }

    fn offset_top(&self, node: NodeId) -> f64 {
        let Some(parent) = self.nodes[node.0].parent else {
            return 0.0;
        };
        let preceding: f64 = self.nodes[parent.0]
            .children
            .iter()
            .take_while(|sibling| **sibling != node)
            .map(|sibling| self.height(*sibling))
            .sum();
        self.offset_top(parent) + self.nodes[parent.0].own_height + preceding
    }

    fn height(&self, node: NodeId) -> f64 {
        let entry = &self.nodes[node.0];
        if !entry.visible {
            return 0.0;
        }
        entry.own_height
            + entry
                .children
                .iter()
                .map(|child| self.height(*child))
                .sum::<f64>()
    }

    fn find_matching(&self, locator: &Locator, root: NodeId) -> Vec<NodeId> {
        let Some(selector) = Self::parsed(locator) else {
            return Vec::new();
        };
        let mut descendants = Vec::new();
        self.collect_descendants(root, &mut descendants);
        descendants.retain(|node| selector.matches(self, *node));
        descendants
    }

    fn matches(&self, node: NodeId, locator: &Locator) -> bool {
        Self::parsed(locator).is_some_and(|selector| selector.matches(self, node))
    }

    fn children(&self, node: NodeId) -> Vec<NodeId> {
        self.nodes[node.0].children.clone()
    }

    fn attribute(&self, node: NodeId, name: &str) -> Option<String> {
        let entry = &self.nodes[node.0];
        match name {
            "id" => entry.id.clone(),
            "class" if !entry.classes.is_empty() => Some(entry.classes.join(" ")),
            _ => entry.attrs.get(name).cloned(),
        }
    }

    fn parse_fragment(&mut self, markup: &str) -> LoaderResult<NodeId> {
        let parsed = serde_json::from_str::<Markup>(markup)
            .map_err(|source| LoaderError::markup(source.to_string()))?;
        let top_level = match parsed {
            Markup::Many(nodes) => nodes,
            Markup::One(node) => vec![node],
        };

        let root = self.alloc(Node::synthetic(FRAGMENT_TAG));
        for node in top_level {
            if let Err(err) = self.push_markup(node, root) {
                self.release(root);
                return Err(err);
            }
        }
        Ok(root)
    }

    fn insert_after(&mut self, anchor: NodeId, nodes: &[NodeId]) {
        let Some(parent) = self.nodes[anchor.0].parent else {
            return;
        };
        for node in nodes {
            self.detach(*node);
        }
        let Some(position) = self.nodes[parent.0]
            .children
            .iter()
            .position(|child| *child == anchor)
        else {
            return;
        };
        for (offset, node) in nodes.iter().enumerate() {
            self.nodes[node.0].parent = Some(parent);
            self.nodes[parent.0]
                .children
                .insert(position + 1 + offset, *node);
        }
    }

    fn append_children(&mut self, parent: NodeId, nodes: &[NodeId]) {
        for node in nodes {
            self.detach(*node);
            self.nodes[node.0].parent = Some(parent);
            self.nodes[parent.0].children.push(*node);
        }
    }

    fn set_visible(&mut self, node: NodeId, visible: bool) {
        self.nodes[node.0].visible = visible;
    }

    fn release(&mut self, node: NodeId) {
        if self.is_attached(node) || self.nodes[node.0].tag == FREE_TAG {
            return;
        }
        self.detach(node);
        let mut subtree = vec![node];
        self.collect_descendants(node, &mut subtree);
        // Reversed so the next parse gets the root's slot first.
        for id in subtree.into_iter().rev() {
            self.nodes[id.0] = Node::synthetic(FREE_TAG);
            self.free.push(id);
        }
    }
}
