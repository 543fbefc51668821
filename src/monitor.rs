use crate::dom::{Dom, Locator, NodeId};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScrollReading {
    pub offset: f64,
    pub threshold: f64,
}

impl ScrollReading {
    pub fn should_advance(&self) -> bool {
        self.offset >= self.threshold
    }
}

/// Measures how far the viewport has travelled relative to the last rendered
/// item. Meant to be driven only from the throttled scroll path.
#[derive(Debug, Clone)]
pub struct ScrollMonitor {
    item: Locator,
    container: Locator,
}

impl ScrollMonitor {
    pub fn new(item: Locator, container: Locator) -> Self {
        Self { item, container }
    }

    /// Distance from the top of the scrollable region to the viewport bottom.
    pub fn current_offset(&self, dom: &dyn Dom) -> f64 {
        dom.scroll_position() + dom.viewport_height()
    }

    pub fn items_container(&self, dom: &dyn Dom) -> Option<NodeId> {
        dom.find_matching(&self.container, dom.document())
            .into_iter()
            .next()
    }

    /// Last item inside the first items container, or anywhere in the
    /// document when no container matches.
    pub fn last_item(&self, dom: &dyn Dom) -> Option<NodeId> {
        let root = self
            .items_container(dom)
            .unwrap_or_else(|| dom.document());
        dom.last_matching(&self.item, root)
    }

    /// `None` while no item is rendered.
    pub fn threshold(&self, dom: &dyn Dom) -> Option<f64> {
        let last = self.last_item(dom)?;
        Some(dom.offset_top(last) + dom.height(last))
    }

    pub fn reading(&self, dom: &dyn Dom) -> Option<ScrollReading> {
        let threshold = self.threshold(dom)?;
        Some(ScrollReading {
            offset: self.current_offset(dom),
            threshold,
        })
    }

    pub fn should_advance(&self, dom: &dyn Dom) -> bool {
        self.reading(dom).is_some_and(|reading| reading.should_advance())
    }
}

#[cfg(test)]
mod tests {
    use super::ScrollMonitor;
    use crate::dom::{Dom, Locator, MemoryDom};

    fn monitor() -> ScrollMonitor {
        ScrollMonitor::new(Locator::new(".item"), Locator::new(".listing"))
    }

    fn dom(markup: &str) -> MemoryDom {
        MemoryDom::from_markup(markup, 100.0).expect("markup should parse")
    }

    #[test]
    fn threshold_is_bottom_of_last_item() {
        let mut dom = dom(r#"
        [
          { "tag": "div", "height": 40 },
          { "tag": "ul", "class": "listing", "children": [
              { "tag": "li", "class": "item", "height": 100 },
              { "tag": "li", "class": "item", "height": 100 }
          ]},
          { "tag": "footer", "height": 300 }
        ]"#);
        let monitor = monitor();
        assert_eq!(monitor.threshold(&dom), Some(240.0));

        dom.scroll_to(100.0);
        assert_eq!(monitor.current_offset(&dom), 200.0);
        assert!(!monitor.should_advance(&dom));

        dom.scroll_to(140.0);
        assert!(monitor.should_advance(&dom));
    }

    #[test]
    fn no_items_means_undetermined_and_never_advances() {
        let mut dom = dom(r#"[{ "tag": "div", "class": "listing", "height": 500 }]"#);
        let monitor = monitor();
        assert_eq!(monitor.threshold(&dom), None);
        assert_eq!(monitor.reading(&dom), None);
        for position in [0.0, 200.0, 400.0] {
            dom.scroll_to(position);
            assert!(!monitor.should_advance(&dom));
        }
    }

    #[test]
    fn items_outside_a_missing_container_still_count() {
        let dom = dom(r#"
        [
          { "tag": "p", "class": "item", "height": 30 },
          { "tag": "p", "class": "item", "height": 30 }
        ]"#);
        let monitor = monitor();
        assert_eq!(monitor.items_container(&dom), None);
        assert_eq!(monitor.threshold(&dom), Some(60.0));
        assert!(monitor.should_advance(&dom));
    }
}
