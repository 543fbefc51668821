use std::time::Duration;

#[derive(Debug, Clone, PartialEq, Default)]
pub struct LoaderStats {
    pub pages_loaded: usize,
    pub items_rendered: usize,
    pub vetoed_triggers: usize,
    pub fetch_failures: usize,
    pub last_fetch_ms: f64,
    pub last_cycle_ms: f64,
    pub fetch_samples: u64,
}

impl LoaderStats {
    pub fn record_fetch(&mut self, elapsed: Duration) {
        self.last_fetch_ms = elapsed.as_secs_f64() * 1000.0;
        self.fetch_samples += 1;
    }

    pub fn record_render(&mut self, items: usize, cycle_elapsed: Duration) {
        self.pages_loaded += 1;
        self.items_rendered += items;
        self.last_cycle_ms = cycle_elapsed.as_secs_f64() * 1000.0;
    }

    pub fn record_veto(&mut self) {
        self.vetoed_triggers += 1;
    }

    pub fn record_fetch_failure(&mut self) {
        self.fetch_failures += 1;
    }

    pub fn average_items_per_page(&self) -> f64 {
        if self.pages_loaded == 0 {
            return 0.0;
        }
        self.items_rendered as f64 / self.pages_loaded as f64
    }
}
