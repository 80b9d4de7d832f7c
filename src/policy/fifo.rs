use std::collections::HashMap;

use super::{first, PageEvent, ReplacementPolicy};
use crate::memory::{Page, PageId};

/// Evicts the page that was loaded earliest.
#[derive(Debug, Default)]
pub struct Fifo {
    /// page id -> load timestamp (smaller = older)
    load_order: HashMap<PageId, u64>,
    counter: u64,
}

impl Fifo {
    pub fn new() -> Self {
        Self::default()
    }
}

impl ReplacementPolicy for Fifo {
    fn name(&self) -> &'static str {
        "FIFO"
    }

    fn select_victim<'a>(&mut self, resident: &[&'a Page]) -> &'a Page {
        let mut victim = first(resident);
        let mut oldest = None;
        for &page in resident {
            // untracked pages count as infinitely old
            let Some(&stamp) = self.load_order.get(&page.id()) else {
                return page;
            };
            if oldest.is_none_or(|o| stamp < o) {
                oldest = Some(stamp);
                victim = page;
            }
        }
        victim
    }

    fn on_event(&mut self, page: &Page, event: PageEvent) {
        match event {
            PageEvent::Load => {
                self.load_order.insert(page.id(), self.counter);
                self.counter += 1;
            }
            PageEvent::Use => {}
            PageEvent::Evict => {
                self.load_order.remove(&page.id());
            }
        }
    }

    fn reset(&mut self) {
        self.load_order.clear();
        self.counter = 0;
    }

    fn describe_state(&self) -> String {
        let mut entries: Vec<_> = self.load_order.iter().collect();
        entries.sort_by_key(|&(_, stamp)| *stamp);
        let mut out = format!("FIFO counter={} tracked={}\n", self.counter, entries.len());
        for (id, stamp) in entries {
            out.push_str(&format!("  page {} loaded at t={}\n", id, stamp));
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pages(ids: &[PageId]) -> Vec<Page> {
        ids.iter().map(|&id| Page::new(id, 1)).collect()
    }

    #[test]
    fn test_evicts_oldest_load() {
        let pages = pages(&[1, 2, 3]);
        let mut fifo = Fifo::new();
        // load out of frame order
        fifo.on_event(&pages[1], PageEvent::Load);
        fifo.on_event(&pages[0], PageEvent::Load);
        fifo.on_event(&pages[2], PageEvent::Load);

        let resident: Vec<&Page> = pages.iter().collect();
        assert_eq!(fifo.select_victim(&resident).id(), 2);
    }

    #[test]
    fn test_use_does_not_reorder() {
        let pages = pages(&[1, 2]);
        let mut fifo = Fifo::new();
        fifo.on_event(&pages[0], PageEvent::Load);
        fifo.on_event(&pages[1], PageEvent::Load);
        fifo.on_event(&pages[0], PageEvent::Use);
        fifo.on_event(&pages[0], PageEvent::Use);

        let resident: Vec<&Page> = pages.iter().collect();
        assert_eq!(fifo.select_victim(&resident).id(), 1);
    }

    #[test]
    fn test_reload_gets_fresh_timestamp() {
        let pages = pages(&[1, 2]);
        let mut fifo = Fifo::new();
        fifo.on_event(&pages[0], PageEvent::Load);
        fifo.on_event(&pages[1], PageEvent::Load);
        fifo.on_event(&pages[0], PageEvent::Evict);
        fifo.on_event(&pages[0], PageEvent::Load);

        let resident: Vec<&Page> = pages.iter().collect();
        assert_eq!(fifo.select_victim(&resident).id(), 2);
    }

    #[test]
    fn test_untracked_page_is_oldest() {
        let pages = pages(&[1, 2, 3]);
        let mut fifo = Fifo::new();
        fifo.on_event(&pages[0], PageEvent::Load);
        fifo.on_event(&pages[1], PageEvent::Load);

        let resident: Vec<&Page> = pages.iter().collect();
        assert_eq!(fifo.select_victim(&resident).id(), 3);
    }

    #[test]
    fn test_reset() {
        let pages = pages(&[1]);
        let mut fifo = Fifo::new();
        fifo.on_event(&pages[0], PageEvent::Load);
        fifo.reset();
        assert!(fifo.describe_state().starts_with("FIFO counter=0 tracked=0"));
    }
}
