use std::collections::HashMap;

use super::{first, PageEvent, ReplacementPolicy};
use crate::memory::{Page, PageId};

/// Evicts the most recently loaded or used page.
#[derive(Debug, Default)]
pub struct Mru {
    last_touch: HashMap<PageId, u64>,
    counter: u64,
}

impl Mru {
    pub fn new() -> Self {
        Self::default()
    }

    fn touch(&mut self, id: PageId) {
        self.last_touch.insert(id, self.counter);
        self.counter += 1;
    }
}

impl ReplacementPolicy for Mru {
    fn name(&self) -> &'static str {
        "MRU"
    }

    fn select_victim<'a>(&mut self, resident: &[&'a Page]) -> &'a Page {
        let mut victim = first(resident);
        let mut newest = None;
        for &page in resident {
            // untracked pages are never preferred
            if let Some(&stamp) = self.last_touch.get(&page.id()) {
                if newest.is_none_or(|n| stamp > n) {
                    newest = Some(stamp);
                    victim = page;
                }
            }
        }
        victim
    }

    fn on_event(&mut self, page: &Page, event: PageEvent) {
        match event {
            PageEvent::Load | PageEvent::Use => self.touch(page.id()),
            PageEvent::Evict => {
                self.last_touch.remove(&page.id());
            }
        }
    }

    fn reset(&mut self) {
        self.last_touch.clear();
        self.counter = 0;
    }

    fn describe_state(&self) -> String {
        let mut entries: Vec<_> = self.last_touch.iter().collect();
        entries.sort_by(|a, b| b.1.cmp(a.1));
        let mut out = format!("MRU counter={} tracked={}\n", self.counter, entries.len());
        for (id, stamp) in entries {
            out.push_str(&format!("  page {} last touched at t={}\n", id, stamp));
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
    fn test_evicts_last_loaded() {
        let pages = pages(&[1, 2, 3]);
        let mut mru = Mru::new();
        for page in &pages {
            mru.on_event(page, PageEvent::Load);
        }
        let resident: Vec<&Page> = pages.iter().collect();
        assert_eq!(mru.select_victim(&resident).id(), 3);
    }

    #[test]
    fn test_use_makes_page_most_recent() {
        let pages = pages(&[1, 2, 3]);
        let mut mru = Mru::new();
        for page in &pages {
            mru.on_event(page, PageEvent::Load);
        }
        mru.on_event(&pages[0], PageEvent::Use);

        let resident: Vec<&Page> = pages.iter().collect();
        assert_eq!(mru.select_victim(&resident).id(), 1);
    }

    #[test]
    fn test_evict_drops_record() {
        let pages = pages(&[1, 2]);
        let mut mru = Mru::new();
        mru.on_event(&pages[0], PageEvent::Load);
        mru.on_event(&pages[1], PageEvent::Load);
        mru.on_event(&pages[1], PageEvent::Evict);

        let resident: Vec<&Page> = pages.iter().collect();
        assert_eq!(mru.select_victim(&resident).id(), 1);
    }

    #[test]
    fn test_untracked_falls_back_to_first() {
        let pages = pages(&[4, 5]);
        let mut mru = Mru::new();
        let resident: Vec<&Page> = pages.iter().collect();
        assert_eq!(mru.select_victim(&resident).id(), 4);
    }
}
