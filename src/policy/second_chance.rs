use std::collections::{HashMap, VecDeque};

use log::warn;

use super::{first, PageEvent, ReplacementPolicy};
use crate::memory::{Page, PageId};

/// FIFO with a reference bit: a referenced page at the head of the queue
/// has its bit cleared and goes to the back instead of being evicted.
#[derive(Debug, Default)]
pub struct SecondChance {
    queue: VecDeque<PageId>,
    referenced: HashMap<PageId, bool>,
}

impl SecondChance {
    pub fn new() -> Self {
        Self::default()
    }
}

impl ReplacementPolicy for SecondChance {
    fn name(&self) -> &'static str {
        "SC"
    }

    fn select_victim<'a>(&mut self, resident: &[&'a Page]) -> &'a Page {
        let fallback = first(resident);
        let limit = self.queue.len() * 2;

        for _ in 0..limit {
            let Some(id) = self.queue.pop_front() else {
                break;
            };
            if self.referenced.get(&id).copied().unwrap_or(false) {
                self.referenced.insert(id, false);
                self.queue.push_back(id);
                continue;
            }
            match resident.iter().copied().find(|page| page.id() == id) {
                Some(page) => {
                    // stays tracked until the MMU reports the eviction
                    self.queue.push_front(id);
                    return page;
                }
                None => {
                    warn!("SC: queued page {} is not resident, dropping it", id);
                    self.referenced.remove(&id);
                }
            }
        }

        warn!(
            "SC: no victim after {} iterations, falling back to page {}",
            limit,
            fallback.id()
        );
        fallback
    }

    fn on_event(&mut self, page: &Page, event: PageEvent) {
        let id = page.id();
        match event {
            PageEvent::Load => {
                self.queue.push_back(id);
                self.referenced.insert(id, false);
            }
            PageEvent::Use => {
                if let Some(bit) = self.referenced.get_mut(&id) {
                    *bit = true;
                }
            }
            PageEvent::Evict => {
                self.queue.retain(|&queued| queued != id);
                self.referenced.remove(&id);
            }
        }
    }

    fn reset(&mut self) {
        self.queue.clear();
        self.referenced.clear();
    }

    fn describe_state(&self) -> String {
        let mut out = format!("SC queued={}\n", self.queue.len());
        for id in &self.queue {
            let bit = self.referenced.get(id).copied().unwrap_or(false);
            out.push_str(&format!("  page {} bit={}\n", id, u8::from(bit)));
        }
        out
    }
}
