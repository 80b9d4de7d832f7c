use std::collections::{HashMap, HashSet};

use log::warn;

use super::{first, PageEvent, ReplacementPolicy};
use crate::instruction::{Instruction, PtrId};
use crate::memory::{Page, PageId};

/// Belady's optimal policy: evict the resident page whose next use lies
/// furthest in the future.
///
/// Needs the whole instruction stream up front. The future is measured in
/// Use instructions: the cursor counts executed Uses, and the distance of a
/// page is how many Uses lie between the cursor and the next Use touching it.
#[derive(Debug, Default)]
pub struct Optimal {
    /// pointer of every Use instruction, in stream order
    future_uses: Option<Vec<PtrId>>,
    cursor: usize,
    ptr_pages: HashMap<PtrId, HashSet<PageId>>,
}

impl Optimal {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_lookahead(sequence: &[Instruction]) -> Self {
        let mut opt = Self::new();
        opt.set_lookahead(sequence);
        opt
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    /// Distance in Use instructions to the next use of `page`, `None` if
    /// it is never used again.
    fn next_use(&self, uses: &[PtrId], page: PageId) -> Option<usize> {
        uses.iter().skip(self.cursor).position(|ptr| {
            self.ptr_pages
                .get(ptr)
                .is_some_and(|pages| pages.contains(&page))
        })
    }
}

impl ReplacementPolicy for Optimal {
    fn name(&self) -> &'static str {
        "OPT"
    }

    fn select_victim<'a>(&mut self, resident: &[&'a Page]) -> &'a Page {
        let fallback = first(resident);
        let Some(uses) = self.future_uses.as_deref() else {
            warn!("OPT: no lookahead sequence set, evicting first resident page");
            return fallback;
        };

        let mut victim = fallback;
        let mut furthest: Option<Option<usize>> = None;
        for &page in resident {
            let distance = self.next_use(uses, page.id());
            // never used again wins outright; earlier pages win ties
            let further = match (furthest, distance) {
                (None, _) => true,
                (Some(None), _) => false,
                (Some(Some(_)), None) => true,
                (Some(Some(best)), Some(d)) => d > best,
            };
            if further {
                furthest = Some(distance);
                victim = page;
            }
        }
        victim
    }

    fn on_event(&mut self, _page: &Page, _event: PageEvent) {}

    fn reset(&mut self) {
        self.cursor = 0;
        self.ptr_pages.clear();
    }

    fn set_lookahead(&mut self, sequence: &[Instruction]) {
        let uses = sequence
            .iter()
            .filter_map(|inst| match *inst {
                Instruction::Use { ptr, .. } => Some(ptr),
                _ => None,
            })
            .collect();
        self.future_uses = Some(uses);
        self.cursor = 0;
    }

    fn register_pointer(&mut self, ptr: PtrId, pages: &[PageId]) {
        self.ptr_pages.insert(ptr, pages.iter().copied().collect());
    }

    fn unregister_pointer(&mut self, ptr: PtrId) {
        self.ptr_pages.remove(&ptr);
    }

    fn advance_cursor(&mut self) {
        self.cursor += 1;
    }

    fn describe_state(&self) -> String {
        let mut out = match &self.future_uses {
            Some(uses) => format!(
                "OPT use {}/{} ({} remaining)\n",
                self.cursor,
                uses.len(),
                uses.len().saturating_sub(self.cursor)
            ),
            None => "OPT without lookahead\n".to_string(),
        };
        let mut ptrs: Vec<_> = self.ptr_pages.keys().collect();
        ptrs.sort();
        out.push_str(&format!("  tracked pointers: {}\n", ptrs.len()));
        for ptr in ptrs {
            let mut pages: Vec<_> = self.ptr_pages[ptr].iter().collect();
            pages.sort();
            out.push_str(&format!("  ptr {}: {:?}\n", ptr, pages));
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn uses(ptrs: &[PtrId]) -> Vec<Instruction> {
        ptrs.iter().map(|&ptr| Instruction::Use { pid: 1, ptr }).collect()
    }

    /// three single-page pointers: ptr n holds page n
    fn setup(sequence: &[Instruction]) -> (Optimal, Vec<Page>) {
        let mut opt = Optimal::with_lookahead(sequence);
        let pages: Vec<Page> = (1..=3).map(|id| Page::new(id, 1)).collect();
        for page in &pages {
            opt.register_pointer(page.id(), &[page.id()]);
        }
        (opt, pages)
    }

    #[test]
    fn test_evicts_furthest_next_use() {
        let (mut opt, pages) = setup(&uses(&[1, 2, 1, 3, 2]));
        let resident: Vec<&Page> = pages.iter().collect();
        assert_eq!(opt.select_victim(&resident).id(), 3);
    }

    #[test]
    fn test_never_used_again_wins() {
        let (mut opt, pages) = setup(&uses(&[1, 3, 1, 1, 3, 1]));
        let resident: Vec<&Page> = pages.iter().collect();
        assert_eq!(opt.select_victim(&resident).id(), 2);
    }

    #[test]
    fn test_ties_broken_by_input_order() {
        // neither 2 nor 3 is used again
        let (mut opt, pages) = setup(&uses(&[1]));
        let resident: Vec<&Page> = pages.iter().collect();
        assert_eq!(opt.select_victim(&resident).id(), 2);

        let resident: Vec<&Page> = vec![&pages[2], &pages[1], &pages[0]];
        assert_eq!(opt.select_victim(&resident).id(), 3);
    }

    #[test]
    fn test_cursor_moves_the_horizon() {
        let (mut opt, pages) = setup(&uses(&[3, 1, 2, 3]));
        let resident: Vec<&Page> = pages.iter().collect();
        // from the start 2 is furthest
        assert_eq!(opt.select_victim(&resident).id(), 2);

        opt.advance_cursor();
        opt.advance_cursor();
        // remaining: [2, 3] -> page 1 is never used again
        assert_eq!(opt.cursor(), 2);
        assert_eq!(opt.select_victim(&resident).id(), 1);
    }

    #[test]
    fn test_non_use_instructions_are_ignored() {
        let sequence = vec![
            Instruction::Allocate { pid: 1, size: 10 },
            Instruction::Use { pid: 1, ptr: 2 },
            Instruction::Free { pid: 1, ptr: 3 },
            Instruction::Use { pid: 1, ptr: 1 },
            Instruction::Terminate { pid: 1 },
        ];
        let (mut opt, pages) = setup(&sequence);
        let resident: Vec<&Page> = pages.iter().collect();
        assert_eq!(opt.select_victim(&resident).id(), 3);
    }

    #[test]
    fn test_without_lookahead_picks_first() {
        let mut opt = Optimal::new();
        let pages: Vec<Page> = (4..=6).map(|id| Page::new(id, 1)).collect();
        let resident: Vec<&Page> = pages.iter().collect();
        assert_eq!(opt.select_victim(&resident).id(), 4);
        assert!(opt.describe_state().starts_with("OPT without lookahead"));
    }

    #[test]
    fn test_unregistered_pointer_is_never_used_again() {
        let (mut opt, pages) = setup(&uses(&[2, 1, 3]));
        opt.unregister_pointer(1);
        assert!(!opt.ptr_pages.contains_key(&1));

        // ptr 1 no longer maps to page 1, so page 1 has no next use
        let resident: Vec<&Page> = pages.iter().collect();
        assert_eq!(opt.select_victim(&resident).id(), 1);
    }

    #[test]
    fn test_reset_keeps_lookahead() {
        let (mut opt, _pages) = setup(&uses(&[1, 2]));
        opt.advance_cursor();
        opt.reset();
        assert_eq!(opt.cursor(), 0);
        assert!(opt.ptr_pages.is_empty());
        assert!(opt.future_uses.is_some());
    }
}
