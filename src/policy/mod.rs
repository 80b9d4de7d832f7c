//! Page replacement policies.
//!
//! Every policy sees the same per-page life cycle, driven by the MMU:
//! `Load`, any number of `Use`, then `Evict`. The MMU reports every
//! residency change, even to policies that ignore it.

mod fifo;
mod mru;
mod optimal;
mod random;
mod second_chance;

pub use fifo::Fifo;
pub use mru::Mru;
pub use optimal::Optimal;
pub use random::Random;
pub use second_chance::SecondChance;

use std::fmt;
use std::str::FromStr;

use crate::instruction::{Instruction, PtrId};
use crate::memory::{Page, PageId};

/// Residency change reported to a policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageEvent {
    Load,
    Use,
    Evict,
}

pub trait ReplacementPolicy: fmt::Debug {
    fn name(&self) -> &'static str;

    /// Choose the page to evict from `resident`, given in frame order.
    ///
    /// `resident` is never empty when called by the MMU; an empty slice
    /// is a caller defect and panics.
    fn select_victim<'a>(&mut self, resident: &[&'a Page]) -> &'a Page;

    fn on_event(&mut self, page: &Page, event: PageEvent);

    fn reset(&mut self);

    /// Install the future instruction stream. Only lookahead policies care.
    fn set_lookahead(&mut self, _sequence: &[Instruction]) {}

    /// A new allocation was registered under `ptr`.
    fn register_pointer(&mut self, _ptr: PtrId, _pages: &[PageId]) {}

    /// `ptr` was freed; its pages will never be used again.
    fn unregister_pointer(&mut self, _ptr: PtrId) {}

    /// One Use instruction finished executing.
    fn advance_cursor(&mut self) {}

    /// Human-readable dump of the policy's bookkeeping.
    fn describe_state(&self) -> String;
}

/// First page of a non-empty candidate list.
pub(crate) fn first<'a>(resident: &[&'a Page]) -> &'a Page {
    match resident.first() {
        Some(page) => page,
        None => panic!("victim selection called with no resident pages"),
    }
}

/// User-selectable policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PolicyKind {
    Fifo,
    Mru,
    SecondChance,
    Random,
    Optimal,
}

impl PolicyKind {
    /// Build a fresh policy. `seed` only matters for `Random`.
    pub fn build(self, seed: Option<u64>) -> Box<dyn ReplacementPolicy> {
        match self {
            PolicyKind::Fifo => Box::new(Fifo::new()),
            PolicyKind::Mru => Box::new(Mru::new()),
            PolicyKind::SecondChance => Box::new(SecondChance::new()),
            PolicyKind::Random => Box::new(match seed {
                Some(seed) => Random::with_seed(seed),
                None => Random::new(),
            }),
            PolicyKind::Optimal => Box::new(Optimal::new()),
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            PolicyKind::Fifo => "FIFO",
            PolicyKind::Mru => "MRU",
            PolicyKind::SecondChance => "SC",
            PolicyKind::Random => "RND",
            PolicyKind::Optimal => "OPT",
        }
    }
}

impl FromStr for PolicyKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "fifo" => Ok(PolicyKind::Fifo),
            "mru" => Ok(PolicyKind::Mru),
            "sc" | "second-chance" | "secondchance" => Ok(PolicyKind::SecondChance),
            "rnd" | "random" => Ok(PolicyKind::Random),
            "opt" | "optimal" => Ok(PolicyKind::Optimal),
            other => Err(format!("unknown replacement policy: {}", other)),
        }
    }
}

impl fmt::Display for PolicyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_policy_names() {
        assert_eq!("FIFO".parse::<PolicyKind>(), Ok(PolicyKind::Fifo));
        assert_eq!("mru".parse::<PolicyKind>(), Ok(PolicyKind::Mru));
        assert_eq!("sc".parse::<PolicyKind>(), Ok(PolicyKind::SecondChance));
        assert_eq!("second-chance".parse::<PolicyKind>(), Ok(PolicyKind::SecondChance));
        assert_eq!("rnd".parse::<PolicyKind>(), Ok(PolicyKind::Random));
        assert_eq!(" opt ".parse::<PolicyKind>(), Ok(PolicyKind::Optimal));
        assert!("lru".parse::<PolicyKind>().is_err());
    }

    #[test]
    fn test_build_names() {
        for kind in [
            PolicyKind::Fifo,
            PolicyKind::Mru,
            PolicyKind::SecondChance,
            PolicyKind::Random,
            PolicyKind::Optimal,
        ] {
            assert_eq!(kind.build(Some(1)).name(), kind.label());
        }
    }

    #[test]
    #[should_panic(expected = "no resident pages")]
    fn test_empty_candidates_panic() {
        let mut fifo = Fifo::new();
        fifo.select_victim(&[]);
    }
}
