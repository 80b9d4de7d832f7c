use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use super::{first, PageEvent, ReplacementPolicy};
use crate::memory::Page;

/// Uniformly random victim. With a seed the victim sequence is reproducible.
#[derive(Debug)]
pub struct Random {
    rng: StdRng,
    seed: Option<u64>,
}

impl Random {
    pub fn new() -> Self {
        Random { rng: StdRng::from_entropy(), seed: None }
    }

    pub fn with_seed(seed: u64) -> Self {
        Random { rng: StdRng::seed_from_u64(seed), seed: Some(seed) }
    }

    pub fn seed(&self) -> Option<u64> {
        self.seed
    }
}

impl Default for Random {
    fn default() -> Self {
        Self::new()
    }
}

impl ReplacementPolicy for Random {
    fn name(&self) -> &'static str {
        "RND"
    }

    fn select_victim<'a>(&mut self, resident: &[&'a Page]) -> &'a Page {
        let fallback = first(resident);
        let index = self.rng.gen_range(0..resident.len());
        resident.get(index).copied().unwrap_or(fallback)
    }

    fn on_event(&mut self, _page: &Page, _event: PageEvent) {}

    fn reset(&mut self) {
        *self = match self.seed {
            Some(seed) => Self::with_seed(seed),
            None => Self::new(),
        };
    }

    fn describe_state(&self) -> String {
        match self.seed {
            Some(seed) => format!("RND seed={} (reproducible)\n", seed),
            None => "RND unseeded\n".to_string(),
        }
    }
}
