//! Runs the same instruction stream through two independent MMUs: one
//! driven by the optimal policy as a benchmark, one by the policy under
//! test.

use log::{debug, info};

use crate::config::MmuConfig;
use crate::error::SimResult;
use crate::instruction::Instruction;
use crate::io::SimulationData;
use crate::mmu::Mmu;
use crate::policy::{Optimal, PolicyKind, ReplacementPolicy};

/// Outcome of one step of both machines.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StepReport {
    pub index: usize,
    pub instruction: Instruction,
    pub optimal_elapsed: u64,
    pub user_elapsed: u64,
}

#[derive(Debug)]
pub struct Simulation {
    sequence: Vec<Instruction>,
    cursor: usize,
    optimal: Mmu,
    user: Mmu,
    kind: PolicyKind,
}

impl Simulation {
    /// Build both machines over `data`. `seed` seeds the random policy.
    pub fn new(config: MmuConfig, data: SimulationData, kind: PolicyKind, seed: u64) -> SimResult<Self> {
        let SimulationData { instructions, processes } = data;

        let mut optimal_policy = Optimal::new();
        optimal_policy.set_lookahead(&instructions);
        let optimal = Mmu::new(config, Box::new(optimal_policy), processes.iter().cloned())?;
        let mut user = Mmu::new(config, kind.build(Some(seed)), processes)?;
        user.set_lookahead(&instructions);

        info!(
            "simulation ready: {} instructions, OPT vs {}, {} frames",
            instructions.len(),
            kind,
            config.frame_count()
        );
        Ok(Simulation { sequence: instructions, cursor: 0, optimal, user, kind })
    }

    /// Execute the next instruction on both machines. `None` once the
    /// stream is exhausted.
    pub fn step(&mut self) -> Option<StepReport> {
        let instruction = *self.sequence.get(self.cursor)?;
        let index = self.cursor;
        self.cursor += 1;

        let optimal_elapsed = self.optimal.execute(&instruction);
        let user_elapsed = self.user.execute(&instruction);
        debug!(
            "#{} {} -> OPT +{}, {} +{}",
            index, instruction, optimal_elapsed, self.kind, user_elapsed
        );

        if self.is_finished() {
            info!(
                "simulation finished: OPT {} / {} {}",
                self.optimal.total_time(),
                self.kind,
                self.user.total_time()
            );
        }
        Some(StepReport { index, instruction, optimal_elapsed, user_elapsed })
    }

    /// Step until the stream is exhausted; returns the number of steps.
    pub fn run(&mut self) -> usize {
        let mut steps = 0;
        while self.step().is_some() {
            steps += 1;
        }
        steps
    }

    pub fn is_finished(&self) -> bool {
        self.cursor >= self.sequence.len()
    }

    /// Rewind both machines to the start of the stream.
    pub fn reset(&mut self) {
        self.cursor = 0;
        self.optimal.reset();
        self.user.reset();
    }

    /// (executed, total)
    pub fn progress(&self) -> (usize, usize) {
        (self.cursor, self.sequence.len())
    }

    pub fn optimal(&self) -> &Mmu {
        &self.optimal
    }

    pub fn user(&self) -> &Mmu {
        &self.user
    }

    pub fn policy_kind(&self) -> PolicyKind {
        self.kind
    }

    pub fn sequence(&self) -> &[Instruction] {
        &self.sequence
    }
}
