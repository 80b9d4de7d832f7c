use std::collections::BTreeSet;

use crate::error::{SimError, SimResult};
use crate::instruction::{Instruction, Pid, PtrId};

/// A simulated process: its scripted instructions, the pointers it owns
/// right now, and a cursor for pulling instructions one at a time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Process {
    pid: Pid,
    instructions: Vec<Instruction>,
    owned: BTreeSet<PtrId>,
    active: bool,
    cursor: usize,
}

impl Process {
    pub fn new(pid: Pid) -> Self {
        Process {
            pid,
            instructions: Vec::new(),
            owned: BTreeSet::new(),
            active: true,
            cursor: 0,
        }
    }

    /// Append an instruction to the script.
    ///
    /// Fails if the instruction belongs to another pid, or if the script
    /// already ends with a Terminate.
    pub fn push_instruction(&mut self, instruction: Instruction) -> SimResult<()> {
        if instruction.pid() != self.pid {
            return Err(SimError::PidMismatch { expected: self.pid, found: instruction.pid() });
        }
        if self.instructions.last().is_some_and(Instruction::is_terminate) {
            return Err(SimError::ProcessTerminated(self.pid));
        }
        self.instructions.push(instruction);
        Ok(())
    }

    /// Pull the next scripted instruction, advancing the cursor.
    pub fn next_instruction(&mut self) -> Option<Instruction> {
        let next = self.instructions.get(self.cursor).copied()?;
        self.cursor += 1;
        Some(next)
    }

    pub fn is_finished(&self) -> bool {
        !self.active || self.cursor >= self.instructions.len()
    }

    pub fn register_pointer(&mut self, ptr: PtrId) {
        self.owned.insert(ptr);
    }

    pub fn release_pointer(&mut self, ptr: PtrId) -> bool {
        self.owned.remove(&ptr)
    }

    pub fn owns(&self, ptr: PtrId) -> bool {
        self.owned.contains(&ptr)
    }

    /// Owned pointers in ascending id order.
    pub fn owned_pointers(&self) -> impl Iterator<Item = PtrId> + '_ {
        self.owned.iter().copied()
    }

    /// Mark the process dead and drop its pointer set.
    pub fn terminate(&mut self) {
        self.active = false;
        self.owned.clear();
    }

    /// Rewind for a fresh run. The script itself is kept.
    pub fn reset(&mut self) {
        self.active = true;
        self.cursor = 0;
        self.owned.clear();
    }

    #[inline]
    pub fn pid(&self) -> Pid {
        self.pid
    }

    #[inline]
    pub fn is_active(&self) -> bool {
        self.active
    }

    pub fn instructions(&self) -> &[Instruction] {
        &self.instructions
    }
}

impl std::fmt::Display for Process {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Process[pid={}, instructions={}, ptrs={}, active={}]",
            self.pid,
            self.instructions.len(),
            self.owned.len(),
            self.active
        )
    }
}
