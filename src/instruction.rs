pub type Pid = u32;
pub type PtrId = u32;

/// One step of a process's workload.
///
/// Pointer ids are already resolved: the trace notation's ordinals never
/// reach the MMU.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Instruction {
    Allocate { pid: Pid, size: usize },
    Use { pid: Pid, ptr: PtrId },
    Free { pid: Pid, ptr: PtrId },
    Terminate { pid: Pid },
}

impl Instruction {
    pub fn pid(&self) -> Pid {
        match *self {
            Instruction::Allocate { pid, .. }
            | Instruction::Use { pid, .. }
            | Instruction::Free { pid, .. }
            | Instruction::Terminate { pid } => pid,
        }
    }

    /// Pointer referenced by a Use or Free.
    pub fn ptr(&self) -> Option<PtrId> {
        match *self {
            Instruction::Use { ptr, .. } | Instruction::Free { ptr, .. } => Some(ptr),
            _ => None,
        }
    }

    #[inline]
    pub fn is_terminate(&self) -> bool {
        matches!(self, Instruction::Terminate { .. })
    }
}

impl std::fmt::Display for Instruction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Instruction::Allocate { pid, size } => write!(f, "new({},{})", pid, size),
            Instruction::Use { pid, ptr } => write!(f, "use(ptr={}) [pid={}]", ptr, pid),
            Instruction::Free { pid, ptr } => write!(f, "delete(ptr={}) [pid={}]", ptr, pid),
            Instruction::Terminate { pid } => write!(f, "kill({})", pid),
        }
    }
}

/// Pages needed to hold `size` bytes: `ceil(size / page_size)`.
#[inline]
pub fn pages_needed(size: usize, page_size: usize) -> usize {
    size.div_ceil(page_size)
}

/// Internal fragmentation left in the last page of a `size`-byte allocation.
#[inline]
pub fn fragmentation(size: usize, page_size: usize) -> usize {
    match size % page_size {
        0 => 0,
        rem => page_size - rem,
    }
}
