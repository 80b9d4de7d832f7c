use std::fmt::{self, Display};

use crate::constants::MAX_ALLOCATION_SIZE;
use crate::instruction::{Pid, PtrId};

/// Errors raised by the simulator.
///
/// The first group covers recoverable semantic problems in the instruction
/// stream: the MMU reports them and skips the instruction. The rest come
/// from loading traces and configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SimError {
    /// instruction names a pid that was never registered
    UnknownProcess(Pid),
    /// instruction targets a process that already terminated
    InactiveProcess(Pid),
    /// Use/Free of a pointer that is not (or no longer) in the symbol table
    DanglingPointer { pid: Pid, ptr: PtrId },
    /// Allocate above `MAX_ALLOCATION_SIZE`
    AllocationTooLarge { pid: Pid, size: usize },
    /// instruction pushed into the wrong process
    PidMismatch { expected: Pid, found: Pid },
    /// instruction pushed after the process's Terminate
    ProcessTerminated(Pid),
    /// malformed trace line (1-based line number)
    Parse { line: usize, message: String },
    Io(String),
    Config(String),
}

pub type SimResult<T> = Result<T, SimError>;

impl SimError {
    /// Whether the error is one the MMU absorbs as a skipped instruction.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            SimError::UnknownProcess(_)
                | SimError::InactiveProcess(_)
                | SimError::DanglingPointer { .. }
                | SimError::AllocationTooLarge { .. }
        )
    }
}

impl Display for SimError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SimError::UnknownProcess(pid) => write!(f, "process {} does not exist", pid),
            SimError::InactiveProcess(pid) => write!(f, "process {} is not active", pid),
            SimError::DanglingPointer { pid, ptr } => {
                write!(f, "pointer {} (pid {}) does not exist", ptr, pid)
            }
            SimError::AllocationTooLarge { pid, size } => write!(
                f,
                "allocation of {} bytes for pid {} exceeds {} bytes",
                size, pid, MAX_ALLOCATION_SIZE
            ),
            SimError::PidMismatch { expected, found } => write!(
                f,
                "instruction for pid {} pushed into process {}",
                found, expected
            ),
            SimError::ProcessTerminated(pid) => {
                write!(f, "process {} already ends with kill", pid)
            }
            SimError::Parse { line, message } => write!(f, "line {}: {}", line, message),
            SimError::Io(msg) => write!(f, "I/O error: {}", msg),
            SimError::Config(msg) => write!(f, "invalid configuration: {}", msg),
        }
    }
}

impl std::error::Error for SimError {}

impl From<std::io::Error> for SimError {
    fn from(value: std::io::Error) -> Self {
        SimError::Io(value.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_recoverable_classification() {
        assert!(SimError::UnknownProcess(3).is_recoverable());
        assert!(SimError::InactiveProcess(3).is_recoverable());
        assert!(SimError::DanglingPointer { pid: 1, ptr: 9 }.is_recoverable());
        assert!(SimError::AllocationTooLarge { pid: 1, size: usize::MAX }.is_recoverable());
        assert!(!SimError::ProcessTerminated(1).is_recoverable());
        assert!(!SimError::Io("boom".to_string()).is_recoverable());
    }

    #[test]
    fn test_display() {
        let err = SimError::Parse { line: 4, message: "unknown command `foo`".to_string() };
        assert_eq!(err.to_string(), "line 4: unknown command `foo`");

        let err = SimError::DanglingPointer { pid: 2, ptr: 7 };
        assert!(err.to_string().contains("pointer 7"));
    }
}
