pub mod config;
pub mod constants;
pub mod error;
pub mod instruction;
pub mod io;
pub mod memory;
pub mod mmu;
pub mod policy;
pub mod process;
pub mod simulation;
pub mod symbol_table;

// Re-export commonly used items for convenience
pub use config::MmuConfig;
pub use constants::*;
pub use error::{SimError, SimResult};
pub use instruction::{Instruction, Pid, PtrId};
pub use io::{generate, SimulationData};
pub use memory::{Computer, Page, PageId};
pub use mmu::{Mmu, MmuStats};
pub use policy::{PageEvent, PolicyKind, ReplacementPolicy};
pub use process::Process;
pub use simulation::{Simulation, StepReport};
pub use symbol_table::SymbolTable;
