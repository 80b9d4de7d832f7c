pub const PAGE_SIZE: usize = 4096;
pub const RAM_SIZE: usize = 400 * 1024;
pub const NUM_FRAMES: usize = RAM_SIZE / PAGE_SIZE;

// time units charged per page touched
pub const HIT_COST: u64 = 1;
pub const FAULT_COST: u64 = 5;

pub const FIRST_PTR_ID: u32 = 1;
pub const FIRST_PAGE_ID: u32 = 1;

// largest single allocation, in bytes
pub const MAX_ALLOCATION_SIZE: usize = i32::MAX as usize;

// workload generator
pub const GEN_SIZE_STEP: usize = 512;
pub const GEN_SIZE_STEPS: usize = 10;
pub const DEFAULT_SEED: u64 = 42;
