//! The memory-management unit: executes instructions against one
//! `Computer`, one `SymbolTable` and one replacement policy, and keeps the
//! running time and thrashing totals.

use std::collections::BTreeMap;

use log::{debug, trace, warn};

use crate::config::MmuConfig;
use crate::constants::{FIRST_PAGE_ID, MAX_ALLOCATION_SIZE};
use crate::error::{SimError, SimResult};
use crate::instruction::{fragmentation, pages_needed, Instruction, Pid, PtrId};
use crate::memory::{Computer, Page, PageId};
use crate::policy::{PageEvent, ReplacementPolicy};
use crate::process::Process;
use crate::symbol_table::SymbolTable;

/// Point-in-time statistics of one MMU.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MmuStats {
    pub total_time: u64,
    pub thrashing_time: u64,
    pub thrashing_pct: f64,
    pub ram_used: usize,
    pub ram_pct: f64,
    pub vram_used: usize,
    pub vram_pct: f64,
    pub fragmentation: usize,
    pub active_processes: usize,
    pub hits: u64,
    pub faults: u64,
}

pub struct Mmu {
    config: MmuConfig,
    computer: Computer,
    symbols: SymbolTable,
    policy: Box<dyn ReplacementPolicy>,
    processes: BTreeMap<Pid, Process>,
    next_page: PageId,
    total_time: u64,
    thrashing_time: u64,
    hits: u64,
    faults: u64,
    diagnostics: Vec<SimError>,
}

impl Mmu {
    pub fn new(
        config: MmuConfig,
        policy: Box<dyn ReplacementPolicy>,
        processes: impl IntoIterator<Item = Process>,
    ) -> SimResult<Self> {
        config.validate()?;
        Ok(Mmu {
            computer: Computer::new(config.frame_count(), config.page_size),
            symbols: SymbolTable::new(),
            policy,
            processes: processes.into_iter().map(|p| (p.pid(), p)).collect(),
            next_page: FIRST_PAGE_ID,
            total_time: 0,
            thrashing_time: 0,
            hits: 0,
            faults: 0,
            diagnostics: Vec::new(),
            config,
        })
    }

    /// Hand the future instruction stream to the policy (Optimal uses it).
    pub fn set_lookahead(&mut self, sequence: &[Instruction]) {
        self.policy.set_lookahead(sequence);
    }

    /// Execute one instruction and return the time it took.
    ///
    /// Recoverable problems (unknown or dead process, dangling pointer) are
    /// logged and recorded; the instruction is then skipped and costs 0.
    ///
    /// # Panics
    /// On frame accounting defects, never on bad input.
    pub fn execute(&mut self, instruction: &Instruction) -> u64 {
        let result = match *instruction {
            Instruction::Allocate { pid, size } => self.allocate(pid, size),
            Instruction::Use { pid, ptr } => self.use_pointer(pid, ptr),
            Instruction::Free { pid, ptr } => self.free(pid, ptr),
            Instruction::Terminate { pid } => self.terminate(pid),
        };
        let elapsed = match result {
            Ok(elapsed) => elapsed,
            Err(err) => {
                warn!("[{}] skipping {}: {}", self.policy.name(), instruction, err);
                self.diagnostics.push(err);
                0
            }
        };
        trace!("[{}] {} -> {}", self.policy.name(), instruction, elapsed);
        self.total_time += elapsed;
        elapsed
    }

    fn allocate(&mut self, pid: Pid, size: usize) -> SimResult<u64> {
        match self.processes.get(&pid) {
            None => return Err(SimError::UnknownProcess(pid)),
            Some(process) if !process.is_active() => {
                return Err(SimError::InactiveProcess(pid));
            }
            Some(_) => {}
        }
        if size > MAX_ALLOCATION_SIZE {
            return Err(SimError::AllocationTooLarge { pid, size });
        }

        let page_size = self.config.page_size;
        let count = pages_needed(size, page_size);
        let mut elapsed = 0;
        let mut ids = Vec::new();

        for i in 0..count {
            let mut page = Page::new(self.next_page, pid);
            self.next_page += 1;
            if i + 1 == count {
                page = page.with_fragmentation(fragmentation(size, page_size));
            }
            ids.push(page.id());

            let frame = match self.computer.find_free_frame() {
                Some(frame) => {
                    elapsed += self.hit();
                    frame
                }
                None => {
                    elapsed += self.fault();
                    self.evict_victim()
                }
            };
            let page = self.computer.place(page, frame);
            self.policy.on_event(page, PageEvent::Load);
        }

        let ptr = self.symbols.register(pid, ids);
        if let Some(process) = self.processes.get_mut(&pid) {
            process.register_pointer(ptr);
        }
        if let Some(pages) = self.symbols.lookup(ptr) {
            self.policy.register_pointer(ptr, pages);
        }
        debug!("[{}] new({},{}) -> ptr {} ({} pages)", self.policy.name(), pid, size, ptr, count);
        Ok(elapsed)
    }

    fn use_pointer(&mut self, pid: Pid, ptr: PtrId) -> SimResult<u64> {
        let Some(ids) = self.symbols.lookup(ptr).map(<[PageId]>::to_vec) else {
            return Err(SimError::DanglingPointer { pid, ptr });
        };

        let mut elapsed = 0;
        for id in ids {
            if self.computer.is_resident(id) {
                elapsed += self.hit();
                if let Some(page) = self.computer.page(id) {
                    self.policy.on_event(page, PageEvent::Use);
                }
                continue;
            }

            elapsed += self.fault();
            let frame = match self.computer.find_free_frame() {
                Some(frame) => frame,
                None => self.evict_victim(),
            };
            let Some(page) = self.computer.swap_in(id, frame) else {
                panic!("page {} of ptr {} is neither in RAM nor on disk", id, ptr);
            };
            debug!("[{}] page {} swapped into frame {}", self.policy.name(), id, frame);
            self.policy.on_event(page, PageEvent::Load);
        }

        self.policy.advance_cursor();
        Ok(elapsed)
    }

    fn free(&mut self, pid: Pid, ptr: PtrId) -> SimResult<u64> {
        let Some(alloc) = self.symbols.remove(ptr) else {
            return Err(SimError::DanglingPointer { pid, ptr });
        };
        if alloc.owner != pid {
            debug!("[{}] ptr {} of pid {} freed by pid {}", self.policy.name(), ptr, alloc.owner, pid);
        }
        if let Some(process) = self.processes.get_mut(&alloc.owner) {
            process.release_pointer(ptr);
        }
        self.policy.unregister_pointer(ptr);
        for id in alloc.pages {
            if let Some(page) = self.computer.release(id) {
                self.policy.on_event(&page, PageEvent::Evict);
            }
        }
        Ok(0)
    }

    fn terminate(&mut self, pid: Pid) -> SimResult<u64> {
        let Some(process) = self.processes.get(&pid) else {
            return Err(SimError::UnknownProcess(pid));
        };
        let owned: Vec<PtrId> = process.owned_pointers().collect();

        let mut elapsed = 0;
        for ptr in owned {
            match self.free(pid, ptr) {
                Ok(cost) => elapsed += cost,
                Err(err) => {
                    warn!("[{}] kill({}): {}", self.policy.name(), pid, err);
                    self.diagnostics.push(err);
                }
            }
        }
        if let Some(process) = self.processes.get_mut(&pid) {
            process.terminate();
        }
        debug!("[{}] process {} terminated", self.policy.name(), pid);
        Ok(elapsed)
    }

    /// Ask the policy for a victim, move it to disk and return its frame.
    fn evict_victim(&mut self) -> usize {
        let resident = self.computer.resident_pages();
        assert!(
            !resident.is_empty(),
            "RAM reported full but no page is resident"
        );
        let victim = self.policy.select_victim(&resident);
        let (id, frame) = match victim.frame_index() {
            Some(frame) => (victim.id(), frame),
            None => panic!("policy {} chose non-resident page {}", self.policy.name(), victim.id()),
        };

        let evicted = self.computer.evict_to_disk(frame);
        debug_assert_eq!(evicted.id(), id);
        self.policy.on_event(&evicted, PageEvent::Evict);
        debug!("[{}] evicted page {} from frame {}", self.policy.name(), id, frame);
        frame
    }

    fn hit(&mut self) -> u64 {
        self.hits += 1;
        self.config.hit_cost
    }

    fn fault(&mut self) -> u64 {
        self.faults += 1;
        self.thrashing_time += self.config.fault_cost;
        self.config.fault_cost
    }

    /// Restore the initial state of a run. Only valid between runs.
    pub fn reset(&mut self) {
        self.computer.reset();
        self.symbols.clear();
        self.policy.reset();
        for process in self.processes.values_mut() {
            process.reset();
        }
        self.next_page = FIRST_PAGE_ID;
        self.total_time = 0;
        self.thrashing_time = 0;
        self.hits = 0;
        self.faults = 0;
        self.diagnostics.clear();
    }

    pub fn stats(&self) -> MmuStats {
        let ram_size = self.config.ram_bytes as f64;
        let pct = |part: f64, whole: f64| if whole == 0.0 { 0.0 } else { part / whole * 100.0 };
        let ram_used = self.computer.real_memory_used();
        let vram_used = self.computer.virtual_memory_used();
        MmuStats {
            total_time: self.total_time,
            thrashing_time: self.thrashing_time,
            thrashing_pct: pct(self.thrashing_time as f64, self.total_time as f64),
            ram_used,
            ram_pct: pct(ram_used as f64, ram_size),
            vram_used,
            vram_pct: pct(vram_used as f64, ram_size),
            fragmentation: self.computer.total_fragmentation(),
            active_processes: self.processes.values().filter(|p| p.is_active()).count(),
            hits: self.hits,
            faults: self.faults,
        }
    }

    pub fn computer(&self) -> &Computer {
        &self.computer
    }

    pub fn symbols(&self) -> &SymbolTable {
        &self.symbols
    }

    pub fn policy(&self) -> &dyn ReplacementPolicy {
        self.policy.as_ref()
    }

    pub fn process(&self, pid: Pid) -> Option<&Process> {
        self.processes.get(&pid)
    }

    pub fn processes(&self) -> impl Iterator<Item = &Process> {
        self.processes.values()
    }

    pub fn config(&self) -> &MmuConfig {
        &self.config
    }

    #[inline]
    pub fn total_time(&self) -> u64 {
        self.total_time
    }

    #[inline]
    pub fn thrashing_time(&self) -> u64 {
        self.thrashing_time
    }

    /// Recoverable errors reported since the last reset.
    pub fn diagnostics(&self) -> &[SimError] {
        &self.diagnostics
    }
}

impl std::fmt::Debug for Mmu {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Mmu")
            .field("policy", &self.policy.name())
            .field("total_time", &self.total_time)
            .field("thrashing_time", &self.thrashing_time)
            .field("resident", &self.computer.ram().occupied())
            .field("on_disk", &self.computer.disk().len())
            .finish()
    }
}
