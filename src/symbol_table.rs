use std::collections::BTreeMap;

use crate::constants::FIRST_PTR_ID;
use crate::instruction::{Pid, PtrId};
use crate::memory::PageId;

/// One live allocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Allocation {
    pub owner: Pid,
    pub pages: Vec<PageId>,
}

/// Global memory map: pointer id -> owning process and ordered pages of
/// that allocation.
///
/// Ids only ever grow during one run. A freed id is never handed out
/// again, so a future Use can always be matched to one allocation.
#[derive(Debug, Clone)]
pub struct SymbolTable {
    pointers: BTreeMap<PtrId, Allocation>,
    next_ptr: PtrId,
}

impl SymbolTable {
    pub fn new() -> Self {
        SymbolTable { pointers: BTreeMap::new(), next_ptr: FIRST_PTR_ID }
    }

    /// Store a new allocation of `owner` and return its pointer id.
    pub fn register(&mut self, owner: Pid, pages: Vec<PageId>) -> PtrId {
        let ptr = self.next_ptr;
        self.next_ptr += 1;
        self.pointers.insert(ptr, Allocation { owner, pages });
        ptr
    }

    pub fn lookup(&self, ptr: PtrId) -> Option<&[PageId]> {
        self.pointers.get(&ptr).map(|alloc| alloc.pages.as_slice())
    }

    /// Process that allocated `ptr`.
    pub fn owner(&self, ptr: PtrId) -> Option<Pid> {
        self.pointers.get(&ptr).map(|alloc| alloc.owner)
    }

    pub fn remove(&mut self, ptr: PtrId) -> Option<Allocation> {
        self.pointers.remove(&ptr)
    }

    pub fn contains(&self, ptr: PtrId) -> bool {
        self.pointers.contains_key(&ptr)
    }

    /// Live pointers in ascending order.
    pub fn pointers(&self) -> impl Iterator<Item = PtrId> + '_ {
        self.pointers.keys().copied()
    }

    pub fn len(&self) -> usize {
        self.pointers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pointers.is_empty()
    }

    pub fn clear(&mut self) {
        self.pointers.clear();
        self.next_ptr = FIRST_PTR_ID;
    }
}

impl Default for SymbolTable {
    fn default() -> Self {
        Self::new()
    }
}
