use crate::instruction::Pid;

pub type PageId = u32;

/// One page of an allocation.
///
/// `frame` is `Some` exactly while the page occupies a RAM frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Page {
    id: PageId,
    pid: Pid,
    frame: Option<usize>,
    fragmentation: usize,
}

impl Page {
    pub fn new(id: PageId, pid: Pid) -> Self {
        Page { id, pid, frame: None, fragmentation: 0 }
    }

    pub fn with_fragmentation(mut self, bytes: usize) -> Self {
        self.fragmentation = bytes;
        self
    }

    #[inline]
    pub fn id(&self) -> PageId {
        self.id
    }

    /// Owning process.
    #[inline]
    pub fn pid(&self) -> Pid {
        self.pid
    }

    #[inline]
    pub fn frame_index(&self) -> Option<usize> {
        self.frame
    }

    #[inline]
    pub fn is_resident(&self) -> bool {
        self.frame.is_some()
    }

    /// Unused bytes inside this page.
    #[inline]
    pub fn fragmentation(&self) -> usize {
        self.fragmentation
    }
}

/// RAM: a fixed array of frames, each empty or holding one page.
#[derive(Debug, Clone)]
pub struct PhysicalMemory {
    frames: Vec<Option<Page>>,
}

impl PhysicalMemory {
    pub fn new(num_frames: usize) -> Self {
        PhysicalMemory { frames: vec![None; num_frames] }
    }

    #[inline]
    pub fn num_frames(&self) -> usize {
        self.frames.len()
    }

    #[inline]
    pub fn get(&self, index: usize) -> Option<&Page> {
        self.frames.get(index).and_then(Option::as_ref)
    }

    /// Lowest-index empty frame (first fit).
    pub fn first_free(&self) -> Option<usize> {
        self.frames.iter().position(Option::is_none)
    }

    /// Put a page in a frame, replacing whatever was there.
    pub fn store(&mut self, index: usize, mut page: Page) -> &Page {
        self.check_index(index);
        page.frame = Some(index);
        self.frames[index].insert(page)
    }

    /// Empty a frame and hand back its page with residency cleared.
    pub fn take(&mut self, index: usize) -> Option<Page> {
        self.check_index(index);
        let mut page = self.frames[index].take()?;
        page.frame = None;
        Some(page)
    }

    pub fn position_of(&self, id: PageId) -> Option<usize> {
        self.frames
            .iter()
            .position(|slot| slot.as_ref().is_some_and(|page| page.id == id))
    }

    /// Occupied frames in frame order.
    pub fn pages(&self) -> impl Iterator<Item = &Page> {
        self.frames.iter().flatten()
    }

    pub fn frames(&self) -> &[Option<Page>] {
        &self.frames
    }

    pub fn occupied(&self) -> usize {
        self.pages().count()
    }

    fn check_index(&self, index: usize) {
        assert!(
            index < self.frames.len(),
            "frame index {} out of range [0, {})",
            index,
            self.frames.len()
        );
    }
}

/// Virtual memory: evicted pages, unbounded.
#[derive(Debug, Clone, Default)]
pub struct Disk {
    pages: Vec<Page>,
}

impl Disk {
    pub fn new() -> Self {
        Disk { pages: Vec::new() }
    }

    pub fn push(&mut self, page: Page) {
        debug_assert!(!page.is_resident());
        self.pages.push(page);
    }

    /// Remove a page from disk by id, preserving the order of the rest.
    pub fn remove(&mut self, id: PageId) -> Option<Page> {
        let pos = self.pages.iter().position(|page| page.id == id)?;
        Some(self.pages.remove(pos))
    }

    pub fn contains(&self, id: PageId) -> bool {
        self.pages.iter().any(|page| page.id == id)
    }

    pub fn pages(&self) -> &[Page] {
        &self.pages
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.pages.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.pages.is_empty()
    }

    pub fn clear(&mut self) {
        self.pages.clear();
    }
}

/// The simulated machine: RAM frames plus the paging disk.
#[derive(Debug, Clone)]
pub struct Computer {
    ram: PhysicalMemory,
    disk: Disk,
    page_size: usize,
}

impl Computer {
    pub fn new(num_frames: usize, page_size: usize) -> Self {
        Computer {
            ram: PhysicalMemory::new(num_frames),
            disk: Disk::new(),
            page_size,
        }
    }

    /// Lowest free frame, or `None` when RAM is full.
    pub fn find_free_frame(&self) -> Option<usize> {
        self.ram.first_free()
    }

    /// Make `page` resident in frame `index`, overwriting the slot.
    ///
    /// # Panics
    /// If `index` is outside `[0, F)`.
    pub fn place(&mut self, page: Page, index: usize) -> &Page {
        self.ram.store(index, page)
    }

    /// Move the page in frame `index` to disk and free the frame.
    ///
    /// # Panics
    /// If `index` is out of range or the frame is empty.
    pub fn evict_to_disk(&mut self, index: usize) -> Page {
        let Some(page) = self.ram.take(index) else {
            panic!("evicting empty frame {}", index);
        };
        self.disk.push(page.clone());
        page
    }

    /// Bring a page from disk into frame `index`. `None` if it is not on disk.
    pub fn swap_in(&mut self, id: PageId, index: usize) -> Option<&Page> {
        let page = self.disk.remove(id)?;
        Some(self.ram.store(index, page))
    }

    /// Remove a page from wherever it lives (RAM frame or disk).
    pub fn release(&mut self, id: PageId) -> Option<Page> {
        match self.ram.position_of(id) {
            Some(index) => self.ram.take(index),
            None => self.disk.remove(id),
        }
    }

    pub fn is_resident(&self, id: PageId) -> bool {
        self.ram.position_of(id).is_some()
    }

    /// Look a page up in RAM first, then on disk.
    pub fn page(&self, id: PageId) -> Option<&Page> {
        self.ram
            .pages()
            .find(|page| page.id == id)
            .or_else(|| self.disk.pages().iter().find(|page| page.id == id))
    }

    /// Resident pages in frame order.
    pub fn resident_pages(&self) -> Vec<&Page> {
        self.ram.pages().collect()
    }

    /// Bytes of RAM held by resident pages.
    pub fn real_memory_used(&self) -> usize {
        self.ram.occupied() * self.page_size
    }

    /// Bytes of disk held by evicted pages.
    pub fn virtual_memory_used(&self) -> usize {
        self.disk.len() * self.page_size
    }

    /// Internal fragmentation of resident pages only.
    pub fn total_fragmentation(&self) -> usize {
        self.ram.pages().map(Page::fragmentation).sum()
    }

    pub fn reset(&mut self) {
        self.ram = PhysicalMemory::new(self.ram.num_frames());
        self.disk.clear();
    }

    pub fn ram(&self) -> &PhysicalMemory {
        &self.ram
    }

    pub fn disk(&self) -> &Disk {
        &self.disk
    }

    #[inline]
    pub fn num_frames(&self) -> usize {
        self.ram.num_frames()
    }

    #[inline]
    pub fn page_size(&self) -> usize {
        self.page_size
    }
}
