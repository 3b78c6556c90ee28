use std::collections::BTreeMap;
use std::fmt;

use crate::constants::FIRST_PID;
use crate::memory::{BlockIndex, FrameIndex};

pub type VirtualPageNumber = u32;

/// Process identifier handed out by a `ProcessIdAllocator`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(transparent)]
pub struct ProcessId(u32);

impl ProcessId {
    pub const fn new(raw: u32) -> Self {
        Self(raw)
    }

    pub const fn as_u32(self) -> u32 {
        self.0
    }
}

impl fmt::Display for ProcessId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u32> for ProcessId {
    fn from(raw: u32) -> Self {
        Self(raw)
    }
}

/// Monotonic pid counter. Resetting a simulation means building a new one.
#[derive(Debug, Clone)]
pub struct ProcessIdAllocator {
    next: u32,
}

impl ProcessIdAllocator {
    pub fn new() -> Self {
        ProcessIdAllocator { next: FIRST_PID }
    }

    /// Hand out the next pid.
    pub fn next_pid(&mut self) -> ProcessId {
        let pid = ProcessId(self.next);
        self.next += 1;
        pid
    }

    /// The pid the next call to `next_pid` will return.
    pub fn peek(&self) -> ProcessId {
        ProcessId(self.next)
    }
}

impl Default for ProcessIdAllocator {
    fn default() -> Self {
        Self::new()
    }
}

/// Residency record for one virtual page.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PageTableEntry {
    pub frame_number: Option<FrameIndex>,
    pub valid: bool,
    pub on_disk: bool,
    pub disk_block: Option<BlockIndex>,
    pub use_bit: bool,
}

impl PageTableEntry {
    /// A page that has never been touched: not in RAM, not on disk.
    pub fn new() -> Self {
        Self::default()
    }

    /// A page freshly bound to `frame`.
    pub fn resident(frame: FrameIndex) -> Self {
        PageTableEntry {
            frame_number: Some(frame),
            valid: true,
            use_bit: true,
            ..Self::default()
        }
    }

    /// Bring the page into `frame`, dropping any disk copy.
    /// Returns the disk block the page was loaded from, if any.
    pub(crate) fn load(&mut self, frame: FrameIndex) -> Option<BlockIndex> {
        let block = self.disk_block.take();
        self.on_disk = false;
        self.frame_number = Some(frame);
        self.valid = true;
        self.use_bit = true;
        block
    }

    /// Move the page out to `block`. Returns the frame it used to occupy.
    pub(crate) fn swap_out(&mut self, block: BlockIndex) -> Option<FrameIndex> {
        let frame = self.frame_number.take();
        self.valid = false;
        self.on_disk = true;
        self.disk_block = Some(block);
        frame
    }

    /// Field-level invariants: never both resident and swapped, and the
    /// flags agree with the indices.
    pub fn is_consistent(&self) -> bool {
        !(self.valid && self.on_disk)
            && self.valid == self.frame_number.is_some()
            && self.on_disk == self.disk_block.is_some()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProcessState {
    New,
    Ready,
    Terminated,
}

impl fmt::Display for ProcessState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ProcessState::New => "NEW",
            ProcessState::Ready => "READY",
            ProcessState::Terminated => "TERMINATED",
        };
        f.write_str(name)
    }
}

/// A simulated process: identity, size, and its sparse page table.
#[derive(Debug, Clone)]
pub struct ProcessDescriptor {
    pid: ProcessId,
    name: String,
    memory_requirement: u64,
    num_pages_required: u32,
    pub(crate) page_table: BTreeMap<VirtualPageNumber, PageTableEntry>,
    pub(crate) state: ProcessState,
}

impl ProcessDescriptor {
    /// Build a descriptor in state `New`. The page count is
    /// `ceil(memory_requirement / page_size)`.
    ///
    /// `page_size` must be non-zero; `MemoryManager::create_process` passes
    /// its own validated page size.
    pub fn new(pid: ProcessId, name: impl Into<String>, memory_requirement: u64, page_size: u32) -> Self {
        let num_pages_required = memory_requirement.div_ceil(u64::from(page_size));
        ProcessDescriptor {
            pid,
            name: name.into(),
            memory_requirement,
            num_pages_required: u32::try_from(num_pages_required).unwrap_or(u32::MAX),
            page_table: BTreeMap::new(),
            state: ProcessState::New,
        }
    }

    pub fn pid(&self) -> ProcessId {
        self.pid
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn memory_requirement(&self) -> u64 {
        self.memory_requirement
    }

    pub fn num_pages_required(&self) -> u32 {
        self.num_pages_required
    }

    pub fn state(&self) -> ProcessState {
        self.state
    }

    pub fn page_table(&self) -> &BTreeMap<VirtualPageNumber, PageTableEntry> {
        &self.page_table
    }

    pub fn page(&self, vpn: VirtualPageNumber) -> Option<&PageTableEntry> {
        self.page_table.get(&vpn)
    }

    /// Number of pages currently held in RAM.
    pub fn resident_pages(&self) -> usize {
        self.page_table.values().filter(|pte| pte.valid).count()
    }

    /// Number of pages currently swapped out.
    pub fn swapped_pages(&self) -> usize {
        self.page_table.values().filter(|pte| pte.on_disk).count()
    }
}

impl fmt::Display for ProcessDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "PID {} ({}) {} bytes, {} pages [{}]",
            self.pid, self.name, self.memory_requirement, self.num_pages_required, self.state
        )
    }
}
