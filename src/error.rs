//! Error types returned by the simulator.
//!
//! Every public operation has its own error enum so callers can match on
//! exactly the failures that operation can produce.

use std::fmt;

use crate::memory::{BlockIndex, FrameIndex};
use crate::process::{ProcessId, VirtualPageNumber};

/// Invalid simulator geometry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigError {
    ZeroPageSize,
    ZeroFrames,
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::ZeroPageSize => write!(f, "page size must be positive"),
            ConfigError::ZeroFrames => write!(f, "number of frames must be positive"),
        }
    }
}

impl std::error::Error for ConfigError {}

/// Failure of `MemoryManager::allocate_memory`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AllocError {
    /// The process needs more pages than there are frames in total.
    OversizedProcess {
        pid: ProcessId,
        required: u32,
        capacity: u32,
    },
    /// The pid is already registered, or the descriptor was already retired.
    DuplicateProcess(ProcessId),
    /// Not enough frames could be freed by eviction.
    OutOfMemory(ProcessId),
}

impl fmt::Display for AllocError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AllocError::OversizedProcess { pid, required, capacity } => write!(
                f,
                "process {} requires {} pages but RAM holds only {} frames",
                pid, required, capacity
            ),
            AllocError::DuplicateProcess(pid) => {
                write!(f, "process {} already has memory allocated", pid)
            }
            AllocError::OutOfMemory(pid) => {
                write!(f, "out of memory while allocating process {}", pid)
            }
        }
    }
}

impl std::error::Error for AllocError {}

/// Failure of an address translation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Fault {
    ProcessNotFound(ProcessId),
    /// The page lies outside the process's declared address space.
    SegmentationFault {
        pid: ProcessId,
        page: u64,
        num_pages: u32,
    },
    /// The page fault could not be served because no frame could be freed.
    OutOfMemory {
        pid: ProcessId,
        page: VirtualPageNumber,
    },
}

impl fmt::Display for Fault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Fault::ProcessNotFound(pid) => write!(f, "process {} not found", pid),
            Fault::SegmentationFault { pid, page, num_pages } => write!(
                f,
                "segmentation fault: page {} is outside process {}'s address space ({} pages)",
                page, pid, num_pages
            ),
            Fault::OutOfMemory { pid, page } => write!(
                f,
                "out of memory while handling page fault for process {}, page {}",
                pid, page
            ),
        }
    }
}

impl std::error::Error for Fault {}

/// Failure of `MemoryManager::deallocate_memory`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeallocError {
    ProcessNotFound(ProcessId),
}

impl fmt::Display for DeallocError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DeallocError::ProcessNotFound(pid) => {
                write!(f, "process {} not found for deallocation", pid)
            }
        }
    }
}

impl std::error::Error for DeallocError {}

/// Why a single eviction step could not make room.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EvictError {
    /// Swap is full (or disabled).
    DiskFull,
    /// The clock sweep found nothing to evict.
    NoVictim,
}

impl fmt::Display for EvictError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EvictError::DiskFull => write!(f, "no free disk block for the victim page"),
            EvictError::NoVictim => write!(f, "clock sweep found no evictable page"),
        }
    }
}

impl std::error::Error for EvictError {}

/// A violated bookkeeping invariant, reported by
/// `MemoryManager::check_consistency`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConsistencyError {
    FreeFrameCount { free: usize, occupied: usize, total: usize },
    FreeBlockCount { free: usize, occupied: usize, total: usize },
    FrameBothFreeAndUsed(FrameIndex),
    BlockBothFreeAndUsed(BlockIndex),
    /// A frame slot names a page that is not resident there.
    DanglingFrame(FrameIndex),
    /// A disk slot names a page that is not swapped out to it.
    DanglingBlock(BlockIndex),
    /// A page table entry disagrees with itself or with the tables.
    BadEntry { pid: ProcessId, vpn: VirtualPageNumber },
}

impl fmt::Display for ConsistencyError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConsistencyError::FreeFrameCount { free, occupied, total } => write!(
                f,
                "{} free + {} occupied frames != {} frames",
                free, occupied, total
            ),
            ConsistencyError::FreeBlockCount { free, occupied, total } => write!(
                f,
                "{} free + {} occupied disk blocks != {} blocks",
                free, occupied, total
            ),
            ConsistencyError::FrameBothFreeAndUsed(frame) => {
                write!(f, "frame {} is both free and occupied", frame)
            }
            ConsistencyError::BlockBothFreeAndUsed(block) => {
                write!(f, "disk block {} is both free and occupied", block)
            }
            ConsistencyError::DanglingFrame(frame) => {
                write!(f, "frame {} has no matching resident page", frame)
            }
            ConsistencyError::DanglingBlock(block) => {
                write!(f, "disk block {} has no matching swapped page", block)
            }
            ConsistencyError::BadEntry { pid, vpn } => {
                write!(f, "inconsistent page table entry for process {}, page {}", pid, vpn)
            }
        }
    }
}

impl std::error::Error for ConsistencyError {}
