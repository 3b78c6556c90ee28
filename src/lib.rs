pub mod config;
pub mod constants;
pub mod error;
pub mod io;
pub mod memory;
pub mod process;
pub mod session;
pub mod translation;
pub mod vm_manager;

// Re-export commonly used items for convenience
pub use config::MemoryConfig;
pub use constants::*;
pub use error::{AllocError, ConfigError, ConsistencyError, DeallocError, Fault};
pub use memory::{BlockIndex, FrameIndex, Occupant};
pub use process::{
    PageTableEntry, ProcessDescriptor, ProcessId, ProcessIdAllocator, ProcessState,
    VirtualPageNumber,
};
pub use session::Simulation;
pub use translation::{AccessKind, PhysicalAddress, Translation, VirtualAddress};
pub use vm_manager::{MemoryManager, PagingStats};
