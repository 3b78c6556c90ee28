use crate::constants::*;
use crate::error::ConfigError;

/// Geometry of a simulated machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MemoryConfig {
    pub page_size: u32,
    pub num_frames: u32,
    /// Zero disables swapping.
    pub num_disk_blocks: u32,
}

impl MemoryConfig {
    pub fn new(page_size: u32, num_frames: u32, num_disk_blocks: u32) -> Self {
        MemoryConfig { page_size, num_frames, num_disk_blocks }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.page_size == 0 {
            return Err(ConfigError::ZeroPageSize);
        }
        if self.num_frames == 0 {
            return Err(ConfigError::ZeroFrames);
        }
        Ok(())
    }

    /// Bytes of simulated RAM.
    pub fn memory_size(&self) -> u64 {
        u64::from(self.page_size) * u64::from(self.num_frames)
    }

    /// Bytes of simulated swap.
    pub fn disk_size(&self) -> u64 {
        u64::from(self.page_size) * u64::from(self.num_disk_blocks)
    }
}

impl Default for MemoryConfig {
    fn default() -> Self {
        MemoryConfig {
            page_size: DEFAULT_PAGE_SIZE,
            num_frames: DEFAULT_NUM_FRAMES,
            num_disk_blocks: DEFAULT_NUM_DISK_BLOCKS,
        }
    }
}
