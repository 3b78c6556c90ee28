// Default geometry: 4 KiB pages, 128 KiB of RAM, 256 KiB of swap.
pub const DEFAULT_PAGE_SIZE: u32 = 4 * 1024;
pub const MEMORY_SIZE: u32 = 128 * 1024;
pub const DISK_SIZE: u32 = 256 * 1024;

pub const DEFAULT_NUM_FRAMES: u32 = MEMORY_SIZE / DEFAULT_PAGE_SIZE;
pub const DEFAULT_NUM_DISK_BLOCKS: u32 = DISK_SIZE / DEFAULT_PAGE_SIZE;

/// Number of full revolutions the clock hand may make before giving up.
pub const CLOCK_MAX_CYCLES: usize = 2;

/// First pid handed out by a fresh `ProcessIdAllocator`.
pub const FIRST_PID: u32 = 1;
