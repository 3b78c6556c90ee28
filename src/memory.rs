use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use crate::constants::CLOCK_MAX_CYCLES;
use crate::error::EvictError;
use crate::process::{PageTableEntry, ProcessDescriptor, ProcessId, VirtualPageNumber};

pub type FrameIndex = usize;
pub type BlockIndex = usize;

/// Processes known to the manager, keyed by pid.
pub type Registry = BTreeMap<ProcessId, ProcessDescriptor>;

/// Which page sits in a frame or disk block.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Occupant {
    pub pid: ProcessId,
    pub vpn: VirtualPageNumber,
}

impl Occupant {
    pub const fn new(pid: ProcessId, vpn: VirtualPageNumber) -> Self {
        Occupant { pid, vpn }
    }
}

impl fmt::Display for Occupant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "P{}:{}", self.pid, self.vpn)
    }
}

/// A page picked by the clock sweep, with the frame it occupies.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Victim {
    pub occupant: Occupant,
    pub frame: FrameIndex,
}

/// Outcome of a completed swap-out.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Eviction {
    pub victim: Occupant,
    pub frame: FrameIndex,
    pub block: BlockIndex,
}

fn lookup_pte<'a>(registry: &'a mut Registry, occupant: Occupant) -> Option<&'a mut PageTableEntry> {
    registry
        .get_mut(&occupant.pid)
        .and_then(|process| process.page_table.get_mut(&occupant.vpn))
}

/// Owns the RAM frame pool and the swap block pool.
///
/// Free indices are kept in ordered sets so the lowest free frame or block
/// is always handed out first.
#[derive(Debug, Clone)]
pub struct FrameAllocator {
    frame_table: Vec<Option<Occupant>>,
    disk_blocks: Vec<Option<Occupant>>,
    free_frames: BTreeSet<FrameIndex>,
    free_disk_blocks: BTreeSet<BlockIndex>,
    clock_hand: FrameIndex,
    last_sweep_len: usize,
}

impl FrameAllocator {
    pub fn new(num_frames: usize, num_disk_blocks: usize) -> Self {
        FrameAllocator {
            frame_table: vec![None; num_frames],
            disk_blocks: vec![None; num_disk_blocks],
            free_frames: (0..num_frames).collect(),
            free_disk_blocks: (0..num_disk_blocks).collect(),
            clock_hand: 0,
            last_sweep_len: 0,
        }
    }

    #[inline]
    pub fn num_frames(&self) -> usize {
        self.frame_table.len()
    }

    #[inline]
    pub fn num_disk_blocks(&self) -> usize {
        self.disk_blocks.len()
    }

    #[inline]
    pub fn free_frame_count(&self) -> usize {
        self.free_frames.len()
    }

    #[inline]
    pub fn free_disk_block_count(&self) -> usize {
        self.free_disk_blocks.len()
    }

    pub fn frame_map(&self) -> &[Option<Occupant>] {
        &self.frame_table
    }

    pub fn disk_map(&self) -> &[Option<Occupant>] {
        &self.disk_blocks
    }

    pub fn clock_hand(&self) -> FrameIndex {
        self.clock_hand
    }

    /// Number of slots the most recent clock sweep inspected.
    pub fn last_sweep_len(&self) -> usize {
        self.last_sweep_len
    }

    pub(crate) fn is_frame_free(&self, frame: FrameIndex) -> bool {
        self.free_frames.contains(&frame)
    }

    pub(crate) fn is_block_free(&self, block: BlockIndex) -> bool {
        self.free_disk_blocks.contains(&block)
    }

    /// Claim the lowest free frame for `occupant`.
    pub fn take_frame(&mut self, occupant: Occupant) -> Option<FrameIndex> {
        let frame = self.free_frames.pop_first()?;
        self.frame_table[frame] = Some(occupant);
        Some(frame)
    }

    /// Return `frame` to the free pool.
    pub fn release_frame(&mut self, frame: FrameIndex) {
        self.frame_table[frame] = None;
        self.free_frames.insert(frame);
    }

    /// Return disk `block` to the free pool.
    pub fn release_block(&mut self, block: BlockIndex) {
        self.disk_blocks[block] = None;
        self.free_disk_blocks.insert(block);
    }

    /// Second-chance sweep starting at the clock hand.
    ///
    /// A page with its use bit set has the bit cleared and is skipped; the
    /// first page found with a clear bit is the victim and the hand is left
    /// just past it. Gives up after `CLOCK_MAX_CYCLES` full revolutions.
    pub fn select_victim(&mut self, registry: &mut Registry) -> Option<Victim> {
        let num_frames = self.frame_table.len();
        let budget = CLOCK_MAX_CYCLES * num_frames;

        for step in 0..budget {
            let hand = self.clock_hand;
            self.clock_hand = (hand + 1) % num_frames;

            let Some(occupant) = self.frame_table[hand] else {
                continue;
            };

            let Some(pte) = lookup_pte(registry, occupant) else {
                log::error!("frame {} holds {} but no such page table entry exists", hand, occupant);
                continue;
            };

            if pte.use_bit {
                log::trace!("clock: frame {} ({}) gets a second chance", hand, occupant);
                pte.use_bit = false;
            } else {
                self.last_sweep_len = step + 1;
                return Some(Victim { occupant, frame: hand });
            }
        }

        self.last_sweep_len = budget;
        log::error!(
            "clock sweep made {} full cycles over {} frames without finding a victim",
            CLOCK_MAX_CYCLES,
            num_frames
        );
        None
    }

    /// Swap one page out to disk, freeing its frame.
    ///
    /// Fails without touching the clock hand or any use bit when no disk
    /// block is free.
    pub fn evict(&mut self, registry: &mut Registry) -> Result<Eviction, EvictError> {
        if self.free_disk_blocks.is_empty() {
            return Err(EvictError::DiskFull);
        }

        let victim = self.select_victim(registry).ok_or(EvictError::NoVictim)?;
        let pte = lookup_pte(registry, victim.occupant).ok_or(EvictError::NoVictim)?;
        let block = self.free_disk_blocks.pop_first().ok_or(EvictError::DiskFull)?;

        pte.swap_out(block);
        self.disk_blocks[block] = Some(victim.occupant);
        self.release_frame(victim.frame);

        log::debug!(
            "swap out: {} from frame {} to disk block {}",
            victim.occupant,
            victim.frame,
            block
        );

        Ok(Eviction {
            victim: victim.occupant,
            frame: victim.frame,
            block,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Build an allocator and registry where process 1 holds `pages`
    /// resident pages, one per frame starting at frame 0.
    fn setup_full(num_frames: usize, num_blocks: usize, pages: u32) -> (FrameAllocator, Registry) {
        let mut fa = FrameAllocator::new(num_frames, num_blocks);
        let mut registry = Registry::new();
        let pid = ProcessId::new(1);
        let mut process = ProcessDescriptor::new(pid, "p1", u64::from(pages) * 4, 4);

        for vpn in 0..pages {
            let frame = fa.take_frame(Occupant::new(pid, vpn)).unwrap();
            process.page_table.insert(vpn, PageTableEntry::resident(frame));
        }
        registry.insert(pid, process);
        (fa, registry)
    }

    #[test]
    fn test_initialization() {
        let fa = FrameAllocator::new(8, 4);
        assert_eq!(fa.num_frames(), 8);
        assert_eq!(fa.num_disk_blocks(), 4);
        assert_eq!(fa.free_frame_count(), 8);
        assert_eq!(fa.free_disk_block_count(), 4);
        assert!(fa.frame_map().iter().all(Option::is_none));
        assert!(fa.disk_map().iter().all(Option::is_none));
        assert_eq!(fa.clock_hand(), 0);
    }

    #[test]
    fn test_take_lowest_frame_first() {
        let mut fa = FrameAllocator::new(4, 0);
        let occ = Occupant::new(ProcessId::new(1), 0);
        assert_eq!(fa.take_frame(occ), Some(0));
        assert_eq!(fa.take_frame(occ), Some(1));

        fa.release_frame(0);
        assert!(fa.is_frame_free(0));
        assert_eq!(fa.frame_map()[0], None);
        assert_eq!(fa.take_frame(occ), Some(0));
    }

    #[test]
    fn test_take_frame_exhausted() {
        let mut fa = FrameAllocator::new(1, 0);
        let occ = Occupant::new(ProcessId::new(1), 0);
        assert_eq!(fa.take_frame(occ), Some(0));
        assert_eq!(fa.take_frame(occ), None);
    }

    #[test]
    fn test_select_victim_second_chance() {
        let (mut fa, mut registry) = setup_full(4, 2, 4);

        // All use bits set: first revolution clears them, then frame 0 goes
        let victim = fa.select_victim(&mut registry).unwrap();
        assert_eq!(victim.frame, 0);
        assert_eq!(victim.occupant, Occupant::new(ProcessId::new(1), 0));
        assert_eq!(fa.clock_hand(), 1);
        assert_eq!(fa.last_sweep_len(), 5);

        let process = &registry[&ProcessId::new(1)];
        assert!(process.page_table.values().all(|pte| !pte.use_bit));
    }

    #[test]
    fn test_select_victim_skips_recently_used() {
        let (mut fa, mut registry) = setup_full(3, 2, 3);
        let pid = ProcessId::new(1);
        for pte in registry.get_mut(&pid).unwrap().page_table.values_mut() {
            pte.use_bit = false;
        }
        registry.get_mut(&pid).unwrap().page_table.get_mut(&0).unwrap().use_bit = true;

        let victim = fa.select_victim(&mut registry).unwrap();
        assert_eq!(victim.frame, 1);
        assert!(!registry[&pid].page_table[&0].use_bit);
        assert_eq!(fa.clock_hand(), 2);
    }

    #[test]
    fn test_select_victim_skips_free_slots() {
        let (mut fa, mut registry) = setup_full(4, 2, 2);
        fa.clock_hand = 2;
        let victim = fa.select_victim(&mut registry).unwrap();
        // Frames 2 and 3 are empty, hand wraps to 0, clears 0 and 1, then picks 0
        assert_eq!(victim.frame, 0);
        assert!(fa.last_sweep_len() <= 2 * fa.num_frames());
    }

    #[test]
    fn test_select_victim_empty_table_is_bounded() {
        let mut fa = FrameAllocator::new(4, 2);
        let mut registry = Registry::new();
        assert_eq!(fa.select_victim(&mut registry), None);
        assert_eq!(fa.last_sweep_len(), 8);
    }

    #[test]
    fn test_evict_moves_page_to_disk() {
        let (mut fa, mut registry) = setup_full(2, 2, 2);
        let eviction = fa.evict(&mut registry).unwrap();

        assert_eq!(eviction.frame, 0);
        assert_eq!(eviction.block, 0);
        assert_eq!(fa.free_frame_count(), 1);
        assert_eq!(fa.free_disk_block_count(), 1);
        assert_eq!(fa.frame_map()[0], None);
        assert_eq!(fa.disk_map()[0], Some(eviction.victim));

        let pte = registry[&ProcessId::new(1)].page_table[&0];
        assert!(!pte.valid);
        assert!(pte.on_disk);
        assert_eq!(pte.disk_block, Some(0));
        assert_eq!(pte.frame_number, None);
    }

    #[test]
    fn test_evict_disk_full_leaves_state_alone() {
        let (mut fa, mut registry) = setup_full(2, 0, 2);
        assert_eq!(fa.evict(&mut registry), Err(EvictError::DiskFull));
        assert_eq!(fa.clock_hand(), 0);
        assert!(registry[&ProcessId::new(1)].page_table.values().all(|pte| pte.use_bit));
        assert_eq!(fa.free_frame_count(), 0);
    }

    #[test]
    fn test_evict_nothing_resident() {
        let mut fa = FrameAllocator::new(2, 2);
        let mut registry = Registry::new();
        assert_eq!(fa.evict(&mut registry), Err(EvictError::NoVictim));
        assert_eq!(fa.free_disk_block_count(), 2);
    }

    #[test]
    fn test_release_block() {
        let (mut fa, mut registry) = setup_full(2, 2, 2);
        let eviction = fa.evict(&mut registry).unwrap();
        fa.release_block(eviction.block);
        assert!(fa.is_block_free(eviction.block));
        assert_eq!(fa.disk_map()[eviction.block], None);
    }
}
