//! The memory manager: process registry, allocation, deallocation and
//! demand-paged address translation on top of a [`FrameAllocator`].

use crate::config::MemoryConfig;
use crate::error::{AllocError, ConfigError, ConsistencyError, DeallocError, EvictError, Fault};
use crate::memory::{FrameAllocator, FrameIndex, Occupant, Registry};
use crate::process::{
    PageTableEntry, ProcessDescriptor, ProcessId, ProcessIdAllocator, ProcessState,
    VirtualPageNumber,
};
use crate::translation::{AccessKind, PhysicalAddress, Translation, VirtualAddress};

/// Counters accumulated over the manager's lifetime.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PagingStats {
    pub hits: u64,
    pub page_faults: u64,
    pub swap_ins: u64,
    pub swap_outs: u64,
}

pub struct MemoryManager {
    page_size: u32,
    frames: FrameAllocator,
    registry: Registry,
    stats: PagingStats,
}

impl MemoryManager {
    /// `page_size` and `num_frames` must be positive. A zero
    /// `num_disk_blocks` disables swapping.
    pub fn new(page_size: u32, num_frames: u32, num_disk_blocks: u32) -> Result<Self, ConfigError> {
        Self::from_config(&MemoryConfig::new(page_size, num_frames, num_disk_blocks))
    }

    pub fn from_config(config: &MemoryConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(MemoryManager {
            page_size: config.page_size,
            frames: FrameAllocator::new(config.num_frames as usize, config.num_disk_blocks as usize),
            registry: Registry::new(),
            stats: PagingStats::default(),
        })
    }

    /// Build a `New` descriptor sized for this manager's page size.
    pub fn create_process(
        &self,
        pids: &mut ProcessIdAllocator,
        name: impl Into<String>,
        memory_requirement: u64,
    ) -> ProcessDescriptor {
        ProcessDescriptor::new(pids.next_pid(), name, memory_requirement, self.page_size)
    }

    /// Bind every page of `process` to a frame and register it.
    ///
    /// Evicts other pages as needed. On failure the process is not
    /// registered and none of its pages are committed; pages already swapped
    /// out to make room stay on disk.
    pub fn allocate_memory(&mut self, mut process: ProcessDescriptor) -> Result<(), AllocError> {
        let pid = process.pid();
        let required = process.num_pages_required();

        if required as usize > self.frames.num_frames() {
            log::warn!(
                "PID {} requires {} pages but RAM holds only {} frames",
                pid,
                required,
                self.frames.num_frames()
            );
            return Err(AllocError::OversizedProcess {
                pid,
                required,
                capacity: self.frames.num_frames() as u32,
            });
        }

        if self.registry.contains_key(&pid) || process.state() != ProcessState::New {
            log::warn!("PID {} already has memory allocated or was retired", pid);
            return Err(AllocError::DuplicateProcess(pid));
        }

        if let Err(err) = self.make_room(required as usize) {
            log::warn!("cannot make room for PID {}: {}", pid, err);
            return Err(AllocError::OutOfMemory(pid));
        }

        let mut frames: Vec<FrameIndex> = Vec::with_capacity(required as usize);
        for vpn in 0..required {
            match self.frames.take_frame(Occupant::new(pid, vpn)) {
                Some(frame) => frames.push(frame),
                None => {
                    for frame in frames {
                        self.frames.release_frame(frame);
                    }
                    return Err(AllocError::OutOfMemory(pid));
                }
            }
        }

        process.page_table.clear();
        for (vpn, &frame) in (0..required).zip(&frames) {
            process.page_table.insert(vpn, PageTableEntry::resident(frame));
        }
        process.state = ProcessState::Ready;

        log::info!(
            "allocated {} pages (frames {:?}) to PID {} ({})",
            required,
            frames,
            pid,
            process.name()
        );
        self.registry.insert(pid, process);
        Ok(())
    }

    /// Release every frame and disk block held by `pid` and retire it.
    /// The terminated descriptor is handed back.
    pub fn deallocate_memory(&mut self, pid: ProcessId) -> Result<ProcessDescriptor, DeallocError> {
        let Some(mut process) = self.registry.remove(&pid) else {
            log::warn!("PID {} not found for deallocation", pid);
            return Err(DeallocError::ProcessNotFound(pid));
        };

        let mut frames_freed = 0;
        let mut blocks_freed = 0;
        for pte in std::mem::take(&mut process.page_table).into_values() {
            if let (true, Some(frame)) = (pte.valid, pte.frame_number) {
                self.frames.release_frame(frame);
                frames_freed += 1;
            }
            if let (true, Some(block)) = (pte.on_disk, pte.disk_block) {
                self.frames.release_block(block);
                blocks_freed += 1;
            }
        }
        process.state = ProcessState::Terminated;

        log::info!(
            "deallocated {} frames and {} disk blocks from PID {} ({})",
            frames_freed,
            blocks_freed,
            pid,
            process.name()
        );
        Ok(process)
    }

    /// Translate `virtual_address` of `pid` to a physical address, serving
    /// page faults on the way.
    pub fn translate(&mut self, pid: ProcessId, virtual_address: u64) -> Result<PhysicalAddress, Fault> {
        self.translate_detailed(pid, virtual_address).map(|t| t.physical)
    }

    /// Like [`translate`](Self::translate), also reporting the frame and
    /// whether the access faulted.
    pub fn translate_detailed(&mut self, pid: ProcessId, virtual_address: u64) -> Result<Translation, Fault> {
        let process = self.registry.get(&pid).ok_or(Fault::ProcessNotFound(pid))?;
        let address = VirtualAddress::from_raw(virtual_address, self.page_size);

        let num_pages = process.num_pages_required();
        if address.page >= u64::from(num_pages) {
            return Err(Fault::SegmentationFault {
                pid,
                page: address.page,
                num_pages,
            });
        }
        let vpn = address.page as VirtualPageNumber;

        let resident = process
            .page(vpn)
            .and_then(|pte| if pte.valid { pte.frame_number } else { None });

        let (frame, kind) = match resident {
            Some(frame) => {
                if let Some(pte) = self.pte_mut(pid, vpn) {
                    pte.use_bit = true;
                }
                self.stats.hits += 1;
                (frame, AccessKind::Hit)
            }
            None => self.handle_page_fault(pid, vpn)?,
        };

        Ok(Translation {
            virtual_address: address,
            physical: PhysicalAddress::from_frame(frame, self.page_size, address.offset),
            frame,
            kind,
        })
    }

    /// Load `vpn` of `pid` into a frame, evicting first if RAM is full.
    fn handle_page_fault(
        &mut self,
        pid: ProcessId,
        vpn: VirtualPageNumber,
    ) -> Result<(FrameIndex, AccessKind), Fault> {
        self.stats.page_faults += 1;
        let out_of_memory = Fault::OutOfMemory { pid, page: vpn };

        if let Err(err) = self.make_room(1) {
            log::warn!("page fault for PID {}, page {} failed: {}", pid, vpn, err);
            return Err(out_of_memory);
        }
        let frame = self
            .frames
            .take_frame(Occupant::new(pid, vpn))
            .ok_or(out_of_memory)?;

        let Some(process) = self.registry.get_mut(&pid) else {
            self.frames.release_frame(frame);
            return Err(Fault::ProcessNotFound(pid));
        };
        let pte = process.page_table.entry(vpn).or_default();

        let kind = match pte.load(frame) {
            Some(block) => {
                self.frames.release_block(block);
                self.stats.swap_ins += 1;
                log::debug!(
                    "page fault: PID {}, page {} swapped in from disk block {} to frame {}",
                    pid,
                    vpn,
                    block,
                    frame
                );
                AccessKind::SwapIn
            }
            None => {
                log::debug!("page fault: PID {}, page {} loaded fresh into frame {}", pid, vpn, frame);
                AccessKind::FirstTouch
            }
        };
        Ok((frame, kind))
    }

    /// Evict until at least `wanted` frames are free.
    fn make_room(&mut self, wanted: usize) -> Result<(), EvictError> {
        while self.frames.free_frame_count() < wanted {
            self.frames.evict(&mut self.registry)?;
            self.stats.swap_outs += 1;
        }
        Ok(())
    }

    fn pte_mut(&mut self, pid: ProcessId, vpn: VirtualPageNumber) -> Option<&mut PageTableEntry> {
        self.registry
            .get_mut(&pid)
            .and_then(|process| process.page_table.get_mut(&vpn))
    }

    pub fn page_size(&self) -> u32 {
        self.page_size
    }

    pub fn num_frames(&self) -> usize {
        self.frames.num_frames()
    }

    pub fn num_disk_blocks(&self) -> usize {
        self.frames.num_disk_blocks()
    }

    pub fn frame_map(&self) -> &[Option<Occupant>] {
        self.frames.frame_map()
    }

    pub fn disk_map(&self) -> &[Option<Occupant>] {
        self.frames.disk_map()
    }

    pub fn free_frame_count(&self) -> usize {
        self.frames.free_frame_count()
    }

    pub fn free_disk_block_count(&self) -> usize {
        self.frames.free_disk_block_count()
    }

    pub fn clock_hand(&self) -> FrameIndex {
        self.frames.clock_hand()
    }

    /// Slots inspected by the most recent clock sweep.
    pub fn last_sweep_len(&self) -> usize {
        self.frames.last_sweep_len()
    }

    pub fn stats(&self) -> PagingStats {
        self.stats
    }

    pub fn process(&self, pid: ProcessId) -> Option<&ProcessDescriptor> {
        self.registry.get(&pid)
    }

    /// Registered processes in pid order.
    pub fn processes(&self) -> impl Iterator<Item = &ProcessDescriptor> {
        self.registry.values()
    }

    /// Verify the frame and disk tables agree with every page table.
    pub fn check_consistency(&self) -> Result<(), ConsistencyError> {
        let frame_map = self.frames.frame_map();
        let disk_map = self.frames.disk_map();

        let occupied = frame_map.iter().filter(|slot| slot.is_some()).count();
        if self.free_frame_count() + occupied != frame_map.len() {
            return Err(ConsistencyError::FreeFrameCount {
                free: self.free_frame_count(),
                occupied,
                total: frame_map.len(),
            });
        }
        let occupied = disk_map.iter().filter(|slot| slot.is_some()).count();
        if self.free_disk_block_count() + occupied != disk_map.len() {
            return Err(ConsistencyError::FreeBlockCount {
                free: self.free_disk_block_count(),
                occupied,
                total: disk_map.len(),
            });
        }

        for (frame, slot) in frame_map.iter().enumerate() {
            let Some(occupant) = slot else { continue };
            if self.frames.is_frame_free(frame) {
                return Err(ConsistencyError::FrameBothFreeAndUsed(frame));
            }
            let resident = self
                .lookup(*occupant)
                .is_some_and(|pte| pte.valid && pte.frame_number == Some(frame));
            if !resident {
                return Err(ConsistencyError::DanglingFrame(frame));
            }
        }

        for (block, slot) in disk_map.iter().enumerate() {
            let Some(occupant) = slot else { continue };
            if self.frames.is_block_free(block) {
                return Err(ConsistencyError::BlockBothFreeAndUsed(block));
            }
            let swapped = self
                .lookup(*occupant)
                .is_some_and(|pte| pte.on_disk && pte.disk_block == Some(block));
            if !swapped {
                return Err(ConsistencyError::DanglingBlock(block));
            }
        }

        for process in self.registry.values() {
            for (&vpn, pte) in process.page_table() {
                let occupant = Occupant::new(process.pid(), vpn);
                let frame_ok = match pte.frame_number {
                    Some(frame) => frame_map.get(frame) == Some(&Some(occupant)),
                    None => true,
                };
                let block_ok = match pte.disk_block {
                    Some(block) => disk_map.get(block) == Some(&Some(occupant)),
                    None => true,
                };
                if !(pte.is_consistent() && frame_ok && block_ok) {
                    return Err(ConsistencyError::BadEntry { pid: process.pid(), vpn });
                }
            }
        }

        Ok(())
    }

    fn lookup(&self, occupant: Occupant) -> Option<&PageTableEntry> {
        self.registry
            .get(&occupant.pid)
            .and_then(|process| process.page(occupant.vpn))
    }
}
