use vmsim::*;

fn occ(pid: ProcessId, vpn: VirtualPageNumber) -> Option<Occupant> {
    Some(Occupant::new(pid, vpn))
}

/// page_size=4, 4 frames, 2 disk blocks; A and B fill RAM.
fn scenario_a() -> (MemoryManager, ProcessIdAllocator, ProcessId, ProcessId) {
    let mut mm = MemoryManager::new(4, 4, 2).unwrap();
    let mut pids = ProcessIdAllocator::new();

    let a = mm.create_process(&mut pids, "A", 8);
    let a_pid = a.pid();
    assert_eq!(a.num_pages_required(), 2);
    mm.allocate_memory(a).unwrap();
    assert_eq!(mm.frame_map(), &[occ(a_pid, 0), occ(a_pid, 1), None, None]);
    assert_eq!(mm.free_frame_count(), 2);

    let b = mm.create_process(&mut pids, "B", 8);
    let b_pid = b.pid();
    mm.allocate_memory(b).unwrap();
    assert_eq!(&mm.frame_map()[2..], &[occ(b_pid, 0), occ(b_pid, 1)]);
    assert_eq!(mm.free_frame_count(), 0);

    (mm, pids, a_pid, b_pid)
}

/// Continues A: C needs one page while RAM is full.
fn scenario_b() -> (MemoryManager, ProcessId, ProcessId, ProcessId) {
    let (mut mm, mut pids, a, b) = scenario_a();

    let c = mm.create_process(&mut pids, "C", 4);
    let c_pid = c.pid();
    mm.allocate_memory(c).unwrap();

    (mm, a, b, c_pid)
}

#[test]
fn scenario_a_fills_ram() {
    let (mm, _, a, b) = scenario_a();
    assert_eq!(mm.process(a).unwrap().state(), ProcessState::Ready);
    assert_eq!(mm.process(b).unwrap().state(), ProcessState::Ready);
    assert_eq!(mm.free_disk_block_count(), 2);
    assert!(mm.check_consistency().is_ok());
}

#[test]
fn scenario_b_evicts_first_frame() {
    let (mm, a, b, c) = scenario_b();

    assert_eq!(mm.disk_map()[0], occ(a, 0));
    assert_eq!(mm.disk_map()[1], None);
    assert_eq!(mm.frame_map()[0], occ(c, 0));
    assert_eq!(mm.free_frame_count(), 0);
    assert_eq!(mm.clock_hand(), 1);

    let pte = *mm.process(a).unwrap().page(0).unwrap();
    assert!(pte.on_disk);
    assert!(!pte.valid);
    assert_eq!(pte.disk_block, Some(0));
    assert_eq!(pte.frame_number, None);

    // The first revolution cleared every other use bit
    assert!(!mm.process(a).unwrap().page(1).unwrap().use_bit);
    assert!(!mm.process(b).unwrap().page(0).unwrap().use_bit);
    assert!(mm.process(c).unwrap().page(0).unwrap().use_bit);

    assert_eq!(mm.stats().swap_outs, 1);
    assert!(mm.check_consistency().is_ok());
}

#[test]
fn scenario_c_swap_in_evicts_again() {
    let (mut mm, a, _, _) = scenario_b();

    let t = mm.translate_detailed(a, 0).unwrap();
    assert_eq!(t.kind, AccessKind::SwapIn);
    assert_eq!(t.physical.as_u64() % 4, 0);
    assert_eq!(mm.disk_map()[0], None);

    // Hand was at frame 1, whose page (A:1) had lost its second chance
    assert_eq!(t.frame, 1);
    assert_eq!(mm.disk_map()[1], occ(a, 1));
    assert_eq!(mm.frame_map()[1], occ(a, 0));
    assert_eq!(mm.free_disk_block_count(), 1);
    assert_eq!(mm.free_frame_count(), 0);
    assert!(mm.check_consistency().is_ok());
}

#[test]
fn scenario_d_segmentation_fault() {
    let (mut mm, a, _, _) = scenario_b();
    let frames_before = mm.frame_map().to_vec();

    let err = mm.translate(a, 100).unwrap_err();
    assert_eq!(err, Fault::SegmentationFault { pid: a, page: 25, num_pages: 2 });
    assert_eq!(mm.frame_map(), &frames_before[..]);
}

#[test]
fn scenario_e_oversized_process() {
    let (mut mm, mut pids, a, b) = scenario_a();
    let frames_before = mm.frame_map().to_vec();
    let disk_before = mm.disk_map().to_vec();

    let big = mm.create_process(&mut pids, "E", 20);
    let big_pid = big.pid();
    assert_eq!(big.num_pages_required(), 5);

    assert_eq!(
        mm.allocate_memory(big),
        Err(AllocError::OversizedProcess { pid: big_pid, required: 5, capacity: 4 })
    );
    assert_eq!(mm.frame_map(), &frames_before[..]);
    assert_eq!(mm.disk_map(), &disk_before[..]);
    assert_eq!(mm.free_frame_count(), 0);
    assert_eq!(mm.free_disk_block_count(), 2);
    let registered: Vec<_> = mm.processes().map(|p| p.pid()).collect();
    assert_eq!(registered, vec![a, b]);
}

#[test]
fn round_trip_restores_free_counts() {
    let (mut mm, a, b, c) = scenario_b();
    mm.translate(a, 0).unwrap();

    for pid in [a, b, c] {
        let retired = mm.deallocate_memory(pid).unwrap();
        assert_eq!(retired.state(), ProcessState::Terminated);
    }
    assert_eq!(mm.free_frame_count(), 4);
    assert_eq!(mm.free_disk_block_count(), 2);
    assert!(mm.processes().next().is_none());

    assert_eq!(mm.translate(a, 0), Err(Fault::ProcessNotFound(a)));
    assert_eq!(mm.deallocate_memory(a).unwrap_err(), DeallocError::ProcessNotFound(a));
}

#[test]
fn swap_disabled_fails_eviction() {
    let mut sim = Simulation::new(MemoryConfig::new(4, 2, 0)).unwrap();
    sim.spawn("a", 8).unwrap();
    let err = sim.spawn("b", 4).unwrap_err();
    assert!(matches!(err, AllocError::OutOfMemory(_)));
    assert!(sim.memory().check_consistency().is_ok());
}
