use crate::config::MemoryConfig;
use crate::error::{AllocError, ConfigError, DeallocError, Fault};
use crate::process::{ProcessDescriptor, ProcessId, ProcessIdAllocator};
use crate::translation::Translation;
use crate::vm_manager::MemoryManager;

/// One simulation run: a memory manager plus the pid counter feeding it.
pub struct Simulation {
    config: MemoryConfig,
    memory: MemoryManager,
    pids: ProcessIdAllocator,
}

impl Simulation {
    pub fn new(config: MemoryConfig) -> Result<Self, ConfigError> {
        Ok(Simulation {
            memory: MemoryManager::from_config(&config)?,
            config,
            pids: ProcessIdAllocator::new(),
        })
    }

    pub fn config(&self) -> &MemoryConfig {
        &self.config
    }

    pub fn memory(&self) -> &MemoryManager {
        &self.memory
    }

    pub fn memory_mut(&mut self) -> &mut MemoryManager {
        &mut self.memory
    }

    /// Build a descriptor without allocating it.
    pub fn create_process(&mut self, name: &str, memory_requirement: u64) -> ProcessDescriptor {
        self.memory.create_process(&mut self.pids, name, memory_requirement)
    }

    /// Create a process and allocate its memory in one step.
    ///
    /// The pid is consumed even when allocation fails.
    pub fn spawn(&mut self, name: &str, memory_requirement: u64) -> Result<ProcessId, AllocError> {
        let process = self.create_process(name, memory_requirement);
        let pid = process.pid();
        self.memory.allocate_memory(process)?;
        Ok(pid)
    }

    pub fn access(&mut self, pid: ProcessId, virtual_address: u64) -> Result<Translation, Fault> {
        self.memory.translate_detailed(pid, virtual_address)
    }

    pub fn release(&mut self, pid: ProcessId) -> Result<ProcessDescriptor, DeallocError> {
        self.memory.deallocate_memory(pid)
    }

    /// Start over with empty memory and pids counting from the beginning.
    pub fn reset(&mut self) {
        log::info!("resetting simulation");
        // Geometry was validated in `new`
        if let Ok(memory) = MemoryManager::from_config(&self.config) {
            self.memory = memory;
        }
        self.pids = ProcessIdAllocator::new();
    }
}
