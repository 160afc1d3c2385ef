/*!
 * Memory Management
 * Simulated address-space creation and teardown
 */

use super::types::{AddressSpace, MemoryError, MemoryResult, MemoryStats};
use crate::core::limits::{DEFAULT_MEMORY_POOL, DEFAULT_SPACE_SIZE};
use crate::core::types::{AddressSpaceId, Pid, Size};
use dashmap::DashMap;
use log::{debug, info};
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;

/// Manages address spaces against a fixed simulated memory pool
///
/// `create_space` charges a space against the pool and fails cleanly when
/// the pool is exhausted. `destroy_space` expects exactly one call per
/// created space; a second call reports `SpaceNotFound`.
pub struct MemoryManager {
    spaces: Arc<DashMap<AddressSpaceId, AddressSpace>>,
    next_space_id: Arc<AtomicU64>,
    used: Arc<AtomicUsize>,
    capacity: usize,
}

impl MemoryManager {
    /// Create a manager with the default pool capacity
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_MEMORY_POOL)
    }

    /// Create a manager with an explicit pool capacity in bytes
    pub fn with_capacity(capacity: usize) -> Self {
        info!("Memory manager initialized with {} bytes", capacity);
        Self {
            spaces: Arc::new(DashMap::new()),
            next_space_id: Arc::new(AtomicU64::new(1)),
            used: Arc::new(AtomicUsize::new(0)),
            capacity,
        }
    }

    /// Create an address space for `owner` with the default size
    pub fn create_space(&self, owner: Pid) -> MemoryResult<AddressSpaceId> {
        self.create_space_sized(owner, DEFAULT_SPACE_SIZE)
    }

    /// Create an address space of `size` bytes for `owner`
    pub fn create_space_sized(&self, owner: Pid, size: Size) -> MemoryResult<AddressSpaceId> {
        let mut used = self.used.load(Ordering::Relaxed);
        loop {
            let new_used = used.saturating_add(size);
            if new_used > self.capacity {
                return Err(MemoryError::OutOfMemory {
                    requested: size,
                    available: self.capacity.saturating_sub(used),
                    used,
                    total: self.capacity,
                });
            }
            match self.used.compare_exchange(
                used,
                new_used,
                Ordering::Relaxed,
                Ordering::Relaxed,
            ) {
                Ok(_) => break,
                Err(observed) => used = observed,
            }
        }

        let id = self.next_space_id.fetch_add(1, Ordering::SeqCst);
        self.spaces.insert(
            id,
            AddressSpace {
                id,
                size,
                owner_pid: owner,
            },
        );
        debug!("Created address space {} ({} bytes) for PID {}", id, size, owner);
        Ok(id)
    }

    /// Destroy an address space, returning the freed byte count
    ///
    /// Valid exactly once per created space.
    pub fn destroy_space(&self, id: AddressSpaceId) -> MemoryResult<Size> {
        let (_, space) = self
            .spaces
            .remove(&id)
            .ok_or(MemoryError::SpaceNotFound(id))?;
        self.used.fetch_sub(space.size, Ordering::Relaxed);
        debug!(
            "Destroyed address space {} ({} bytes, PID {})",
            id, space.size, space.owner_pid
        );
        Ok(space.size)
    }

    /// Look up address-space metadata
    pub fn space_info(&self, id: AddressSpaceId) -> Option<AddressSpace> {
        self.spaces.get(&id).map(|r| r.value().clone())
    }

    /// Number of live address spaces
    pub fn active_spaces(&self) -> usize {
        self.spaces.len()
    }

    /// Pool usage statistics
    pub fn stats(&self) -> MemoryStats {
        let used = self.used.load(Ordering::Relaxed);
        MemoryStats {
            total_memory: self.capacity,
            used_memory: used,
            available_memory: self.capacity.saturating_sub(used),
            active_spaces: self.spaces.len(),
        }
    }
}

impl Clone for MemoryManager {
    fn clone(&self) -> Self {
        Self {
            spaces: Arc::clone(&self.spaces),
            next_space_id: Arc::clone(&self.next_space_id),
            used: Arc::clone(&self.used),
            capacity: self.capacity,
        }
    }
}

impl Default for MemoryManager {
    fn default() -> Self {
        Self::new()
    }
}
