/*!
 * Memory Types
 * Common types for address-space management
 */

use crate::core::types::{AddressSpaceId, Pid, Size};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Memory operation result
pub type MemoryResult<T> = Result<T, MemoryError>;

/// Memory errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MemoryError {
    #[error("out of memory: requested {requested} bytes, available {available} bytes ({used} used / {total} total)")]
    OutOfMemory {
        requested: usize,
        available: usize,
        used: usize,
        total: usize,
    },

    #[error("address space not found: {0}")]
    SpaceNotFound(AddressSpaceId),
}

/// Address-space metadata
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AddressSpace {
    pub id: AddressSpaceId,
    pub size: Size,
    pub owner_pid: Pid,
}

/// Memory statistics
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MemoryStats {
    pub total_memory: usize,
    pub used_memory: usize,
    pub available_memory: usize,
    pub active_spaces: usize,
}
