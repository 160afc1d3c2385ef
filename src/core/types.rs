/*!
 * Core Types
 * Common types shared across the process subsystem
 */

/// Process ID type
pub type Pid = u32;

/// Thread ID type
pub type Tid = u32;

/// Exit status recorded when a process terminates
pub type ExitStatus = i32;

/// Handle to an address space issued by the memory manager
pub type AddressSpaceId = u64;

/// Size type for memory operations
pub type Size = usize;
