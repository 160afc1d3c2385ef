/*!
 * Process Lifecycle Core
 * Process creation, parent/child tracking, termination, and blocking
 * wait-for-child, exposed as a library
 */

pub mod core;
pub mod memory;
pub mod process;

// Re-exports
pub use crate::core::sync::{ParkQueue, WaitToken, WakeResult};
pub use crate::core::types::{AddressSpaceId, ExitStatus, Pid, Tid};
pub use memory::{AddressSpace, MemoryError, MemoryManager, MemoryStats};
pub use process::{
    Process, ProcessError, ProcessInfo, ProcessLifecycle, ProcessResult, ProcessState,
    ProcessTable, ProcessTree, Reaped, WaitCoordinator, WaitTarget,
};
