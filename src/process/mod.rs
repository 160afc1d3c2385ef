/*!
 * Process Module
 * Process table, tree, lifecycle, and wait-for-child coordination
 */

pub mod lifecycle;
pub mod table;
pub mod tree;
pub mod types;
pub mod wait;

// Re-export for convenience
pub use lifecycle::ProcessLifecycle;
pub use table::ProcessTable;
pub use tree::ProcessTree;
pub use types::{Process, ProcessError, ProcessInfo, ProcessResult, ProcessState};
pub use wait::{Reaped, WaitCoordinator, WaitTarget};
