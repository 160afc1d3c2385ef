/*!
 * Process Lifecycle
 * Creation and termination, orchestrating table, tree, memory, and wait
 *
 * Creation and termination each run their table mutations under a single
 * write guard: a process is never visible half-registered, and a dying
 * process's children are reparented in the same step that marks it a
 * zombie. Address-space teardown and waiter wakeup happen after the
 * guard is released.
 */

use super::table::{self, ProcessTable};
use super::tree::{self, ProcessTree};
use super::types::{Process, ProcessError, ProcessResult, ProcessState};
use super::wait::WaitCoordinator;
use crate::core::types::{AddressSpaceId, ExitStatus, Pid, Tid};
use crate::memory::MemoryManager;
use log::{debug, info, warn};
use std::sync::{Arc, OnceLock};

/// Process creation and termination state machine
///
/// Holds the shared table, the tree view over it, the memory manager
/// supplying address spaces, and the wait coordinator it notifies on
/// exit. Clones share all state.
pub struct ProcessLifecycle {
    table: Arc<ProcessTable>,
    tree: ProcessTree,
    memory: MemoryManager,
    waits: WaitCoordinator,
    root: Arc<OnceLock<Pid>>,
}

impl ProcessLifecycle {
    /// Create a lifecycle with a default memory manager
    pub fn new() -> Self {
        Self::with_memory_manager(MemoryManager::new())
    }

    /// Create a lifecycle backed by an explicit memory manager
    pub fn with_memory_manager(memory: MemoryManager) -> Self {
        let table = Arc::new(ProcessTable::new());
        let waits = WaitCoordinator::new(Arc::clone(&table));
        let tree = ProcessTree::new(Arc::clone(&table));
        info!("Process lifecycle initialized");
        Self {
            table,
            tree,
            memory,
            waits,
            root: Arc::new(OnceLock::new()),
        }
    }

    /// Designate and create the root process
    ///
    /// The root is the reaper for orphaned children and the only process
    /// without a parent. Callable once; later calls fail with
    /// `RootAlreadyExists`.
    pub fn create_root(&self, name: &str) -> ProcessResult<Pid> {
        if let Some(&existing) = self.root.get() {
            return Err(ProcessError::RootAlreadyExists(existing));
        }

        let pid = self.table.allocate_id()?;
        let space = self.memory.create_space(pid)?;

        // Reserve the root designation before the entry becomes visible;
        // a concurrent caller that loses the race rolls back cleanly.
        if self.root.set(pid).is_err() {
            self.release_space(space);
            let existing = self.root.get().copied().unwrap_or_default();
            return Err(ProcessError::RootAlreadyExists(existing));
        }

        let mut process = Process::new(pid, name, None, space);
        process.state = ProcessState::Running;

        let mut map = self.table.write();
        if let Err(e) = table::insert_locked(&mut map, process) {
            drop(map);
            self.release_space(space);
            return Err(e);
        }
        drop(map);

        info!("Created root process (PID {})", pid);
        Ok(pid)
    }

    /// Create a process as a child of `parent`
    ///
    /// The address space is constructed first; if the pool is exhausted
    /// the call fails with `ResourceExhausted` and nothing is registered.
    /// Insertion and the parent link happen under one table guard.
    pub fn create(&self, name: &str, parent: Pid) -> ProcessResult<Pid> {
        let pid = self.table.allocate_id()?;
        let space = self.memory.create_space(pid)?;

        let mut process = Process::new(pid, name, Some(parent), space);
        process.state = ProcessState::Running;

        let mut map = self.table.write();
        if let Err(e) = table::insert_locked(&mut map, process) {
            drop(map);
            self.release_space(space);
            return Err(e);
        }
        if let Err(e) = tree::attach_locked(&mut map, parent, pid) {
            map.remove(&pid);
            drop(map);
            self.release_space(space);
            return Err(e);
        }
        drop(map);

        info!("Created process (PID {}, parent {})", pid, parent);
        Ok(pid)
    }

    /// Terminate a running process
    ///
    /// Records the exit status, moves the process to zombie, reparents
    /// its children to the root, releases its address space exactly once,
    /// and wakes any waiter blocked on the parent. A second call fails
    /// with `InvalidState` and changes nothing.
    pub fn terminate(&self, pid: Pid, exit_status: ExitStatus) -> ProcessResult<()> {
        let reaper = self.root.get().copied();

        let (space, parent, reparented) = {
            let mut map = self.table.write();
            let process = map.get_mut(&pid).ok_or(ProcessError::NotFound(pid))?;
            if !process.state.is_running() {
                return Err(ProcessError::InvalidState {
                    pid,
                    state: process.state,
                });
            }

            process.state = ProcessState::Terminating;
            process.exit_status = Some(exit_status);
            process.threads.clear();
            let space = process.address_space.take();
            let parent = process.parent;

            let reparented = match reaper {
                Some(root) => tree::reparent_locked(&mut map, pid, root),
                None => 0,
            };

            if let Some(process) = map.get_mut(&pid) {
                process.state = ProcessState::Zombie;
            }
            (space, parent, reparented)
        };

        if reparented > 0 {
            debug!("Reparented {} children of PID {} to root", reparented, pid);
        }
        if let Some(space) = space {
            self.release_space(space);
        }
        if let Some(parent) = parent {
            self.waits.notify_exit(parent);
        }

        info!("Process {} terminated with status {}", pid, exit_status);
        Ok(())
    }

    /// Record a thread id as owned by `pid`
    ///
    /// Thread creation and teardown live outside the core; only
    /// membership is tracked here.
    pub fn attach_thread(&self, pid: Pid, tid: Tid) -> ProcessResult<()> {
        let mut map = self.table.write();
        let process = map.get_mut(&pid).ok_or(ProcessError::NotFound(pid))?;
        if !process.state.is_running() {
            return Err(ProcessError::InvalidState {
                pid,
                state: process.state,
            });
        }
        process.threads.insert(tid);
        Ok(())
    }

    /// Drop a thread id from `pid`; returns whether it was tracked
    pub fn detach_thread(&self, pid: Pid, tid: Tid) -> ProcessResult<bool> {
        let mut map = self.table.write();
        let process = map.get_mut(&pid).ok_or(ProcessError::NotFound(pid))?;
        Ok(process.threads.remove(&tid))
    }

    /// The designated root/reaper, once created
    pub fn root_pid(&self) -> Option<Pid> {
        self.root.get().copied()
    }

    /// Shared process table
    pub fn table(&self) -> &Arc<ProcessTable> {
        &self.table
    }

    /// Tree view over the shared table
    pub fn tree(&self) -> &ProcessTree {
        &self.tree
    }

    /// Memory manager supplying address spaces
    pub fn memory_manager(&self) -> &MemoryManager {
        &self.memory
    }

    /// Wait coordinator notified by `terminate`
    pub fn wait_coordinator(&self) -> &WaitCoordinator {
        &self.waits
    }

    fn release_space(&self, space: AddressSpaceId) {
        if let Err(e) = self.memory.destroy_space(space) {
            warn!("Failed to release address space {}: {}", space, e);
        }
    }
}

impl Clone for ProcessLifecycle {
    fn clone(&self) -> Self {
        Self {
            table: Arc::clone(&self.table),
            tree: self.tree.clone(),
            memory: self.memory.clone(),
            waits: self.waits.clone(),
            root: Arc::clone(&self.root),
        }
    }
}

impl Default for ProcessLifecycle {
    fn default() -> Self {
        Self::new()
    }
}
