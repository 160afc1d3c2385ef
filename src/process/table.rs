/*!
 * Process Table
 * Canonical set of live processes and PID allocation
 *
 * One table-wide lock scopes every mutation of process state, child sets,
 * and parent links. Compound operations (create, terminate, reap) run
 * their map-level steps under a single write guard so no observer sees a
 * half-registered process or a child without a parent. The lock is never
 * held across a suspension.
 */

use super::types::{Process, ProcessError, ProcessInfo, ProcessResult};
use crate::core::types::Pid;
use parking_lot::{RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU32, Ordering};

/// The locked process map; compound operations from tree/lifecycle/wait
/// run against this under a single guard.
pub(crate) type ProcessMap = HashMap<Pid, Process, ahash::RandomState>;

/// Insert a new entry into the locked map
pub(crate) fn insert_locked(map: &mut ProcessMap, process: Process) -> ProcessResult<()> {
    if map.contains_key(&process.pid) {
        return Err(ProcessError::DuplicatePid(process.pid));
    }
    map.insert(process.pid, process);
    Ok(())
}

/// Remove a reaped zombie from the locked map
pub(crate) fn remove_locked(map: &mut ProcessMap, pid: Pid) -> ProcessResult<Process> {
    let state = match map.get(&pid) {
        None => return Err(ProcessError::NotFound(pid)),
        Some(process) => process.state,
    };
    if !state.is_zombie() {
        return Err(ProcessError::InvalidState { pid, state });
    }
    map.remove(&pid).ok_or(ProcessError::NotFound(pid))
}

/// Canonical set of live processes
pub struct ProcessTable {
    slots: RwLock<ProcessMap>,
    next_pid: AtomicU32,
}

impl ProcessTable {
    /// Create an empty table; PIDs start at 1 (0 is never issued)
    pub fn new() -> Self {
        Self {
            slots: RwLock::new(ProcessMap::default()),
            next_pid: AtomicU32::new(1),
        }
    }

    /// Allocate a fresh unique PID
    ///
    /// Identifiers are monotonic and never reused. Fails only when the
    /// id space is exhausted.
    pub fn allocate_id(&self) -> ProcessResult<Pid> {
        let mut current = self.next_pid.load(Ordering::Relaxed);
        loop {
            if current == Pid::MAX {
                return Err(ProcessError::ResourceExhausted(
                    "process identifier space exhausted".to_string(),
                ));
            }
            match self.next_pid.compare_exchange(
                current,
                current + 1,
                Ordering::SeqCst,
                Ordering::Relaxed,
            ) {
                Ok(_) => return Ok(current),
                Err(observed) => current = observed,
            }
        }
    }

    /// Add a new entry; `DuplicatePid` should be unreachable for ids from
    /// `allocate_id`
    pub fn insert(&self, process: Process) -> ProcessResult<()> {
        insert_locked(&mut self.slots.write(), process)
    }

    /// Look up a process snapshot by id
    pub fn lookup(&self, pid: Pid) -> Option<ProcessInfo> {
        self.slots.read().get(&pid).map(ProcessInfo::from)
    }

    /// Delete an entry; only valid for reaped zombies
    pub fn remove(&self, pid: Pid) -> ProcessResult<Process> {
        remove_locked(&mut self.slots.write(), pid)
    }

    /// Check whether a pid is present
    pub fn contains(&self, pid: Pid) -> bool {
        self.slots.read().contains_key(&pid)
    }

    /// Number of table entries (zombies included)
    pub fn len(&self) -> usize {
        self.slots.read().len()
    }

    /// Check whether the table is empty
    pub fn is_empty(&self) -> bool {
        self.slots.read().is_empty()
    }

    /// Snapshot all entries
    pub fn list(&self) -> Vec<ProcessInfo> {
        let mut listing: Vec<ProcessInfo> =
            self.slots.read().values().map(ProcessInfo::from).collect();
        listing.sort_by_key(|p| p.pid);
        listing
    }

    pub(crate) fn write(&self) -> RwLockWriteGuard<'_, ProcessMap> {
        self.slots.write()
    }

    pub(crate) fn read(&self) -> RwLockReadGuard<'_, ProcessMap> {
        self.slots.read()
    }
}

impl Default for ProcessTable {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::process::types::ProcessState;

    fn running(pid: Pid) -> Process {
        let mut p = Process::new(pid, "proc", None, pid as u64);
        p.state = ProcessState::Running;
        p
    }

    #[test]
    fn test_allocate_id_is_monotonic() {
        let table = ProcessTable::new();
        let a = table.allocate_id().unwrap();
        let b = table.allocate_id().unwrap();
        let c = table.allocate_id().unwrap();
        assert!(a < b && b < c);
        assert_eq!(a, 1);
    }

    #[test]
    fn test_insert_and_lookup() {
        let table = ProcessTable::new();
        let pid = table.allocate_id().unwrap();
        table.insert(running(pid)).unwrap();

        let info = table.lookup(pid).unwrap();
        assert_eq!(info.pid, pid);
        assert_eq!(info.state, ProcessState::Running);
        assert!(table.lookup(pid + 1).is_none());
    }

    #[test]
    fn test_duplicate_insert_rejected() {
        let table = ProcessTable::new();
        table.insert(running(1)).unwrap();
        assert_eq!(
            table.insert(running(1)),
            Err(ProcessError::DuplicatePid(1))
        );
    }

    #[test]
    fn test_remove_requires_zombie() {
        let table = ProcessTable::new();
        table.insert(running(1)).unwrap();

        assert_eq!(
            table.remove(1),
            Err(ProcessError::InvalidState {
                pid: 1,
                state: ProcessState::Running
            })
        );

        {
            let mut map = table.write();
            let p = map.get_mut(&1).unwrap();
            p.state = ProcessState::Zombie;
            p.exit_status = Some(0);
        }
        assert!(table.remove(1).is_ok());
        assert_eq!(table.remove(1), Err(ProcessError::NotFound(1)));
    }

    #[test]
    fn test_list_is_sorted_by_pid() {
        let table = ProcessTable::new();
        table.insert(running(3)).unwrap();
        table.insert(running(1)).unwrap();
        table.insert(running(2)).unwrap();

        let pids: Vec<Pid> = table.list().iter().map(|p| p.pid).collect();
        assert_eq!(pids, vec![1, 2, 3]);
    }
}
