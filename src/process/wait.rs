/*!
 * Wait Coordination
 * Blocking wait-for-child and zombie reaping
 *
 * The wait loop is check-then-park: snapshot the exit-event generation
 * for the parent, probe for a reapable child under the table lock, and
 * park only if nothing matched. Termination bumps the generation before
 * waking, so an exit that lands between the probe and the park is still
 * observed. Reaping happens entirely under one table write guard, which
 * is what keeps two concurrent waiters from collecting the same zombie.
 */

use super::table::{self, ProcessTable};
use super::tree;
use super::types::{ProcessError, ProcessResult};
use crate::core::sync::ParkQueue;
use crate::core::types::{ExitStatus, Pid};
use log::debug;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Which child a wait call is prepared to collect
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WaitTarget {
    /// Any child of the calling parent
    Any,
    /// One specific child
    Child(Pid),
}

/// A collected zombie: its identifier and recorded exit status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reaped {
    pub pid: Pid,
    pub exit_status: ExitStatus,
}

/// Blocking wait-for-child protocol over the process table
pub struct WaitCoordinator {
    table: Arc<ProcessTable>,
    exit_events: Arc<ParkQueue<Pid>>,
}

impl WaitCoordinator {
    pub fn new(table: Arc<ProcessTable>) -> Self {
        Self {
            table,
            exit_events: Arc::new(ParkQueue::new()),
        }
    }

    /// Block until a matching child of `parent` can be reaped
    ///
    /// For `WaitTarget::Child`, the pid must currently be a child of
    /// `parent` or the call fails with `NoSuchChild` without blocking.
    /// For `WaitTarget::Any`, a parent with no children at all fails the
    /// same way. On success the zombie has been removed from the table
    /// and from the parent's child set.
    pub fn wait(&self, parent: Pid, target: WaitTarget) -> ProcessResult<Reaped> {
        loop {
            let token = self.exit_events.prepare(parent);
            if let Some(reaped) = self.try_reap(parent, target)? {
                return Ok(reaped);
            }
            self.exit_events.park(parent, token);
        }
    }

    /// Like `wait`, but gives up with `Timeout` once `timeout` elapses
    pub fn wait_timeout(
        &self,
        parent: Pid,
        target: WaitTarget,
        timeout: Duration,
    ) -> ProcessResult<Reaped> {
        let deadline = Instant::now() + timeout;
        loop {
            let token = self.exit_events.prepare(parent);
            if let Some(reaped) = self.try_reap(parent, target)? {
                return Ok(reaped);
            }
            let now = Instant::now();
            if now >= deadline {
                return Err(ProcessError::Timeout);
            }
            self.exit_events.park_timeout(parent, token, deadline - now);
        }
    }

    /// Non-blocking probe: reap a matching zombie if one exists right now
    ///
    /// `Ok(None)` means a matching child exists but is still running.
    pub fn try_reap(&self, parent: Pid, target: WaitTarget) -> ProcessResult<Option<Reaped>> {
        let mut map = self.table.write();

        let candidate = match map.get(&parent) {
            None => return Err(ProcessError::NotFound(parent)),
            Some(entry) => match target {
                WaitTarget::Child(child) => {
                    if !entry.has_child(child) {
                        return Err(ProcessError::NoSuchChild { parent });
                    }
                    match map.get(&child) {
                        Some(c) if c.state.is_zombie() => Some(child),
                        Some(_) => None,
                        None => return Err(ProcessError::NoSuchChild { parent }),
                    }
                }
                WaitTarget::Any => {
                    if entry.children.is_empty() {
                        return Err(ProcessError::NoSuchChild { parent });
                    }
                    tree::first_zombie_locked(&map, parent)
                }
            },
        };

        let Some(zombie) = candidate else {
            return Ok(None);
        };

        let process = table::remove_locked(&mut map, zombie)?;
        if let Some(entry) = map.get_mut(&parent) {
            entry.remove_child(zombie);
        }
        drop(map);

        let exit_status = process.exit_status.unwrap_or(-1);
        debug!(
            "PID {} reaped child {} (status {})",
            parent, zombie, exit_status
        );
        Ok(Some(Reaped {
            pid: zombie,
            exit_status,
        }))
    }

    /// Wake every waiter blocked on `parent`; each re-checks and either
    /// reaps a distinct zombie or parks again
    pub(crate) fn notify_exit(&self, parent: Pid) {
        self.exit_events.wake_all(parent);
    }

    /// Approximate count of blocked waiters for `parent` (diagnostics)
    pub fn waiter_count(&self, parent: Pid) -> usize {
        self.exit_events.waiter_count(parent)
    }
}

impl Clone for WaitCoordinator {
    fn clone(&self) -> Self {
        Self {
            table: Arc::clone(&self.table),
            exit_events: Arc::clone(&self.exit_events),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::process::types::{Process, ProcessState};

    fn table_with(pids: &[Pid]) -> Arc<ProcessTable> {
        let table = Arc::new(ProcessTable::new());
        for &pid in pids {
            let mut p = Process::new(pid, "proc", None, pid as u64);
            p.state = ProcessState::Running;
            table.insert(p).unwrap();
        }
        table
    }

    fn link(table: &ProcessTable, parent: Pid, child: Pid) {
        tree::attach_locked(&mut table.write(), parent, child).unwrap();
    }

    fn make_zombie(table: &ProcessTable, pid: Pid, status: ExitStatus) {
        let mut map = table.write();
        let p = map.get_mut(&pid).unwrap();
        p.state = ProcessState::Zombie;
        p.exit_status = Some(status);
    }

    #[test]
    fn test_try_reap_any_prefers_first_zombie() {
        let table = table_with(&[1, 2, 3]);
        let waits = WaitCoordinator::new(Arc::clone(&table));
        link(&table, 1, 2);
        link(&table, 1, 3);
        make_zombie(&table, 3, 7);

        let reaped = waits.try_reap(1, WaitTarget::Any).unwrap().unwrap();
        assert_eq!(reaped, Reaped { pid: 3, exit_status: 7 });
        assert!(!table.contains(3));
        assert_eq!(table.lookup(1).unwrap().children, vec![2]);
    }

    #[test]
    fn test_try_reap_any_without_children() {
        let table = table_with(&[1]);
        let waits = WaitCoordinator::new(Arc::clone(&table));
        assert_eq!(
            waits.try_reap(1, WaitTarget::Any),
            Err(ProcessError::NoSuchChild { parent: 1 })
        );
    }

    #[test]
    fn test_try_reap_specific_running_child_is_none() {
        let table = table_with(&[1, 2]);
        let waits = WaitCoordinator::new(Arc::clone(&table));
        link(&table, 1, 2);

        assert_eq!(waits.try_reap(1, WaitTarget::Child(2)), Ok(None));
    }

    #[test]
    fn test_try_reap_specific_not_a_child() {
        let table = table_with(&[1, 2, 3]);
        let waits = WaitCoordinator::new(Arc::clone(&table));
        link(&table, 1, 2);

        // 3 exists but belongs to nobody
        assert_eq!(
            waits.try_reap(1, WaitTarget::Child(3)),
            Err(ProcessError::NoSuchChild { parent: 1 })
        );
    }

    #[test]
    fn test_try_reap_unknown_parent() {
        let table = table_with(&[]);
        let waits = WaitCoordinator::new(Arc::clone(&table));
        assert_eq!(
            waits.try_reap(9, WaitTarget::Any),
            Err(ProcessError::NotFound(9))
        );
    }

    #[test]
    fn test_wait_timeout_on_running_child() {
        let table = table_with(&[1, 2]);
        let waits = WaitCoordinator::new(Arc::clone(&table));
        link(&table, 1, 2);

        let result = waits.wait_timeout(1, WaitTarget::Child(2), Duration::from_millis(50));
        assert_eq!(result, Err(ProcessError::Timeout));
    }
}
