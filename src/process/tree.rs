/*!
 * Process Tree
 * Parent/child links and reparenting on exit
 *
 * Link mutations come in two layers: `*_locked` functions operate on an
 * already-held table guard so lifecycle and wait can compose them into
 * one atomic step, and the public `ProcessTree` component wraps each in
 * its own lock acquisition.
 */

use super::table::{ProcessMap, ProcessTable};
use super::types::{ProcessError, ProcessInfo, ProcessResult};
use crate::core::types::Pid;
use std::sync::Arc;

/// Link `child` under `parent` in the locked map
///
/// Sets the child's parent backref and appends to the parent's child set
/// in one step. The parent must be live.
pub(crate) fn attach_locked(map: &mut ProcessMap, parent: Pid, child: Pid) -> ProcessResult<()> {
    if !map.contains_key(&child) {
        return Err(ProcessError::NotFound(child));
    }
    let entry = map.get_mut(&parent).ok_or(ProcessError::NotFound(parent))?;
    if !entry.state.is_running() {
        return Err(ProcessError::InvalidState {
            pid: parent,
            state: entry.state,
        });
    }
    entry.add_child(child);
    if let Some(c) = map.get_mut(&child) {
        c.parent = Some(parent);
    }
    Ok(())
}

/// Move every child of `of` under `to` in the locked map
///
/// Updates each moved child's parent backref together with the child
/// lists, so no observer of the guard's release sees a dangling parent.
/// A no-op when `of` is its own reaper. Returns the number moved.
pub(crate) fn reparent_locked(map: &mut ProcessMap, of: Pid, to: Pid) -> usize {
    if of == to || !map.contains_key(&to) {
        return 0;
    }
    let orphans = match map.get_mut(&of) {
        Some(process) => std::mem::take(&mut process.children),
        None => return 0,
    };
    let moved = orphans.len();
    for &child in &orphans {
        if let Some(c) = map.get_mut(&child) {
            c.parent = Some(to);
        }
    }
    if let Some(reaper) = map.get_mut(&to) {
        for child in orphans {
            reaper.add_child(child);
        }
    }
    moved
}

/// First zombie in `parent`'s child set, in attach order
pub(crate) fn first_zombie_locked(map: &ProcessMap, parent: Pid) -> Option<Pid> {
    let entry = map.get(&parent)?;
    entry
        .children
        .iter()
        .copied()
        .find(|child| matches!(map.get(child), Some(c) if c.state.is_zombie()))
}

/// Parent/child relationship view over the process table
pub struct ProcessTree {
    table: Arc<ProcessTable>,
}

impl ProcessTree {
    pub fn new(table: Arc<ProcessTable>) -> Self {
        Self { table }
    }

    /// Add `child` to `parent`'s child set; called once at creation
    pub fn attach_child(&self, parent: Pid, child: Pid) -> ProcessResult<()> {
        attach_locked(&mut self.table.write(), parent, child)
    }

    /// Move every child of `of` to `to`, updating each moved child's
    /// parent backref; atomic with respect to concurrent wait/reap
    pub fn reparent_children(&self, of: Pid, to: Pid) -> usize {
        reparent_locked(&mut self.table.write(), of, to)
    }

    /// Snapshot of `child` if it is currently a child of `parent`
    pub fn find_child(&self, parent: Pid, child: Pid) -> Option<ProcessInfo> {
        let map = self.table.read();
        let entry = map.get(&parent)?;
        if !entry.has_child(child) {
            return None;
        }
        map.get(&child).map(ProcessInfo::from)
    }

    /// Snapshot of the first zombie child of `parent`, in attach order
    pub fn find_zombie_child(&self, parent: Pid) -> Option<ProcessInfo> {
        let map = self.table.read();
        let zombie = first_zombie_locked(&map, parent)?;
        map.get(&zombie).map(ProcessInfo::from)
    }

    /// Child pids of `parent` in attach order
    pub fn children_of(&self, parent: Pid) -> Vec<Pid> {
        self.table
            .read()
            .get(&parent)
            .map(|p| p.children.clone())
            .unwrap_or_default()
    }

    /// Parent backref of `pid`
    pub fn parent_of(&self, pid: Pid) -> Option<Pid> {
        self.table.read().get(&pid).and_then(|p| p.parent)
    }
}

impl Clone for ProcessTree {
    fn clone(&self) -> Self {
        Self {
            table: Arc::clone(&self.table),
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

    fn make_zombie(table: &ProcessTable, pid: Pid, status: i32) {
        let mut map = table.write();
        let p = map.get_mut(&pid).unwrap();
        p.state = ProcessState::Zombie;
        p.exit_status = Some(status);
    }

    #[test]
    fn test_attach_links_both_directions() {
        let table = table_with(&[1, 2]);
        let tree = ProcessTree::new(Arc::clone(&table));

        tree.attach_child(1, 2).unwrap();
        assert_eq!(tree.children_of(1), vec![2]);
        assert_eq!(tree.parent_of(2), Some(1));
    }

    #[test]
    fn test_attach_requires_live_parent() {
        let table = table_with(&[1, 2]);
        let tree = ProcessTree::new(Arc::clone(&table));
        make_zombie(&table, 1, 0);

        assert_eq!(
            tree.attach_child(1, 2),
            Err(ProcessError::InvalidState {
                pid: 1,
                state: ProcessState::Zombie
            })
        );
        assert_eq!(tree.attach_child(9, 2), Err(ProcessError::NotFound(9)));
    }

    #[test]
    fn test_reparent_moves_all_children() {
        let table = table_with(&[1, 2, 3, 4]);
        let tree = ProcessTree::new(Arc::clone(&table));
        tree.attach_child(1, 2).unwrap();
        tree.attach_child(2, 3).unwrap();
        tree.attach_child(2, 4).unwrap();

        let moved = tree.reparent_children(2, 1);
        assert_eq!(moved, 2);
        assert_eq!(tree.children_of(2), Vec::<Pid>::new());
        assert_eq!(tree.children_of(1), vec![2, 3, 4]);
        assert_eq!(tree.parent_of(3), Some(1));
        assert_eq!(tree.parent_of(4), Some(1));
    }

    #[test]
    fn test_reparent_to_self_is_noop() {
        let table = table_with(&[1, 2]);
        let tree = ProcessTree::new(Arc::clone(&table));
        tree.attach_child(1, 2).unwrap();

        assert_eq!(tree.reparent_children(1, 1), 0);
        assert_eq!(tree.children_of(1), vec![2]);
        assert_eq!(tree.parent_of(2), Some(1));
    }

    #[test]
    fn test_find_zombie_child_in_attach_order() {
        let table = table_with(&[1, 2, 3]);
        let tree = ProcessTree::new(Arc::clone(&table));
        tree.attach_child(1, 2).unwrap();
        tree.attach_child(1, 3).unwrap();

        assert!(tree.find_zombie_child(1).is_none());

        make_zombie(&table, 3, 7);
        make_zombie(&table, 2, 9);

        // Attach order decides among multiple zombies
        let zombie = tree.find_zombie_child(1).unwrap();
        assert_eq!(zombie.pid, 2);
        assert_eq!(zombie.exit_status, Some(9));
    }

    #[test]
    fn test_find_child_checks_membership() {
        let table = table_with(&[1, 2, 3]);
        let tree = ProcessTree::new(Arc::clone(&table));
        tree.attach_child(1, 2).unwrap();

        assert_eq!(tree.find_child(1, 2).unwrap().pid, 2);
        // 3 exists but is not a child of 1
        assert!(tree.find_child(1, 3).is_none());
    }
}
