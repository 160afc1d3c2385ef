/*!
 * Process Types
 * Common types for process management
 */

use crate::core::limits::MAX_PROCESS_NAME_LEN;
use crate::core::types::{AddressSpaceId, ExitStatus, Pid, Tid};
use crate::memory::MemoryError;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use thiserror::Error;

/// Process operation result
///
/// # Must Use
/// Process operations can fail and must be handled to prevent resource leaks
pub type ProcessResult<T> = Result<T, ProcessError>;

/// Process errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProcessError {
    #[error("Process not found: {0}")]
    NotFound(Pid),

    #[error("Resource exhausted: {0}")]
    ResourceExhausted(String),

    #[error("Invalid state for PID {pid}: {state:?}")]
    InvalidState { pid: Pid, state: ProcessState },

    #[error("No such child for parent {parent}")]
    NoSuchChild { parent: Pid },

    #[error("PID already registered: {0}")]
    DuplicatePid(Pid),

    #[error("Root process already designated: {0}")]
    RootAlreadyExists(Pid),

    #[error("Wait timed out")]
    Timeout,
}

impl From<MemoryError> for ProcessError {
    fn from(err: MemoryError) -> Self {
        ProcessError::ResourceExhausted(err.to_string())
    }
}

/// Process state
///
/// `Created` and `Terminating` are transient and only ever held inside a
/// table write lock; external observers see `Running` or `Zombie`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProcessState {
    /// Entry constructed but not yet visible in the table
    Created,
    /// Process is live
    Running,
    /// Termination in progress
    Terminating,
    /// Terminated; exit status retained until reaped
    Zombie,
}

impl ProcessState {
    /// Check if process is running
    #[inline(always)]
    #[must_use]
    pub const fn is_running(&self) -> bool {
        matches!(self, ProcessState::Running)
    }

    /// Check if process has terminated and awaits reaping
    #[inline(always)]
    #[must_use]
    pub const fn is_zombie(&self) -> bool {
        matches!(self, ProcessState::Zombie)
    }
}

/// A process table entry
///
/// Relations are id-indexed: `parent` is a non-owning backref and
/// `children` holds ids, never handles. The entry owns its address space
/// until termination takes it for teardown.
#[derive(Debug, Clone, PartialEq)]
pub struct Process {
    pub pid: Pid,
    pub name: String,
    pub state: ProcessState,
    pub exit_status: Option<ExitStatus>,
    pub parent: Option<Pid>,
    /// Child pids in attach order; reaping and reparenting preserve order
    pub children: Vec<Pid>,
    pub threads: HashSet<Tid>,
    pub address_space: Option<AddressSpaceId>,
}

impl Process {
    /// Build a table entry in the `Created` state
    ///
    /// Names longer than `MAX_PROCESS_NAME_LEN` bytes are silently
    /// truncated at a character boundary.
    #[must_use]
    pub fn new(pid: Pid, name: &str, parent: Option<Pid>, address_space: AddressSpaceId) -> Self {
        Self {
            pid,
            name: truncate_name(name),
            state: ProcessState::Created,
            exit_status: None,
            parent,
            children: Vec::new(),
            threads: HashSet::new(),
            address_space: Some(address_space),
        }
    }

    /// Add a child id, preserving attach order
    pub(crate) fn add_child(&mut self, child: Pid) {
        debug_assert!(!self.children.contains(&child));
        self.children.push(child);
    }

    /// Remove a child id; returns whether it was present
    pub(crate) fn remove_child(&mut self, child: Pid) -> bool {
        match self.children.iter().position(|&c| c == child) {
            Some(idx) => {
                self.children.remove(idx);
                true
            }
            None => false,
        }
    }

    /// Check child-set membership
    #[inline]
    #[must_use]
    pub fn has_child(&self, child: Pid) -> bool {
        self.children.contains(&child)
    }
}

fn truncate_name(name: &str) -> String {
    if name.len() <= MAX_PROCESS_NAME_LEN {
        return name.to_string();
    }
    let mut end = MAX_PROCESS_NAME_LEN;
    while !name.is_char_boundary(end) {
        end -= 1;
    }
    name[..end].to_string()
}

/// Cloneable snapshot of a process table entry
///
/// Lookups hand out snapshots, never references into the locked table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct ProcessInfo {
    pub pid: Pid,
    pub name: String,
    pub state: ProcessState,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub exit_status: Option<ExitStatus>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent: Option<Pid>,
    pub children: Vec<Pid>,
    pub thread_count: usize,
}

impl From<&Process> for ProcessInfo {
    fn from(process: &Process) -> Self {
        Self {
            pid: process.pid,
            name: process.name.clone(),
            state: process.state,
            exit_status: process.exit_status,
            parent: process.parent,
            children: process.children.clone(),
            thread_count: process.threads.len(),
        }
    }
}
