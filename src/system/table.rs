use std::collections::{HashMap, HashSet};
use std::path::Path;

use super::error::SourceError;
use super::process::{Pid, ProcessEntry};

/// PIDs of every numeric directory under the proc root.
pub fn list_live_pids(proc_root: &Path) -> Result<Vec<Pid>, SourceError> {
    let entries =
        std::fs::read_dir(proc_root).map_err(|e| SourceError::from_io(proc_root.to_path_buf(), e))?;
    let mut pids: Vec<Pid> = entries
        .flatten()
        .filter_map(|entry| entry.file_name().to_str()?.parse().ok())
        .collect();
    pids.sort_unstable();
    Ok(pids)
}

/// What one reconciliation pass changes: PIDs to start tracking and PIDs
/// whose proc entry is gone.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReconcilePlan {
    pub additions: Vec<Pid>,
    pub removals: Vec<Pid>,
}

/// The authoritative set of tracked processes, keyed by PID.
#[derive(Debug, Clone, Default)]
pub struct ProcessTable {
    entries: HashMap<Pid, ProcessEntry>,
}

impl ProcessTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, pid: Pid) -> Option<&ProcessEntry> {
        self.entries.get(&pid)
    }

    pub fn pids(&self) -> Vec<Pid> {
        let mut pids: Vec<Pid> = self.entries.keys().copied().collect();
        pids.sort_unstable();
        pids
    }

    pub(crate) fn entries_mut(&mut self) -> &mut HashMap<Pid, ProcessEntry> {
        &mut self.entries
    }

    /// Compare the table with the live PID list. Every PID the table would
    /// hold after additions is checked with `exists`; the ones that fail
    /// are scheduled for removal.
    pub fn plan<F>(&self, live: &[Pid], mut exists: F) -> ReconcilePlan
    where
        F: FnMut(Pid) -> bool,
    {
        let mut additions: Vec<Pid> = live
            .iter()
            .copied()
            .filter(|pid| !self.entries.contains_key(pid))
            .collect::<HashSet<_>>()
            .into_iter()
            .collect();
        additions.sort_unstable();

        let mut removals: Vec<Pid> = self
            .entries
            .keys()
            .chain(additions.iter())
            .copied()
            .filter(|&pid| !exists(pid))
            .collect();
        removals.sort_unstable();

        ReconcilePlan {
            additions,
            removals,
        }
    }

    pub fn insert_new(&mut self, pids: &[Pid]) {
        for &pid in pids {
            self.entries
                .entry(pid)
                .or_insert_with(|| ProcessEntry::new(pid));
        }
    }

    pub fn remove_all(&mut self, pids: &[Pid]) {
        for pid in pids {
            self.entries.remove(pid);
        }
    }

    /// A point-in-time copy of every entry, ordered by PID.
    pub fn snapshot(&self) -> Vec<ProcessEntry> {
        let mut entries: Vec<ProcessEntry> = self.entries.values().cloned().collect();
        entries.sort_by_key(|e| e.pid);
        entries
    }
}
