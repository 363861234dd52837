use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use crate::fs::entry::{FsEntry, PathKey};

/// The canonical set of selected entries, keyed by path.
///
/// Entries are value snapshots, so a path can stay selected while it is not
/// materialized, filtered out, or in the middle of a move.
#[derive(Debug, Clone, Default)]
pub struct SelectionSet {
    entries: BTreeMap<PathKey, FsEntry>,
}

impl SelectionSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, key: &PathKey) -> bool {
        self.entries.contains_key(key)
    }

    pub fn contains_path(&self, path: &Path) -> bool {
        self.contains(&PathKey::new(path))
    }

    /// Returns true if the entry was newly added.
    pub fn insert(&mut self, entry: FsEntry) -> bool {
        self.entries.insert(entry.key().clone(), entry).is_none()
    }

    pub fn remove(&mut self, key: &PathKey) -> Option<FsEntry> {
        self.entries.remove(key)
    }

    /// Add or remove `entry`; returns true if membership changed.
    pub fn set(&mut self, entry: &FsEntry, selected: bool) -> bool {
        if selected {
            self.insert(entry.clone())
        } else {
            self.remove(entry.key()).is_some()
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Snapshot of every selected entry, ordered by path.
    pub fn entries(&self) -> Vec<FsEntry> {
        self.entries.values().cloned().collect()
    }

    /// Selected files only, ordered by path.
    pub fn selected_files(&self) -> Vec<PathBuf> {
        self.entries
            .values()
            .filter(|e| !e.is_dir())
            .map(|e| e.path.clone())
            .collect()
    }

    /// Selected entries equal to or below `key`.
    pub fn entries_within(&self, key: &PathKey) -> Vec<FsEntry> {
        self.entries
            .range(key.clone()..)
            .take_while(|(k, _)| k.is_within(key))
            .map(|(_, e)| e.clone())
            .collect()
    }

    /// Remove `key` and everything selected below it.
    pub fn remove_within(&mut self, key: &PathKey) -> Vec<FsEntry> {
        let doomed = self.entries_within(key);
        for entry in &doomed {
            self.entries.remove(entry.key());
        }
        doomed
    }

    /// Drop entries the predicate rejects; returns what was dropped.
    pub fn retain(&mut self, mut keep: impl FnMut(&FsEntry) -> bool) -> Vec<FsEntry> {
        let mut dropped = Vec::new();
        self.entries.retain(|_, e| {
            if keep(e) {
                true
            } else {
                dropped.push(e.clone());
                false
            }
        });
        dropped
    }

    /// Selected entries with no selected ancestor.
    pub fn top_level(&self) -> Vec<FsEntry> {
        top_level(self.entries())
    }
}

/// Reduce `entries` to those not contained in another entry of the list.
pub fn top_level(mut entries: Vec<FsEntry>) -> Vec<FsEntry> {
    entries.sort_by(|a, b| a.key().cmp(b.key()));
    let mut out: Vec<FsEntry> = Vec::with_capacity(entries.len());
    for entry in entries {
        let covered = out
            .iter()
            .any(|kept| kept.is_dir() && entry.key().is_within(kept.key()));
        if !covered && !out.contains(&entry) {
            out.push(entry);
        }
    }
    out
}
