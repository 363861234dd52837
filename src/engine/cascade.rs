//! Selection cascade: a toggle flows down to descendants, then up through
//! every materialized ancestor.
//!
//! Propagation is explicit and two-phase. Nothing here listens to widget
//! events; callers get a [`ChangeSet`] describing what the view must redraw.

use std::path::{Path, PathBuf};

use crate::engine::tree::Materialization;
use crate::engine::Engine;
use crate::error::OpError;
use crate::fs::entry::{EntryKind, FsEntry, PathKey};
use crate::fs::gateway::OpResult;

/// Plain click vs modifier click.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToggleMode {
    /// Direct file children of a directory only.
    Shallow,
    /// Every descendant on disk, files and directories, ignoring the filter.
    Deep,
}

/// One observable effect of an engine operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Change {
    Checked { path: PathBuf, checked: bool },
    Expanded { path: PathBuf, expanded: bool },
    Materialized { path: PathBuf },
    Removed { path: PathBuf },
    Reloaded,
}

/// Ordered log of changes produced by one public operation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChangeSet {
    changes: Vec<Change>,
}

impl ChangeSet {
    pub fn push(&mut self, change: Change) {
        self.changes.push(change);
    }

    pub fn iter(&self) -> impl Iterator<Item = &Change> {
        self.changes.iter()
    }

    pub fn len(&self) -> usize {
        self.changes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.changes.is_empty()
    }

    /// Final checkbox value of every path whose flag flipped.
    pub fn checked_updates(&self) -> Vec<(PathBuf, bool)> {
        let mut out: Vec<(PathBuf, bool)> = Vec::new();
        for change in &self.changes {
            if let Change::Checked { path, checked } = change {
                match out.iter_mut().find(|(p, _)| p == path) {
                    Some(slot) => slot.1 = *checked,
                    None => out.push((path.clone(), *checked)),
                }
            }
        }
        out
    }
}

/// The one open unit of work. Every internal step that mutates engine state
/// takes `&mut Txn`, so changes are only ever recorded inside an operation.
#[derive(Debug, Default)]
pub(crate) struct Txn {
    changes: ChangeSet,
}

impl Txn {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn record(&mut self, change: Change) {
        self.changes.push(change);
    }

    pub(crate) fn finish(self) -> ChangeSet {
        self.changes
    }
}

/// What a directory toggle collected before changing anything.
#[derive(Debug, Default)]
struct Gathered {
    touched: Vec<FsEntry>,
    listing: Option<Vec<FsEntry>>,
}

impl Engine {
    /// Set `path`'s selection to `target` and cascade per `mode`.
    ///
    /// `path` must be materialized and interactive.
    pub fn toggle(&mut self, path: &Path, target: bool, mode: ToggleMode) -> OpResult<ChangeSet> {
        let key = PathKey::new(path);
        let node = self
            .tree
            .get(&key)
            .ok_or_else(|| OpError::NotFound(path.to_path_buf()))?;
        if !node.is_interactive() {
            return Err(OpError::AccessDenied(path.to_path_buf()));
        }
        let entry = node.entry.clone();

        // Gather first so a failing disk walk leaves state untouched.
        let Gathered {
            mut touched,
            listing,
        } = match entry.kind {
            EntryKind::Directory => self.descendants_for(&entry, mode)?,
            EntryKind::File => Gathered::default(),
        };

        let mut txn = Txn::new();
        for child in &touched {
            self.selection.set(child, target);
        }
        // An unloaded directory takes the membership its children give it,
        // so materializing it later changes nothing.
        let own = match &listing {
            Some(children) => {
                target
                    && !children.is_empty()
                    && children.iter().all(|c| self.selection.contains(c.key()))
            }
            None => target,
        };
        self.selection.set(&entry, own);

        // Deepest first, so a directory sees its children's final state.
        touched.sort_by_key(|e| std::cmp::Reverse(e.path.components().count()));
        for child in &touched {
            if self.tree.contains(child.key()) {
                self.sync_flag(&mut txn, child.key());
            }
        }
        self.sync_flag(&mut txn, &key);
        self.propagate_up(&mut txn, &key);

        tracing::debug!(
            path = %path.display(),
            target,
            ?mode,
            touched = touched.len(),
            "selection toggled"
        );
        Ok(txn.finish())
    }

    /// Flip the current state of `path`.
    pub fn toggle_path(&mut self, path: &Path, mode: ToggleMode) -> OpResult<ChangeSet> {
        let target = !self.is_checked(path);
        self.toggle(path, target, mode)
    }

    /// Entries a directory toggle touches below `dir`, plus the visible
    /// listing of `dir` when it is not loaded.
    fn descendants_for(&self, dir: &FsEntry, mode: ToggleMode) -> OpResult<Gathered> {
        let loaded = self
            .tree
            .get(dir.key())
            .filter(|n| n.state == Materialization::Loaded);
        let listing = match loaded {
            Some(_) => None,
            None => Some(self.gateway.list_children(&dir.path, Some(&self.filters))?),
        };
        let touched = match mode {
            ToggleMode::Deep => {
                let mut out = Vec::new();
                self.gateway.walk(&dir.path, &mut |e| out.push(e.clone()))?;
                out
            }
            ToggleMode::Shallow => {
                let children = match (loaded, &listing) {
                    (Some(node), _) => node.children.iter().map(|c| c.entry.clone()).collect(),
                    (None, Some(listed)) => listed.clone(),
                    (None, None) => Vec::new(),
                };
                children.into_iter().filter(|e| !e.is_dir()).collect()
            }
        };
        Ok(Gathered { touched, listing })
    }

    /// Recompute one node's checkbox from the selection.
    ///
    /// A loaded directory is checked iff it has visible children and all of
    /// them are selected; its own membership is brought in line. A denied
    /// directory has no visible children and is never checked. Anything else
    /// mirrors its membership.
    pub(crate) fn sync_flag(&mut self, txn: &mut Txn, key: &PathKey) {
        let Some(node) = self.tree.get(key) else {
            return;
        };
        let entry = node.entry.clone();
        let checked = match (node.is_dir(), node.state) {
            (true, Materialization::Loaded) => node.all_children_selected(&self.selection),
            (true, Materialization::Denied) => false,
            _ => self.selection.contains(key),
        };
        if entry.is_dir() {
            self.selection.set(&entry, checked);
        }
        if let Some(node) = self.tree.get_mut(key) {
            if node.checked != checked {
                node.checked = checked;
                txn.record(Change::Checked {
                    path: entry.path,
                    checked,
                });
            }
        }
    }

    /// Re-derive every materialized ancestor of `key`, nearest first.
    ///
    /// Keeps going to the top even when a level does not change, because
    /// a sibling elsewhere may still flip the next level.
    pub(crate) fn propagate_up(&mut self, txn: &mut Txn, key: &PathKey) {
        let mut current = self.tree.get(key).and_then(|n| n.parent.clone());
        while let Some(ancestor) = current {
            self.sync_flag(txn, &ancestor);
            current = self.tree.get(&ancestor).and_then(|n| n.parent.clone());
        }
    }
}
