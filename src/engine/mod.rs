//! The consistency engine: tree, index, selection and filter registry kept
//! in step across interactive edits and disk mutations.
//!
//! Every public operation takes `&mut self`, so no two operations can ever
//! interleave and a cascade can never re-enter itself.

pub mod cascade;
pub mod filter;
pub mod index;
pub mod mutation;
pub mod selection;
pub mod tree;

#[cfg(test)]
pub(crate) mod test_support;

use std::path::{Path, PathBuf};

use crate::error::OpError;
use crate::fs::clipboard::Clipboard;
use crate::fs::entry::{rebase_path, FsEntry, PathKey};
use crate::fs::gateway::{FileSystemGateway, OpResult};

use cascade::{Change, ChangeSet, Txn};
use filter::{ExtensionTally, FilterRegistry};
use selection::SelectionSet;
use tree::{Materialization, Node, Row, TreeModel};

/// Knobs the engine takes from configuration.
#[derive(Debug, Clone)]
pub struct EngineOptions {
    pub dirs_first: bool,
    /// Extensions switched off right after every root load.
    pub disabled_extensions: Vec<String>,
}

impl Default for EngineOptions {
    fn default() -> Self {
        Self {
            dirs_first: true,
            disabled_extensions: Vec::new(),
        }
    }
}

/// What a refresh does to selections below the refreshed node.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Sweep {
    /// Drop every discarded descendant, plus anything gone from disk.
    Selection,
    /// Leave the selection untouched (filter changes).
    Keep,
}

/// Which parents a mutation resynchronized afterwards.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Resync {
    pub refreshed: Vec<PathBuf>,
    pub full_reload: bool,
}

pub struct Engine {
    gateway: Box<dyn FileSystemGateway>,
    tree: TreeModel,
    selection: SelectionSet,
    filters: FilterRegistry,
    clipboard: Clipboard,
    options: EngineOptions,
}

impl Engine {
    /// Build an engine and load `root`.
    pub fn new(
        gateway: Box<dyn FileSystemGateway>,
        options: EngineOptions,
        root: &Path,
    ) -> OpResult<Self> {
        let mut engine = Self {
            gateway,
            tree: TreeModel::new(FsEntry::dir(root), options.dirs_first),
            selection: SelectionSet::new(),
            filters: FilterRegistry::new(),
            clipboard: Clipboard::new(),
            options,
        };
        engine.load_root(root)?;
        Ok(engine)
    }

    /// Replace the whole model with a fresh view of `path`.
    ///
    /// Runs the one full extension scan, then materializes the first level.
    /// The selection starts empty; the clipboard survives.
    pub fn load_root(&mut self, path: &Path) -> OpResult<ChangeSet> {
        let entry = self.gateway.stat(path)?;
        if !entry.is_dir() {
            return Err(OpError::NotFound(path.to_path_buf()));
        }
        let tally = ExtensionTally::scan(self.gateway.as_ref(), path)?;
        self.filters = FilterRegistry::from_tally(&tally, &self.options.disabled_extensions);
        self.selection.clear();
        self.tree = TreeModel::new(entry, self.options.dirs_first);

        let mut txn = Txn::new();
        let root_key = self.tree.root_key().clone();
        self.materialize(&mut txn, &root_key)?;
        self.set_expanded(&mut txn, &root_key, true);
        txn.record(Change::Reloaded);

        tracing::info!(
            root = %path.display(),
            extensions = self.filters.len(),
            children = self.tree.root().children.len(),
            "root loaded"
        );
        Ok(txn.finish())
    }

    /// Materialize `path` if needed and show its children.
    ///
    /// A directory that cannot be listed becomes a denied leaf rather than
    /// an error.
    pub fn expand(&mut self, path: &Path) -> OpResult<ChangeSet> {
        let key = PathKey::new(path);
        let node = self
            .tree
            .get(&key)
            .ok_or_else(|| OpError::NotFound(path.to_path_buf()))?;
        if !node.is_dir() {
            return Ok(ChangeSet::default());
        }
        let mut txn = Txn::new();
        self.materialize(&mut txn, &key)?;
        self.sync_flag(&mut txn, &key);
        self.propagate_up(&mut txn, &key);
        let loaded = self
            .tree
            .get(&key)
            .is_some_and(|n| n.state == Materialization::Loaded);
        if loaded {
            self.set_expanded(&mut txn, &key, true);
        }
        Ok(txn.finish())
    }

    /// Hide children; materialized nodes stay in memory.
    pub fn collapse(&mut self, path: &Path) -> ChangeSet {
        let mut txn = Txn::new();
        self.set_expanded(&mut txn, &PathKey::new(path), false);
        txn.finish()
    }

    /// Re-read one directory from disk.
    ///
    /// Selections of the discarded descendants are dropped; anything selected
    /// deeper than the materialized part survives.
    pub fn refresh(&mut self, path: &Path) -> OpResult<ChangeSet> {
        let mut txn = Txn::new();
        self.refresh_in(&mut txn, &PathKey::new(path), Sweep::Selection)?;
        Ok(txn.finish())
    }

    /// Full tree reload from the root. The filter registry is not rescanned.
    pub fn reload(&mut self) -> OpResult<ChangeSet> {
        let mut txn = Txn::new();
        self.reload_in(&mut txn, Sweep::Selection)?;
        Ok(txn.finish())
    }

    /// Switch an extension on or off and rematerialize to match.
    ///
    /// The selection is left alone: hidden files stay selected.
    pub fn set_filter_enabled(&mut self, ext: &str, enabled: bool) -> OpResult<ChangeSet> {
        if !self.filters.set_enabled(ext, enabled) {
            return Ok(ChangeSet::default());
        }
        tracing::debug!(ext, enabled, "filter changed");
        let mut txn = Txn::new();
        self.reload_in(&mut txn, Sweep::Keep)?;
        Ok(txn.finish())
    }

    // Accessors

    pub fn tree(&self) -> &TreeModel {
        &self.tree
    }

    pub fn selection(&self) -> &SelectionSet {
        &self.selection
    }

    pub fn filters(&self) -> &FilterRegistry {
        &self.filters
    }

    pub fn clipboard(&self) -> &Clipboard {
        &self.clipboard
    }

    pub fn root_path(&self) -> &Path {
        self.tree.root_path()
    }

    pub fn node(&self, path: &Path) -> Option<&Node> {
        self.tree.get(&PathKey::new(path))
    }

    /// Observable flag for materialized nodes, membership otherwise.
    pub fn is_checked(&self, path: &Path) -> bool {
        match self.node(path) {
            Some(node) => node.checked,
            None => self.selection.contains_path(path),
        }
    }

    pub fn rows(&self) -> Vec<Row> {
        self.tree.rows()
    }

    pub fn read_text(&self, path: &Path) -> OpResult<String> {
        self.gateway.read_text(path)
    }

    // Internal steps shared by cascade and mutation

    /// Populate an unloaded directory from disk through the active filter.
    pub(crate) fn materialize(&mut self, txn: &mut Txn, key: &PathKey) -> OpResult<()> {
        let Some(node) = self.tree.get_mut(key) else {
            return Err(OpError::NotFound(key.as_path().to_path_buf()));
        };
        if !node.is_dir() || node.state != Materialization::Unloaded {
            return Ok(());
        }
        node.state = Materialization::Loading;
        let path = node.entry.path.clone();

        match self.gateway.list_children(&path, Some(&self.filters)) {
            Ok(children) => {
                let created = self.tree.populate(key, children, &self.selection);
                tracing::debug!(
                    path = %path.display(),
                    children = created.len(),
                    indexed = self.tree.index().len(),
                    "materialized"
                );
                txn.record(Change::Materialized { path });
                Ok(())
            }
            Err(OpError::AccessDenied(_)) => {
                tracing::warn!(path = %path.display(), "access denied, marking directory disabled");
                self.tree.mark_denied(key);
                txn.record(Change::Materialized { path });
                Ok(())
            }
            Err(e) => {
                if let Some(node) = self.tree.get_mut(key) {
                    node.state = Materialization::Unloaded;
                }
                Err(e)
            }
        }
    }

    pub(crate) fn set_expanded(&mut self, txn: &mut Txn, key: &PathKey, expanded: bool) {
        if let Some(node) = self.tree.get_mut(key) {
            if node.expanded != expanded && node.is_dir() {
                node.expanded = expanded;
                txn.record(Change::Expanded {
                    path: node.entry.path.clone(),
                    expanded,
                });
            }
        }
    }

    /// Drop every materialized descendant of `key`, sweep the selection,
    /// rematerialize and restore expansion.
    pub(crate) fn refresh_in(
        &mut self,
        txn: &mut Txn,
        key: &PathKey,
        sweep: Sweep,
    ) -> OpResult<()> {
        let (was_expanded, idle) = match self.tree.get(key) {
            Some(node) => (
                node.expanded,
                !node.is_dir() || node.state == Materialization::Unloaded,
            ),
            None => return Err(OpError::NotFound(key.as_path().to_path_buf())),
        };
        if idle {
            self.sync_flag(txn, key);
            self.propagate_up(txn, key);
            return Ok(());
        }
        let expanded_below = self.tree.expanded_dirs_under(key);

        let discarded = self.tree.clear_children(key);
        let mut dropped = 0;
        if sweep == Sweep::Selection {
            for entry in &discarded {
                if self.selection.remove(entry.key()).is_some() {
                    dropped += 1;
                }
            }
            let stale: Vec<FsEntry> = self
                .selection
                .entries_within(key)
                .into_iter()
                .filter(|e| e.key() != key && !self.gateway.exists(&e.path))
                .collect();
            for entry in &stale {
                self.selection.remove(entry.key());
            }
            dropped += stale.len();
        }

        self.materialize(txn, key)?;
        let loaded = self
            .tree
            .get(key)
            .is_some_and(|n| n.state == Materialization::Loaded);
        if was_expanded && loaded {
            if let Some(node) = self.tree.get_mut(key) {
                node.expanded = true;
            }
        }
        self.restore_expansion(txn, &expanded_below);
        self.sync_flag(txn, key);
        self.propagate_up(txn, key);

        tracing::debug!(
            path = %key.as_path().display(),
            dropped,
            reexpanded = expanded_below.len(),
            "refreshed"
        );
        Ok(())
    }

    /// Re-expand `dirs` (parents listed before children) where they still
    /// exist, then resync their flags deepest first.
    pub(crate) fn restore_expansion(&mut self, txn: &mut Txn, dirs: &[PathBuf]) {
        let mut restored = Vec::new();
        for dir in dirs {
            let key = PathKey::new(dir);
            if !self.tree.contains(&key) {
                continue;
            }
            if let Err(e) = self.materialize(txn, &key) {
                tracing::warn!(path = %dir.display(), error = %e, "could not restore expansion");
                continue;
            }
            if let Some(node) = self.tree.get_mut(&key) {
                if node.state == Materialization::Loaded {
                    node.expanded = true;
                }
            }
            restored.push(key);
        }
        for key in restored.iter().rev() {
            self.sync_flag(txn, key);
        }
    }

    pub(crate) fn reload_in(&mut self, txn: &mut Txn, sweep: Sweep) -> OpResult<()> {
        if sweep == Sweep::Selection {
            let gateway = &self.gateway;
            let pruned = self.selection.retain(|e| gateway.exists(&e.path));
            if !pruned.is_empty() {
                tracing::debug!(count = pruned.len(), "pruned vanished selections");
            }
        }
        let root_key = self.tree.root_key().clone();
        self.refresh_in(txn, &root_key, sweep)?;
        txn.record(Change::Reloaded);
        Ok(())
    }

    /// Refresh every marked directory once.
    ///
    /// Nested marks collapse into their ancestor. If a mark is the root, is
    /// not materialized, or fails to refresh, the whole tree reloads instead.
    pub(crate) fn refresh_marked(&mut self, txn: &mut Txn, marked: &[PathBuf]) -> OpResult<Resync> {
        let root_key = self.tree.root_key().clone();
        let mut keys: Vec<(PathKey, PathBuf)> = Vec::new();
        for path in marked {
            let key = PathKey::new(path);
            if !keys.iter().any(|(k, _)| *k == key) {
                keys.push((key, path.clone()));
            }
        }
        let needs_full = keys
            .iter()
            .any(|(k, _)| *k == root_key || !self.tree.contains(k));

        let mut resync = Resync::default();
        if !needs_full {
            for (key, path) in &keys {
                let nested = keys.iter().any(|(other, _)| other != key && key.is_within(other));
                if nested {
                    continue;
                }
                if let Err(e) = self.refresh_in(txn, key, Sweep::Selection) {
                    tracing::warn!(path = %path.display(), error = %e, "targeted refresh failed");
                    resync.full_reload = true;
                    break;
                }
                resync.refreshed.push(path.clone());
            }
        }
        if needs_full || resync.full_reload {
            self.reload_in(txn, Sweep::Selection)?;
            resync.refreshed.clear();
            resync.full_reload = true;
        }
        Ok(resync)
    }

    /// Files `entry` contributes to the registry: nothing outside the root
    /// or below an ignored folder.
    pub(crate) fn tally_of(&self, entry: &FsEntry) -> ExtensionTally {
        if !self.is_counted(entry) {
            return ExtensionTally::new();
        }
        ExtensionTally::of_entry(self.gateway.as_ref(), entry).unwrap_or_else(|e| {
            tracing::warn!(path = %entry.path.display(), error = %e, "could not count files");
            ExtensionTally::new()
        })
    }

    /// What is still on disk of `entry` after a mutation failed partway.
    pub(crate) fn tally_remaining(&self, entry: &FsEntry) -> ExtensionTally {
        if self.gateway.exists(&entry.path) {
            self.tally_of(entry)
        } else {
            ExtensionTally::new()
        }
    }

    /// Apply the net per-extension difference between two tallies, so an
    /// unchanged extension never drops to zero in between.
    pub(crate) fn apply_tally_change(&mut self, removed: &ExtensionTally, added: &ExtensionTally) {
        let mut exts: Vec<&str> = removed.iter().map(|(e, _)| e).collect();
        exts.extend(added.iter().map(|(e, _)| e));
        exts.sort_unstable();
        exts.dedup();
        for ext in exts {
            let delta = added.get(ext) as i64 - removed.get(ext) as i64;
            self.filters.adjust_count(ext, delta);
        }
    }

    fn is_counted(&self, entry: &FsEntry) -> bool {
        let Some(rel) = rebase_path(&entry.path, self.tree.root_path(), Path::new("")) else {
            return false;
        };
        let names: Vec<String> = rel
            .components()
            .map(|c| c.as_os_str().to_string_lossy().to_string())
            .collect();
        let dirs = if entry.is_dir() {
            &names[..]
        } else {
            &names[..names.len().saturating_sub(1)]
        };
        !dirs.iter().any(|n| self.gateway.is_ignored(n))
    }
}
