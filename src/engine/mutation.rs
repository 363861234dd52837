//! Disk-mutating operations: clipboard capture, paste, delete and rename.
//!
//! Each operation brackets its gateway calls with the bookkeeping that keeps
//! the tree, index, selection and registry consistent, then resyncs the
//! touched parents (or the whole tree) once at the end.

use std::path::{Path, PathBuf};

use crate::engine::cascade::{Change, ChangeSet, Txn};
use crate::engine::filter::ExtensionTally;
use crate::engine::selection::top_level;
use crate::engine::tree::Materialization;
use crate::engine::{Engine, Resync, Sweep};
use crate::error::{InvalidNameReason, OpError};
use crate::fs::clipboard::ClipboardMode;
use crate::fs::entry::{rebase_path, FsEntry, PathKey};
use crate::fs::gateway::OpResult;

/// Characters no file name may contain on any supported platform.
const RESERVED_CHARS: &[char] = &['<', '>', ':', '"', '/', '\\', '|', '?', '*'];

/// The user-facing side of a mutation. Supplies decisions, never touches
/// engine state.
pub trait PresentationObserver {
    /// Asked once per delete batch with the number of top-level targets.
    fn confirm_delete(&mut self, count: usize) -> bool;

    /// Asked for every paste item whose destination already exists.
    fn resolve_conflict(&mut self, source: &FsEntry, existing: &Path) -> ConflictChoice;

    /// Called with everything a batch changed, after it finished.
    fn on_changes(&mut self, _changes: &ChangeSet) {}
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConflictChoice {
    Overwrite,
    Skip,
    CancelAll,
}

/// Why a paste item was passed over without an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// Pasting into the folder it already lives in.
    SameLocation,
    /// The source vanished after it was copied.
    Missing,
    /// A directory pasted into itself or one of its descendants.
    SelfContainment,
    /// The user chose to skip a conflict.
    Declined,
}

#[derive(Debug)]
pub struct ItemFailure {
    pub path: PathBuf,
    pub error: OpError,
}

#[derive(Debug, Default)]
pub struct PasteReport {
    pub pasted: Vec<PathBuf>,
    pub skipped: Vec<(PathBuf, SkipReason)>,
    pub failed: Vec<ItemFailure>,
    pub cancelled: bool,
    /// A fatal failure stopped the batch; later items were not attempted.
    pub aborted: bool,
    pub resync: Resync,
    pub changes: ChangeSet,
}

impl PasteReport {
    pub fn pasted_count(&self) -> usize {
        self.pasted.len()
    }
}

#[derive(Debug, Default)]
pub struct DeleteReport {
    pub deleted: Vec<PathBuf>,
    pub failed: Vec<ItemFailure>,
    pub cancelled: bool,
    pub aborted: bool,
    pub resync: Resync,
    pub changes: ChangeSet,
}

#[derive(Debug)]
pub struct RenameOutcome {
    pub new_path: PathBuf,
    pub changes: ChangeSet,
}

/// Check a proposed name without touching the disk; returns it trimmed.
pub fn validate_name(current: &str, proposed: &str) -> OpResult<String> {
    let name = proposed.trim();
    if name.is_empty() {
        return Err(OpError::InvalidName(InvalidNameReason::Empty));
    }
    if let Some(c) = name
        .chars()
        .find(|c| RESERVED_CHARS.contains(c) || c.is_control())
    {
        return Err(OpError::InvalidName(InvalidNameReason::ReservedCharacter(c)));
    }
    if name == "." || name == ".." {
        return Err(OpError::InvalidName(InvalidNameReason::DotName));
    }
    if name == current {
        return Err(OpError::InvalidName(InvalidNameReason::Unchanged));
    }
    Ok(name.to_string())
}

/// Log and store a per-item failure. Returns true if the batch must stop.
fn record_failure(failed: &mut Vec<ItemFailure>, path: &Path, error: OpError) -> bool {
    let fatal = error.is_fatal();
    if fatal {
        tracing::error!(path = %path.display(), error = %error, "aborting batch");
    } else {
        tracing::warn!(path = %path.display(), error = %error, "item failed");
    }
    failed.push(ItemFailure {
        path: path.to_path_buf(),
        error,
    });
    fatal
}

impl Engine {
    /// Put the top-level selected entries on the clipboard.
    pub fn clip_selection(&mut self, mode: ClipboardMode) -> usize {
        let entries = self.selection.top_level();
        self.clip_entries(entries, mode)
    }

    /// Put explicit entries on the clipboard. The root is never clipped.
    pub fn clip_entries(&mut self, entries: Vec<FsEntry>, mode: ClipboardMode) -> usize {
        let root_key = self.tree.root_key().clone();
        let entries: Vec<FsEntry> = top_level(entries)
            .into_iter()
            .filter(|e| *e.key() != root_key)
            .collect();
        self.clipboard.set(entries, mode);
        tracing::debug!(count = self.clipboard.len(), ?mode, "clipboard set");
        self.clipboard.len()
    }

    pub fn clear_clipboard(&mut self) {
        self.clipboard.clear();
    }

    /// Destinations under `dest` that a paste would collide with.
    pub fn paste_conflicts(&self, dest: &Path) -> Vec<PathBuf> {
        self.clipboard
            .entries()
            .iter()
            .filter_map(|source| {
                let target = dest.join(&source.name);
                let clash = PathKey::new(&target) != *source.key() && self.gateway.exists(&target);
                clash.then_some(target)
            })
            .collect()
    }

    /// Copy or move every clipboard entry into `dest`, one at a time.
    ///
    /// Items succeed or fail independently. Only a fatal error or
    /// `CancelAll` stops the batch early.
    pub fn paste(
        &mut self,
        dest: &Path,
        observer: &mut dyn PresentationObserver,
    ) -> OpResult<PasteReport> {
        let mut report = PasteReport::default();
        let Some(mode) = self.clipboard.mode() else {
            return Ok(report);
        };
        let dest_entry = self.gateway.stat(dest)?;
        if !dest_entry.is_dir() {
            return Err(OpError::NotFound(dest.to_path_buf()));
        }
        let dest = dest_entry.path;
        let dest_key = PathKey::new(&dest);
        let items = self.clipboard.entries().to_vec();

        let mut txn = Txn::new();
        let mut marked: Vec<PathBuf> = Vec::new();
        let mut moved: Vec<PathKey> = Vec::new();

        for source in items {
            let target = dest.join(&source.name);
            let target_key = PathKey::new(&target);

            if target_key == *source.key() {
                report.skipped.push((source.path.clone(), SkipReason::SameLocation));
                continue;
            }
            if !self.gateway.exists(&source.path) {
                tracing::warn!(path = %source.path.display(), "source no longer exists, skipping");
                report.skipped.push((source.path.clone(), SkipReason::Missing));
                continue;
            }
            if source.is_dir() && dest_key.is_within(source.key()) {
                tracing::warn!(
                    source = %source.path.display(),
                    dest = %dest.display(),
                    "cannot paste a directory into itself, skipping"
                );
                report.skipped.push((source.path.clone(), SkipReason::SelfContainment));
                continue;
            }

            if self.gateway.exists(&target) {
                match observer.resolve_conflict(&source, &target) {
                    ConflictChoice::Skip => {
                        report.skipped.push((source.path.clone(), SkipReason::Declined));
                        continue;
                    }
                    ConflictChoice::CancelAll => {
                        tracing::info!(at = %source.path.display(), "paste cancelled");
                        report.cancelled = true;
                        break;
                    }
                    ConflictChoice::Overwrite => {
                        // Deleting the destination would take the source with it.
                        if source.key().is_within(&target_key) {
                            let err = OpError::SelfContainment(target.clone());
                            record_failure(&mut report.failed, &source.path, err);
                            continue;
                        }
                        let cleared = match self.gateway.stat(&target) {
                            Ok(existing) => self.discard(&mut txn, &existing),
                            Err(e) => Err(e),
                        };
                        if let Err(e) = cleared {
                            marked.push(dest.clone());
                            if record_failure(&mut report.failed, &source.path, e) {
                                report.aborted = true;
                                break;
                            }
                            continue;
                        }
                        marked.push(dest.clone());
                    }
                }
            }

            let source_tally = match mode {
                ClipboardMode::Cut => self.tally_of(&source),
                ClipboardMode::Copy => ExtensionTally::new(),
            };
            let target_entry = FsEntry::new(&target, source.kind);
            let target_existed = self.gateway.exists(&target);
            let result = match mode {
                ClipboardMode::Copy => self.gateway.copy(&source, &target),
                ClipboardMode::Cut => self.gateway.move_entry(&source, &target),
            };
            match result {
                Ok(()) => {
                    let placed = self.tally_of(&target_entry);
                    self.apply_tally_change(&source_tally, &placed);
                    if mode == ClipboardMode::Cut {
                        self.forget(&mut txn, &source);
                        if let Some(parent) = source.parent_path() {
                            marked.push(parent.to_path_buf());
                        }
                        moved.push(source.key().clone());
                    }
                    marked.push(dest.clone());
                    report.pasted.push(target);
                }
                Err(e) => {
                    // A recursive copy or move may have got partway.
                    let mut after = match mode {
                        ClipboardMode::Cut => self.tally_remaining(&source),
                        ClipboardMode::Copy => ExtensionTally::new(),
                    };
                    if !target_existed && self.gateway.exists(&target) {
                        after.merge(&self.tally_of(&target_entry));
                        marked.push(dest.clone());
                    }
                    self.apply_tally_change(&source_tally, &after);
                    if record_failure(&mut report.failed, &source.path, e) {
                        report.aborted = true;
                        break;
                    }
                }
            }
        }

        if mode == ClipboardMode::Cut {
            self.clipboard.remove(&moved);
        }
        report.resync = self.resync_after(&mut txn, &marked, report.aborted);
        report.changes = txn.finish();
        observer.on_changes(&report.changes);

        tracing::info!(
            dest = %dest.display(),
            ?mode,
            pasted = report.pasted.len(),
            skipped = report.skipped.len(),
            failed = report.failed.len(),
            cancelled = report.cancelled,
            "paste finished"
        );
        Ok(report)
    }

    /// Delete `entries` from disk after confirmation.
    ///
    /// Selection membership is dropped before any disk call, so a partial
    /// failure never leaves a selected entry that may be gone.
    pub fn delete(
        &mut self,
        entries: Vec<FsEntry>,
        observer: &mut dyn PresentationObserver,
    ) -> OpResult<DeleteReport> {
        let mut report = DeleteReport::default();
        let root_key = self.tree.root_key().clone();
        let mut targets = Vec::new();
        for entry in top_level(entries) {
            if *entry.key() == root_key {
                let err = OpError::AccessDenied(entry.path.clone());
                record_failure(&mut report.failed, &entry.path, err);
            } else {
                targets.push(entry);
            }
        }
        if targets.is_empty() {
            return Ok(report);
        }
        if !observer.confirm_delete(targets.len()) {
            report.cancelled = true;
            return Ok(report);
        }

        let mut txn = Txn::new();
        for target in &targets {
            self.selection.remove_within(target.key());
        }
        for target in &targets {
            self.resync_subtree(&mut txn, target.key());
        }

        let mut marked = Vec::new();
        for target in &targets {
            match self.discard(&mut txn, target) {
                Ok(()) => {
                    report.deleted.push(target.path.clone());
                    if let Some(parent) = target.parent_path() {
                        marked.push(parent.to_path_buf());
                    }
                }
                Err(e) => {
                    if let Some(parent) = target.parent_path() {
                        marked.push(parent.to_path_buf());
                    }
                    if record_failure(&mut report.failed, &target.path, e) {
                        report.aborted = true;
                        break;
                    }
                }
            }
        }

        let gone: Vec<PathKey> = self
            .clipboard
            .entries()
            .iter()
            .filter(|e| report.deleted.iter().any(|d| e.key().is_within(&PathKey::new(d))))
            .map(|e| e.key().clone())
            .collect();
        if !gone.is_empty() {
            self.clipboard.remove(&gone);
        }

        report.resync = self.resync_after(&mut txn, &marked, report.aborted);
        report.changes = txn.finish();
        observer.on_changes(&report.changes);

        tracing::info!(
            deleted = report.deleted.len(),
            failed = report.failed.len(),
            aborted = report.aborted,
            "delete finished"
        );
        Ok(report)
    }

    /// Rename `path` in place to `new_name`.
    ///
    /// The old subtree is dropped before the disk call and recreated from a
    /// refresh afterwards. Selection and expansion carry over to the new
    /// path.
    pub fn rename(&mut self, path: &Path, new_name: &str) -> OpResult<RenameOutcome> {
        let key = PathKey::new(path);
        let (entry, was_expanded) = match self.tree.get(&key) {
            Some(node) => (
                node.entry.clone(),
                node.expanded && node.state == Materialization::Loaded,
            ),
            None => return Err(OpError::NotFound(path.to_path_buf())),
        };
        if key == *self.tree.root_key() {
            return Err(OpError::AccessDenied(path.to_path_buf()));
        }
        let new_name = validate_name(&entry.name, new_name)?;
        let parent = entry
            .parent_path()
            .map(Path::to_path_buf)
            .ok_or_else(|| OpError::NotFound(path.to_path_buf()))?;
        let target = parent.join(&new_name);
        let target_key = PathKey::new(&target);
        // A case-only rename keeps the same identity and is not a collision.
        if target_key != key && (self.tree.contains(&target_key) || self.gateway.exists(&target)) {
            return Err(OpError::NameCollision(target));
        }

        let saved = self.selection.entries_within(&key);
        let mut expanded = Vec::new();
        if was_expanded {
            expanded.push(entry.path.clone());
        }
        expanded.extend(self.tree.expanded_dirs_under(&key));
        // Directory renames only move counts when the name enters or
        // leaves the ignore list.
        let recount =
            !entry.is_dir() || self.gateway.is_ignored(&entry.name) != self.gateway.is_ignored(&new_name);
        let old_tally = if recount {
            self.tally_of(&entry)
        } else {
            ExtensionTally::new()
        };

        let mut txn = Txn::new();
        self.forget(&mut txn, &entry);

        if let Err(e) = self.gateway.rename(&entry, &target) {
            tracing::warn!(path = %entry.path.display(), error = %e, "rename failed");
            for prior in saved {
                if self.gateway.exists(&prior.path) {
                    self.selection.insert(prior);
                }
            }
            if let Err(resync_err) = self.refresh_marked(&mut txn, &[parent]) {
                tracing::warn!(error = %resync_err, "could not resync after failed rename");
            }
            return Err(e);
        }

        let renamed = FsEntry::new(&target, entry.kind);
        if recount {
            let new_tally = self.tally_of(&renamed);
            self.apply_tally_change(&old_tally, &new_tally);
        }
        let visible = self.filters.admits(&renamed);
        for prior in saved {
            if let Some(moved) = prior.rebased(&entry.path, &target) {
                if *moved.key() != target_key || visible {
                    self.selection.insert(moved);
                }
            }
        }
        let rebased_dirs: Vec<PathBuf> = expanded
            .iter()
            .filter_map(|d| rebase_path(d, &entry.path, &target))
            .collect();

        self.refresh_marked(&mut txn, &[parent])?;
        self.restore_expansion(&mut txn, &rebased_dirs);
        if self.tree.contains(&target_key) {
            self.sync_flag(&mut txn, &target_key);
            self.propagate_up(&mut txn, &target_key);
        }

        tracing::info!(from = %entry.path.display(), to = %target.display(), "renamed");
        Ok(RenameOutcome {
            new_path: target,
            changes: txn.finish(),
        })
    }

    /// Delete one entry from disk and drop it from every structure.
    fn discard(&mut self, txn: &mut Txn, entry: &FsEntry) -> OpResult<()> {
        let tally = self.tally_of(entry);
        if let Err(e) = self.gateway.delete(entry) {
            // Part of a directory may already be gone.
            let left = self.tally_remaining(entry);
            self.apply_tally_change(&tally, &left);
            return Err(e);
        }
        self.apply_tally_change(&tally, &ExtensionTally::new());
        self.forget(txn, entry);
        Ok(())
    }

    /// Drop `entry` and everything below it from the tree, index and
    /// selection without touching the disk.
    fn forget(&mut self, txn: &mut Txn, entry: &FsEntry) {
        let removed = self.tree.remove_subtree(entry.key());
        if !removed.is_empty() {
            txn.record(Change::Removed {
                path: entry.path.clone(),
            });
        }
        self.selection.remove_within(entry.key());
    }

    /// Resync every materialized node of a subtree deepest first, then its
    /// ancestors.
    fn resync_subtree(&mut self, txn: &mut Txn, key: &PathKey) {
        let keys = self.tree.subtree_keys(key);
        for k in keys.iter().rev() {
            self.sync_flag(txn, k);
        }
        self.propagate_up(txn, key);
    }

    /// Resync after a batch. The disk work is already done, so a failing
    /// reload is logged and reported rather than returned.
    fn resync_after(&mut self, txn: &mut Txn, marked: &[PathBuf], aborted: bool) -> Resync {
        let result = if aborted {
            self.reload_in(txn, Sweep::Selection).map(|()| Resync {
                refreshed: Vec::new(),
                full_reload: true,
            })
        } else {
            self.refresh_marked(txn, marked)
        };
        result.unwrap_or_else(|e| {
            tracing::error!(error = %e, "could not resync the tree after a batch");
            Resync {
                refreshed: Vec::new(),
                full_reload: true,
            }
        })
    }
}
