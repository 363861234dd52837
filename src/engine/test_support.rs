//! Fixtures shared by the engine test modules.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::engine::filter::FilterRegistry;
use crate::engine::mutation::{ConflictChoice, PresentationObserver};
use crate::engine::tree::{Materialization, Node};
use crate::engine::{Engine, EngineOptions};
use crate::error::OpError;
use crate::fs::entry::{FsEntry, PathKey};
use crate::fs::gateway::{DiskGateway, FileSystemGateway, OpResult};

pub fn engine_at(root: &Path) -> Engine {
    Engine::new(Box::new(DiskGateway::default()), EngineOptions::default(), root).unwrap()
}

pub fn key_of(path: &Path) -> PathKey {
    PathKey::new(path)
}

/// Check the structural and checkbox invariants over the whole tree.
pub fn assert_invariants(engine: &Engine) {
    let tree = engine.tree();
    let mut nodes = tree.node_keys();
    let node_count = nodes.len();
    nodes.sort();
    nodes.dedup();
    assert_eq!(nodes.len(), node_count, "duplicate node paths");
    let mut indexed: Vec<PathKey> = tree.index().keys().cloned().collect();
    indexed.sort();
    assert_eq!(nodes, indexed, "index out of step with tree");

    check_node(engine, tree.root());
}

fn check_node(engine: &Engine, node: &Node) {
    let selection = engine.selection();
    let path = node.path().display().to_string();
    if node.is_dir() {
        match node.state {
            Materialization::Loaded => {
                let expected = node.all_children_selected(selection);
                assert_eq!(node.checked, expected, "derived flag wrong for {path}");
                assert_eq!(
                    selection.contains(node.key()),
                    expected,
                    "membership out of step for {path}"
                );
            }
            Materialization::Denied => assert!(!node.checked, "denied node checked: {path}"),
            _ => assert_eq!(node.checked, selection.contains(node.key()), "flag wrong for {path}"),
        }
    } else {
        assert_eq!(node.checked, selection.contains(node.key()), "flag wrong for {path}");
    }
    for child in &node.children {
        assert_eq!(child.parent.as_ref(), Some(node.key()));
        check_node(engine, child);
    }
}

/// Observer with canned answers that records what it was asked.
#[derive(Debug)]
pub struct Scripted {
    pub confirm: bool,
    pub choice: ConflictChoice,
    pub asked_delete: Vec<usize>,
    pub conflicts: Vec<PathBuf>,
}

impl Scripted {
    pub fn new(confirm: bool, choice: ConflictChoice) -> Self {
        Self {
            confirm,
            choice,
            asked_delete: Vec::new(),
            conflicts: Vec::new(),
        }
    }
}

impl PresentationObserver for Scripted {
    fn confirm_delete(&mut self, count: usize) -> bool {
        self.asked_delete.push(count);
        self.confirm
    }

    fn resolve_conflict(&mut self, _source: &FsEntry, existing: &Path) -> ConflictChoice {
        self.conflicts.push(existing.to_path_buf());
        self.choice
    }
}

/// Failure to inject for a given path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Fault {
    InUse,
    Unexpected,
    /// Delete or copy one file of a directory, then fail.
    Partial,
}

/// Disk gateway that fails mutations on chosen source paths.
#[derive(Default)]
pub struct FaultyGateway {
    inner: DiskGateway,
    faults: HashMap<PathKey, Fault>,
    listing_broken: Arc<AtomicBool>,
}

impl FaultyGateway {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail(mut self, path: &Path, fault: Fault) -> Self {
        self.faults.insert(PathKey::new(path), fault);
        self
    }

    /// Switch that makes every later directory listing fail.
    pub fn listing_switch(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.listing_broken)
    }

    fn fault(&self, entry: &FsEntry) -> Option<Fault> {
        self.faults.get(entry.key()).copied()
    }

    fn check(&self, entry: &FsEntry) -> OpResult<()> {
        match self.fault(entry) {
            Some(Fault::InUse) => Err(OpError::InUse(entry.path.clone())),
            Some(Fault::Unexpected) => Err(OpError::Unexpected(format!(
                "injected failure for {}",
                entry.path.display()
            ))),
            Some(Fault::Partial) | None => Ok(()),
        }
    }

    /// First file below `dir`, by name.
    fn first_file(dir: &Path) -> Option<PathBuf> {
        let mut files: Vec<PathBuf> = fs::read_dir(dir)
            .ok()?
            .flatten()
            .map(|e| e.path())
            .filter(|p| p.is_file())
            .collect();
        files.sort();
        files.into_iter().next()
    }
}

impl FileSystemGateway for FaultyGateway {
    fn list_children(
        &self,
        dir: &Path,
        filter: Option<&FilterRegistry>,
    ) -> OpResult<Vec<FsEntry>> {
        if self.listing_broken.load(Ordering::SeqCst) {
            return Err(OpError::Unexpected(format!("cannot list {}", dir.display())));
        }
        self.inner.list_children(dir, filter)
    }

    fn exists(&self, path: &Path) -> bool {
        self.inner.exists(path)
    }

    fn is_ignored(&self, name: &str) -> bool {
        self.inner.is_ignored(name)
    }

    fn stat(&self, path: &Path) -> OpResult<FsEntry> {
        self.inner.stat(path)
    }

    fn read_text(&self, path: &Path) -> OpResult<String> {
        self.inner.read_text(path)
    }

    fn walk(&self, root: &Path, visit: &mut dyn FnMut(&FsEntry)) -> OpResult<()> {
        self.inner.walk(root, visit)
    }

    fn delete(&self, entry: &FsEntry) -> OpResult<()> {
        self.check(entry)?;
        if self.fault(entry) == Some(Fault::Partial) {
            if let Some(file) = Self::first_file(&entry.path) {
                fs::remove_file(&file).unwrap();
            }
            return Err(OpError::AccessDenied(entry.path.clone()));
        }
        self.inner.delete(entry)
    }

    fn copy(&self, entry: &FsEntry, dest: &Path) -> OpResult<()> {
        self.check(entry)?;
        if self.fault(entry) == Some(Fault::Partial) {
            fs::create_dir(dest).unwrap();
            if let Some(file) = Self::first_file(&entry.path) {
                let name = file.file_name().unwrap();
                fs::copy(&file, dest.join(name)).unwrap();
            }
            return Err(OpError::AccessDenied(entry.path.clone()));
        }
        self.inner.copy(entry, dest)
    }

    fn move_entry(&self, entry: &FsEntry, dest: &Path) -> OpResult<()> {
        self.check(entry)?;
        self.inner.move_entry(entry, dest)
    }

    fn rename(&self, entry: &FsEntry, dest: &Path) -> OpResult<()> {
        self.check(entry)?;
        self.inner.rename(entry, dest)
    }
}

pub fn faulty_engine(root: &Path, gateway: FaultyGateway) -> Engine {
    Engine::new(Box::new(gateway), EngineOptions::default(), root).unwrap()
}
