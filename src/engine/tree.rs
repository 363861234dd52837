use std::path::{Path, PathBuf};

use crate::engine::index::{IndexEntry, ViewIndex};
use crate::engine::selection::SelectionSet;
use crate::fs::entry::{FsEntry, PathKey};

/// How far a directory node has been read from disk.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Materialization {
    Unloaded,
    Loading,
    Loaded,
    /// Listing failed with access denied; shown as a disabled leaf.
    Denied,
}

/// A live element of the tree, owned by its parent's child list.
#[derive(Debug, Clone)]
pub struct Node {
    pub entry: FsEntry,
    pub state: Materialization,
    /// Meaningful only when `state` is `Loaded`.
    pub children: Vec<Node>,
    /// Non-owning back-reference, resolved through the `ViewIndex`.
    pub parent: Option<PathKey>,
    pub expanded: bool,
    /// Observable checkbox state.
    pub checked: bool,
    pub depth: usize,
}

impl Node {
    fn new(entry: FsEntry, parent: Option<PathKey>, depth: usize) -> Self {
        Self {
            entry,
            state: Materialization::Unloaded,
            children: Vec::new(),
            parent,
            expanded: false,
            checked: false,
            depth,
        }
    }

    pub fn key(&self) -> &PathKey {
        self.entry.key()
    }

    pub fn path(&self) -> &Path {
        &self.entry.path
    }

    pub fn is_dir(&self) -> bool {
        self.entry.is_dir()
    }

    /// Denied nodes take no clicks.
    pub fn is_interactive(&self) -> bool {
        self.state != Materialization::Denied
    }

    /// True iff there is at least one visible child and every one is selected.
    pub fn all_children_selected(&self, selection: &SelectionSet) -> bool {
        !self.children.is_empty() && self.children.iter().all(|c| selection.contains(c.key()))
    }
}

/// A flattened, render-ready view of one visible node.
#[derive(Debug, Clone)]
pub struct Row {
    pub entry: FsEntry,
    pub depth: usize,
    pub expanded: bool,
    pub checked: bool,
    pub state: Materialization,
    pub is_last_sibling: bool,
}

/// Lazily materialized directory hierarchy plus its path index.
#[derive(Debug)]
pub struct TreeModel {
    root: Node,
    index: ViewIndex,
    dirs_first: bool,
}

impl TreeModel {
    /// A tree holding only the (unloaded) root node.
    pub fn new(root: FsEntry, dirs_first: bool) -> Self {
        let mut index = ViewIndex::new();
        index.insert(
            root.key().clone(),
            IndexEntry {
                path: root.path.clone(),
                kind: root.kind,
                parent: None,
            },
        );
        Self {
            root: Node::new(root, None, 0),
            index,
            dirs_first,
        }
    }

    pub fn root(&self) -> &Node {
        &self.root
    }

    pub fn root_key(&self) -> &PathKey {
        self.root.key()
    }

    pub fn root_path(&self) -> &Path {
        self.root.path()
    }

    pub fn index(&self) -> &ViewIndex {
        &self.index
    }

    pub fn contains(&self, key: &PathKey) -> bool {
        self.index.contains(key)
    }

    pub fn parent_key(&self, key: &PathKey) -> Option<PathKey> {
        self.index.parent_of(key).cloned()
    }

    pub fn get(&self, key: &PathKey) -> Option<&Node> {
        let chain = self.index.chain(key)?;
        let mut node = &self.root;
        if chain.first() != Some(node.key()) {
            return None;
        }
        for k in &chain[1..] {
            node = node.children.iter().find(|c| c.key() == k)?;
        }
        Some(node)
    }

    pub fn get_mut(&mut self, key: &PathKey) -> Option<&mut Node> {
        let chain = self.index.chain(key)?;
        let mut node = &mut self.root;
        if chain.first() != Some(node.key()) {
            return None;
        }
        for k in &chain[1..] {
            node = node.children.iter_mut().find(|c| c.key() == k)?;
        }
        Some(node)
    }

    /// Give an unloaded directory its children and mark it `Loaded`.
    ///
    /// Each new node's checkbox mirrors its current selection membership.
    /// Entries whose key is already indexed (case-only duplicates) are
    /// skipped. Returns the keys of the created nodes.
    pub fn populate(
        &mut self,
        key: &PathKey,
        entries: Vec<FsEntry>,
        selection: &SelectionSet,
    ) -> Vec<PathKey> {
        let dirs_first = self.dirs_first;
        let Some(chain) = self.index.chain(key) else {
            return Vec::new();
        };
        let mut created = Vec::new();
        let mut children = Vec::with_capacity(entries.len());
        let depth = chain.len();
        for entry in entries {
            let child_key = entry.key().clone();
            let inserted = self.index.insert(
                child_key.clone(),
                IndexEntry {
                    path: entry.path.clone(),
                    kind: entry.kind,
                    parent: Some(key.clone()),
                },
            );
            if !inserted {
                tracing::warn!(path = %entry.path.display(), "skipping entry with duplicate identity");
                continue;
            }
            let mut node = Node::new(entry, Some(key.clone()), depth);
            node.checked = selection.contains(&child_key);
            created.push(child_key);
            children.push(node);
        }
        sort_nodes(&mut children, dirs_first);
        if let Some(node) = self.get_mut(key) {
            node.children = children;
            node.state = Materialization::Loaded;
        }
        created
    }

    pub fn mark_denied(&mut self, key: &PathKey) {
        if let Some(node) = self.get_mut(key) {
            node.children.clear();
            node.state = Materialization::Denied;
            node.expanded = false;
        }
    }

    /// Drop every descendant of `key` from the tree and the index, leaving
    /// the node itself `Unloaded`. Returns the removed entries.
    pub fn clear_children(&mut self, key: &PathKey) -> Vec<FsEntry> {
        let Some(node) = self.get_mut(key) else {
            return Vec::new();
        };
        let children = std::mem::take(&mut node.children);
        node.state = Materialization::Unloaded;
        let mut removed = Vec::new();
        for child in children {
            collect_subtree(child, &mut removed);
        }
        for entry in &removed {
            self.index.remove(entry.key());
        }
        removed
    }

    /// Detach `key` and everything below it. The root cannot be removed.
    pub fn remove_subtree(&mut self, key: &PathKey) -> Vec<FsEntry> {
        let Some(parent_key) = self.parent_key(key) else {
            return Vec::new();
        };
        let Some(parent) = self.get_mut(&parent_key) else {
            return Vec::new();
        };
        let Some(pos) = parent.children.iter().position(|c| c.key() == key) else {
            return Vec::new();
        };
        let node = parent.children.remove(pos);
        let mut removed = Vec::new();
        collect_subtree(node, &mut removed);
        for entry in &removed {
            self.index.remove(entry.key());
        }
        removed
    }

    /// Expanded, loaded directories strictly below `key`, parents first.
    pub fn expanded_dirs_under(&self, key: &PathKey) -> Vec<PathBuf> {
        let mut out = Vec::new();
        if let Some(node) = self.get(key) {
            for child in &node.children {
                collect_expanded(child, &mut out);
            }
        }
        out
    }

    /// Flatten the visible part of the tree for rendering.
    pub fn rows(&self) -> Vec<Row> {
        let mut rows = Vec::new();
        flatten_node(&self.root, &mut rows, true);
        rows
    }

    /// `key` and every materialized node below it, parents first.
    pub fn subtree_keys(&self, key: &PathKey) -> Vec<PathKey> {
        let mut keys = Vec::new();
        if let Some(node) = self.get(key) {
            collect_keys(node, &mut keys);
        }
        keys
    }

    /// Every node reachable from the root, as keys.
    pub fn node_keys(&self) -> Vec<PathKey> {
        let mut keys = Vec::new();
        let mut stack = vec![&self.root];
        while let Some(node) = stack.pop() {
            keys.push(node.key().clone());
            stack.extend(node.children.iter());
        }
        keys
    }
}

/// Directories first (when enabled), then case-insensitive by name.
fn sort_nodes(nodes: &mut [Node], dirs_first: bool) {
    nodes.sort_by(|a, b| {
        let mut cmp = std::cmp::Ordering::Equal;
        if dirs_first {
            cmp = b.is_dir().cmp(&a.is_dir());
        }
        cmp.then_with(|| {
            a.entry
                .name
                .to_lowercase()
                .cmp(&b.entry.name.to_lowercase())
        })
    });
}

fn collect_subtree(node: Node, out: &mut Vec<FsEntry>) {
    let Node {
        entry, children, ..
    } = node;
    out.push(entry);
    for child in children {
        collect_subtree(child, out);
    }
}

fn collect_keys(node: &Node, out: &mut Vec<PathKey>) {
    out.push(node.key().clone());
    for child in &node.children {
        collect_keys(child, out);
    }
}

fn collect_expanded(node: &Node, out: &mut Vec<PathBuf>) {
    if node.state == Materialization::Loaded && node.expanded {
        out.push(node.entry.path.clone());
        for child in &node.children {
            collect_expanded(child, out);
        }
    }
}

fn flatten_node(node: &Node, rows: &mut Vec<Row>, is_last: bool) {
    rows.push(Row {
        entry: node.entry.clone(),
        depth: node.depth,
        expanded: node.expanded,
        checked: node.checked,
        state: node.state,
        is_last_sibling: is_last,
    });
    if node.expanded {
        let count = node.children.len();
        for (i, child) in node.children.iter().enumerate() {
            flatten_node(child, rows, i + 1 == count);
        }
    }
}
