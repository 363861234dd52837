use std::collections::HashMap;
use std::path::PathBuf;

use crate::fs::entry::{EntryKind, PathKey};

/// What the index records about one materialized node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexEntry {
    pub path: PathBuf,
    pub kind: EntryKind,
    /// Non-owning link to the parent node, `None` for the root.
    pub parent: Option<PathKey>,
}

/// Path → node lookup for everything currently materialized.
///
/// Holds exactly one entry per live node. Nodes themselves are owned by
/// their parent's child list; the index only records how to reach them.
#[derive(Debug, Default)]
pub struct ViewIndex {
    map: HashMap<PathKey, IndexEntry>,
}

impl ViewIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns false if the key was already present (and leaves it untouched).
    pub fn insert(&mut self, key: PathKey, entry: IndexEntry) -> bool {
        if self.map.contains_key(&key) {
            return false;
        }
        self.map.insert(key, entry);
        true
    }

    pub fn remove(&mut self, key: &PathKey) -> Option<IndexEntry> {
        self.map.remove(key)
    }

    pub fn contains(&self, key: &PathKey) -> bool {
        self.map.contains_key(key)
    }

    pub fn parent_of(&self, key: &PathKey) -> Option<&PathKey> {
        self.map.get(key).and_then(|e| e.parent.as_ref())
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }

    #[cfg(test)]
    pub fn keys(&self) -> impl Iterator<Item = &PathKey> {
        self.map.keys()
    }

    /// Keys from the root down to `key`, following parent links.
    ///
    /// `None` if `key` or any link on the way is missing.
    pub fn chain(&self, key: &PathKey) -> Option<Vec<PathKey>> {
        let mut chain = vec![key.clone()];
        let mut current = self.map.get(key)?;
        while let Some(parent) = &current.parent {
            current = self.map.get(parent)?;
            chain.push(parent.clone());
        }
        chain.reverse();
        Some(chain)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;

    fn key(p: &str) -> PathKey {
        PathKey::new(Path::new(p))
    }

    fn entry(p: &str, parent: Option<&str>) -> IndexEntry {
        IndexEntry {
            path: PathBuf::from(p),
            kind: EntryKind::Directory,
            parent: parent.map(key),
        }
    }

    #[test]
    fn insert_rejects_duplicates() {
        let mut idx = ViewIndex::new();
        assert!(idx.insert(key("/r"), entry("/r", None)));
        assert!(!idx.insert(key("/R"), entry("/R", None)));
        assert_eq!(idx.len(), 1);
        assert_eq!(idx.chain(&key("/R")).unwrap(), vec![key("/r")]);
    }

    #[test]
    fn chain_walks_to_root() {
        let mut idx = ViewIndex::new();
        idx.insert(key("/r"), entry("/r", None));
        idx.insert(key("/r/a"), entry("/r/a", Some("/r")));
        idx.insert(key("/r/a/b"), entry("/r/a/b", Some("/r/a")));
        let chain = idx.chain(&key("/r/a/b")).unwrap();
        assert_eq!(chain, vec![key("/r"), key("/r/a"), key("/r/a/b")]);
        assert_eq!(idx.parent_of(&key("/r/a")), Some(&key("/r")));
    }

    #[test]
    fn chain_breaks_on_missing_link() {
        let mut idx = ViewIndex::new();
        idx.insert(key("/r/a/b"), entry("/r/a/b", Some("/r/a")));
        assert!(idx.chain(&key("/r/a/b")).is_none());
        assert!(idx.chain(&key("/nope")).is_none());
    }
}
