use std::hash::{Hash, Hasher};
use std::path::{Component, Path, PathBuf};

/// Case-folded path identity.
///
/// Two paths that differ only by letter case map to the same key, so every
/// lookup table in the engine treats them as one entry.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PathKey(PathBuf);

impl PathKey {
    pub fn new(path: &Path) -> Self {
        PathKey(PathBuf::from(path.to_string_lossy().to_lowercase()))
    }

    /// True if `self` equals `ancestor` or lies somewhere below it.
    ///
    /// Matching is component-wise, so `/a/foo` is not within `/a/fo`.
    pub fn is_within(&self, ancestor: &PathKey) -> bool {
        self.0.starts_with(&ancestor.0)
    }

    pub fn as_path(&self) -> &Path {
        &self.0
    }
}

/// Kind of filesystem entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryKind {
    File,
    Directory,
}

/// Value snapshot of a filesystem entry.
///
/// Equality and hashing use the case-folded path only.
#[derive(Debug, Clone)]
pub struct FsEntry {
    pub name: String,
    pub path: PathBuf,
    pub kind: EntryKind,
    /// Lowercase extension without the dot; empty for directories and
    /// extensionless files.
    pub extension: String,
    key: PathKey,
}

impl FsEntry {
    pub fn new(path: &Path, kind: EntryKind) -> Self {
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| path.to_string_lossy().to_string());
        let extension = match kind {
            EntryKind::Directory => String::new(),
            EntryKind::File => extension_of(path),
        };
        Self {
            name,
            path: path.to_path_buf(),
            kind,
            extension,
            key: PathKey::new(path),
        }
    }

    pub fn file(path: &Path) -> Self {
        Self::new(path, EntryKind::File)
    }

    pub fn dir(path: &Path) -> Self {
        Self::new(path, EntryKind::Directory)
    }

    pub fn key(&self) -> &PathKey {
        &self.key
    }

    pub fn is_dir(&self) -> bool {
        self.kind == EntryKind::Directory
    }

    pub fn parent_path(&self) -> Option<&Path> {
        self.path.parent()
    }

    /// The same entry moved from below `from` to below `to`.
    ///
    /// Returns `None` when this entry does not live under `from`.
    pub fn rebased(&self, from: &Path, to: &Path) -> Option<FsEntry> {
        rebase_path(&self.path, from, to).map(|p| FsEntry::new(&p, self.kind))
    }
}

impl PartialEq for FsEntry {
    fn eq(&self, other: &Self) -> bool {
        self.key == other.key
    }
}

impl Eq for FsEntry {}

impl Hash for FsEntry {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.key.hash(state);
    }
}

/// Lowercase extension of `path`, empty if it has none.
pub fn extension_of(path: &Path) -> String {
    path.extension()
        .map(|e| e.to_string_lossy().to_lowercase())
        .unwrap_or_default()
}

/// Replace the `from` prefix of `path` with `to`, comparing case-insensitively.
pub fn rebase_path(path: &Path, from: &Path, to: &Path) -> Option<PathBuf> {
    if !PathKey::new(path).is_within(&PathKey::new(from)) {
        return None;
    }
    let depth = from.components().filter(|c| !matches!(c, Component::CurDir)).count();
    let tail: PathBuf = path
        .components()
        .filter(|c| !matches!(c, Component::CurDir))
        .skip(depth)
        .collect();
    if tail.as_os_str().is_empty() {
        Some(to.to_path_buf())
    } else {
        Some(to.join(tail))
    }
}
