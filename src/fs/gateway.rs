use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use crate::engine::filter::FilterRegistry;
use crate::error::OpError;
use crate::fs::entry::{EntryKind, FsEntry};

/// Folder names skipped by every recursive walk, copy and scan.
pub const DEFAULT_IGNORE_DIRS: &[&str] = &[
    ".git",
    ".vs",
    ".vscode",
    ".idea",
    "bin",
    "obj",
    "node_modules",
    "__pycache__",
    "target",
    "build",
];

/// Raw OS code for a rename across devices.
#[cfg(windows)]
const CROSS_DEVICE_CODE: i32 = 17; // ERROR_NOT_SAME_DEVICE
#[cfg(not(windows))]
const CROSS_DEVICE_CODE: i32 = 18; // EXDEV

pub type OpResult<T> = std::result::Result<T, OpError>;

/// Everything the engine needs from the disk.
///
/// Recursive operations (`walk`, `copy`) skip ignored folder names.
pub trait FileSystemGateway {
    /// Direct children of `dir`, optionally dropping entries the filter hides.
    fn list_children(&self, dir: &Path, filter: Option<&FilterRegistry>)
        -> OpResult<Vec<FsEntry>>;

    fn exists(&self, path: &Path) -> bool;

    /// Whether recursive operations skip a folder with this name.
    fn is_ignored(&self, name: &str) -> bool;

    fn stat(&self, path: &Path) -> OpResult<FsEntry>;

    fn read_text(&self, path: &Path) -> OpResult<String>;

    /// Visit every descendant of `root` (not `root` itself), parents first.
    ///
    /// Unreadable sub-directories are skipped; an unreadable `root` is an error.
    fn walk(&self, root: &Path, visit: &mut dyn FnMut(&FsEntry)) -> OpResult<()>;

    /// Remove a file, or a directory with everything below it.
    fn delete(&self, entry: &FsEntry) -> OpResult<()>;

    /// Copy `entry` to the exact path `dest`.
    fn copy(&self, entry: &FsEntry, dest: &Path) -> OpResult<()>;

    /// Move `entry` to the exact path `dest`.
    fn move_entry(&self, entry: &FsEntry, dest: &Path) -> OpResult<()>;

    /// Rename `entry` in place to `dest`.
    fn rename(&self, entry: &FsEntry, dest: &Path) -> OpResult<()>;
}

/// `FileSystemGateway` backed by `std::fs`.
#[derive(Debug, Clone)]
pub struct DiskGateway {
    ignore_dirs: Vec<String>,
}

impl Default for DiskGateway {
    fn default() -> Self {
        Self::new(DEFAULT_IGNORE_DIRS.iter().map(|s| s.to_string()).collect())
    }
}

impl DiskGateway {
    pub fn new(ignore_dirs: Vec<String>) -> Self {
        Self { ignore_dirs }
    }

    /// Classify a path without following symlinks, so links never recurse.
    fn entry_for(path: &Path) -> io::Result<FsEntry> {
        let metadata = fs::symlink_metadata(path)?;
        let kind = if metadata.is_dir() {
            EntryKind::Directory
        } else {
            EntryKind::File
        };
        Ok(FsEntry::new(path, kind))
    }

    fn copy_dir_recursive(&self, src: &Path, dest: &Path, skip_ignored: bool) -> OpResult<()> {
        fs::create_dir(dest).map_err(|e| OpError::from_io(dest, e))?;
        let entries = fs::read_dir(src).map_err(|e| OpError::from_io(src, e))?;
        for entry in entries {
            let entry = entry.map_err(|e| OpError::from_io(src, e))?;
            let src_path = entry.path();
            let dest_path = dest.join(entry.file_name());
            let child = Self::entry_for(&src_path).map_err(|e| OpError::from_io(&src_path, e))?;
            if child.is_dir() {
                if skip_ignored && self.is_ignored(&child.name) {
                    continue;
                }
                self.copy_dir_recursive(&src_path, &dest_path, skip_ignored)?;
            } else {
                fs::copy(&src_path, &dest_path).map_err(|e| OpError::from_io(&src_path, e))?;
            }
        }
        Ok(())
    }
}

impl FileSystemGateway for DiskGateway {
    fn list_children(
        &self,
        dir: &Path,
        filter: Option<&FilterRegistry>,
    ) -> OpResult<Vec<FsEntry>> {
        let entries = fs::read_dir(dir).map_err(|e| OpError::from_io(dir, e))?;
        let mut children = Vec::new();
        for entry in entries {
            let entry = match entry {
                Ok(e) => e,
                Err(_) => continue,
            };
            let child = match Self::entry_for(&entry.path()) {
                Ok(c) => c,
                Err(_) => continue,
            };
            if filter.map_or(true, |f| f.admits(&child)) {
                children.push(child);
            }
        }
        Ok(children)
    }

    fn exists(&self, path: &Path) -> bool {
        fs::symlink_metadata(path).is_ok()
    }

    fn is_ignored(&self, name: &str) -> bool {
        self.ignore_dirs.iter().any(|d| d.eq_ignore_ascii_case(name))
    }

    fn stat(&self, path: &Path) -> OpResult<FsEntry> {
        Self::entry_for(path).map_err(|e| OpError::from_io(path, e))
    }

    fn read_text(&self, path: &Path) -> OpResult<String> {
        fs::read_to_string(path).map_err(|e| OpError::from_io(path, e))
    }

    fn walk(&self, root: &Path, visit: &mut dyn FnMut(&FsEntry)) -> OpResult<()> {
        let mut stack: Vec<PathBuf> = vec![root.to_path_buf()];
        let mut first = true;
        while let Some(dir) = stack.pop() {
            let entries = match fs::read_dir(&dir) {
                Ok(e) => e,
                Err(e) if first => return Err(OpError::from_io(&dir, e)),
                Err(e) => {
                    tracing::warn!(path = %dir.display(), error = %e, "skipping unreadable directory");
                    continue;
                }
            };
            first = false;
            for entry in entries.flatten() {
                let child = match Self::entry_for(&entry.path()) {
                    Ok(c) => c,
                    Err(_) => continue,
                };
                if child.is_dir() {
                    if self.is_ignored(&child.name) {
                        continue;
                    }
                    stack.push(child.path.clone());
                }
                visit(&child);
            }
        }
        Ok(())
    }

    fn delete(&self, entry: &FsEntry) -> OpResult<()> {
        let result = if entry.is_dir() {
            fs::remove_dir_all(&entry.path)
        } else {
            fs::remove_file(&entry.path)
        };
        result.map_err(|e| OpError::from_io(&entry.path, e))
    }

    fn copy(&self, entry: &FsEntry, dest: &Path) -> OpResult<()> {
        if entry.is_dir() {
            self.copy_dir_recursive(&entry.path, dest, true)
        } else {
            if self.exists(dest) {
                return Err(OpError::NameCollision(dest.to_path_buf()));
            }
            fs::copy(&entry.path, dest)
                .map(|_| ())
                .map_err(|e| OpError::from_io(&entry.path, e))
        }
    }

    fn move_entry(&self, entry: &FsEntry, dest: &Path) -> OpResult<()> {
        if self.exists(dest) {
            return Err(OpError::NameCollision(dest.to_path_buf()));
        }
        match fs::rename(&entry.path, dest) {
            Ok(()) => Ok(()),
            Err(e) if e.raw_os_error() == Some(CROSS_DEVICE_CODE) => {
                // Moves carry everything, ignored folders included.
                if entry.is_dir() {
                    self.copy_dir_recursive(&entry.path, dest, false)?;
                } else {
                    fs::copy(&entry.path, dest).map_err(|e| OpError::from_io(&entry.path, e))?;
                }
                self.delete(entry)
            }
            Err(e) => Err(OpError::from_io(&entry.path, e)),
        }
    }

    fn rename(&self, entry: &FsEntry, dest: &Path) -> OpResult<()> {
        fs::rename(&entry.path, dest).map_err(|e| OpError::from_io(&entry.path, e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::filter::ExtensionTally;
    use tempfile::TempDir;

    fn setup() -> TempDir {
        let tmp = TempDir::new().unwrap();
        let root = tmp.path();
        fs::create_dir_all(root.join("src").join("nested")).unwrap();
        fs::create_dir_all(root.join("node_modules").join("pkg")).unwrap();
        fs::write(root.join("a.txt"), "alpha").unwrap();
        fs::write(root.join("b.md"), "# b").unwrap();
        fs::write(root.join("src").join("main.rs"), "fn main() {}").unwrap();
        fs::write(root.join("src").join("nested").join("deep.rs"), "").unwrap();
        fs::write(root.join("node_modules").join("pkg").join("index.js"), "").unwrap();
        tmp
    }

    fn names(entries: &[FsEntry]) -> Vec<String> {
        let mut n: Vec<String> = entries.iter().map(|e| e.name.clone()).collect();
        n.sort();
        n
    }

    #[test]
    fn list_children_unfiltered() {
        let tmp = setup();
        let gw = DiskGateway::default();
        let children = gw.list_children(tmp.path(), None).unwrap();
        assert_eq!(names(&children), vec!["a.txt", "b.md", "node_modules", "src"]);
    }

    #[test]
    fn list_children_applies_filter() {
        let tmp = setup();
        let gw = DiskGateway::default();
        let mut reg = FilterRegistry::from_tally(&ExtensionTally::scan(&gw, tmp.path()).unwrap(), &[]);
        reg.set_enabled("md", false);
        let children = gw.list_children(tmp.path(), Some(&reg)).unwrap();
        assert_eq!(names(&children), vec!["a.txt", "node_modules", "src"]);
    }

    #[test]
    fn list_children_missing_dir_is_not_found() {
        let tmp = setup();
        let gw = DiskGateway::default();
        let err = gw.list_children(&tmp.path().join("nope"), None).unwrap_err();
        assert!(matches!(err, OpError::NotFound(_)));
    }

    #[test]
    fn walk_skips_ignored_folders() {
        let tmp = setup();
        let gw = DiskGateway::default();
        let mut seen = Vec::new();
        gw.walk(tmp.path(), &mut |e| seen.push(e.name.clone())).unwrap();
        seen.sort();
        assert_eq!(seen, vec!["a.txt", "b.md", "deep.rs", "main.rs", "nested", "src"]);
    }

    #[test]
    fn walk_missing_root_fails() {
        let tmp = setup();
        let gw = DiskGateway::default();
        assert!(gw.walk(&tmp.path().join("nope"), &mut |_| {}).is_err());
    }

    #[test]
    fn read_text_returns_content() {
        let tmp = setup();
        let gw = DiskGateway::default();
        assert_eq!(gw.read_text(&tmp.path().join("a.txt")).unwrap(), "alpha");
        assert!(matches!(
            gw.read_text(&tmp.path().join("zzz.txt")),
            Err(OpError::NotFound(_))
        ));
    }

    #[test]
    fn stat_classifies_kind() {
        let tmp = setup();
        let gw = DiskGateway::default();
        assert!(gw.stat(&tmp.path().join("src")).unwrap().is_dir());
        assert!(!gw.stat(&tmp.path().join("a.txt")).unwrap().is_dir());
    }

    #[test]
    fn copy_directory_skips_ignored() {
        let tmp = setup();
        let gw = DiskGateway::default();
        fs::create_dir(tmp.path().join("src").join("target")).unwrap();
        fs::write(tmp.path().join("src").join("target").join("out.o"), "").unwrap();
        let src = gw.stat(&tmp.path().join("src")).unwrap();
        let dest = tmp.path().join("copy_of_src");
        gw.copy(&src, &dest).unwrap();
        assert!(dest.join("main.rs").exists());
        assert!(dest.join("nested").join("deep.rs").exists());
        assert!(!dest.join("target").exists());
        assert!(src.path.exists());
    }

    #[test]
    fn copy_file_refuses_existing_destination() {
        let tmp = setup();
        let gw = DiskGateway::default();
        let a = gw.stat(&tmp.path().join("a.txt")).unwrap();
        let err = gw.copy(&a, &tmp.path().join("b.md")).unwrap_err();
        assert!(matches!(err, OpError::NameCollision(_)));
    }

    #[test]
    fn move_entry_relocates() {
        let tmp = setup();
        let gw = DiskGateway::default();
        let a = gw.stat(&tmp.path().join("a.txt")).unwrap();
        let dest = tmp.path().join("src").join("a.txt");
        gw.move_entry(&a, &dest).unwrap();
        assert!(dest.exists());
        assert!(!a.path.exists());
    }

    #[test]
    fn delete_directory_recursively() {
        let tmp = setup();
        let gw = DiskGateway::default();
        let src = gw.stat(&tmp.path().join("src")).unwrap();
        gw.delete(&src).unwrap();
        assert!(!gw.exists(&src.path));
    }

    #[test]
    fn delete_missing_is_not_found() {
        let tmp = setup();
        let gw = DiskGateway::default();
        let ghost = FsEntry::file(&tmp.path().join("ghost.txt"));
        assert!(matches!(gw.delete(&ghost), Err(OpError::NotFound(_))));
    }

    #[test]
    fn rename_in_place() {
        let tmp = setup();
        let gw = DiskGateway::default();
        let a = gw.stat(&tmp.path().join("a.txt")).unwrap();
        gw.rename(&a, &tmp.path().join("z.txt")).unwrap();
        assert!(tmp.path().join("z.txt").exists());
    }
}
