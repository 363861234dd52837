use crate::fs::entry::{FsEntry, PathKey};

/// Whether a paste copies or moves the held entries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClipboardMode {
    Copy,
    Cut,
}

/// Engine-internal clipboard: entry snapshots taken at copy/cut time.
///
/// Independent of the selection once captured.
#[derive(Debug, Clone, Default)]
pub struct Clipboard {
    entries: Vec<FsEntry>,
    mode: Option<ClipboardMode>,
}

impl Clipboard {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the contents, keeping order and dropping duplicate paths.
    pub fn set(&mut self, entries: Vec<FsEntry>, mode: ClipboardMode) {
        let mut unique: Vec<FsEntry> = Vec::with_capacity(entries.len());
        for entry in entries {
            if !unique.contains(&entry) {
                unique.push(entry);
            }
        }
        self.entries = unique;
        self.mode = Some(mode);
    }

    pub fn clear(&mut self) {
        self.entries.clear();
        self.mode = None;
    }

    pub fn entries(&self) -> &[FsEntry] {
        &self.entries
    }

    pub fn mode(&self) -> Option<ClipboardMode> {
        self.mode
    }

    pub fn is_cut(&self) -> bool {
        self.mode == Some(ClipboardMode::Cut)
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Drop entries that were moved away. Cut mode ends once nothing is left.
    pub fn remove(&mut self, moved: &[PathKey]) {
        self.entries.retain(|e| !moved.contains(e.key()));
        if self.entries.is_empty() {
            self.mode = None;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;

    fn file(p: &str) -> FsEntry {
        FsEntry::file(Path::new(p))
    }

    #[test]
    fn new_clipboard_is_empty() {
        let cb = Clipboard::new();
        assert!(cb.is_empty());
        assert_eq!(cb.mode(), None);
        assert!(!cb.is_cut());
    }

    #[test]
    fn set_replaces_and_dedups() {
        let mut cb = Clipboard::new();
        cb.set(vec![file("/tmp/old.txt")], ClipboardMode::Copy);
        cb.set(
            vec![file("/tmp/a.txt"), file("/tmp/A.TXT"), file("/tmp/b.txt")],
            ClipboardMode::Cut,
        );
        assert_eq!(cb.len(), 2);
        assert!(cb.is_cut());
        assert_eq!(cb.entries()[1].name, "b.txt");
    }

    #[test]
    fn removing_everything_ends_cut_mode() {
        let mut cb = Clipboard::new();
        cb.set(vec![file("/tmp/a.txt"), file("/tmp/b.txt")], ClipboardMode::Cut);
        cb.remove(&[PathKey::new(Path::new("/tmp/a.txt"))]);
        assert_eq!(cb.len(), 1);
        assert!(cb.is_cut());
        cb.remove(&[PathKey::new(Path::new("/tmp/b.txt"))]);
        assert!(cb.is_empty());
        assert_eq!(cb.mode(), None);
    }

    #[test]
    fn clear_resets_mode() {
        let mut cb = Clipboard::new();
        cb.set(vec![file("/tmp/a.txt")], ClipboardMode::Copy);
        cb.clear();
        assert!(cb.is_empty());
        assert_eq!(cb.mode(), None);
    }
}
