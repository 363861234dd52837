use std::collections::BTreeMap;
use std::path::Path;

use crate::fs::entry::{EntryKind, FsEntry};
use crate::fs::gateway::{FileSystemGateway, OpResult};

/// One row of the extension filter panel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilterEntry {
    pub extension: String,
    pub enabled: bool,
    pub count: usize,
}

impl FilterEntry {
    /// Label shown in the filter panel.
    pub fn label(&self) -> String {
        if self.extension.is_empty() {
            "(none)".to_string()
        } else {
            format!(".{}", self.extension)
        }
    }
}

/// Per-extension file counts for a subtree.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExtensionTally {
    counts: BTreeMap<String, usize>,
}

impl ExtensionTally {
    pub fn new() -> Self {
        Self::default()
    }

    /// Full recursive count of files below `root`, ignore list applied.
    pub fn scan(gateway: &dyn FileSystemGateway, root: &Path) -> OpResult<Self> {
        let mut tally = Self::new();
        gateway.walk(root, &mut |e| tally.add(e))?;
        Ok(tally)
    }

    /// Files contributed by `entry`: itself, or everything below a directory.
    pub fn of_entry(gateway: &dyn FileSystemGateway, entry: &FsEntry) -> OpResult<Self> {
        if entry.is_dir() {
            Self::scan(gateway, &entry.path)
        } else {
            let mut tally = Self::new();
            tally.add(entry);
            Ok(tally)
        }
    }

    /// Count `entry` if it is a file; directories are ignored.
    pub fn add(&mut self, entry: &FsEntry) {
        if entry.kind == EntryKind::File {
            *self.counts.entry(entry.extension.clone()).or_insert(0) += 1;
        }
    }

    pub fn get(&self, ext: &str) -> usize {
        self.counts.get(ext).copied().unwrap_or(0)
    }

    /// Add another tally's counts into this one.
    pub fn merge(&mut self, other: &ExtensionTally) {
        for (ext, count) in other.iter() {
            *self.counts.entry(ext.to_string()).or_insert(0) += count;
        }
    }

    pub fn is_empty(&self) -> bool {
        self.counts.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, usize)> {
        self.counts.iter().map(|(k, v)| (k.as_str(), *v))
    }
}

/// Extension → {enabled, count} table, sorted by extension.
///
/// Built once from a full scan at root load and adjusted incrementally
/// afterwards. Rows whose count drops to zero are removed.
#[derive(Debug, Clone, Default)]
pub struct FilterRegistry {
    entries: Vec<FilterEntry>,
}

/// Strip a leading dot and lowercase, so `.TXT` and `txt` name the same row.
pub fn normalize_ext(ext: &str) -> String {
    ext.trim_start_matches('.').to_lowercase()
}

impl FilterRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from a scan tally; extensions listed in `disabled` start off.
    pub fn from_tally(tally: &ExtensionTally, disabled: &[String]) -> Self {
        let disabled: Vec<String> = disabled.iter().map(|e| normalize_ext(e)).collect();
        let entries = tally
            .iter()
            .filter(|(_, count)| *count > 0)
            .map(|(ext, count)| FilterEntry {
                extension: ext.to_string(),
                enabled: !disabled.iter().any(|d| d == ext),
                count,
            })
            .collect();
        Self { entries }
    }

    pub fn entries(&self) -> &[FilterEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn position(&self, ext: &str) -> Result<usize, usize> {
        self.entries
            .binary_search_by(|e| e.extension.as_str().cmp(ext))
    }

    pub fn get(&self, ext: &str) -> Option<&FilterEntry> {
        let ext = normalize_ext(ext);
        self.position(&ext).ok().map(|i| &self.entries[i])
    }

    #[cfg(test)]
    pub fn count(&self, ext: &str) -> usize {
        self.get(ext).map(|e| e.count).unwrap_or(0)
    }

    /// Unknown extensions count as enabled so brand-new files stay visible.
    pub fn is_enabled(&self, ext: &str) -> bool {
        self.get(ext).map(|e| e.enabled).unwrap_or(true)
    }

    /// Whether `entry` survives the active filter. Directories always do.
    pub fn admits(&self, entry: &FsEntry) -> bool {
        match entry.kind {
            EntryKind::Directory => true,
            EntryKind::File => self.is_enabled(&entry.extension),
        }
    }

    /// Returns true if the flag actually changed.
    pub fn set_enabled(&mut self, ext: &str, enabled: bool) -> bool {
        let ext = normalize_ext(ext);
        match self.position(&ext) {
            Ok(i) if self.entries[i].enabled != enabled => {
                self.entries[i].enabled = enabled;
                true
            }
            _ => false,
        }
    }

    /// Apply a count delta without rescanning.
    ///
    /// Zero-count rows are removed; a positive delta for an unseen extension
    /// inserts an enabled row at its sorted position.
    pub fn adjust_count(&mut self, ext: &str, delta: i64) {
        if delta == 0 {
            return;
        }
        let ext = normalize_ext(ext);
        match self.position(&ext) {
            Ok(i) => {
                let next = self.entries[i].count as i64 + delta;
                if next <= 0 {
                    self.entries.remove(i);
                } else {
                    self.entries[i].count = next as usize;
                }
            }
            Err(i) if delta > 0 => {
                self.entries.insert(
                    i,
                    FilterEntry {
                        extension: ext,
                        enabled: true,
                        count: delta as usize,
                    },
                );
            }
            Err(_) => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tally(files: &[&str]) -> ExtensionTally {
        let mut t = ExtensionTally::new();
        for f in files {
            t.add(&FsEntry::file(Path::new(f)));
        }
        t
    }

    #[test]
    fn from_tally_is_sorted_with_counts() {
        let reg = FilterRegistry::from_tally(&tally(&["/r/b.rs", "/r/a.txt", "/r/c.rs"]), &[]);
        let exts: Vec<&str> = reg.entries().iter().map(|e| e.extension.as_str()).collect();
        assert_eq!(exts, vec!["rs", "txt"]);
        assert_eq!(reg.count("rs"), 2);
        assert_eq!(reg.count(".TXT"), 1);
        assert!(reg.entries().iter().all(|e| e.enabled));
    }

    #[test]
    fn tally_ignores_directories() {
        let mut t = ExtensionTally::new();
        t.add(&FsEntry::dir(Path::new("/r/src")));
        assert!(t.is_empty());
    }

    #[test]
    fn disabled_extensions_start_off() {
        let reg = FilterRegistry::from_tally(&tally(&["/r/a.txt", "/r/b.md"]), &[".MD".into()]);
        assert!(!reg.is_enabled("md"));
        assert!(reg.is_enabled("txt"));
    }

    #[test]
    fn adjust_count_removes_zero_rows() {
        let mut reg = FilterRegistry::from_tally(&tally(&["/r/a.txt", "/r/b.md"]), &[]);
        reg.adjust_count("md", -1);
        assert!(reg.get("md").is_none());
        assert_eq!(reg.len(), 1);
    }

    #[test]
    fn adjust_count_inserts_new_extension_sorted() {
        let mut reg = FilterRegistry::from_tally(&tally(&["/r/a.txt", "/r/b.md"]), &[]);
        reg.adjust_count("py", 2);
        let exts: Vec<&str> = reg.entries().iter().map(|e| e.extension.as_str()).collect();
        assert_eq!(exts, vec!["md", "py", "txt"]);
        assert!(reg.is_enabled("py"));
        assert_eq!(reg.count("py"), 2);
    }

    #[test]
    fn negative_delta_for_unknown_is_noop() {
        let mut reg = FilterRegistry::new();
        reg.adjust_count("zip", -3);
        assert!(reg.is_empty());
    }

    #[test]
    fn admits_hides_only_disabled_files() {
        let mut reg = FilterRegistry::from_tally(&tally(&["/r/a.txt", "/r/b.md"]), &[]);
        assert!(reg.set_enabled("md", false));
        assert!(!reg.set_enabled("md", false));
        assert!(!reg.admits(&FsEntry::file(Path::new("/r/b.md"))));
        assert!(reg.admits(&FsEntry::file(Path::new("/r/a.txt"))));
        assert!(reg.admits(&FsEntry::file(Path::new("/r/new.xyz"))));
        assert!(reg.admits(&FsEntry::dir(Path::new("/r/docs.md"))));
    }

    #[test]
    fn merge_adds_counts() {
        let mut t = tally(&["/r/a.txt"]);
        t.merge(&tally(&["/r/x/c.txt", "/r/x/d.rs"]));
        assert_eq!(t.get("txt"), 2);
        assert_eq!(t.get("rs"), 1);
    }

    #[test]
    fn label_for_missing_extension() {
        let reg = FilterRegistry::from_tally(&tally(&["/r/Makefile"]), &[]);
        assert_eq!(reg.entries()[0].label(), "(none)");
    }
}
