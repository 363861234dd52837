use std::io;
use std::path::{Path, PathBuf};
use std::time::Instant;

use crate::engine::cascade::{ChangeSet, ToggleMode};
use crate::engine::mutation::{ConflictChoice, PresentationObserver};
use crate::engine::tree::{Materialization, Row};
use crate::engine::Engine;
use crate::error::{InvalidNameReason, OpError};
use crate::fs::clipboard::ClipboardMode;
use crate::fs::entry::FsEntry;

/// Lines of a file shown in the preview pane.
const PREVIEW_LINES: usize = 200;

/// The kind of dialog being displayed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DialogKind {
    Rename { original: PathBuf },
    DeleteConfirm { targets: Vec<PathBuf> },
    PasteConflict { dest: PathBuf, conflicts: Vec<PathBuf> },
    Error { message: String },
}

/// Application mode.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub enum AppMode {
    #[default]
    Normal,
    Dialog(DialogKind),
}

/// Which pane receives navigation keys.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum Focus {
    #[default]
    Tree,
    Filter,
}

/// State for a dialog's text input.
#[derive(Debug, Default)]
pub struct DialogState {
    pub input: String,
    pub cursor_position: usize,
}

/// Text of the focused file, loaded on cursor moves.
#[derive(Debug, Default)]
pub struct PreviewState {
    pub path: Option<PathBuf>,
    pub lines: Vec<String>,
    pub message: Option<String>,
}

/// Answers collected from a dialog before the engine runs the batch.
///
/// The terminal cannot block inside an engine call, so every question the
/// engine asks is answered from what the user already chose.
#[derive(Debug, Clone, Copy)]
pub struct PresetAnswers {
    pub confirm: bool,
    pub choice: ConflictChoice,
}

impl PresentationObserver for PresetAnswers {
    fn confirm_delete(&mut self, _count: usize) -> bool {
        self.confirm
    }

    fn resolve_conflict(&mut self, _source: &FsEntry, _existing: &Path) -> ConflictChoice {
        self.choice
    }

    fn on_changes(&mut self, changes: &ChangeSet) {
        tracing::debug!(changes = changes.len(), "batch applied");
    }
}

/// Main application state.
pub struct App {
    pub engine: Engine,
    pub rows: Vec<Row>,
    pub cursor: usize,
    pub scroll_offset: usize,
    pub filter_cursor: usize,
    pub focus: Focus,
    pub should_quit: bool,
    pub show_help: bool,
    pub mode: AppMode,
    pub dialog_state: DialogState,
    pub preview: PreviewState,
    /// Message, creation time, and whether it reports an error.
    pub status_message: Option<(String, Instant, bool)>,
    confirm_delete: bool,
}

impl App {
    pub fn new(engine: Engine, confirm_delete: bool) -> Self {
        let mut app = Self {
            rows: engine.rows(),
            engine,
            cursor: 0,
            scroll_offset: 0,
            filter_cursor: 0,
            focus: Focus::Tree,
            should_quit: false,
            show_help: false,
            mode: AppMode::Normal,
            dialog_state: DialogState::default(),
            preview: PreviewState::default(),
            status_message: None,
            confirm_delete,
        };
        app.update_preview();
        app
    }

    /// The row under the cursor.
    pub fn focused(&self) -> Option<&Row> {
        self.rows.get(self.cursor)
    }

    pub fn focused_path(&self) -> Option<PathBuf> {
        self.focused().map(|row| row.entry.path.clone())
    }

    /// Re-read the rows after the engine changed, keeping the cursor on
    /// `keep` when it is still visible.
    fn sync_rows(&mut self, keep: Option<&Path>) {
        self.rows = self.engine.rows();
        if let Some(path) = keep {
            if let Some(idx) = self.rows.iter().position(|r| r.entry.path == path) {
                self.cursor = idx;
            }
        }
        self.cursor = self.cursor.min(self.rows.len().saturating_sub(1));
        let filters = self.engine.filters().len();
        self.filter_cursor = self.filter_cursor.min(filters.saturating_sub(1));
        self.update_preview();
    }

    /// Keep the cursor row inside a viewport of `visible_height` rows.
    pub fn update_scroll(&mut self, visible_height: usize) {
        if visible_height == 0 {
            return;
        }
        if self.cursor < self.scroll_offset {
            self.scroll_offset = self.cursor;
        } else if self.cursor >= self.scroll_offset + visible_height {
            self.scroll_offset = self.cursor + 1 - visible_height;
        }
    }

    fn update_preview(&mut self) {
        let Some(row) = self.focused() else {
            self.preview = PreviewState::default();
            return;
        };
        if self.preview.path.as_deref() == Some(row.entry.path.as_path()) {
            return;
        }
        let path = row.entry.path.clone();
        let mut preview = PreviewState {
            path: Some(path.clone()),
            ..PreviewState::default()
        };
        if row.entry.is_dir() {
            preview.message = Some(match row.state {
                Materialization::Denied => "Access denied".to_string(),
                _ => format!("{} selected", self.engine.selection().len()),
            });
        } else {
            match self.engine.read_text(&path) {
                Ok(text) => {
                    preview.lines = text
                        .lines()
                        .take(PREVIEW_LINES)
                        .map(|l| l.to_string())
                        .collect();
                }
                Err(OpError::Other { source, .. })
                    if source.kind() == io::ErrorKind::InvalidData =>
                {
                    preview.message = Some("Binary file".to_string());
                }
                Err(e) => preview.message = Some(e.to_string()),
            }
        }
        self.preview = preview;
    }

    /// Open a dialog of the given kind.
    pub fn open_dialog(&mut self, kind: DialogKind) {
        self.dialog_state = DialogState::default();
        if let DialogKind::Rename { ref original } = kind {
            if let Some(name) = original.file_name() {
                let name = name.to_string_lossy().to_string();
                self.dialog_state.cursor_position = name.len();
                self.dialog_state.input = name;
            }
        }
        self.mode = AppMode::Dialog(kind);
    }

    /// Close the current dialog and return to normal mode.
    pub fn close_dialog(&mut self) {
        self.mode = AppMode::Normal;
        self.dialog_state = DialogState::default();
    }

    pub fn dialog_input_char(&mut self, c: char) {
        self.dialog_state
            .input
            .insert(self.dialog_state.cursor_position, c);
        self.dialog_state.cursor_position += c.len_utf8();
    }

    /// Delete the character before the cursor (backspace).
    pub fn dialog_delete_char(&mut self) {
        let pos = self.dialog_state.cursor_position;
        if let Some(prev) = self.dialog_state.input[..pos].chars().next_back() {
            self.dialog_state.cursor_position -= prev.len_utf8();
            self.dialog_state
                .input
                .remove(self.dialog_state.cursor_position);
        }
    }

    pub fn dialog_move_cursor_left(&mut self) {
        let pos = self.dialog_state.cursor_position;
        if let Some(prev) = self.dialog_state.input[..pos].chars().next_back() {
            self.dialog_state.cursor_position -= prev.len_utf8();
        }
    }

    pub fn dialog_move_cursor_right(&mut self) {
        let pos = self.dialog_state.cursor_position;
        if let Some(next) = self.dialog_state.input[pos..].chars().next() {
            self.dialog_state.cursor_position += next.len_utf8();
        }
    }

    pub fn dialog_cursor_home(&mut self) {
        self.dialog_state.cursor_position = 0;
    }

    pub fn dialog_cursor_end(&mut self) {
        self.dialog_state.cursor_position = self.dialog_state.input.len();
    }

    pub fn set_status_message(&mut self, msg: String) {
        self.status_message = Some((msg, Instant::now(), false));
    }

    pub fn set_error_message(&mut self, msg: String) {
        self.status_message = Some((msg, Instant::now(), true));
    }

    /// Clear the status message if it has been displayed for more than 3 seconds.
    pub fn clear_expired_status(&mut self) {
        if let Some((_, ref created, _)) = self.status_message {
            if created.elapsed().as_secs() > 3 {
                self.status_message = None;
            }
        }
    }

    /// Directory a paste lands in: the focused directory, or the focused
    /// file's parent.
    pub fn current_dir(&self) -> PathBuf {
        if let Some(row) = self.focused() {
            if row.entry.is_dir() {
                return row.entry.path.clone();
            }
            if let Some(parent) = row.entry.parent_path() {
                return parent.to_path_buf();
            }
        }
        self.engine.root_path().to_path_buf()
    }

    pub fn quit(&mut self) {
        self.should_quit = true;
    }

    pub fn select_next(&mut self) {
        if self.cursor + 1 < self.rows.len() {
            self.cursor += 1;
            self.update_preview();
        }
    }

    pub fn select_previous(&mut self) {
        if self.cursor > 0 {
            self.cursor -= 1;
            self.update_preview();
        }
    }

    pub fn select_first(&mut self) {
        self.cursor = 0;
        self.update_preview();
    }

    pub fn select_last(&mut self) {
        self.cursor = self.rows.len().saturating_sub(1);
        self.update_preview();
    }

    pub fn toggle_focus(&mut self) {
        self.focus = match self.focus {
            Focus::Tree => Focus::Filter,
            Focus::Filter => Focus::Tree,
        };
    }

    pub fn filter_next(&mut self) {
        if self.engine.filters().is_empty() {
            return;
        }
        if self.filter_cursor + 1 < self.engine.filters().len() {
            self.filter_cursor += 1;
        }
    }

    pub fn filter_previous(&mut self) {
        self.filter_cursor = self.filter_cursor.saturating_sub(1);
    }

    /// Report an engine error and resync the view with whatever state the
    /// engine is left in.
    fn report_error(&mut self, err: OpError) {
        tracing::warn!(error = %err, "operation failed");
        self.set_error_message(err.to_string());
        let keep = self.focused_path();
        self.sync_rows(keep.as_deref());
    }

    /// Expand the focused directory (no-op on files).
    pub fn expand_selected(&mut self) {
        let Some(row) = self.focused() else { return };
        if !row.entry.is_dir() {
            return;
        }
        let path = row.entry.path.clone();
        match self.engine.expand(&path) {
            Ok(_) => {
                if self.engine.node(&path).map(|n| n.state) == Some(Materialization::Denied) {
                    self.set_error_message(format!("Access denied: {}", path.display()));
                }
                self.sync_rows(Some(&path));
            }
            Err(e) => self.report_error(e),
        }
    }

    /// Collapse the focused directory, or jump to the parent row if it is a
    /// file or already collapsed.
    pub fn collapse_selected(&mut self) {
        let Some(row) = self.focused() else { return };
        let path = row.entry.path.clone();
        if row.entry.is_dir() && row.expanded {
            self.engine.collapse(&path);
            self.sync_rows(Some(&path));
            return;
        }
        let depth = row.depth;
        if depth == 0 {
            return;
        }
        if let Some(idx) = self.rows[..self.cursor]
            .iter()
            .rposition(|r| r.depth < depth)
        {
            self.cursor = idx;
            self.update_preview();
        }
    }

    /// Flip the focused entry's checkbox.
    pub fn toggle_selected(&mut self, mode: ToggleMode) {
        let Some(row) = self.focused() else { return };
        if row.state == Materialization::Denied {
            self.set_error_message("Access denied".to_string());
            return;
        }
        let path = row.entry.path.clone();
        match self.engine.toggle_path(&path, mode) {
            Ok(_) => {
                self.sync_rows(Some(&path));
                // The preview of a directory shows the selection count.
                self.preview.path = None;
                self.update_preview();
            }
            Err(e) => self.report_error(e),
        }
    }

    /// Put the selection, or the focused entry when nothing is selected, on
    /// the clipboard.
    pub fn clip(&mut self, mode: ClipboardMode) {
        let count = if self.engine.selection().is_empty() {
            match self.focused() {
                Some(row) => {
                    let entry = row.entry.clone();
                    self.engine.clip_entries(vec![entry], mode)
                }
                None => 0,
            }
        } else {
            self.engine.clip_selection(mode)
        };
        let verb = match mode {
            ClipboardMode::Copy => "Copied",
            ClipboardMode::Cut => "Cut",
        };
        if count == 0 {
            self.set_status_message("Nothing to put on the clipboard".to_string());
        } else {
            self.set_status_message(format!("{} {} item(s) to clipboard", verb, count));
        }
    }

    /// Start a paste into the current directory. Conflicts are asked about
    /// once up front.
    pub fn start_paste(&mut self) {
        if self.engine.clipboard().is_empty() {
            self.set_status_message("Clipboard is empty".to_string());
            return;
        }
        let dest = self.current_dir();
        let conflicts = self.engine.paste_conflicts(&dest);
        if conflicts.is_empty() {
            self.run_paste(&dest, ConflictChoice::Skip);
        } else {
            self.open_dialog(DialogKind::PasteConflict { dest, conflicts });
        }
    }

    /// Run the paste with one answer applied to every conflict.
    pub fn run_paste(&mut self, dest: &Path, choice: ConflictChoice) {
        let mut answers = PresetAnswers {
            confirm: true,
            choice,
        };
        let keep = self.focused_path();
        match self.engine.paste(dest, &mut answers) {
            Ok(report) => {
                self.sync_rows(keep.as_deref());
                if report.aborted {
                    let message = report
                        .failed
                        .last()
                        .map(|f| format!("{} ({})", f.error, display_name(&f.path)))
                        .unwrap_or_default();
                    self.open_dialog(DialogKind::Error {
                        message: format!("Paste aborted: {}", message),
                    });
                } else if !report.failed.is_empty() {
                    self.set_error_message(format!(
                        "Pasted {}, {} failed: {}",
                        report.pasted_count(),
                        report.failed.len(),
                        report.failed[0].error
                    ));
                } else if report.cancelled {
                    self.set_status_message(format!(
                        "Paste cancelled after {} item(s)",
                        report.pasted_count()
                    ));
                } else {
                    self.set_status_message(format!(
                        "Pasted {} item(s), skipped {}",
                        report.pasted_count(),
                        report.skipped.len()
                    ));
                }
            }
            Err(e) => self.report_error(e),
        }
    }

    /// Start deleting the selection, or the focused entry when nothing is
    /// selected.
    pub fn start_delete(&mut self) {
        let entries: Vec<FsEntry> = if self.engine.selection().is_empty() {
            self.focused().map(|r| r.entry.clone()).into_iter().collect()
        } else {
            self.engine.selection().top_level()
        };
        let root = self.engine.root_path().to_path_buf();
        let targets: Vec<PathBuf> = entries
            .into_iter()
            .map(|e| e.path)
            .filter(|p| *p != root)
            .collect();
        if targets.is_empty() {
            self.set_error_message("The root folder cannot be deleted".to_string());
            return;
        }
        if self.confirm_delete {
            self.open_dialog(DialogKind::DeleteConfirm { targets });
        } else {
            self.run_delete(targets);
        }
    }

    pub fn run_delete(&mut self, targets: Vec<PathBuf>) {
        let entries = targets
            .iter()
            .map(|p| match self.engine.node(p) {
                Some(node) => node.entry.clone(),
                None => FsEntry::file(p),
            })
            .collect();
        let mut answers = PresetAnswers {
            confirm: true,
            choice: ConflictChoice::Skip,
        };
        let keep = self.focused_path();
        match self.engine.delete(entries, &mut answers) {
            Ok(report) => {
                self.sync_rows(keep.as_deref());
                if report.aborted {
                    let at = report
                        .failed
                        .last()
                        .map(|f| display_name(&f.path))
                        .unwrap_or_default();
                    self.open_dialog(DialogKind::Error {
                        message: format!(
                            "Delete aborted at {} after {} item(s); the tree was reloaded",
                            at,
                            report.deleted.len()
                        ),
                    });
                } else if let Some(first) = report.failed.first() {
                    self.set_error_message(format!(
                        "Deleted {}, {} failed: {}",
                        report.deleted.len(),
                        report.failed.len(),
                        first.error
                    ));
                } else {
                    self.set_status_message(format!("Deleted {} item(s)", report.deleted.len()));
                }
            }
            Err(e) => self.report_error(e),
        }
    }

    pub fn start_rename(&mut self) {
        let Some(path) = self.focused_path() else { return };
        if path == self.engine.root_path() {
            self.set_error_message("The root folder cannot be renamed".to_string());
            return;
        }
        self.open_dialog(DialogKind::Rename { original: path });
    }

    /// Apply the rename typed into the dialog.
    pub fn submit_rename(&mut self, original: &Path) {
        let input = std::mem::take(&mut self.dialog_state.input);
        self.close_dialog();
        match self.engine.rename(original, &input) {
            Ok(outcome) => {
                tracing::debug!(changes = outcome.changes.len(), "rename applied");
                let name = display_name(&outcome.new_path);
                self.sync_rows(Some(&outcome.new_path));
                self.set_status_message(format!("Renamed to {}", name));
            }
            Err(OpError::InvalidName(InvalidNameReason::Unchanged)) => {}
            Err(e @ (OpError::InvalidName(_) | OpError::NameCollision(_))) => {
                self.set_error_message(e.to_string());
            }
            Err(e) => {
                self.report_error(e);
            }
        }
    }

    /// Flip the extension under the filter cursor.
    pub fn toggle_filter(&mut self) {
        let Some(entry) = self.engine.filters().entries().get(self.filter_cursor).cloned() else {
            return;
        };
        let keep = self.focused_path();
        match self.engine.set_filter_enabled(&entry.extension, !entry.enabled) {
            Ok(_) => {
                self.sync_rows(keep.as_deref());
                let state = if entry.enabled { "hidden" } else { "shown" };
                self.set_status_message(format!("{} files {}", entry.label(), state));
            }
            Err(e) => self.report_error(e),
        }
    }

    /// Re-read the directory the cursor is in.
    pub fn refresh_current(&mut self) {
        let dir = self.current_dir();
        let keep = self.focused_path();
        match self.engine.refresh(&dir) {
            Ok(_) => {
                self.preview.path = None;
                self.sync_rows(keep.as_deref());
                self.set_status_message(format!("Refreshed {}", display_name(&dir)));
            }
            Err(e) => self.report_error(e),
        }
    }

    pub fn reload(&mut self) {
        let keep = self.focused_path();
        match self.engine.reload() {
            Ok(_) => {
                self.preview.path = None;
                self.sync_rows(keep.as_deref());
                self.set_status_message("Reloaded".to_string());
            }
            Err(e) => self.report_error(e),
        }
    }
}

fn display_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| path.display().to_string())
}
