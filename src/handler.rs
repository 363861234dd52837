use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};

use crate::app::{App, AppMode, DialogKind, Focus};
use crate::engine::cascade::ToggleMode;
use crate::engine::mutation::ConflictChoice;
use crate::fs::clipboard::ClipboardMode;

/// Handle a key event.
pub fn handle_key_event(app: &mut App, key: KeyEvent) {
    if key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL) {
        app.quit();
        return;
    }

    if app.show_help {
        if matches!(key.code, KeyCode::Char('?') | KeyCode::Esc | KeyCode::Char('q')) {
            app.show_help = false;
        }
        return;
    }

    match app.mode.clone() {
        AppMode::Dialog(kind) => handle_dialog_key(app, key, kind),
        AppMode::Normal => match app.focus {
            Focus::Tree => handle_tree_key(app, key),
            Focus::Filter => handle_filter_key(app, key),
        },
    }
}

fn handle_tree_key(app: &mut App, key: KeyEvent) {
    match key.code {
        KeyCode::Char('q') => app.quit(),
        KeyCode::Char('j') | KeyCode::Down => app.select_next(),
        KeyCode::Char('k') | KeyCode::Up => app.select_previous(),
        KeyCode::Char('g') | KeyCode::Home => app.select_first(),
        KeyCode::Char('G') | KeyCode::End => app.select_last(),
        KeyCode::Char('l') | KeyCode::Right | KeyCode::Enter => app.expand_selected(),
        KeyCode::Char('h') | KeyCode::Left => app.collapse_selected(),
        KeyCode::Char(' ') => app.toggle_selected(ToggleMode::Shallow),
        KeyCode::Char('a') => app.toggle_selected(ToggleMode::Deep),
        KeyCode::Char('y') => app.clip(ClipboardMode::Copy),
        KeyCode::Char('x') => app.clip(ClipboardMode::Cut),
        KeyCode::Char('p') => app.start_paste(),
        KeyCode::Char('d') | KeyCode::Delete => app.start_delete(),
        KeyCode::Char('r') | KeyCode::F(2) => app.start_rename(),
        KeyCode::Char('R') => app.reload(),
        KeyCode::F(5) => app.refresh_current(),
        KeyCode::Tab => app.toggle_focus(),
        KeyCode::Char('?') => app.show_help = true,
        KeyCode::Esc => app.engine.clear_clipboard(),
        _ => {}
    }
}

fn handle_filter_key(app: &mut App, key: KeyEvent) {
    match key.code {
        KeyCode::Char('q') => app.quit(),
        KeyCode::Char('j') | KeyCode::Down => app.filter_next(),
        KeyCode::Char('k') | KeyCode::Up => app.filter_previous(),
        KeyCode::Char(' ') | KeyCode::Enter => app.toggle_filter(),
        KeyCode::Char('R') => app.reload(),
        KeyCode::Tab | KeyCode::Esc => app.toggle_focus(),
        KeyCode::Char('?') => app.show_help = true,
        _ => {}
    }
}

fn handle_dialog_key(app: &mut App, key: KeyEvent, kind: DialogKind) {
    match kind {
        DialogKind::Rename { original } => match key.code {
            KeyCode::Enter => app.submit_rename(&original),
            KeyCode::Esc => app.close_dialog(),
            KeyCode::Backspace => app.dialog_delete_char(),
            KeyCode::Left => app.dialog_move_cursor_left(),
            KeyCode::Right => app.dialog_move_cursor_right(),
            KeyCode::Home => app.dialog_cursor_home(),
            KeyCode::End => app.dialog_cursor_end(),
            KeyCode::Char(c) => app.dialog_input_char(c),
            _ => {}
        },
        DialogKind::DeleteConfirm { targets } => match key.code {
            KeyCode::Char('y') | KeyCode::Char('Y') => {
                app.close_dialog();
                app.run_delete(targets);
            }
            KeyCode::Char('n') | KeyCode::Char('N') | KeyCode::Esc => app.close_dialog(),
            _ => {}
        },
        DialogKind::PasteConflict { dest, .. } => {
            let choice = match key.code {
                KeyCode::Char('o') | KeyCode::Char('O') => ConflictChoice::Overwrite,
                KeyCode::Char('s') | KeyCode::Char('S') => ConflictChoice::Skip,
                KeyCode::Char('c') | KeyCode::Char('C') | KeyCode::Esc => {
                    ConflictChoice::CancelAll
                }
                _ => return,
            };
            app.close_dialog();
            if choice == ConflictChoice::CancelAll {
                app.set_status_message("Paste cancelled".to_string());
            } else {
                app.run_paste(&dest, choice);
            }
        }
        DialogKind::Error { .. } => {
            if matches!(key.code, KeyCode::Enter | KeyCode::Esc) {
                app.close_dialog();
            }
        }
    }
}
