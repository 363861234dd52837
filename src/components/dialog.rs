use std::path::{Path, PathBuf};

use ratatui::{
    buffer::Buffer,
    layout::Rect,
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, Padding, Widget},
};

use crate::app::{AppMode, DialogKind, DialogState};

/// Centered modal overlay for the active dialog, if any.
pub struct DialogWidget<'a> {
    mode: &'a AppMode,
    dialog_state: &'a DialogState,
}

impl<'a> DialogWidget<'a> {
    pub fn new(mode: &'a AppMode, dialog_state: &'a DialogState) -> Self {
        Self { mode, dialog_state }
    }
}

fn centered_rect(width: u16, height: u16, area: Rect) -> Rect {
    let w = width.min(area.width);
    let h = height.min(area.height);
    let x = area.x + area.width.saturating_sub(w) / 2;
    let y = area.y + area.height.saturating_sub(h) / 2;
    Rect::new(x, y, w, h)
}

/// Clear a centered box, draw its border and return the inner area.
fn frame(title: &str, color: Color, width: u16, height: u16, area: Rect, buf: &mut Buffer) -> Rect {
    let rect = centered_rect(width, height, area);
    Clear.render(rect, buf);
    let block = Block::default()
        .title(format!(" {} ", title))
        .borders(Borders::ALL)
        .border_style(Style::default().fg(color))
        .padding(Padding::horizontal(1));
    let inner = block.inner(rect);
    block.render(rect, buf);
    inner
}

fn hint(text: &str, inner: Rect, buf: &mut Buffer) {
    if inner.height < 2 {
        return;
    }
    let style = Style::default()
        .fg(Color::DarkGray)
        .add_modifier(Modifier::DIM);
    let line = Line::from(Span::styled(text, style));
    buf.set_line(inner.x, inner.y + inner.height - 1, &line, inner.width);
}

fn display_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| path.to_string_lossy().to_string())
}

impl<'a> Widget for DialogWidget<'a> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let AppMode::Dialog(kind) = self.mode else {
            return;
        };
        match kind {
            DialogKind::Rename { .. } => render_input_dialog("Rename", self.dialog_state, area, buf),
            DialogKind::DeleteConfirm { targets } => {
                let header = format!("Delete {} item(s)?", targets.len());
                render_list_dialog(
                    "Delete Confirmation",
                    &header,
                    targets,
                    "[y] Yes  [n/Esc] Cancel",
                    area,
                    buf,
                );
            }
            DialogKind::PasteConflict { conflicts, .. } => {
                let header = format!("{} item(s) already exist:", conflicts.len());
                render_list_dialog(
                    "Paste Conflict",
                    &header,
                    conflicts,
                    "[o] Overwrite all  [s] Skip all  [c/Esc] Cancel",
                    area,
                    buf,
                );
            }
            DialogKind::Error { message } => render_error_dialog(message, area, buf),
        }
    }
}

fn render_input_dialog(title: &str, state: &DialogState, area: Rect, buf: &mut Buffer) {
    let inner = frame(title, Color::Cyan, 50.min(area.width.saturating_sub(4)), 5, area, buf);
    if inner.height == 0 || inner.width == 0 {
        return;
    }

    let input = &state.input;
    let pos = state.cursor_position.min(input.len());
    let (before, rest) = input.split_at(pos);
    let mut chars = rest.chars();
    let cursor_char = chars.next().map(|c| c.to_string()).unwrap_or_else(|| " ".into());
    let after = chars.as_str();

    // Keep the cursor in view by dropping characters from the left.
    let max_before = (inner.width as usize).saturating_sub(2);
    let before_count = before.chars().count();
    let before_display: String = before
        .chars()
        .skip(before_count.saturating_sub(max_before))
        .collect();

    let input_style = Style::default().fg(Color::White);
    let cursor_style = Style::default()
        .bg(Color::White)
        .fg(Color::Black)
        .add_modifier(Modifier::BOLD);
    let line = Line::from(vec![
        Span::styled(before_display, input_style),
        Span::styled(cursor_char, cursor_style),
        Span::styled(after, input_style),
    ]);
    buf.set_line(inner.x, inner.y + inner.height / 2, &line, inner.width);
    hint("[Enter] Confirm  [Esc] Cancel", inner, buf);
}

fn render_list_dialog(
    title: &str,
    header: &str,
    paths: &[PathBuf],
    hint_text: &str,
    area: Rect,
    buf: &mut Buffer,
) {
    let longest = paths
        .iter()
        .map(|p| display_name(p).chars().count())
        .max()
        .unwrap_or(10);
    let width = (longest as u16 + 10)
        .max(hint_text.len() as u16 + 4)
        .max(40)
        .min(area.width.saturating_sub(4));
    let height = (paths.len() as u16 + 6).min(area.height.saturating_sub(2));
    let inner = frame(title, Color::Red, width, height, area, buf);
    if inner.height == 0 || inner.width == 0 {
        return;
    }

    let header_line = Line::from(Span::styled(
        header,
        Style::default()
            .fg(Color::Yellow)
            .add_modifier(Modifier::BOLD),
    ));
    buf.set_line(inner.x, inner.y, &header_line, inner.width);

    let room = inner.height.saturating_sub(3) as usize;
    let shown = if paths.len() > room { room.saturating_sub(1) } else { paths.len() };
    for (i, path) in paths.iter().take(shown).enumerate() {
        let line = Line::from(Span::styled(
            format!("  • {}", display_name(path)),
            Style::default().fg(Color::White),
        ));
        buf.set_line(inner.x, inner.y + 2 + i as u16, &line, inner.width);
    }
    if shown < paths.len() {
        let more = Line::from(Span::styled(
            format!("  … and {} more", paths.len() - shown),
            Style::default().fg(Color::DarkGray),
        ));
        buf.set_line(inner.x, inner.y + 2 + shown as u16, &more, inner.width);
    }
    hint(hint_text, inner, buf);
}

fn render_error_dialog(message: &str, area: Rect, buf: &mut Buffer) {
    let width = (message.chars().count() as u16 + 6)
        .max(30)
        .min(area.width.saturating_sub(4));
    let inner = frame("Error", Color::Red, width, 5, area, buf);
    if inner.height == 0 || inner.width == 0 {
        return;
    }
    let line = Line::from(Span::styled(message, Style::default().fg(Color::Red)));
    buf.set_line(inner.x, inner.y + inner.height / 2, &line, inner.width);
    hint("[Enter/Esc] Dismiss", inner, buf);
}
