use ratatui::{
    layout::{Constraint, Direction, Layout},
    style::{Color, Style},
    widgets::{Block, Borders},
    Frame,
};

use crate::app::{App, Focus};
use crate::components::dialog::DialogWidget;
use crate::components::filter_panel::FilterPanelWidget;
use crate::components::help::HelpOverlay;
use crate::components::preview::PreviewWidget;
use crate::components::status_bar::StatusBarWidget;
use crate::components::tree::TreeWidget;
use crate::fs::clipboard::ClipboardMode;

fn pane(title: String, focused: bool) -> Block<'static> {
    let color = if focused { Color::Cyan } else { Color::DarkGray };
    Block::default()
        .title(title)
        .borders(Borders::ALL)
        .border_style(Style::default().fg(color))
}

/// Render the application UI.
///
/// Layout: tree on the left; filter panel above the preview on the right;
/// status bar along the bottom; dialogs and help drawn over everything.
pub fn render(app: &mut App, frame: &mut Frame) {
    let area = frame.area();
    let [body, status] = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Min(3), Constraint::Length(1)])
        .areas(area);
    let [tree_area, side] = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(55), Constraint::Percentage(45)])
        .areas(body);
    let [filter_area, preview_area] = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Percentage(40), Constraint::Percentage(60)])
        .areas(side);

    // Border takes two rows.
    app.update_scroll(tree_area.height.saturating_sub(2) as usize);

    let tree_focused = app.focus == Focus::Tree;
    let root_name = app
        .rows
        .first()
        .map(|r| r.entry.name.clone())
        .unwrap_or_default();
    let tree = TreeWidget::new(&app.rows, app.cursor, app.scroll_offset)
        .focused(tree_focused)
        .clipboard(app.engine.clipboard())
        .block(pane(format!(" {} ", root_name), tree_focused));
    frame.render_widget(tree, tree_area);

    let filters = FilterPanelWidget::new(app.engine.filters().entries(), app.filter_cursor)
        .focused(!tree_focused)
        .block(pane(" Extensions ".to_string(), !tree_focused));
    frame.render_widget(filters, filter_area);

    let preview_title = app
        .preview
        .path
        .as_ref()
        .and_then(|p| p.file_name())
        .map(|n| format!(" {} ", n.to_string_lossy()))
        .unwrap_or_else(|| " Preview ".to_string());
    frame.render_widget(
        PreviewWidget::new(&app.preview).block(pane(preview_title, false)),
        preview_area,
    );

    let path_str = app
        .focused()
        .map(|r| r.entry.path.display().to_string())
        .unwrap_or_default();
    let clipboard = app.engine.clipboard();
    let clipboard_info = match clipboard.mode() {
        Some(ClipboardMode::Copy) => Some(format!("copy {}", clipboard.len())),
        Some(ClipboardMode::Cut) => Some(format!("cut {}", clipboard.len())),
        None => None,
    };
    let mut bar = StatusBarWidget::new(&path_str, app.engine.selection().len());
    if let Some(info) = clipboard_info.as_deref() {
        bar = bar.clipboard_info(info);
    }
    if let Some((msg, _, is_error)) = &app.status_message {
        bar = bar.status_message(msg, *is_error);
    }
    frame.render_widget(bar, status);

    frame.render_widget(DialogWidget::new(&app.mode, &app.dialog_state), area);
    if app.show_help {
        frame.render_widget(HelpOverlay, area);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::{Engine, EngineOptions};
    use crate::fs::gateway::DiskGateway;
    use ratatui::{backend::TestBackend, Terminal};
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn renders_all_panes() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("notes.md"), "hello preview").unwrap();
        let engine = Engine::new(
            Box::new(DiskGateway::default()),
            EngineOptions::default(),
            dir.path(),
        )
        .unwrap();
        let mut app = App::new(engine, true);
        app.select_next();

        let mut terminal = Terminal::new(TestBackend::new(100, 20)).unwrap();
        terminal.draw(|frame| render(&mut app, frame)).unwrap();
        let buffer = terminal.backend().buffer();
        let content: String = buffer.content().iter().map(|c| c.symbol()).collect();
        assert!(content.contains("[ ] notes.md"));
        assert!(content.contains("Extensions"));
        assert!(content.contains(".md (1)"));
        assert!(content.contains("hello preview"));
        assert!(content.contains("0 selected"));
    }
}
