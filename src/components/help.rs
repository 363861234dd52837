use ratatui::{
    buffer::Buffer,
    layout::Rect,
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, Widget},
};

/// (section, [(keys, action)]).
const SECTIONS: &[(&str, &[(&str, &str)])] = &[
    (
        "Tree",
        &[
            ("j / ↓, k / ↑", "Move down / up"),
            ("g / G", "Jump to first / last"),
            ("l / → / Enter", "Expand folder"),
            ("h / ←", "Collapse, or go to parent"),
            ("Space", "Toggle entry (folder: its files)"),
            ("a", "Toggle folder with everything below"),
            ("F5", "Refresh the current folder"),
            ("R", "Reload the whole tree"),
        ],
    ),
    (
        "Files",
        &[
            ("y / x", "Copy / cut selection"),
            ("p", "Paste into focused folder"),
            ("d", "Delete selection"),
            ("r", "Rename focused entry"),
            ("Esc", "Clear clipboard"),
        ],
    ),
    (
        "Filter panel",
        &[
            ("Tab", "Switch between tree and filter"),
            ("Space / Enter", "Show or hide an extension"),
        ],
    ),
    ("General", &[("?", "Toggle this help"), ("q / Ctrl+C", "Quit")]),
];

/// Modal key reference.
pub struct HelpOverlay;

impl HelpOverlay {
    fn lines() -> Vec<Line<'static>> {
        let heading = Style::default()
            .fg(Color::Cyan)
            .add_modifier(Modifier::BOLD);
        let key_style = Style::default()
            .fg(Color::Yellow)
            .add_modifier(Modifier::BOLD);
        let mut lines = Vec::new();
        for (section, keys) in SECTIONS {
            lines.push(Line::from(Span::styled(format!("── {} ", section), heading)));
            for (key, action) in keys.iter() {
                lines.push(Line::from(vec![
                    Span::styled(format!("  {:<18}", key), key_style),
                    Span::raw(*action),
                ]));
            }
            lines.push(Line::from(""));
        }
        lines.push(Line::from(Span::styled(
            " Press ? or Esc to close ",
            Style::default().fg(Color::DarkGray),
        )));
        lines
    }
}

impl Widget for HelpOverlay {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let width = 60.min(area.width);
        let height = 30.min(area.height);
        let rect = Rect::new(
            area.x + area.width.saturating_sub(width) / 2,
            area.y + area.height.saturating_sub(height) / 2,
            width,
            height,
        );
        Clear.render(rect, buf);
        let block = Block::default()
            .title(" Help ")
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::Cyan));
        let inner = block.inner(rect);
        block.render(rect, buf);

        for (i, line) in Self::lines().iter().take(inner.height as usize).enumerate() {
            buf.set_line(
                inner.x + 1,
                inner.y + i as u16,
                line,
                inner.width.saturating_sub(2),
            );
        }
    }
}
