use ratatui::{
    buffer::Buffer,
    layout::Rect,
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Widget},
};

use crate::engine::tree::{Materialization, Row};
use crate::fs::clipboard::Clipboard;

/// Tree pane: one line per visible node with connector lines and a checkbox.
pub struct TreeWidget<'a> {
    rows: &'a [Row],
    cursor: usize,
    scroll_offset: usize,
    focused: bool,
    clipboard: Option<&'a Clipboard>,
    block: Option<Block<'a>>,
}

impl<'a> TreeWidget<'a> {
    pub fn new(rows: &'a [Row], cursor: usize, scroll_offset: usize) -> Self {
        Self {
            rows,
            cursor,
            scroll_offset,
            focused: true,
            clipboard: None,
            block: None,
        }
    }

    pub fn focused(mut self, focused: bool) -> Self {
        self.focused = focused;
        self
    }

    /// Entries on the clipboard are drawn with a marker.
    pub fn clipboard(mut self, clipboard: &'a Clipboard) -> Self {
        self.clipboard = Some(clipboard);
        self
    }

    pub fn block(mut self, block: Block<'a>) -> Self {
        self.block = Some(block);
        self
    }

    /// Connector prefix for the row at `index`.
    ///
    /// Each ancestor level draws a continuation line unless that ancestor
    /// was the last of its siblings.
    fn build_prefix(rows: &[Row], index: usize) -> String {
        let row = &rows[index];
        if row.depth == 0 {
            return String::new();
        }
        let mut prefix = String::new();
        for d in 1..row.depth {
            let ancestor_is_last = rows[..index]
                .iter()
                .rev()
                .take_while(|r| r.depth >= d)
                .find(|r| r.depth == d)
                .map(|r| r.is_last_sibling)
                .unwrap_or(false);
            prefix.push_str(if ancestor_is_last { "   " } else { "│  " });
        }
        prefix.push_str(if row.is_last_sibling { "└──" } else { "├──" });
        prefix
    }

    fn checkbox(row: &Row) -> &'static str {
        match (row.state, row.checked) {
            (Materialization::Denied, _) => "[!] ",
            (_, true) => "[x] ",
            (_, false) => "[ ] ",
        }
    }

    fn indicator(row: &Row) -> &'static str {
        if !row.entry.is_dir() {
            ""
        } else if row.expanded {
            "▾ "
        } else {
            "▸ "
        }
    }
}

impl<'a> Widget for TreeWidget<'a> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let inner = match &self.block {
            Some(block) => {
                let inner = block.inner(area);
                block.clone().render(area, buf);
                inner
            }
            None => area,
        };

        let visible_height = inner.height as usize;
        if self.rows.is_empty() || visible_height == 0 {
            return;
        }

        let visible = self
            .rows
            .iter()
            .enumerate()
            .skip(self.scroll_offset)
            .take(visible_height);

        for (i, (idx, row)) in visible.enumerate() {
            let y = inner.y + i as u16;

            let on_clipboard = self
                .clipboard
                .map(|c| c.entries().iter().any(|e| e.key() == row.entry.key()))
                .unwrap_or(false);

            let mut style = if row.state == Materialization::Denied {
                Style::default().fg(Color::Red).add_modifier(Modifier::DIM)
            } else if row.entry.is_dir() {
                Style::default()
                    .fg(Color::Blue)
                    .add_modifier(Modifier::BOLD)
            } else {
                Style::default().fg(Color::White)
            };
            if row.checked {
                style = style.fg(Color::Green);
            }
            if on_clipboard {
                style = style.add_modifier(Modifier::ITALIC);
            }
            if idx == self.cursor {
                let bg = if self.focused {
                    Color::DarkGray
                } else {
                    Color::Black
                };
                style = style.bg(bg).add_modifier(Modifier::BOLD);
            }

            let marker = match (on_clipboard, self.clipboard.map(|c| c.is_cut())) {
                (true, Some(true)) => "✂ ",
                (true, _) => "⧉ ",
                _ => "",
            };
            let text = format!(
                "{}{}{}{}{}",
                Self::build_prefix(self.rows, idx),
                Self::checkbox(row),
                Self::indicator(row),
                marker,
                row.entry.name
            );
            let line = Line::from(Span::styled(text, style));
            buf.set_line(inner.x, y, &line, inner.width);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fs::entry::FsEntry;
    use std::path::Path;

    fn row(path: &str, depth: usize, last: bool, checked: bool) -> Row {
        let path = Path::new(path);
        let entry = if path.extension().is_some() {
            FsEntry::file(path)
        } else {
            FsEntry::dir(path)
        };
        Row {
            entry,
            depth,
            expanded: depth == 0,
            checked,
            state: Materialization::Loaded,
            is_last_sibling: last,
        }
    }

    fn line(buf: &Buffer, y: u16, width: u16) -> String {
        (0..width)
            .map(|x| buf.cell((x, y)).unwrap().symbol().to_string())
            .collect()
    }

    #[test]
    fn renders_checkboxes_and_connectors() {
        let rows = vec![
            row("/p", 0, true, false),
            row("/p/src", 1, false, false),
            row("/p/a.rs", 1, true, true),
        ];
        let area = Rect::new(0, 0, 30, 3);
        let mut buf = Buffer::empty(area);
        TreeWidget::new(&rows, 0, 0).render(area, &mut buf);

        assert!(line(&buf, 0, 30).starts_with("[ ] ▾ p"));
        assert!(line(&buf, 1, 30).starts_with("├──[ ] ▸ src"));
        assert!(line(&buf, 2, 30).starts_with("└──[x] a.rs"));
    }

    #[test]
    fn denied_rows_show_bang() {
        let mut denied = row("/p/locked", 1, true, false);
        denied.state = Materialization::Denied;
        let rows = vec![row("/p", 0, true, false), denied];
        let area = Rect::new(0, 0, 30, 2);
        let mut buf = Buffer::empty(area);
        TreeWidget::new(&rows, 0, 0).render(area, &mut buf);
        assert!(line(&buf, 1, 30).contains("[!]"));
    }

    #[test]
    fn nested_prefix_continues_open_levels() {
        let rows = vec![
            row("/p", 0, true, false),
            row("/p/a", 1, false, false),
            row("/p/a/x.md", 2, true, false),
            row("/p/b", 1, true, false),
        ];
        assert_eq!(TreeWidget::build_prefix(&rows, 2), "│  └──");
        assert_eq!(TreeWidget::build_prefix(&rows, 3), "└──");
    }

    #[test]
    fn scroll_offset_skips_rows() {
        let rows = vec![
            row("/p", 0, true, false),
            row("/p/a.md", 1, false, false),
            row("/p/b.md", 1, true, false),
        ];
        let area = Rect::new(0, 0, 20, 1);
        let mut buf = Buffer::empty(area);
        TreeWidget::new(&rows, 2, 2).render(area, &mut buf);
        assert!(line(&buf, 0, 20).contains("b.md"));
    }
}
